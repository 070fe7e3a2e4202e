//! Prompts for lesson generation, illustration, and tutor narration.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — the JSON structure the validator expects
//!    and the structure the model is asked to produce live one screen apart;
//!    changing the section vocabulary means editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect prompts directly without
//!    calling a real model, making contract regressions easy to catch.

/// Instruction prompt sent with the inlined PDF for lesson generation.
///
/// The wire keys (`titulo`, `topicos`, `secoes`, `tipo`, …) are the contract
/// the validator in [`crate::pipeline::validate`] enforces; the six section
/// kinds listed here are the only ones that survive normalization.
pub const LESSON_PROMPT: &str = r#"You are an AI assistant specialised in producing detailed, well-structured teaching material from PDF documents.
Analyse the provided PDF and transform it into a rich, interactive study guide, with code examples always placed in dedicated sections of kind "codigo".

The result MUST be a SINGLE JSON object. Include NO text outside the JSON object, not even markdown fences such as ```json.
The JSON object must follow EXACTLY this structure:
{
  "titulo": "string",            // overall title of the material
  "topicos": [
    {
      "id": "string",            // unique topic identifier (e.g. "1", "2.1", "theme-a")
      "titulo": "string",        // title of this topic
      "objetivos": ["string"],   // learning objectives for this topic
      "secoes": [
        { "tipo": "texto",              "titulo": "string (optional)", "conteudo": "string (markdown allowed)" },
        { "tipo": "exemplo",            "titulo": "string (optional)", "conteudo": "string (markdown allowed; a scenario or use case)" },
        { "tipo": "destaque",           "conteudo": "string (one short sentence or paragraph emphasising a key point)" },
        { "tipo": "lista",              "titulo": "string (optional)", "itens": ["string"] },
        { "tipo": "pergunta_reflexiva", "conteudo": "string (a question prompting critical thinking)" },
        { "tipo": "codigo",             "titulo": "string (optional)", "conteudo": "string (RAW source code only)", "linguagem": "string (optional, e.g. 'python')" }
      ]
    }
  ]
}

STRICT JSON RULES:
1. The result MUST be ONE valid JSON object with NO surrounding text.
2. Use double quotes for all keys and string values.
3. Escape special characters inside strings (quotes, backslashes, newlines).
4. Commas between object pairs and array elements only; NEVER trailing commas.
5. Every bracket and brace must be correctly opened, closed, and nested.
6. Re-check the JSON syntax before finishing; a syntax error makes the response unusable.

CONTENT RULES:
- Produce an appropriate overall 'titulo'.
- For each topic provide a unique 'id', a clear 'titulo', a list of 'objetivos', and an array of 'secoes'.
- Choose section kinds ('texto', 'exemplo', 'destaque', 'lista', 'pergunta_reflexiva', 'codigo') to best present the information.
- Any code fragment belongs exclusively in a "codigo" section; never embed code inside text or example sections.
- The 'conteudo' of 'texto', 'exemplo', 'destaque', and 'pergunta_reflexiva' sections may use simple Markdown (bold, italic, lists, links).
- For 'codigo' sections, 'conteudo' MUST be raw source code, never fenced.
- Write the material in the same language as the input PDF; fall back to Portuguese (pt-BR) when the language cannot be determined.
- If the PDF is empty or contains no usable text, return a JSON object whose title states the problem and one topic with a section explaining that no material could be generated."#;

/// Wrap a topic title into the illustration request prompt.
///
/// The style suffix keeps generated images consistent across topics and the
/// "no text" instruction avoids garbled captions burned into the picture.
pub fn illustration_prompt(topic_title: &str) -> String {
    format!(
        "A clear, educational illustration about: {topic_title}. \
         Digital art style, vibrant, modern and conceptual. No text in the image."
    )
}

/// Build the tutor narration prompt for a lesson title.
///
/// The serialized lesson is appended by the caller; the persona text asks
/// for a motivational spoken-style summary, not a restatement of the JSON.
pub fn tutor_prompt(lesson_title: &str) -> String {
    format!(
        r#"You are "Your Study Tutor", an AI with a warm, experienced, and enthusiastic personality. Your mission is to be a close, welcoming mentor for students working through this material.

Create a spoken-style explanation (as text) of the content provided below as a JSON object. The main title of the material is: "{lesson_title}".

Your explanation must follow this structure:

1. A warm, personalised greeting
   Greet the student, mention the material's title in a light, motivating way, and show you are glad to accompany them.

2. The main points of the content
   Identify and briefly explain the 2 or 3 most important concepts in the material. Use simple, direct, engaging language. Spark curiosity with rhetorical questions, light analogies, or by showing the practical use of what will be studied.

3. A motivating closing message
   Encourage the student to continue, with empathetic, confidence-building phrases. Reinforce that they are not alone and that learning is a continuous construction.

Important:
- Do not copy or repeat technical parts of the JSON.
- Your role is a clear, motivational summary that prepares the student to dive into the content with confidence and curiosity.
- Keep the tone friendly, confident, and respectful throughout.

Now read the JSON content and produce your introductory explanation for the student:
"#
    )
}
