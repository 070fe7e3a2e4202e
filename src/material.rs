//! Lesson schema: the validated educational material handed to callers.
//!
//! Field names on the wire are fixed by the generation prompt contract
//! (`titulo`, `topicos`, `secoes`, …) and the serde renames below keep the
//! serialized form byte-compatible with what the upstream model is asked to
//! produce. That matters in one place beyond display: the tutor narration
//! prompt embeds the serialized lesson verbatim.
//!
//! These types carry no logic. Construction happens exclusively in
//! [`crate::pipeline::validate`], which guarantees every `Topic` and
//! `Section` here passed the shape checks; a malformed entry is dropped
//! before these types are built, never partially included.

use serde::Serialize;

/// The top-level validated educational material: a title plus an ordered
/// sequence of topics.
///
/// Created fresh per generation request; immutable once returned to the
/// caller except for topic-level image enrichment by the illustration step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lesson {
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "topicos")]
    pub topics: Vec<Topic>,
}

/// One teaching unit: learning objectives followed by typed content blocks.
///
/// `id` is caller-supplied by the model and not validated for uniqueness.
/// `sections` and `objectives` may be empty but are always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topic {
    pub id: String,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "objetivos")]
    pub objectives: Vec<String>,
    #[serde(rename = "secoes")]
    pub sections: Vec<Section>,
    /// URI or inline data reference to a generated illustration. Absent when
    /// illustrations are disabled or the illustration request yielded
    /// nothing; no placeholder is ever substituted.
    #[serde(rename = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// One typed content block within a topic.
///
/// The wire tag vocabulary is fixed by the generation prompt:
/// `texto`, `exemplo`, `destaque`, `lista`, `pergunta_reflexiva`, `codigo`.
/// A section whose tag matches none of these, or whose payload has the
/// wrong shape, never reaches this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tipo")]
pub enum Section {
    /// Markdown-bearing prose.
    #[serde(rename = "texto")]
    Text {
        #[serde(rename = "titulo", skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(rename = "conteudo")]
        content: String,
    },

    /// A worked example, scenario, or use case (Markdown allowed).
    #[serde(rename = "exemplo")]
    Example {
        #[serde(rename = "titulo", skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(rename = "conteudo")]
        content: String,
    },

    /// A short emphasized statement of a key point.
    #[serde(rename = "destaque")]
    Highlight {
        #[serde(rename = "titulo", skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(rename = "conteudo")]
        content: String,
    },

    /// An ordered list of plain-string items.
    #[serde(rename = "lista")]
    List {
        #[serde(rename = "titulo", skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(rename = "itens")]
        items: Vec<String>,
    },

    /// A question prompting the student to reflect.
    #[serde(rename = "pergunta_reflexiva")]
    ReflectiveQuestion {
        #[serde(rename = "titulo", skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(rename = "conteudo")]
        content: String,
    },

    /// Raw source code, never Markdown-fenced, with an optional language hint.
    #[serde(rename = "codigo")]
    Code {
        #[serde(rename = "titulo", skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(rename = "conteudo")]
        content: String,
        #[serde(rename = "linguagem", skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
}

impl Section {
    /// The wire tag for this section's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Section::Text { .. } => "texto",
            Section::Example { .. } => "exemplo",
            Section::Highlight { .. } => "destaque",
            Section::List { .. } => "lista",
            Section::ReflectiveQuestion { .. } => "pergunta_reflexiva",
            Section::Code { .. } => "codigo",
        }
    }
}
