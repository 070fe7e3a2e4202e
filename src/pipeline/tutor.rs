//! Tutor narration: a spoken-style summary of the lesson, synthesized to
//! playable audio.
//!
//! Strictly sequential: narration text first, then speech synthesis, then
//! container assembly. A failure anywhere here is fatal for the narration
//! feature only — the lesson the caller already holds is untouched.

use crate::audio::{assemble_playable, PlayableAudio};
use crate::backend::GenerativeBackend;
use crate::config::{LessonConfig, TTS_MODEL};
use crate::error::LessonError;
use crate::material::Lesson;
use crate::prompts::tutor_prompt;
use tracing::info;

/// Narration text plus the playable audio it was synthesized into.
#[derive(Debug, Clone)]
pub struct TutorNarration {
    pub text: String,
    pub audio: PlayableAudio,
}

/// Generate the tutor's spoken introduction for a lesson.
///
/// The prompt embeds the persona template followed by the serialized
/// lesson; the model is asked for a motivational summary, not a
/// restatement of the JSON.
pub async fn narrate_lesson<B: GenerativeBackend>(
    backend: &B,
    config: &LessonConfig,
    lesson: &Lesson,
) -> Result<TutorNarration, LessonError> {
    let lesson_json = serde_json::to_string(lesson)
        .map_err(|e| LessonError::Internal(format!("lesson serialization: {e}")))?;
    let prompt = format!("{}\n\n{}", tutor_prompt(&lesson.title), lesson_json);

    info!(lesson = lesson.title, "generating tutor narration text");
    let text = backend
        .generate_narration(&config.tutor_model, &prompt)
        .await?;
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(LessonError::EmptyNarration);
    }

    info!(chars = text.len(), voice = config.voice, "synthesizing speech");
    let payload = backend
        .synthesize_speech(TTS_MODEL, &config.voice, &text)
        .await?;
    let audio = assemble_playable(&payload)?;

    Ok(TutorNarration { text, audio })
}
