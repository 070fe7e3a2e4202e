//! The generative-API seam.
//!
//! Everything the pipeline asks of the hosted model — lesson text from a
//! PDF, one illustration per topic, tutor narration text, speech synthesis —
//! goes through [`GenerativeBackend`]. The orchestrator is generic over the
//! trait so tests substitute a scripted in-memory backend and never touch
//! the network; [`crate::gemini::GeminiBackend`] is the production
//! implementation.

use crate::error::LessonError;

/// A base64 audio payload with its declared media type, exactly as the
/// speech API returned it. [`crate::audio::assemble_playable`] turns this
/// into playable bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechPayload {
    pub audio_base64: String,
    pub media_type: String,
}

/// Network collaborator for all four generative operations.
///
/// Futures returned here are driven on a single task (the whole pipeline is
/// cooperative, see the crate docs), so no `Send` bound is imposed.
#[allow(async_fn_in_trait)]
pub trait GenerativeBackend {
    /// Submit the instruction prompt plus inlined PDF bytes and return the
    /// raw response text, expected (but not trusted) to be the lesson JSON.
    async fn generate_lesson_text(
        &self,
        model: &str,
        prompt: &str,
        pdf_bytes: &[u8],
    ) -> Result<String, LessonError>;

    /// Request one illustration for a free-text prompt.
    ///
    /// `Ok(None)` means the service produced nothing — a normal outcome,
    /// not an error. `Ok(Some(_))` is a URI or inline data reference.
    async fn generate_image(&self, prompt: &str) -> Result<Option<String>, LessonError>;

    /// Generate plain narration text for the given prompt.
    async fn generate_narration(&self, model: &str, prompt: &str) -> Result<String, LessonError>;

    /// Synthesize speech for the given text with the given voice selector.
    async fn synthesize_speech(
        &self,
        model: &str,
        voice: &str,
        text: &str,
    ) -> Result<SpeechPayload, LessonError>;
}
