//! Error types for the pdf2lesson library.
//!
//! Two distinct error surfaces reflect two distinct failure modes:
//!
//! * [`LessonError`] — **Fatal**: the current operation cannot proceed at
//!   all (no credential, no file selected, transport failure, root payload
//!   malformed, undecodable audio). Returned as `Err(LessonError)` from the
//!   library entry points.
//!
//! * [`Diagnostics`] — **Non-fatal**: individual topics or sections were
//!   dropped while normalizing the model's response. Returned alongside the
//!   [`crate::material::Lesson`] so callers can surface drop counts to the
//!   user instead of losing the whole document to one malformed entry.
//!
//! The separation lets callers decide their own tolerance: treat any drop as
//! a quality failure, warn and continue, or ignore diagnostics entirely.

use thiserror::Error;

/// All fatal errors returned by the pdf2lesson library.
///
/// Item-level drops during validation use [`Diagnostics`] and are returned
/// next to the lesson rather than propagated here.
#[derive(Debug, Error)]
pub enum LessonError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// No API credential is available; detected before any network call.
    #[error(
        "Generative API key is not configured.\n\
         Set GEMINI_API_KEY (or API_KEY) in the environment, or pass one \
         explicitly via LessonConfig::builder().api_key(..)."
    )]
    ApiKeyMissing,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Precondition errors (local, no network call attempted) ────────────
    /// A generation was requested before any PDF was selected.
    #[error("No PDF file selected. Select a PDF document before submitting.")]
    NoFileSelected,

    /// The selected file does not declare (or contain) PDF content.
    #[error("File '{name}' is not a PDF: {detail}")]
    NotAPdf { name: String, detail: String },

    /// Narration was requested for empty text.
    #[error("Narration text is empty; nothing to convert to speech.")]
    EmptyNarration,

    /// The tutor was called before any lesson was generated.
    #[error("No lesson available. Generate material before calling the tutor.")]
    NoLesson,

    // ── Communication errors ──────────────────────────────────────────────
    /// Network/transport/auth failure talking to an external API endpoint.
    #[error("Communication failure with the {endpoint} API: {detail}")]
    Communication {
        endpoint: &'static str,
        detail: String,
    },

    // ── Response-shape errors ─────────────────────────────────────────────
    /// The generation response decodes but violates the expected shape at
    /// the root (missing string `titulo` or array `topicos`), or is not
    /// valid JSON at all. Fatal for the whole generation.
    #[error("The generation API returned an unexpected format: {detail}")]
    MalformedResponse { detail: String },

    // ── Media errors ──────────────────────────────────────────────────────
    /// Invalid base64 or otherwise unplayable audio. Fatal for the
    /// narration feature only; the displayed lesson stays valid.
    #[error("Audio payload could not be decoded: {detail}")]
    MediaDecoding { detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a single topic or section was excluded from the normalized lesson.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropReason {
    /// Topic is missing string `id`, string `titulo`, or the `objetivos` /
    /// `secoes` arrays.
    #[error("topic is missing required fields (id, titulo, objetivos, secoes)")]
    TopicShape,

    /// Topic has an `objetivos` array containing non-string entries.
    #[error("topic '{title}' has non-string entries in 'objetivos'")]
    TopicObjectives { title: String },

    /// A section-shaped object (kind tag + content, no topic fields)
    /// appeared directly inside the `topicos` array.
    #[error("section of kind '{kind}' found at topic level")]
    StraySectionAtTopicLevel { kind: String },

    /// Section has no string `tipo` tag at all.
    #[error("section has no 'tipo' tag")]
    SectionUntagged,

    /// Section kind tag matched none of the six known variants.
    #[error("unknown section kind '{kind}'")]
    SectionUnknownKind { kind: String },

    /// A `lista` section whose `itens` is not an all-string array.
    #[error("section 'lista' has invalid 'itens' (not an array of strings)")]
    SectionListItems,

    /// A content-bearing section whose `conteudo` is not a string.
    #[error("section '{kind}' has non-string 'conteudo'")]
    SectionContent { kind: String },

    /// A `codigo` section with a `linguagem` field that is not a string.
    #[error("section 'codigo' has non-string 'linguagem'")]
    SectionCodeLanguage,
}

/// Side-channel record of everything dropped while normalizing one response.
///
/// Always returned next to the lesson; an empty `Diagnostics` means the raw
/// payload was fully well-formed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// One entry per dropped top-level item in `topicos`.
    pub dropped_topics: Vec<DropReason>,
    /// One entry per dropped section, tagged with the owning topic's title.
    pub dropped_sections: Vec<(String, DropReason)>,
    /// The raw payload had at least one topic but none survived validation.
    /// Non-fatal: the lesson is returned with an empty topic list, but this
    /// is a user-visible quality signal.
    pub all_topics_dropped: bool,
}

impl Diagnostics {
    /// True when nothing was dropped.
    pub fn is_clean(&self) -> bool {
        self.dropped_topics.is_empty() && self.dropped_sections.is_empty()
    }

    /// Total number of dropped items (topics + sections).
    pub fn dropped_count(&self) -> usize {
        self.dropped_topics.len() + self.dropped_sections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_missing_mentions_env_var() {
        let msg = LessonError::ApiKeyMissing.to_string();
        assert!(msg.contains("GEMINI_API_KEY"), "got: {msg}");
    }

    #[test]
    fn communication_display() {
        let e = LessonError::Communication {
            endpoint: "text generation",
            detail: "connection refused".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("text generation"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn drop_reason_display() {
        let r = DropReason::SectionUnknownKind {
            kind: "tabela".into(),
        };
        assert!(r.to_string().contains("tabela"));
    }

    #[test]
    fn diagnostics_counts() {
        let mut d = Diagnostics::default();
        assert!(d.is_clean());
        d.dropped_topics.push(DropReason::TopicShape);
        d.dropped_sections
            .push(("Intro".into(), DropReason::SectionListItems));
        assert!(!d.is_clean());
        assert_eq!(d.dropped_count(), 2);
    }
}
