//! # pdf2lesson
//!
//! Turn a PDF document into structured lesson material using a hosted
//! generative-AI API, with optional per-topic illustrations and a
//! text-to-speech tutor narration.
//!
//! ## Why this crate?
//!
//! The hard part of this pipeline is not calling the model — it is trusting
//! what comes back. The generation API returns loosely-structured JSON that
//! only usually matches the requested schema: topics with corrupt fields,
//! sections with unknown kinds, section objects strayed into the topic
//! array. This crate normalizes that untrusted payload into a strict lesson
//! schema, dropping malformed items with diagnostics instead of failing the
//! whole document, and sequences the surrounding flow (submit → validate →
//! illustrate → narrate) as an explicit state machine that discards stale
//! responses.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Submit    instruction prompt + inlined PDF bytes to the model
//!  ├─ 2. Validate  untrusted JSON → Lesson (drop + diagnose malformed items)
//!  ├─ 3. Illustrate fan-out one image request per topic, order-preserving
//!  └─ 4. Complete  lesson handed to the caller
//!
//! Lesson ─▶ tutor narration text ─▶ speech synthesis ─▶ WAV assembly
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2lesson::{GeminiBackend, LessonConfig, Orchestrator, Outcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credential read from GEMINI_API_KEY / API_KEY
//!     let config = LessonConfig::default();
//!     let backend = GeminiBackend::from_config(&config)?;
//!     let orchestrator = Orchestrator::new(backend, config);
//!
//!     let bytes = std::fs::read("document.pdf")?;
//!     orchestrator.select_file("document.pdf", "application/pdf", bytes)?;
//!
//!     if let Outcome::Completed(output) = orchestrator.generate().await? {
//!         println!("{}", serde_json::to_string_pretty(&output.lesson)?);
//!         eprintln!("dropped during validation: {}", output.diagnostics.dropped_count());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2lesson` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2lesson = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod audio;
pub mod backend;
pub mod config;
pub mod error;
pub mod gemini;
pub mod material;
pub mod orchestrate;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use audio::{assemble_playable, PlayableAudio};
pub use backend::{GenerativeBackend, SpeechPayload};
pub use config::{LessonConfig, LessonConfigBuilder, ModelTier};
pub use error::{Diagnostics, DropReason, LessonError};
pub use gemini::GeminiBackend;
pub use material::{Lesson, Section, Topic};
pub use orchestrate::{GenerationOutput, Orchestrator, Outcome, Phase, SelectedFile};
pub use pipeline::tutor::TutorNarration;
pub use pipeline::validate::normalize_lesson;
pub use progress::{ProgressEstimator, ProgressTicker};
