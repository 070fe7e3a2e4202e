//! Pipeline stages for lesson generation.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets the
//! orchestrator sequence them without any stage knowing about the others.
//!
//! ## Data Flow
//!
//! ```text
//! PDF ──▶ backend text call ──▶ validate ──▶ illustrate ──▶ Lesson
//!                                 (drop + diagnose)  (fan-out/fan-in)
//!
//! Lesson ──▶ tutor ──▶ narration text ──▶ speech ──▶ playable audio
//! ```
//!
//! 1. [`validate`]   — normalize the untrusted response JSON into a
//!    [`crate::material::Lesson`], dropping malformed items with diagnostics
//! 2. [`illustrate`] — optionally attach one generated image per topic;
//!    per-topic failures are normal absent-image outcomes
//! 3. [`tutor`]      — narration text plus speech synthesis and WAV assembly

pub mod illustrate;
pub mod tutor;
pub mod validate;
