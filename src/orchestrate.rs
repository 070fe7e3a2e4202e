//! Generation orchestration: the session state machine.
//!
//! One [`Orchestrator`] holds the state of one user session: the selected
//! file, the current phase, the displayed lesson, and the single active
//! audio handle. Generation walks the phases
//!
//! ```text
//! Idle → Submitting → ValidatingText → AwaitingIllustrations → Complete
//! ```
//!
//! with `Errored` absorbing failures from any non-terminal phase. Only an
//! explicit [`Orchestrator::reset`] returns to `Idle`, discarding the
//! lesson and any audio.
//!
//! ## Stale-response rejection
//!
//! There is no mid-flight cancellation; instead every request is tagged
//! with a monotonically increasing generation id. After each suspension
//! point the id is compared against the current counter and, when a reset
//! or newer request has bumped it, the late result is discarded as
//! [`Outcome::Superseded`] without touching session state. A stale
//! completion can therefore never overwrite a newer request's lesson,
//! phase, or audio.

use crate::audio::PlayableAudio;
use crate::backend::GenerativeBackend;
use crate::config::LessonConfig;
use crate::error::{Diagnostics, LessonError};
use crate::material::Lesson;
use crate::pipeline::tutor::{narrate_lesson, TutorNarration};
use crate::pipeline::{illustrate, validate};
use crate::prompts::LESSON_PROMPT;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

/// Where the session currently is in the generation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing in flight; no lesson displayed.
    #[default]
    Idle,
    /// PDF and prompt submitted; waiting on the generation API.
    Submitting,
    /// Response received; validating and normalizing.
    ValidatingText,
    /// Fan-out of per-topic illustration requests in flight.
    AwaitingIllustrations,
    /// A lesson is displayed.
    Complete,
    /// A fatal error ended the last operation. Absorbing until reset.
    Errored,
}

/// A user-selected PDF: declared name and raw bytes.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// A finished generation: the lesson plus the validation drop ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutput {
    pub lesson: Lesson,
    pub diagnostics: Diagnostics,
}

/// Result of an operation that may have been overtaken by a newer request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operation finished and its result was installed.
    Completed(T),
    /// A reset or newer request superseded this one; the result was
    /// discarded and session state is untouched.
    Superseded,
}

#[derive(Default)]
struct SessionState {
    phase: Phase,
    file: Option<SelectedFile>,
    output: Option<GenerationOutput>,
    audio: Option<PlayableAudio>,
}

/// The session state machine, generic over the generative backend so tests
/// can script every network edge.
pub struct Orchestrator<B> {
    backend: B,
    config: LessonConfig,
    generation: AtomicU64,
    state: Mutex<SessionState>,
}

impl<B: GenerativeBackend> Orchestrator<B> {
    pub fn new(backend: B, config: LessonConfig) -> Self {
        Self {
            backend,
            config,
            generation: AtomicU64::new(0),
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Accept a user-selected file, validated by declared media type before
    /// acceptance. Selecting a file discards any displayed lesson, like
    /// starting over with a new document.
    pub fn select_file(
        &self,
        name: &str,
        media_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), LessonError> {
        if media_type != "application/pdf" {
            return Err(LessonError::NotAPdf {
                name: name.to_string(),
                detail: format!("declared media type is '{media_type}'"),
            });
        }
        if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
            return Err(LessonError::NotAPdf {
                name: name.to_string(),
                detail: "content does not start with the %PDF magic bytes".into(),
            });
        }

        let mut state = self.lock();
        state.file = Some(SelectedFile {
            name: name.to_string(),
            bytes,
        });
        state.output = None;
        state.phase = Phase::Idle;
        Ok(())
    }

    /// The underlying generative backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The current phase.
    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    /// The currently displayed lesson, if any.
    pub fn output(&self) -> Option<GenerationOutput> {
        self.lock().output.clone()
    }

    /// Run one end-to-end generation: submit → validate → illustrate.
    ///
    /// # Errors
    /// - [`LessonError::NoFileSelected`] before any network call when no
    ///   file is selected (session state untouched).
    /// - [`LessonError::ApiKeyMissing`] pre-flight when no credential
    ///   resolves.
    /// - [`LessonError::Communication`] / [`LessonError::MalformedResponse`]
    ///   for transport and root-shape failures; the phase moves to
    ///   `Errored` unless a newer request already took over.
    pub async fn generate(&self) -> Result<Outcome<GenerationOutput>, LessonError> {
        let file = self
            .lock()
            .file
            .clone()
            .ok_or(LessonError::NoFileSelected)?;

        // Credential check precedes any network traffic so a missing key is
        // a configuration error, never a transport one.
        self.config.resolve_api_key()?;

        let id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let model = self.config.tier.model_id();
        info!(generation = id, model, file = file.name, "starting generation");

        self.set_phase_if_current(id, Phase::Submitting);
        let raw = match self
            .backend
            .generate_lesson_text(model, LESSON_PROMPT, &file.bytes)
            .await
        {
            Ok(raw) => raw,
            Err(e) => return self.fail_if_current(id, e),
        };
        if !self.is_current(id) {
            warn!(generation = id, "discarding stale generation response");
            return Ok(Outcome::Superseded);
        }

        self.set_phase_if_current(id, Phase::ValidatingText);
        let (lesson, diagnostics) = match validate::normalize_lesson(&raw) {
            Ok(v) => v,
            Err(e) => return self.fail_if_current(id, e),
        };
        if !diagnostics.is_clean() {
            warn!(
                generation = id,
                dropped = diagnostics.dropped_count(),
                "generation degraded: malformed items dropped during validation"
            );
        }

        self.set_phase_if_current(id, Phase::AwaitingIllustrations);
        let topics = illustrate::augment_with_illustrations(
            &self.backend,
            lesson.topics,
            self.config.illustrations,
        )
        .await;
        if !self.is_current(id) {
            warn!(generation = id, "discarding stale illustrated lesson");
            return Ok(Outcome::Superseded);
        }

        let output = GenerationOutput {
            lesson: Lesson {
                title: lesson.title,
                topics,
            },
            diagnostics,
        };

        let mut state = self.lock();
        state.phase = Phase::Complete;
        state.output = Some(output.clone());
        info!(
            generation = id,
            topics = output.lesson.topics.len(),
            "generation complete"
        );
        Ok(Outcome::Completed(output))
    }

    /// Narrate the displayed lesson and install the playable audio,
    /// releasing whatever audio handle was installed before.
    ///
    /// A narration failure leaves the displayed lesson (and phase) intact:
    /// it is fatal for the narration feature only.
    pub async fn call_tutor(&self) -> Result<Outcome<TutorNarration>, LessonError> {
        let lesson = self
            .lock()
            .output
            .as_ref()
            .map(|o| o.lesson.clone())
            .ok_or(LessonError::NoLesson)?;

        self.config.resolve_api_key()?;
        let id = self.generation.load(Ordering::SeqCst);

        let narration = narrate_lesson(&self.backend, &self.config, &lesson).await?;

        if !self.is_current(id) {
            warn!("discarding tutor audio for a superseded session");
            return Ok(Outcome::Superseded);
        }

        // Replacing the slot drops the previous playable handle, so
        // repeated tutor calls hold at most one audio buffer.
        self.lock().audio = Some(narration.audio.clone());
        Ok(Outcome::Completed(narration))
    }

    /// The currently installed narration audio, if any.
    pub fn audio(&self) -> Option<PlayableAudio> {
        self.lock().audio.clone()
    }

    /// Explicit user reset: discard the selection, lesson, and audio, and
    /// invalidate anything still in flight.
    pub fn reset(&self) {
        // Bump the counter first so in-flight completions see themselves
        // as stale before the state is cleared.
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        state.file = None;
        state.output = None;
        state.audio = None;
        state.phase = Phase::Idle;
        info!("session reset");
    }

    fn is_current(&self, id: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == id
    }

    fn set_phase_if_current(&self, id: u64, phase: Phase) {
        if self.is_current(id) {
            self.lock().phase = phase;
        }
    }

    fn fail_if_current<T>(
        &self,
        id: u64,
        error: LessonError,
    ) -> Result<Outcome<T>, LessonError> {
        if self.is_current(id) {
            self.lock().phase = Phase::Errored;
            Err(error)
        } else {
            warn!(generation = id, %error, "stale generation failed; ignoring");
            Ok(Outcome::Superseded)
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
