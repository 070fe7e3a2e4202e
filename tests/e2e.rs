//! End-to-end integration tests for pdf2lesson.
//!
//! These exercise the whole pipeline — orchestrator, validator, illustration
//! fan-out, tutor narration, audio assembly — against scripted in-memory
//! backends, so they run offline and deterministically. Network edges are
//! covered by the per-module unit tests plus the wire-struct tests in
//! `src/gemini.rs`.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use pdf2lesson::pipeline::illustrate::augment_with_illustrations;
use pdf2lesson::{
    normalize_lesson, DropReason, GenerativeBackend, LessonConfig, LessonError, ModelTier,
    Orchestrator, Outcome, Phase, ProgressTicker, SpeechPayload, Topic,
};
use serde_json::json;
use std::cell::RefCell;
use tokio::sync::oneshot;
use tokio::task::yield_now;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn config() -> LessonConfig {
    LessonConfig::builder()
        .api_key("test-key")
        .illustrations(false)
        .build()
        .unwrap()
}

fn config_with_illustrations() -> LessonConfig {
    LessonConfig::builder()
        .api_key("test-key")
        .illustrations(true)
        .build()
        .unwrap()
}

fn pdf() -> Vec<u8> {
    b"%PDF-1.7 fake document body".to_vec()
}

fn two_topic_body() -> String {
    json!({
        "titulo": "Estruturas de Dados",
        "topicos": [
            {
                "id": "t1",
                "titulo": "Grafos",
                "objetivos": ["Definir vertices e arestas"],
                "secoes": [
                    { "tipo": "texto", "conteudo": "Um grafo é..." },
                    { "tipo": "lista", "titulo": "Tipos", "itens": ["dirigido", "não dirigido"] }
                ]
            },
            {
                "id": "t2",
                "titulo": "Árvores",
                "objetivos": [],
                "secoes": [
                    { "tipo": "codigo", "conteudo": "root.left", "linguagem": "python" }
                ]
            }
        ]
    })
    .to_string()
}

fn bare_topic(id: &str, title: &str) -> Topic {
    Topic {
        id: id.into(),
        title: title.into(),
        objectives: vec![],
        sections: vec![],
        image: None,
    }
}

/// Fully scripted backend: fixed responses, per-operation call counters.
struct ScriptedBackend {
    lesson_body: String,
    image: Result<Option<String>, LessonError>,
    narration: String,
    speech: SpeechPayload,
    text_calls: RefCell<usize>,
    image_calls: RefCell<usize>,
    speech_calls: RefCell<usize>,
}

impl ScriptedBackend {
    fn new(lesson_body: impl Into<String>) -> Self {
        Self {
            lesson_body: lesson_body.into(),
            image: Ok(Some("data:image/jpeg;base64,QUJD".into())),
            narration: "Olá! Hoje vamos estudar estruturas de dados.".into(),
            speech: SpeechPayload {
                audio_base64: BASE64.encode([0u8; 16]),
                media_type: "audio/L16;codec=pcm;rate=24000".into(),
            },
            text_calls: RefCell::new(0),
            image_calls: RefCell::new(0),
            speech_calls: RefCell::new(0),
        }
    }
}

impl GenerativeBackend for ScriptedBackend {
    async fn generate_lesson_text(
        &self,
        _model: &str,
        _prompt: &str,
        _pdf: &[u8],
    ) -> Result<String, LessonError> {
        *self.text_calls.borrow_mut() += 1;
        Ok(self.lesson_body.clone())
    }

    async fn generate_image(&self, _prompt: &str) -> Result<Option<String>, LessonError> {
        *self.image_calls.borrow_mut() += 1;
        match &self.image {
            Ok(v) => Ok(v.clone()),
            Err(e) => Err(LessonError::Internal(e.to_string())),
        }
    }

    async fn generate_narration(&self, _model: &str, _prompt: &str) -> Result<String, LessonError> {
        Ok(self.narration.clone())
    }

    async fn synthesize_speech(
        &self,
        _model: &str,
        _voice: &str,
        _text: &str,
    ) -> Result<SpeechPayload, LessonError> {
        *self.speech_calls.borrow_mut() += 1;
        Ok(self.speech.clone())
    }
}

// ── Scenario: happy path with illustrations disabled ─────────────────────────

#[tokio::test]
async fn generation_with_illustrations_disabled_issues_no_image_calls() {
    let orch = Orchestrator::new(ScriptedBackend::new(two_topic_body()), config());
    orch.select_file("aula.pdf", "application/pdf", pdf()).unwrap();

    let Outcome::Completed(output) = orch.generate().await.unwrap() else {
        panic!("expected completion");
    };

    assert_eq!(orch.phase(), Phase::Complete);
    assert_eq!(output.lesson.title, "Estruturas de Dados");
    assert_eq!(output.lesson.topics.len(), 2);
    assert!(output.lesson.topics.iter().all(|t| t.image.is_none()));
    assert!(output.diagnostics.is_clean());
    assert_eq!(*orch.backend().image_calls.borrow(), 0);
    assert_eq!(*orch.backend().text_calls.borrow(), 1);
}

#[tokio::test]
async fn generation_with_illustrations_enabled_attaches_one_per_topic() {
    let orch = Orchestrator::new(
        ScriptedBackend::new(two_topic_body()),
        config_with_illustrations(),
    );
    orch.select_file("aula.pdf", "application/pdf", pdf()).unwrap();

    let Outcome::Completed(output) = orch.generate().await.unwrap() else {
        panic!("expected completion");
    };

    assert_eq!(*orch.backend().image_calls.borrow(), 2);
    assert!(output.lesson.topics.iter().all(|t| t.image.is_some()));
}

#[tokio::test]
async fn failed_illustrations_never_fail_the_lesson() {
    let mut backend = ScriptedBackend::new(two_topic_body());
    backend.image = Err(LessonError::Internal(
        "429 RESOURCE_EXHAUSTED: quota exceeded".into(),
    ));
    let orch = Orchestrator::new(backend, config_with_illustrations());
    orch.select_file("aula.pdf", "application/pdf", pdf()).unwrap();

    let Outcome::Completed(output) = orch.generate().await.unwrap() else {
        panic!("expected completion");
    };

    assert_eq!(orch.phase(), Phase::Complete);
    assert_eq!(output.lesson.topics.len(), 2, "topics survive");
    assert!(output.lesson.topics.iter().all(|t| t.image.is_none()));
}

// ── Scenario: degraded payload with a stray topic-level section ──────────────

#[tokio::test]
async fn stray_section_at_topic_level_degrades_without_failing() {
    let body = json!({
        "titulo": "X",
        "topicos": [{ "tipo": "texto", "conteudo": "orphan section" }]
    })
    .to_string();
    let orch = Orchestrator::new(ScriptedBackend::new(body), config());
    orch.select_file("aula.pdf", "application/pdf", pdf()).unwrap();

    let Outcome::Completed(output) = orch.generate().await.unwrap() else {
        panic!("expected completion");
    };

    assert_eq!(orch.phase(), Phase::Complete, "degraded, not errored");
    assert_eq!(output.lesson.title, "X");
    assert!(output.lesson.topics.is_empty());
    assert!(output.diagnostics.all_topics_dropped);
    assert!(matches!(
        output.diagnostics.dropped_topics.as_slice(),
        [DropReason::StraySectionAtTopicLevel { kind }] if kind == "texto"
    ));
}

// ── Scenario: tutor narration down to playable audio ─────────────────────────

#[tokio::test]
async fn tutor_flow_wraps_raw_pcm_into_wav() {
    let raw_pcm: Vec<u8> = (0u8..50).collect();
    let mut backend = ScriptedBackend::new(two_topic_body());
    backend.speech = SpeechPayload {
        audio_base64: BASE64.encode(&raw_pcm),
        media_type: "audio/L16;codec=pcm;rate=24000".into(),
    };
    let orch = Orchestrator::new(backend, config());
    orch.select_file("aula.pdf", "application/pdf", pdf()).unwrap();
    orch.generate().await.unwrap();

    let Outcome::Completed(narration) = orch.call_tutor().await.unwrap() else {
        panic!("expected narration");
    };

    let audio = &narration.audio;
    assert_eq!(audio.media_type, "audio/wav");
    assert_eq!(audio.bytes.len(), 94, "44-byte header + 50 PCM bytes");
    assert_eq!(&audio.bytes[..4], b"RIFF");
    assert_eq!(&audio.bytes[8..12], b"WAVE");
    // RIFF size = 36 + data length
    assert_eq!(u32::from_le_bytes(audio.bytes[4..8].try_into().unwrap()), 86);
    // Sample rate 24 kHz mono
    assert_eq!(
        u32::from_le_bytes(audio.bytes[24..28].try_into().unwrap()),
        24_000
    );
    // data chunk size
    assert_eq!(u32::from_le_bytes(audio.bytes[40..44].try_into().unwrap()), 50);
    assert_eq!(&audio.bytes[44..], raw_pcm.as_slice());
    assert_eq!(orch.audio().unwrap(), narration.audio);
}

#[tokio::test]
async fn non_pcm_speech_passes_through_untouched() {
    let mp3ish: Vec<u8> = vec![0xff, 0xfb, 0x90, 0x00];
    let mut backend = ScriptedBackend::new(two_topic_body());
    backend.speech = SpeechPayload {
        audio_base64: BASE64.encode(&mp3ish),
        media_type: "audio/mpeg".into(),
    };
    let orch = Orchestrator::new(backend, config());
    orch.select_file("aula.pdf", "application/pdf", pdf()).unwrap();
    orch.generate().await.unwrap();

    let Outcome::Completed(narration) = orch.call_tutor().await.unwrap() else {
        panic!("expected narration");
    };
    assert_eq!(narration.audio.media_type, "audio/mpeg");
    assert_eq!(narration.audio.bytes, mp3ish);
}

// ── Validator properties on full pipeline payloads ───────────────────────────

#[test]
fn normalization_is_idempotent_on_its_own_output() {
    let messy = format!(
        "```json\n{}\n```",
        json!({
            "titulo": "Aula",
            "topicos": [
                {
                    "id": "1",
                    "titulo": "Válido",
                    "objetivos": ["a"],
                    "secoes": [
                        { "tipo": "texto", "conteudo": "ok" },
                        { "tipo": "desconhecido", "conteudo": "?" }
                    ]
                },
                { "id": "2", "titulo": "Quebrado" }
            ]
        })
    );

    let (first, diag) = normalize_lesson(&messy).unwrap();
    assert!(!diag.is_clean());

    let reserialized = serde_json::to_string(&first).unwrap();
    let (second, diag2) = normalize_lesson(&reserialized).unwrap();
    assert_eq!(first, second);
    assert!(diag2.is_clean(), "valid output re-validates with no drops");
}

#[test]
fn mixed_validity_payload_drops_only_malformed_items() {
    let body = json!({
        "titulo": "Aula",
        "topicos": [
            {
                "id": "1",
                "titulo": "Sobrevivente",
                "objetivos": ["a", "b"],
                "secoes": [
                    { "tipo": "texto", "conteudo": "fica" },
                    { "tipo": "lista", "itens": ["x", 42] },
                    { "conteudo": "sem tipo" }
                ]
            },
            { "id": "2", "titulo": "Sem objetivos", "secoes": [] },
            "not even an object"
        ]
    })
    .to_string();

    let (lesson, diag) = normalize_lesson(&body).unwrap();

    assert_eq!(lesson.topics.len(), 1);
    let survivor = &lesson.topics[0];
    assert_eq!(survivor.title, "Sobrevivente");
    assert_eq!(survivor.sections.len(), 1, "only the valid section remains");
    assert_eq!(survivor.sections[0].kind(), "texto");

    assert_eq!(diag.dropped_topics.len(), 2);
    assert_eq!(diag.dropped_sections.len(), 2);
    assert!(!diag.all_topics_dropped);
}

// ── Illustration fan-out ordering ────────────────────────────────────────────

/// Image backend whose response for the first topic is held behind a gate,
/// so it completes *after* its siblings.
struct GatedImages {
    gate: RefCell<Option<oneshot::Receiver<()>>>,
    completion_order: RefCell<Vec<String>>,
}

impl GenerativeBackend for GatedImages {
    async fn generate_lesson_text(
        &self,
        _model: &str,
        _prompt: &str,
        _pdf: &[u8],
    ) -> Result<String, LessonError> {
        unreachable!("not used in this test")
    }

    async fn generate_image(&self, prompt: &str) -> Result<Option<String>, LessonError> {
        if prompt.contains("Grafos") {
            let rx = self.gate.borrow_mut().take().expect("gate consumed twice");
            rx.await.map_err(|_| LessonError::Internal("gate dropped".into()))?;
            self.completion_order.borrow_mut().push("Grafos".into());
            Ok(Some("data:image/jpeg;base64,AAAA".into()))
        } else if prompt.contains("Árvores") {
            self.completion_order.borrow_mut().push("Árvores".into());
            Ok(Some("data:image/jpeg;base64,BBBB".into()))
        } else {
            self.completion_order.borrow_mut().push("Hash".into());
            Ok(Some("data:image/jpeg;base64,CCCC".into()))
        }
    }

    async fn generate_narration(&self, _model: &str, _prompt: &str) -> Result<String, LessonError> {
        unreachable!("not used in this test")
    }

    async fn synthesize_speech(
        &self,
        _model: &str,
        _voice: &str,
        _text: &str,
    ) -> Result<SpeechPayload, LessonError> {
        unreachable!("not used in this test")
    }
}

#[tokio::test]
async fn illustration_order_is_preserved_under_out_of_order_completion() {
    let (release, gate) = oneshot::channel();
    let backend = GatedImages {
        gate: RefCell::new(Some(gate)),
        completion_order: RefCell::new(Vec::new()),
    };
    let topics = vec![
        bare_topic("1", "Grafos"),
        bare_topic("2", "Árvores"),
        bare_topic("3", "Hash"),
    ];

    let driver = async {
        // Let the fan-out start and the two ungated requests finish, then
        // release the first topic's image last.
        yield_now().await;
        release.send(()).unwrap();
    };
    let (augmented, ()) = futures::join!(
        augment_with_illustrations(&backend, topics, true),
        driver
    );

    assert_eq!(
        *backend.completion_order.borrow(),
        ["Árvores", "Hash", "Grafos"],
        "first topic really finished last"
    );
    let titles: Vec<&str> = augmented.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, ["Grafos", "Árvores", "Hash"], "order preserved");
    assert_eq!(augmented[0].image.as_deref(), Some("data:image/jpeg;base64,AAAA"));
    assert_eq!(augmented[1].image.as_deref(), Some("data:image/jpeg;base64,BBBB"));
    assert_eq!(augmented[2].image.as_deref(), Some("data:image/jpeg;base64,CCCC"));
}

// ── Stale-response rejection ─────────────────────────────────────────────────

/// Lesson-text backend where each call awaits its own release gate, letting
/// a test decide which in-flight generation lands first.
struct GatedLessonText {
    gates: RefCell<Vec<oneshot::Receiver<String>>>,
}

impl GenerativeBackend for GatedLessonText {
    async fn generate_lesson_text(
        &self,
        _model: &str,
        _prompt: &str,
        _pdf: &[u8],
    ) -> Result<String, LessonError> {
        let rx = self.gates.borrow_mut().remove(0);
        rx.await
            .map_err(|_| LessonError::Internal("gate dropped".into()))
    }

    async fn generate_image(&self, _prompt: &str) -> Result<Option<String>, LessonError> {
        Ok(None)
    }

    async fn generate_narration(&self, _model: &str, _prompt: &str) -> Result<String, LessonError> {
        unreachable!("not used in this test")
    }

    async fn synthesize_speech(
        &self,
        _model: &str,
        _voice: &str,
        _text: &str,
    ) -> Result<SpeechPayload, LessonError> {
        unreachable!("not used in this test")
    }
}

fn one_topic_body(title: &str) -> String {
    json!({
        "titulo": title,
        "topicos": [{ "id": "1", "titulo": title, "objetivos": [], "secoes": [] }]
    })
    .to_string()
}

#[tokio::test]
async fn late_response_from_superseded_generation_is_discarded() {
    let (release_first, gate_first) = oneshot::channel();
    let (release_second, gate_second) = oneshot::channel();
    let backend = GatedLessonText {
        gates: RefCell::new(vec![gate_first, gate_second]),
    };
    let orch = Orchestrator::new(backend, config());
    orch.select_file("aula.pdf", "application/pdf", pdf()).unwrap();

    let driver = async {
        // Both generations are in flight; land the *second* one first.
        yield_now().await;
        release_second.send(one_topic_body("Second")).unwrap();
        yield_now().await;
        release_first.send(one_topic_body("First")).unwrap();
    };
    let (first, second, ()) = futures::join!(orch.generate(), orch.generate(), driver);

    assert_eq!(first.unwrap(), Outcome::Superseded, "late landing discarded");
    let Outcome::Completed(output) = second.unwrap() else {
        panic!("newest generation must complete");
    };
    assert_eq!(output.lesson.title, "Second");

    // The displayed lesson is the newest one; the stale response never
    // overwrote it.
    assert_eq!(orch.output().unwrap().lesson.title, "Second");
    assert_eq!(orch.phase(), Phase::Complete);
}

#[tokio::test]
async fn reset_during_flight_discards_the_landing_response() {
    let (release, gate) = oneshot::channel();
    let backend = GatedLessonText {
        gates: RefCell::new(vec![gate]),
    };
    let orch = Orchestrator::new(backend, config());
    orch.select_file("aula.pdf", "application/pdf", pdf()).unwrap();

    let driver = async {
        yield_now().await;
        orch.reset();
        release.send(one_topic_body("Late")).unwrap();
    };
    let (result, ()) = futures::join!(orch.generate(), driver);

    assert_eq!(result.unwrap(), Outcome::Superseded);
    assert_eq!(orch.phase(), Phase::Idle, "reset state untouched by landing");
    assert!(orch.output().is_none());
}

// ── Simulated progress over the whole flight envelope ────────────────────────

#[tokio::test(start_paused = true)]
async fn progress_stays_below_ceiling_until_confirmed() {
    let ticker = ProgressTicker::spawn(ModelTier::Fast);
    // Let the ticker task register its interval at t=0.
    yield_now().await;

    // Far past the 120 s estimate: the indicator must sit at the cap, never
    // claiming a completion nothing confirmed.
    tokio::time::advance(std::time::Duration::from_secs(600)).await;
    yield_now().await;
    assert_eq!(ticker.percent(), 95.0);

    ticker.complete();
    assert_eq!(ticker.percent(), 100.0);
}

#[tokio::test(start_paused = true)]
async fn failed_generation_freezes_progress_short_of_done() {
    let ticker = ProgressTicker::spawn(ModelTier::Pro);
    yield_now().await;

    tokio::time::advance(std::time::Duration::from_secs(18)).await;
    yield_now().await;
    let at_failure = ticker.percent();
    assert!(at_failure > 0.0 && at_failure < 95.0);

    ticker.fail();
    tokio::time::advance(std::time::Duration::from_secs(60)).await;
    yield_now().await;
    assert_eq!(ticker.percent(), at_failure, "frozen, not rolled back");
}
