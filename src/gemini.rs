//! Production [`GenerativeBackend`] over the Google generative-language
//! REST API.
//!
//! One `reqwest` client is shared across all four operations; the API key is
//! resolved before the client is built so a missing credential surfaces as
//! [`LessonError::ApiKeyMissing`] and never as a transport failure. All
//! request and response bodies are serde structs — no hand-built JSON
//! strings — and only the fields the pipeline consumes are modelled;
//! everything else in the responses is ignored.

use crate::backend::{GenerativeBackend, SpeechPayload};
use crate::config::{LessonConfig, IMAGE_MODEL};
use crate::error::LessonError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// HTTP backend for the hosted generative API.
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiBackend {
    /// Build a backend from the config, resolving the API key pre-flight.
    pub fn from_config(config: &LessonConfig) -> Result<Self, LessonError> {
        let api_key = config.resolve_api_key()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LessonError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            base_url: API_BASE.to_string(),
        })
    }

    /// Point the backend at a different host (test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &'static str,
        path: &str,
        body: &B,
    ) -> Result<R, LessonError> {
        let url = format!("{}/{}?key={}", self.base_url, path, self.api_key);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| LessonError::Communication {
                endpoint,
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LessonError::Communication {
                endpoint,
                detail: format!("HTTP {status}: {}", truncate(&body, 300)),
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| LessonError::MalformedResponse {
                detail: format!("{endpoint} response body: {e}"),
            })
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ── Wire types (request) ─────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Serialize)]
struct PredictInstance {
    prompt: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    output_mime_type: String,
}

// ── Wire types (response) ────────────────────────────────────────────────

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CandidatePart {
    text: Option<String>,
    inline_data: Option<CandidateInlineData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CandidateInlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
}

impl GenerateResponse {
    /// First text part across candidates, the way clients of this API read
    /// plain-text results.
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
    }

    fn first_inline_data(self) -> Option<CandidateInlineData> {
        self.candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.inline_data)
    }
}

// ── Trait implementation ─────────────────────────────────────────────────

impl GenerativeBackend for GeminiBackend {
    async fn generate_lesson_text(
        &self,
        model: &str,
        prompt: &str,
        pdf_bytes: &[u8],
    ) -> Result<String, LessonError> {
        debug!(model, pdf_len = pdf_bytes.len(), "requesting lesson text");
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: Some(prompt.to_string()),
                        inline_data: None,
                    },
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: "application/pdf".to_string(),
                            data: BASE64.encode(pdf_bytes),
                        }),
                    },
                ],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_modalities: None,
                speech_config: None,
            }),
        };

        let response: GenerateResponse = self
            .post_json(
                "text generation",
                &format!("models/{model}:generateContent"),
                &request,
            )
            .await?;

        response.first_text().ok_or(LessonError::MalformedResponse {
            detail: "text generation response contains no text part".into(),
        })
    }

    async fn generate_image(&self, prompt: &str) -> Result<Option<String>, LessonError> {
        debug!(prompt, "requesting illustration");
        let request = PredictRequest {
            instances: vec![PredictInstance {
                prompt: prompt.to_string(),
            }],
            parameters: PredictParameters {
                sample_count: 1,
                output_mime_type: "image/jpeg".to_string(),
            },
        };

        let response: PredictResponse = self
            .post_json(
                "image generation",
                &format!("models/{IMAGE_MODEL}:predict"),
                &request,
            )
            .await?;

        // Zero predictions (or a prediction with no bytes) is a valid
        // outcome: the topic simply goes without an image.
        Ok(response
            .predictions
            .into_iter()
            .find_map(|p| p.bytes_base64_encoded)
            .map(|b64| format!("data:image/jpeg;base64,{b64}")))
    }

    async fn generate_narration(&self, model: &str, prompt: &str) -> Result<String, LessonError> {
        debug!(model, "requesting tutor narration text");
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                    inline_data: None,
                }],
            }],
            generation_config: None,
        };

        let response: GenerateResponse = self
            .post_json(
                "tutor narration",
                &format!("models/{model}:generateContent"),
                &request,
            )
            .await?;

        response
            .first_text()
            .map(|t| t.trim().to_string())
            .ok_or(LessonError::MalformedResponse {
                detail: "tutor narration response contains no text".into(),
            })
    }

    async fn synthesize_speech(
        &self,
        model: &str,
        voice: &str,
        text: &str,
    ) -> Result<SpeechPayload, LessonError> {
        debug!(model, voice, text_len = text.len(), "requesting speech");
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(text.to_string()),
                    inline_data: None,
                }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: None,
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice.to_string(),
                        },
                    },
                }),
            }),
        };

        let response: GenerateResponse = self
            .post_json(
                "speech synthesis",
                &format!("models/{model}:generateContent"),
                &request,
            )
            .await?;

        let inline = response
            .first_inline_data()
            .ok_or(LessonError::MalformedResponse {
                detail: "speech response carries no audio data or media type".into(),
            })?;

        Ok(SpeechPayload {
            audio_base64: inline.data,
            media_type: inline.mime_type,
        })
    }
}
