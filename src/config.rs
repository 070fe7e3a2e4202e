//! Configuration types for lesson generation.
//!
//! All generation behaviour is controlled through [`LessonConfig`], built
//! via its [`LessonConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across tasks, log them, and diff two runs to
//! understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! The builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::LessonError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Model id used for the fast (flash) generation tier.
pub const FAST_MODEL: &str = "gemini-2.5-flash-preview-04-17";
/// Model id used for the higher-quality (pro) generation tier.
pub const PRO_MODEL: &str = "gemini-2.5-pro-preview-06-05";
/// Model id used for speech synthesis.
pub const TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
/// Model id used to generate topic illustrations.
pub const IMAGE_MODEL: &str = "imagen-3.0-generate-002";
/// Default voice selector for speech synthesis.
pub const DEFAULT_VOICE: &str = "Kore";

/// Quality tier selecting which text-generation model handles the PDF.
///
/// The fast tier is optimized for latency; the pro tier can produce richer
/// material but takes noticeably longer, which is why the simulated
/// progress clock uses a larger time estimate for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelTier {
    /// Flash model: fastest responses. (default)
    #[default]
    Fast,
    /// Pro model: higher quality, slower.
    Pro,
}

impl ModelTier {
    /// The concrete model identifier for this tier.
    pub fn model_id(self) -> &'static str {
        match self {
            ModelTier::Fast => FAST_MODEL,
            ModelTier::Pro => PRO_MODEL,
        }
    }

    /// Seconds after which the simulated progress clock reaches its 95 %
    /// ceiling for this tier.
    pub fn estimated_total_secs(self) -> u64 {
        match self {
            ModelTier::Fast => 120,
            ModelTier::Pro => 180,
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelTier::Fast => write!(f, "fast"),
            ModelTier::Pro => write!(f, "pro"),
        }
    }
}

/// Configuration for one lesson-generation session.
///
/// Built via [`LessonConfig::builder()`] or [`LessonConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2lesson::{LessonConfig, ModelTier};
///
/// let config = LessonConfig::builder()
///     .tier(ModelTier::Pro)
///     .illustrations(false)
///     .api_key("test-key")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct LessonConfig {
    /// Text-generation quality tier. Default: [`ModelTier::Fast`].
    pub tier: ModelTier,

    /// Whether to request one illustration per topic. Default: true.
    ///
    /// When disabled the illustration step issues zero network calls and
    /// every topic's image stays absent.
    pub illustrations: bool,

    /// API credential. If `None`, resolved from `GEMINI_API_KEY` then
    /// `API_KEY` at build time; absence is a pre-flight
    /// [`LessonError::ApiKeyMissing`], distinct from any transport failure.
    pub api_key: Option<String>,

    /// Voice selector passed to speech synthesis. Default: "Kore".
    pub voice: String,

    /// Model used for tutor narration text. Default: the fast tier model,
    /// regardless of `tier` — narration favours latency over depth.
    pub tutor_model: String,

    /// Per-request HTTP timeout in seconds. Default: 300.
    ///
    /// Generation over a whole PDF routinely takes minutes; this bounds a
    /// hung connection, not normal latency.
    pub request_timeout_secs: u64,
}

impl Default for LessonConfig {
    fn default() -> Self {
        Self {
            tier: ModelTier::default(),
            illustrations: true,
            api_key: None,
            voice: DEFAULT_VOICE.to_string(),
            tutor_model: FAST_MODEL.to_string(),
            request_timeout_secs: 300,
        }
    }
}

impl LessonConfig {
    /// Create a new builder for `LessonConfig`.
    pub fn builder() -> LessonConfigBuilder {
        LessonConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolve the effective API key, checking the environment when none was
    /// set explicitly. Called before any network request so a missing
    /// credential surfaces as a configuration error, never a transport one.
    pub fn resolve_api_key(&self) -> Result<String, LessonError> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }
        for var in ["GEMINI_API_KEY", "API_KEY"] {
            if let Ok(key) = std::env::var(var) {
                if !key.is_empty() {
                    return Ok(key);
                }
            }
        }
        Err(LessonError::ApiKeyMissing)
    }
}

/// Builder for [`LessonConfig`].
#[derive(Debug)]
pub struct LessonConfigBuilder {
    config: LessonConfig,
}

impl LessonConfigBuilder {
    pub fn tier(mut self, tier: ModelTier) -> Self {
        self.config.tier = tier;
        self
    }

    pub fn illustrations(mut self, enabled: bool) -> Self {
        self.config.illustrations = enabled;
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn voice(mut self, voice: impl Into<String>) -> Self {
        self.config.voice = voice.into();
        self
    }

    pub fn tutor_model(mut self, model: impl Into<String>) -> Self {
        self.config.tutor_model = model.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<LessonConfig, LessonError> {
        let c = &self.config;
        if c.voice.trim().is_empty() {
            return Err(LessonError::InvalidConfig(
                "Voice selector must not be empty".into(),
            ));
        }
        if c.request_timeout_secs == 0 {
            return Err(LessonError::InvalidConfig(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
