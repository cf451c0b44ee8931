// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Estimator configuration.
//!
//! This module defines [`EstimatorConfig`] and its parts: [`DetectorConfig`] for
//! the landmark model, [`ChatConfig`] for the hosted chat-completions service and
//! [`ScoringConfig`] for the pose evaluator. All of them use the same builder
//! pattern.
//!
//! # Example
//!
//! ```rust
//! use medai_inference::{ChatConfig, DetectorBackend, DetectorConfig, EstimatorConfig};
//!
//! let config = EstimatorConfig::new()
//!     .with_detector(
//!         DetectorConfig::new()
//!             .with_backend(DetectorBackend::Yolo)
//!             .with_model("yolo11n-pose.onnx")
//!             .with_confidence(0.3),
//!     )
//!     .with_chat(ChatConfig::new().with_api_key("gsk_test"));
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{PoseError, Result};
use crate::keypoint::BodyPart;

/// Default OpenAI-compatible chat-completions endpoint.
pub const DEFAULT_CHAT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Text model used to generate reference poses.
pub const DEFAULT_REFERENCE_MODEL: &str = "llama-3.3-70b-versatile";

/// Vision model used for coaching feedback.
pub const DEFAULT_FEEDBACK_MODEL: &str = "llama-3.2-11b-vision-preview";

/// Environment variable holding the chat API key.
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

/// Environment variable overriding the chat endpoint.
pub const ENDPOINT_ENV: &str = "GROQ_API_ENDPOINT";

/// Which landmark model drives detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectorBackend {
    /// Single-pose `MoveNet` (Lightning/Thunder) ONNX export.
    MoveNet,
    /// Ultralytics YOLO pose ONNX export.
    Yolo,
    /// No model; every detection yields the neutral-standing fallback.
    #[default]
    None,
}

impl DetectorBackend {
    /// Default square input size for the backend.
    #[must_use]
    pub const fn default_input_size(self) -> u32 {
        match self {
            Self::MoveNet => 256,
            Self::Yolo => 640,
            Self::None => 0,
        }
    }
}

impl fmt::Display for DetectorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MoveNet => "movenet",
            Self::Yolo => "yolo",
            Self::None => "none",
        };
        write!(f, "{name}")
    }
}

impl FromStr for DetectorBackend {
    type Err = PoseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "movenet" => Ok(Self::MoveNet),
            "yolo" | "yolo-pose" => Ok(Self::Yolo),
            "none" | "fallback" => Ok(Self::None),
            other => Err(PoseError::ConfigError(format!(
                "unknown detector backend '{other}' (expected movenet, yolo or none)"
            ))),
        }
    }
}

/// Configuration for the keypoint detector.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Landmark model backend.
    pub backend: DetectorBackend,
    /// Path to the ONNX model file. Required unless the backend is `None`.
    pub model_path: Option<PathBuf>,
    /// Minimum person confidence for the YOLO backend (0.0 to 1.0).
    pub confidence_threshold: f32,
    /// Explicit square input size. If `None`, the backend default is used.
    pub input_size: Option<u32>,
    /// Number of intra-op threads for ONNX Runtime (`0` lets ONNX Runtime decide).
    pub num_threads: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            backend: DetectorBackend::None,
            model_path: None,
            confidence_threshold: 0.25,
            input_size: None,
            num_threads: 0,
        }
    }
}

impl DetectorConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_backend(mut self, backend: DetectorBackend) -> Self {
        self.backend = backend;
        self
    }

    #[must_use]
    pub fn with_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    #[must_use]
    pub const fn with_confidence(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    #[must_use]
    pub const fn with_input_size(mut self, size: u32) -> Self {
        self.input_size = Some(size);
        self
    }

    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    /// Effective model input size.
    #[must_use]
    pub fn input_size(&self) -> u32 {
        self.input_size
            .unwrap_or_else(|| self.backend.default_input_size())
    }
}

/// Configuration for the chat-completions client.
#[derive(Clone)]
pub struct ChatConfig {
    /// Bearer token. Requests fail with an HTTP error when absent.
    pub api_key: Option<String>,
    /// Full URL of the chat-completions endpoint.
    pub endpoint: String,
    /// Model used for reference pose generation.
    pub reference_model: String,
    /// Model used for image feedback.
    pub feedback_model: String,
    /// Sampling temperature for both calls.
    pub temperature: f32,
    /// Token limit for reference generation.
    pub reference_max_tokens: u32,
    /// Token limit for feedback.
    pub feedback_max_tokens: u32,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub request_timeout: Duration,
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("endpoint", &self.endpoint)
            .field("reference_model", &self.reference_model)
            .field("feedback_model", &self.feedback_model)
            .field("temperature", &self.temperature)
            .field("reference_max_tokens", &self.reference_max_tokens)
            .field("feedback_max_tokens", &self.feedback_max_tokens)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_CHAT_ENDPOINT.to_string(),
            reference_model: DEFAULT_REFERENCE_MODEL.to_string(),
            feedback_model: DEFAULT_FEEDBACK_MODEL.to_string(),
            temperature: 0.2,
            reference_max_tokens: 1000,
            feedback_max_tokens: 1024,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl ChatConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `GROQ_API_KEY` and `GROQ_API_ENDPOINT`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the env keys.
    /// Empty values are ignored.
    #[must_use]
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            api_key: non_empty(API_KEY_ENV),
            endpoint: non_empty(ENDPOINT_ENV).unwrap_or_else(|| DEFAULT_CHAT_ENDPOINT.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_reference_model(mut self, model: impl Into<String>) -> Self {
        self.reference_model = model.into();
        self
    }

    #[must_use]
    pub fn with_feedback_model(mut self, model: impl Into<String>) -> Self {
        self.feedback_model = model.into();
        self
    }

    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub const fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }
}

/// Constants of the weighted Euclidean pose score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// Weight per scored body part. Parts not listed do not contribute.
    pub part_weights: Vec<(BodyPart, f32)>,
    /// Distance at which a part's similarity reaches zero.
    pub distance_scale: f32,
    /// Score reported when evaluation fails.
    pub neutral_score: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            part_weights: vec![
                (BodyPart::LeftShoulder, 1.5),
                (BodyPart::RightShoulder, 1.5),
                (BodyPart::LeftHip, 1.5),
                (BodyPart::RightHip, 1.5),
                (BodyPart::LeftKnee, 1.2),
                (BodyPart::RightKnee, 1.2),
                (BodyPart::LeftAnkle, 1.0),
                (BodyPart::RightAnkle, 1.0),
                (BodyPart::LeftElbow, 1.0),
                (BodyPart::RightElbow, 1.0),
                (BodyPart::LeftWrist, 0.8),
                (BodyPart::RightWrist, 0.8),
            ],
            distance_scale: 0.5,
            neutral_score: 50.0,
        }
    }
}

impl ScoringConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or add) the weight of one body part.
    #[must_use]
    pub fn with_weight(mut self, part: BodyPart, weight: f32) -> Self {
        match self.part_weights.iter_mut().find(|(p, _)| *p == part) {
            Some(entry) => entry.1 = weight,
            None => self.part_weights.push((part, weight)),
        }
        self
    }

    #[must_use]
    pub const fn with_distance_scale(mut self, scale: f32) -> Self {
        self.distance_scale = scale;
        self
    }

    #[must_use]
    pub const fn with_neutral_score(mut self, score: f32) -> Self {
        self.neutral_score = score;
        self
    }

    /// Weight configured for `part`, if it is scored.
    #[must_use]
    pub fn weight(&self, part: BodyPart) -> Option<f32> {
        self.part_weights
            .iter()
            .find(|(p, _)| *p == part)
            .map(|&(_, w)| w)
    }

    /// Check that the constants can produce a score.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::EvaluationError`] for a non-positive distance scale or
    /// a negative or non-finite weight.
    pub fn validate(&self) -> Result<()> {
        if !(self.distance_scale.is_finite() && self.distance_scale > 0.0) {
            return Err(PoseError::EvaluationError(format!(
                "distance scale must be positive, got {}",
                self.distance_scale
            )));
        }
        if let Some((part, weight)) = self
            .part_weights
            .iter()
            .find(|(_, w)| !w.is_finite() || *w < 0.0)
        {
            return Err(PoseError::EvaluationError(format!(
                "invalid weight {weight} for {part}"
            )));
        }
        Ok(())
    }
}

/// Top-level configuration for [`crate::PoseEstimator`].
#[derive(Debug, Clone, Default)]
pub struct EstimatorConfig {
    pub detector: DetectorConfig,
    pub chat: ChatConfig,
    pub scoring: ScoringConfig,
}

impl EstimatorConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default detector and scoring, chat settings from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_chat(ChatConfig::from_env())
    }

    #[must_use]
    pub fn with_detector(mut self, detector: DetectorConfig) -> Self {
        self.detector = detector;
        self
    }

    #[must_use]
    pub fn with_chat(mut self, chat: ChatConfig) -> Self {
        self.chat = chat;
        self
    }

    #[must_use]
    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }
}
