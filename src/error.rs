// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the pose estimation library.
//!
//! Every fallible step returns a typed [`PoseError`]. The detector wrapper, the
//! reference store, the feedback generator and the estimator decide where an
//! error is replaced by a fallback value.

use std::fmt;

/// Result type alias for pose estimation operations.
pub type Result<T> = std::result::Result<T, PoseError>;

/// Main error type for the pose estimation library.
#[derive(Debug)]
pub enum PoseError {
    /// Base64 payload could not be decoded.
    DecodeError(String),
    /// Image bytes could not be decoded or converted.
    ImageError(String),
    /// Error loading the ONNX landmark model.
    ModelLoadError(String),
    /// Error during model inference.
    InferenceError(String),
    /// The detector found no person above the confidence threshold.
    NoPersonDetected,
    /// Model output tensor did not have the expected layout.
    MalformedOutput(String),
    /// Transport-level HTTP failure (DNS, connect, timeout, TLS).
    HttpError(String),
    /// The remote service answered with a non-success status.
    ServiceStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, for logging.
        body: String,
    },
    /// No brace-delimited JSON object could be found in a model reply.
    MissingJson,
    /// A JSON document failed to parse.
    JsonError(String),
    /// A parsed document did not match the expected schema.
    SchemaError(String),
    /// A generated pose had fewer keypoints than required.
    IncompleteKeypoints {
        /// Number of keypoints received.
        got: usize,
        /// Number of keypoints required.
        expected: usize,
    },
    /// A generated pose lacked some required body parts.
    MissingParts(Vec<String>),
    /// Pose scoring could not be computed.
    EvaluationError(String),
    /// Invalid configuration provided.
    ConfigError(String),
    /// Wrapped `std::io::Error`
    Io(std::io::Error),
}

impl fmt::Display for PoseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DecodeError(msg) => write!(f, "Decode error: {msg}"),
            Self::ImageError(msg) => write!(f, "Image error: {msg}"),
            Self::ModelLoadError(msg) => write!(f, "Model load error: {msg}"),
            Self::InferenceError(msg) => write!(f, "Inference error: {msg}"),
            Self::NoPersonDetected => write!(f, "No person detected"),
            Self::MalformedOutput(msg) => write!(f, "Malformed model output: {msg}"),
            Self::HttpError(msg) => write!(f, "HTTP error: {msg}"),
            Self::ServiceStatus { status, body } => {
                write!(f, "Service returned status {status}: {body}")
            }
            Self::MissingJson => write!(f, "No JSON object found in reply"),
            Self::JsonError(msg) => write!(f, "JSON error: {msg}"),
            Self::SchemaError(msg) => write!(f, "Schema error: {msg}"),
            Self::IncompleteKeypoints { got, expected } => {
                write!(f, "Incomplete keypoints: got {got}, expected {expected}")
            }
            Self::MissingParts(parts) => write!(f, "Missing keypoint parts: {}", parts.join(", ")),
            Self::EvaluationError(msg) => write!(f, "Evaluation error: {msg}"),
            Self::ConfigError(msg) => write!(f, "Config error: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
        }
    }
}

impl std::error::Error for PoseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl PoseError {
    /// Whether the error came from a remote service (transport or status).
    #[must_use]
    pub const fn is_service_error(&self) -> bool {
        matches!(self, Self::HttpError(_) | Self::ServiceStatus { .. })
    }
}

impl From<std::io::Error> for PoseError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<image::ImageError> for PoseError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageError(err.to_string())
    }
}

impl From<base64::DecodeError> for PoseError {
    fn from(err: base64::DecodeError) -> Self {
        Self::DecodeError(err.to_string())
    }
}

impl From<serde_json::Error> for PoseError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<ureq::Error> for PoseError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(status) => Self::ServiceStatus {
                status,
                body: String::new(),
            },
            ureq::Error::Timeout(timeout) => {
                Self::HttpError(format!("request timed out ({timeout:?})"))
            }
            other => Self::HttpError(other.to_string()),
        }
    }
}

impl From<ort::Error> for PoseError {
    fn from(err: ort::Error) -> Self {
        Self::InferenceError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PoseError::ModelLoadError("test".to_string());
        assert_eq!(err.to_string(), "Model load error: test");

        let err = PoseError::IncompleteKeypoints { got: 10, expected: 17 };
        assert_eq!(err.to_string(), "Incomplete keypoints: got 10, expected 17");

        let err = PoseError::MissingParts(vec!["nose".to_string(), "left_eye".to_string()]);
        assert_eq!(err.to_string(), "Missing keypoint parts: nose, left_eye");
    }

    #[test]
    fn test_service_error_kind() {
        let err = PoseError::ServiceStatus {
            status: 429,
            body: "rate limited".to_string(),
        };
        assert!(err.is_service_error());
        assert!(PoseError::HttpError("refused".to_string()).is_service_error());
        assert!(!PoseError::MissingJson.is_service_error());
    }

    #[test]
    fn test_status_code_conversion() {
        let err: PoseError = ureq::Error::StatusCode(503).into();
        assert!(matches!(err, PoseError::ServiceStatus { status: 503, .. }));
    }
}
