// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]

//! # MEDAI Pose Inference Library
//!
//! Prenatal yoga pose estimation: detect body keypoints in a photo, score them
//! against a reference pose, and ask a hosted vision-language model for
//! coaching feedback.
//!
//! ## Pipeline
//!
//! 1. The client image (raw bytes or base64, optionally a data URI) is decoded
//!    ([`ImageInput`]).
//! 2. A [`KeypointDetector`] (`MoveNet` or YOLO pose ONNX, or the model-less
//!    fallback) produces a [`PoseSnapshot`] of 17 normalized landmarks.
//! 3. The [`ReferenceStore`] returns the reference pose for the requested id,
//!    generating it with a chat model on first use and caching it.
//! 4. The [`PoseEvaluator`] computes a weighted Euclidean similarity in 0..=100.
//!
//! Every stage has a fallback, so [`PoseEstimator::estimate_pose`] and
//! [`PoseEstimator::pose_feedback`] always return a value. The `try_*`
//! variants expose the typed [`PoseError`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use medai_inference::{
//!     DetectorBackend, DetectorConfig, EstimatorConfig, ImageInput, PoseEstimator,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EstimatorConfig::from_env().with_detector(
//!         DetectorConfig::new()
//!             .with_backend(DetectorBackend::MoveNet)
//!             .with_model("movenet_thunder.onnx"),
//!     );
//!     let estimator = PoseEstimator::from_config(&config);
//!
//!     let image = ImageInput::from(std::fs::read("warrior.jpg")?);
//!     let estimate = estimator.estimate_pose(&image, "2-1");
//!     println!("accuracy {:.1}", estimate.accuracy);
//!
//!     let tips = estimator.pose_feedback(&image, "2-1", false);
//!     println!("{tips}");
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # Score a photo against Warrior II with a YOLO pose model
//! medai-inference estimate --image warrior.jpg --pose 2-1 --backend yolo --model yolo11n-pose.onnx
//!
//! # Also request coaching feedback (needs GROQ_API_KEY)
//! medai-inference estimate --image warrior.jpg --pose 2-1 --feedback
//!
//! # Print the reference pose for a catalogue id
//! medai-inference reference --pose 3-2
//!
//! # List supported poses
//! medai-inference poses
//! ```
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`keypoint`] | Body parts, keypoints and snapshots |
//! | [`catalog`] | Supported poses ([`PoseCatalog`]) |
//! | [`presets`] | Hardcoded fallback and reference snapshots |
//! | [`source`] | Image input decoding ([`ImageInput`]) |
//! | [`preprocessing`] | Letterbox and resize to model tensors |
//! | [`detector`] | Keypoint detection backends |
//! | [`chat`] | Chat-completions client ([`GroqClient`]) |
//! | [`reference`] | Reference pose cache ([`ReferenceStore`]) |
//! | [`evaluator`] | Pose similarity scoring |
//! | [`feedback`] | Coaching feedback generation |
//! | [`estimator`] | End-to-end pipeline ([`PoseEstimator`]) |
//! | [`medication`] | Medication reference table |
//! | [`config`] | Configuration builders |
//! | [`error`] | Error types ([`PoseError`], [`Result`]) |

// Modules
pub mod catalog;
pub mod chat;
pub mod cli;
pub mod config;
pub mod detector;
pub mod error;
pub mod estimator;
pub mod evaluator;
pub mod feedback;
pub mod keypoint;
pub mod medication;
pub mod preprocessing;
pub mod presets;
pub mod reference;
pub mod source;

// Re-export main types for convenience
pub use catalog::{CatalogEntry, PoseCatalog};
pub use chat::{ChatCompletion, ChatMessage, ChatRequest, GroqClient};
pub use config::{ChatConfig, DetectorBackend, DetectorConfig, EstimatorConfig, ScoringConfig};
pub use detector::{
    FallbackDetector, KeypointDetector, MoveNetDetector, YoloPoseDetector, detect_or_fallback,
    load_detector,
};
pub use error::{PoseError, Result};
pub use estimator::{PoseEstimate, PoseEstimator};
pub use evaluator::PoseEvaluator;
pub use feedback::FeedbackGenerator;
pub use keypoint::{BodyPart, Keypoint, PoseSnapshot, Position};
pub use medication::{MedicationInfo, lookup_medication};
pub use reference::{ReferencePose, ReferenceSource, ReferenceStore};
pub use source::ImageInput;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "medai-inference");
    }
}
