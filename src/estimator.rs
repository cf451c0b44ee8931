// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose estimation pipeline.
//!
//! [`PoseEstimator`] chains input decoding, keypoint detection, reference
//! lookup and scoring. The `try_*` methods expose typed errors; the plain
//! methods never fail and substitute fallbacks instead.
//!
//! # Example
//!
//! ```no_run
//! use medai_inference::{EstimatorConfig, ImageInput, PoseEstimator};
//!
//! let estimator = PoseEstimator::from_config(&EstimatorConfig::from_env());
//! let bytes = std::fs::read("pose.jpg").unwrap();
//! let estimate = estimator.estimate_pose(&ImageInput::from(bytes), "2-1");
//! println!("{}: {:.1}%", estimate.pose_id, estimate.accuracy);
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::chat::{ChatCompletion, GroqClient};
use crate::config::EstimatorConfig;
use crate::detector::{KeypointDetector, detect_or_fallback, load_detector};
use crate::error::Result;
use crate::evaluator::PoseEvaluator;
use crate::feedback::{FeedbackGenerator, fallback_for};
use crate::keypoint::PoseSnapshot;
use crate::presets::neutral_standing;
use crate::reference::{ReferencePose, ReferenceStore};
use crate::source::ImageInput;

/// Result of one estimation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoseEstimate {
    pub pose_id: String,
    /// Similarity to the reference, 0 to 100.
    pub accuracy: f32,
    pub keypoints: PoseSnapshot,
    pub reference_keypoints: PoseSnapshot,
}

/// Detector, reference store, evaluator and feedback generator behind one API.
///
/// All methods take `&self`; the detector session is guarded by a mutex so the
/// estimator can be shared across threads.
pub struct PoseEstimator {
    detector: Mutex<Box<dyn KeypointDetector>>,
    references: ReferenceStore,
    evaluator: PoseEvaluator,
    feedback: FeedbackGenerator,
}

impl PoseEstimator {
    /// Assemble an estimator from its parts.
    #[must_use]
    pub fn new(
        detector: Box<dyn KeypointDetector>,
        chat: Arc<dyn ChatCompletion>,
        config: &EstimatorConfig,
    ) -> Self {
        Self {
            detector: Mutex::new(detector),
            references: ReferenceStore::new(Arc::clone(&chat), &config.chat),
            evaluator: PoseEvaluator::new(config.scoring.clone()),
            feedback: FeedbackGenerator::new(chat, &config.chat),
        }
    }

    /// Estimator with the configured detector (fallback backend if it fails to
    /// load) and a Groq chat client.
    #[must_use]
    pub fn from_config(config: &EstimatorConfig) -> Self {
        let chat: Arc<dyn ChatCompletion> = Arc::new(GroqClient::new(&config.chat));
        Self::new(load_detector(&config.detector), chat, config)
    }

    #[must_use]
    pub const fn references(&self) -> &ReferenceStore {
        &self.references
    }

    #[must_use]
    pub const fn evaluator(&self) -> &PoseEvaluator {
        &self.evaluator
    }

    /// Name of the active detector backend.
    #[must_use]
    pub fn detector_name(&self) -> &'static str {
        self.detector
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .name()
    }

    /// Estimate and score the pose in `image` against `pose_id`.
    ///
    /// Detection failures inside a decoded image are already replaced by the
    /// neutral-standing pose; only input decoding and scoring errors surface.
    ///
    /// # Errors
    ///
    /// Returns a decode/image error for unreadable input or an evaluation error.
    pub fn try_estimate_pose(&self, image: &ImageInput, pose_id: &str) -> Result<PoseEstimate> {
        let decoded = image.decode()?;
        let keypoints = {
            let mut detector = self.detector.lock().unwrap_or_else(PoisonError::into_inner);
            detect_or_fallback(&mut **detector, &decoded)
        };
        let reference = self.references.get_reference(pose_id);
        let accuracy = self.evaluator.evaluate(&keypoints, &reference.keypoints)?;

        tracing::debug!(pose_id, accuracy, keypoints = keypoints.len(), "pose estimated");
        Ok(estimate(pose_id, accuracy, keypoints, &reference))
    }

    /// Estimate the pose, substituting fallbacks on any failure.
    ///
    /// On error the estimate carries the neutral score, the neutral-standing
    /// keypoints and the regular reference pose.
    #[must_use]
    pub fn estimate_pose(&self, image: &ImageInput, pose_id: &str) -> PoseEstimate {
        self.try_estimate_pose(image, pose_id).unwrap_or_else(|err| {
            tracing::warn!(pose_id, error = %err, "pose estimation failed, returning fallback estimate");
            let reference = self.references.get_reference(pose_id);
            estimate(
                pose_id,
                self.evaluator.config().neutral_score,
                neutral_standing(),
                &reference,
            )
        })
    }

    /// Coaching feedback for the pose in `image`. Never fails.
    #[must_use]
    pub fn pose_feedback(&self, image: &ImageInput, pose_id: &str, is_final: bool) -> String {
        match image.to_bytes() {
            Ok(bytes) => self.feedback.generate(&bytes, pose_id, is_final),
            Err(err) => fallback_for(&err, pose_id).to_string(),
        }
    }
}

fn estimate(pose_id: &str, accuracy: f32, keypoints: PoseSnapshot, reference: &ReferencePose) -> PoseEstimate {
    PoseEstimate {
        pose_id: pose_id.to_string(),
        accuracy,
        keypoints,
        reference_keypoints: reference.keypoints.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat, RgbImage};

    use crate::chat::ChatRequest;
    use crate::detector::FallbackDetector;
    use crate::error::PoseError;
    use crate::feedback::GENERAL_FALLBACK;
    use crate::presets::mountain_pose;

    struct OfflineChat;

    impl ChatCompletion for OfflineChat {
        fn complete(&self, _request: &ChatRequest) -> Result<String> {
            Err(PoseError::HttpError("offline".to_string()))
        }
    }

    fn estimator() -> PoseEstimator {
        PoseEstimator::new(Box::new(FallbackDetector), Arc::new(OfflineChat), &EstimatorConfig::default())
    }

    fn png() -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(16, 16))
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_estimate_with_valid_image() {
        let estimator = estimator();
        let estimate = estimator.estimate_pose(&ImageInput::from(png()), "1-1");
        assert_eq!(estimate.pose_id, "1-1");
        assert_eq!(estimate.keypoints, neutral_standing());
        assert_eq!(estimate.reference_keypoints, mountain_pose());
        assert!((0.0..=100.0).contains(&estimate.accuracy));
        assert!(estimate.accuracy > 50.0);
    }

    #[test]
    fn test_malformed_input_gives_neutral_estimate() {
        let estimator = estimator();
        let estimate = estimator.estimate_pose(&ImageInput::from(vec![0xFF_u8, 0x00, 0x12]), "2-1");
        assert!((estimate.accuracy - 50.0).abs() < f32::EPSILON);
        assert_eq!(estimate.keypoints, neutral_standing());
        assert_eq!(estimate.reference_keypoints.len(), 17);
        assert!(estimator.try_estimate_pose(&ImageInput::from("%%%"), "2-1").is_err());
    }

    #[test]
    fn test_feedback_falls_back_offline() {
        let estimator = estimator();
        assert_eq!(
            estimator.pose_feedback(&ImageInput::from(png()), "1-1", false),
            GENERAL_FALLBACK
        );
        assert_eq!(
            estimator.pose_feedback(&ImageInput::from("not base64!"), "1-1", false),
            GENERAL_FALLBACK
        );
        assert_eq!(estimator.detector_name(), "fallback");
    }

    #[test]
    fn test_estimate_json_shape() {
        let estimate = estimator().estimate_pose(&ImageInput::from(png()), "3-3");
        let value = serde_json::to_value(&estimate).unwrap();
        assert_eq!(value["pose_id"], "3-3");
        assert_eq!(value["keypoints"].as_array().unwrap().len(), 17);
        assert_eq!(value["reference_keypoints"][0]["part"], "nose");
    }
}
