// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Weighted Euclidean pose similarity.

use crate::config::ScoringConfig;
use crate::error::{PoseError, Result};
use crate::keypoint::PoseSnapshot;

/// Scores a detected pose against a reference on a 0 to 100 scale.
#[derive(Debug, Clone, Default)]
pub struct PoseEvaluator {
    config: ScoringConfig,
}

impl PoseEvaluator {
    #[must_use]
    pub const fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Similarity of `detected` to `reference`.
    ///
    /// Each weighted part present in both snapshots contributes
    /// `max(0, 1 - d / distance_scale)` times its weight. The weighted mean is
    /// scaled to 0..=100. Empty snapshots and snapshots without a common
    /// weighted part score 0.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::EvaluationError`] for invalid scoring constants or
    /// non-finite coordinates on a matched part.
    pub fn evaluate(&self, detected: &PoseSnapshot, reference: &PoseSnapshot) -> Result<f32> {
        self.config.validate()?;
        if detected.is_empty() || reference.is_empty() {
            return Ok(0.0);
        }

        let detected = detected.by_part();
        let reference = reference.by_part();

        let mut total = 0.0_f32;
        let mut weight_sum = 0.0_f32;

        for &(part, weight) in &self.config.part_weights {
            let (Some(d), Some(r)) = (detected.get(&part), reference.get(&part)) else {
                continue;
            };
            if !d.position.is_finite() || !r.position.is_finite() {
                return Err(PoseError::EvaluationError(format!(
                    "non-finite coordinates for {part}"
                )));
            }
            let distance = d.position.distance(&r.position);
            let similarity = (1.0 - distance / self.config.distance_scale).max(0.0);
            total += similarity * weight;
            weight_sum += weight;
        }

        if weight_sum <= 0.0 {
            return Ok(0.0);
        }

        let score = 100.0 * total / weight_sum;
        if !score.is_finite() {
            return Err(PoseError::EvaluationError(format!("score is not finite ({score})")));
        }
        Ok(score.clamp(0.0, 100.0))
    }

    /// Like [`Self::evaluate`], but reports the neutral score on error.
    #[must_use]
    pub fn score(&self, detected: &PoseSnapshot, reference: &PoseSnapshot) -> f32 {
        self.evaluate(detected, reference).unwrap_or_else(|err| {
            tracing::warn!(error = %err, neutral = self.config.neutral_score, "pose evaluation failed");
            self.config.neutral_score
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypoint::{BodyPart, Keypoint};
    use crate::presets::{mountain_pose, neutral_standing};

    fn shifted(snapshot: &PoseSnapshot, dx: f32) -> PoseSnapshot {
        snapshot
            .iter()
            .map(|kp| Keypoint::new(kp.part, kp.position.x + dx, kp.position.y, kp.score))
            .collect()
    }

    #[test]
    fn test_identical_is_perfect() {
        let evaluator = PoseEvaluator::default();
        let pose = mountain_pose();
        assert!((evaluator.evaluate(&pose, &pose).unwrap() - 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_far_offset_is_zero() {
        let evaluator = PoseEvaluator::default();
        let pose = mountain_pose();
        assert!(evaluator.evaluate(&shifted(&pose, 0.6), &pose).unwrap().abs() < 1e-6);
        assert!(evaluator.evaluate(&shifted(&pose, 2.0), &pose).unwrap().abs() < 1e-6);
    }

    #[test]
    fn test_offset_at_distance_scale_is_zero() {
        let evaluator = PoseEvaluator::default();
        let origin = PoseSnapshot::from_positions(&[(0.0, 0.0); BodyPart::COUNT], 1.0);
        let half = PoseSnapshot::from_positions(&[(0.5, 0.0); BodyPart::COUNT], 1.0);
        assert!(evaluator.evaluate(&half, &origin).unwrap().abs() < f32::EPSILON);
        assert!(evaluator.evaluate(&origin, &half).unwrap().abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_offset() {
        let evaluator = PoseEvaluator::default();
        let pose = mountain_pose();
        // Uniform 0.1 offset: similarity 0.8 on every part.
        let score = evaluator.evaluate(&shifted(&pose, 0.1), &pose).unwrap();
        assert!((score - 80.0).abs() < 1e-3);
    }

    #[test]
    fn test_symmetric() {
        let evaluator = PoseEvaluator::default();
        let a = neutral_standing();
        let b = mountain_pose();
        let ab = evaluator.evaluate(&a, &b).unwrap();
        let ba = evaluator.evaluate(&b, &a).unwrap();
        assert!((ab - ba).abs() < 1e-4);
        assert!((0.0..=100.0).contains(&ab));
    }

    #[test]
    fn test_empty_and_unmatched() {
        let evaluator = PoseEvaluator::default();
        let pose = mountain_pose();
        assert!(evaluator.evaluate(&PoseSnapshot::default(), &pose).unwrap().abs() < f32::EPSILON);
        assert!(evaluator.evaluate(&pose, &PoseSnapshot::default()).unwrap().abs() < f32::EPSILON);

        // Only unweighted parts in common.
        let face = PoseSnapshot::new(vec![Keypoint::new(BodyPart::Nose, 0.5, 0.1, 1.0)]);
        assert!(evaluator.evaluate(&face, &pose).unwrap().abs() < f32::EPSILON);
    }

    #[test]
    fn test_non_finite_falls_back_to_neutral() {
        let evaluator = PoseEvaluator::default();
        let broken = PoseSnapshot::new(vec![Keypoint::new(BodyPart::LeftHip, f32::NAN, 0.5, 1.0)]);
        assert!(matches!(
            evaluator.evaluate(&broken, &mountain_pose()),
            Err(PoseError::EvaluationError(_))
        ));
        assert!((evaluator.score(&broken, &mountain_pose()) - 50.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_invalid_config() {
        let evaluator = PoseEvaluator::new(ScoringConfig::new().with_distance_scale(-1.0));
        let pose = mountain_pose();
        assert!(evaluator.evaluate(&pose, &pose).is_err());
        assert!((evaluator.score(&pose, &pose) - 50.0).abs() < f32::EPSILON);
    }
}
