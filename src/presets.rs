// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Hardcoded pose snapshots used when detection or generation fails.
//!
//! Positions are listed in [`BodyPart::ALL`] order: nose, eyes, ears,
//! shoulders, elbows, wrists, hips, knees, ankles (left before right).

use crate::keypoint::{BodyPart, PoseSnapshot};

type Positions = [(f32, f32); BodyPart::COUNT];

/// Confidence assigned to every keypoint of the detector fallback.
pub const FALLBACK_DETECTION_SCORE: f32 = 0.9;

/// Confidence assigned to every keypoint of a reference preset.
pub const REFERENCE_SCORE: f32 = 1.0;

/// Simplified neutral standing pose returned when detection fails.
const NEUTRAL_STANDING: Positions = [
    (0.5, 0.1),
    (0.45, 0.09),
    (0.55, 0.09),
    (0.4, 0.1),
    (0.6, 0.1),
    (0.4, 0.25),
    (0.6, 0.25),
    (0.35, 0.4),
    (0.65, 0.4),
    (0.3, 0.55),
    (0.7, 0.55),
    (0.45, 0.55),
    (0.55, 0.55),
    (0.45, 0.75),
    (0.55, 0.75),
    (0.45, 0.95),
    (0.55, 0.95),
];

const MOUNTAIN: Positions = [
    (0.5, 0.1),
    (0.47, 0.09),
    (0.53, 0.09),
    (0.44, 0.1),
    (0.56, 0.1),
    (0.42, 0.22),
    (0.58, 0.22),
    (0.4, 0.38),
    (0.6, 0.38),
    (0.38, 0.52),
    (0.62, 0.52),
    (0.46, 0.54),
    (0.54, 0.54),
    (0.46, 0.74),
    (0.54, 0.74),
    (0.46, 0.94),
    (0.54, 0.94),
];

/// Cat position of the cat-cow flow.
const CAT_COW: Positions = [
    (0.5, 0.35),
    (0.48, 0.33),
    (0.52, 0.33),
    (0.46, 0.34),
    (0.54, 0.34),
    (0.38, 0.4),
    (0.62, 0.4),
    (0.3, 0.5),
    (0.7, 0.5),
    (0.25, 0.6),
    (0.75, 0.6),
    (0.4, 0.65),
    (0.6, 0.65),
    (0.35, 0.75),
    (0.65, 0.75),
    (0.3, 0.85),
    (0.7, 0.85),
];

/// Right-side variant.
const SEATED_SIDE_STRETCH: Positions = [
    (0.42, 0.3),
    (0.4, 0.29),
    (0.44, 0.28),
    (0.38, 0.3),
    (0.46, 0.29),
    (0.4, 0.4),
    (0.5, 0.38),
    (0.35, 0.25),
    (0.55, 0.25),
    (0.28, 0.15),
    (0.65, 0.15),
    (0.4, 0.68),
    (0.55, 0.68),
    (0.35, 0.78),
    (0.65, 0.78),
    (0.3, 0.85),
    (0.75, 0.82),
];

const WARRIOR_II: Positions = [
    (0.5, 0.15),
    (0.48, 0.14),
    (0.52, 0.14),
    (0.46, 0.15),
    (0.54, 0.15),
    (0.3, 0.25),
    (0.7, 0.25),
    (0.15, 0.25),
    (0.85, 0.25),
    (0.05, 0.25),
    (0.95, 0.25),
    (0.35, 0.55),
    (0.65, 0.55),
    (0.25, 0.7),
    (0.75, 0.75),
    (0.15, 0.9),
    (0.85, 0.9),
];

const WIDE_LEGGED_FORWARD_FOLD: Positions = [
    (0.5, 0.6),
    (0.48, 0.58),
    (0.52, 0.58),
    (0.46, 0.56),
    (0.54, 0.56),
    (0.45, 0.45),
    (0.55, 0.45),
    (0.45, 0.6),
    (0.55, 0.6),
    (0.45, 0.75),
    (0.55, 0.75),
    (0.3, 0.35),
    (0.7, 0.35),
    (0.15, 0.6),
    (0.85, 0.6),
    (0.15, 0.9),
    (0.85, 0.9),
];

/// Right hand resting on the shin or a block, left arm reaching up.
const SUPPORTED_TRIANGLE: Positions = [
    (0.6, 0.3),
    (0.58, 0.29),
    (0.62, 0.29),
    (0.56, 0.3),
    (0.64, 0.3),
    (0.52, 0.36),
    (0.66, 0.42),
    (0.5, 0.22),
    (0.7, 0.56),
    (0.48, 0.08),
    (0.74, 0.7),
    (0.45, 0.55),
    (0.55, 0.55),
    (0.35, 0.72),
    (0.68, 0.72),
    (0.25, 0.92),
    (0.78, 0.92),
];

/// Wide squat with palms together in front of the chest.
const MODIFIED_SQUAT: Positions = [
    (0.5, 0.25),
    (0.48, 0.23),
    (0.52, 0.23),
    (0.46, 0.24),
    (0.54, 0.24),
    (0.4, 0.35),
    (0.6, 0.35),
    (0.38, 0.5),
    (0.62, 0.5),
    (0.46, 0.58),
    (0.54, 0.58),
    (0.42, 0.65),
    (0.58, 0.65),
    (0.3, 0.7),
    (0.7, 0.7),
    (0.36, 0.92),
    (0.64, 0.92),
];

const SEATED_BUTTERFLY: Positions = [
    (0.5, 0.2),
    (0.48, 0.18),
    (0.52, 0.18),
    (0.46, 0.19),
    (0.54, 0.19),
    (0.4, 0.32),
    (0.6, 0.32),
    (0.37, 0.5),
    (0.63, 0.5),
    (0.45, 0.7),
    (0.55, 0.7),
    (0.42, 0.68),
    (0.58, 0.68),
    (0.25, 0.75),
    (0.75, 0.75),
    (0.46, 0.8),
    (0.54, 0.8),
];

/// Lying on the left side, head to the left of the frame.
const SIDE_LYING_RELAXATION: Positions = [
    (0.18, 0.52),
    (0.17, 0.5),
    (0.19, 0.49),
    (0.15, 0.52),
    (0.16, 0.48),
    (0.28, 0.6),
    (0.28, 0.52),
    (0.22, 0.68),
    (0.38, 0.58),
    (0.16, 0.62),
    (0.4, 0.66),
    (0.55, 0.62),
    (0.55, 0.55),
    (0.7, 0.66),
    (0.68, 0.58),
    (0.85, 0.66),
    (0.84, 0.6),
];

/// Fixed detector fallback: all 17 parts at uniform 0.9 confidence.
#[must_use]
pub fn neutral_standing() -> PoseSnapshot {
    PoseSnapshot::from_positions(&NEUTRAL_STANDING, FALLBACK_DETECTION_SCORE)
}

/// Generic reference used for unrecognized pose ids.
#[must_use]
pub fn mountain_pose() -> PoseSnapshot {
    PoseSnapshot::from_positions(&MOUNTAIN, REFERENCE_SCORE)
}

/// Pose-specific hardcoded reference, or the mountain pose for unknown ids.
#[must_use]
pub fn reference_preset(pose_id: &str) -> PoseSnapshot {
    let positions = match pose_id {
        "1-1" => &MOUNTAIN,
        "1-2" => &CAT_COW,
        "1-3" => &SEATED_SIDE_STRETCH,
        "2-1" => &WARRIOR_II,
        "2-2" => &WIDE_LEGGED_FORWARD_FOLD,
        "2-3" => &SUPPORTED_TRIANGLE,
        "3-1" => &MODIFIED_SQUAT,
        "3-2" => &SEATED_BUTTERFLY,
        "3-3" => &SIDE_LYING_RELAXATION,
        _ => &MOUNTAIN,
    };
    PoseSnapshot::from_positions(positions, REFERENCE_SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PoseCatalog;

    #[test]
    fn test_neutral_standing_is_complete() {
        let pose = neutral_standing();
        assert_eq!(pose.len(), BodyPart::COUNT);
        assert!(pose.is_complete());
        assert!(pose.iter().all(|kp| (kp.score - 0.9).abs() < f32::EPSILON));
    }

    #[test]
    fn test_every_catalog_pose_has_a_complete_preset() {
        for entry in PoseCatalog::default().entries() {
            let preset = reference_preset(entry.pose_id);
            assert!(preset.is_complete(), "preset for {} is incomplete", entry.pose_id);
            assert!(
                preset
                    .iter()
                    .all(|kp| (0.0..=1.0).contains(&kp.position.x) && (0.0..=1.0).contains(&kp.position.y)),
                "preset for {} leaves the frame",
                entry.pose_id
            );
        }
    }

    #[test]
    fn test_unknown_id_uses_mountain() {
        assert_eq!(reference_preset("9-9"), mountain_pose());
        assert_eq!(reference_preset("1-1"), mountain_pose());
        assert_ne!(reference_preset("2-1"), mountain_pose());
    }
}
