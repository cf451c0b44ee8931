// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Body landmarks, keypoints and pose snapshots.
//!
//! The 17 landmarks follow the COCO / `MoveNet` ordering so detector outputs can
//! be mapped by index. All coordinates are normalized to the image size with the
//! origin in the top-left corner.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Named anatomical landmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl BodyPart {
    /// Number of landmarks in the closed set.
    pub const COUNT: usize = 17;

    /// All landmarks in detector output order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    /// Returns the snake_case name used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }

    /// Landmark at a detector output index.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for BodyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BodyPart {
    type Err = BodyPartParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .find(|part| part.as_str() == name)
            .copied()
            .ok_or_else(|| BodyPartParseError(s.to_string()))
    }
}

/// Error returned when parsing an unknown landmark name.
#[derive(Debug, Clone)]
pub struct BodyPartParseError(String);

impl fmt::Display for BodyPartParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown body part '{}'", self.0)
    }
}

impl std::error::Error for BodyPartParseError {}

/// Normalized 2D position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Whether both coordinates are finite numbers.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A single landmark with its position and confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub part: BodyPart,
    pub position: Position,
    pub score: f32,
}

impl Keypoint {
    #[must_use]
    pub const fn new(part: BodyPart, x: f32, y: f32, score: f32) -> Self {
        Self {
            part,
            position: Position::new(x, y),
            score,
        }
    }
}

/// Keypoints describing one body configuration at one instant.
///
/// Missing landmarks are simply absent. Duplicate parts are tolerated; the
/// indexed view keeps the last one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoseSnapshot {
    keypoints: Vec<Keypoint>,
}

impl PoseSnapshot {
    #[must_use]
    pub const fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    /// Build a snapshot from `(x, y)` positions in [`BodyPart::ALL`] order.
    #[must_use]
    pub fn from_positions(positions: &[(f32, f32); BodyPart::COUNT], score: f32) -> Self {
        BodyPart::ALL
            .iter()
            .zip(positions)
            .map(|(&part, &(x, y))| Keypoint::new(part, x, y, score))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    #[must_use]
    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Keypoint> {
        self.keypoints.iter()
    }

    /// Name-indexed view of the snapshot (last write wins).
    #[must_use]
    pub fn by_part(&self) -> HashMap<BodyPart, &Keypoint> {
        self.keypoints.iter().map(|kp| (kp.part, kp)).collect()
    }

    /// Last keypoint recorded for `part`.
    #[must_use]
    pub fn get(&self, part: BodyPart) -> Option<&Keypoint> {
        self.keypoints.iter().rev().find(|kp| kp.part == part)
    }

    /// Landmarks from the closed set that this snapshot lacks.
    #[must_use]
    pub fn missing_parts(&self) -> Vec<BodyPart> {
        let present = self.by_part();
        BodyPart::ALL
            .iter()
            .filter(|part| !present.contains_key(part))
            .copied()
            .collect()
    }

    /// Whether every one of the 17 landmarks is present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_parts().is_empty()
    }
}

impl FromIterator<Keypoint> for PoseSnapshot {
    fn from_iter<I: IntoIterator<Item = Keypoint>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PoseSnapshot {
    type Item = &'a Keypoint;
    type IntoIter = std::slice::Iter<'a, Keypoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.keypoints.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_part_from_str() {
        assert_eq!("nose".parse::<BodyPart>().unwrap(), BodyPart::Nose);
        assert_eq!("Left_Shoulder".parse::<BodyPart>().unwrap(), BodyPart::LeftShoulder);
        assert!("neck".parse::<BodyPart>().is_err());
    }

    #[test]
    fn test_body_part_index() {
        assert_eq!(BodyPart::from_index(0), Some(BodyPart::Nose));
        assert_eq!(BodyPart::from_index(16), Some(BodyPart::RightAnkle));
        assert_eq!(BodyPart::from_index(17), None);
    }

    #[test]
    fn test_keypoint_json_shape() {
        let kp = Keypoint::new(BodyPart::LeftHip, 0.46, 0.54, 1.0);
        let json = serde_json::to_value(kp).unwrap();
        assert_eq!(json["part"], "left_hip");
        assert!((json["position"]["x"].as_f64().unwrap() - 0.46).abs() < 1e-6);
        assert!((json["score"].as_f64().unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_snapshot_last_write_wins() {
        let snapshot = PoseSnapshot::new(vec![
            Keypoint::new(BodyPart::Nose, 0.1, 0.1, 0.5),
            Keypoint::new(BodyPart::Nose, 0.9, 0.9, 0.7),
        ]);
        let indexed = snapshot.by_part();
        assert_eq!(indexed.len(), 1);
        assert!((indexed[&BodyPart::Nose].position.x - 0.9).abs() < 1e-6);
        assert!((snapshot.get(BodyPart::Nose).unwrap().score - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_missing_parts() {
        let snapshot = PoseSnapshot::new(vec![Keypoint::new(BodyPart::Nose, 0.5, 0.1, 1.0)]);
        let missing = snapshot.missing_parts();
        assert_eq!(missing.len(), 16);
        assert!(!missing.contains(&BodyPart::Nose));
        assert!(!snapshot.is_complete());
    }

    #[test]
    fn test_position_distance() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(0.3, 0.4);
        assert!((a.distance(&b) - 0.5).abs() < 1e-6);
        assert!((b.distance(&a) - 0.5).abs() < 1e-6);
    }
}
