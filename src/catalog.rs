// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Static catalog of supported yoga poses.
//!
//! Catalog entries are prompt material for reference generation and supply
//! display names for feedback. The catalog is read-only.

use serde::Serialize;

/// Display name used for ids that are not in the catalog.
pub const UNKNOWN_POSE_NAME: &str = "Yoga Pose";

/// One catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub pose_id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

const ENTRIES: [CatalogEntry; 9] = [
    CatalogEntry {
        pose_id: "1-1",
        title: "Modified Mountain Pose",
        description: "Stand tall with feet hip-width apart, arms at sides. Draw shoulders back and down, engage core gently.",
    },
    CatalogEntry {
        pose_id: "1-2",
        title: "Cat-Cow Stretch",
        description: "Start on hands and knees. Alternate between arching back (cow) and rounding spine (cat).",
    },
    CatalogEntry {
        pose_id: "1-3",
        title: "Seated Side Stretch",
        description: "Sit cross-legged, reach one arm overhead and lean to opposite side. Hold and repeat on other side.",
    },
    CatalogEntry {
        pose_id: "2-1",
        title: "Warrior II",
        description: "Step feet wide apart, turn one foot out. Bend knee over ankle, extend arms and gaze over front hand.",
    },
    CatalogEntry {
        pose_id: "2-2",
        title: "Wide-Legged Forward Fold",
        description: "Step feet wide apart, fold forward from hips. Rest hands on floor or blocks if needed.",
    },
    CatalogEntry {
        pose_id: "2-3",
        title: "Supported Triangle Pose",
        description: "Step feet wide apart, extend one arm down to shin/block/floor and the other arm up.",
    },
    CatalogEntry {
        pose_id: "3-1",
        title: "Modified Squat",
        description: "Stand with feet wider than hips, lower into squat. Use wall or chair for support if needed.",
    },
    CatalogEntry {
        pose_id: "3-2",
        title: "Seated Butterfly",
        description: "Sit with soles of feet together, knees out to sides. Sit on blanket for support if needed.",
    },
    CatalogEntry {
        pose_id: "3-3",
        title: "Side-Lying Relaxation",
        description: "Lie on left side with pillows supporting head, belly, and between knees.",
    },
];

/// Lookup table from pose id to title and description.
#[derive(Debug, Clone)]
pub struct PoseCatalog {
    entries: Vec<CatalogEntry>,
}

impl Default for PoseCatalog {
    fn default() -> Self {
        Self {
            entries: ENTRIES.to_vec(),
        }
    }
}

impl PoseCatalog {
    /// Catalog with explicit entries instead of the built-in poses.
    #[must_use]
    pub const fn with_entries(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn get(&self, pose_id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.pose_id == pose_id)
    }

    /// Title for `pose_id`, or [`UNKNOWN_POSE_NAME`].
    #[must_use]
    pub fn display_name(&self, pose_id: &str) -> &'static str {
        self.get(pose_id).map_or(UNKNOWN_POSE_NAME, |entry| entry.title)
    }

    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        let catalog = PoseCatalog::default();
        assert_eq!(catalog.entries().len(), 9);
        assert_eq!(catalog.get("2-1").unwrap().title, "Warrior II");
        assert!(catalog.get("4-1").is_none());
    }

    #[test]
    fn test_display_name_fallback() {
        let catalog = PoseCatalog::default();
        assert_eq!(catalog.display_name("3-2"), "Seated Butterfly");
        assert_eq!(catalog.display_name("unknown"), UNKNOWN_POSE_NAME);
    }
}
