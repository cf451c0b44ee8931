// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Reference pose store.
//!
//! Reference poses are produced lazily: the first request for a catalogued pose
//! asks the chat model for 17 normalized keypoints, and any failure along the
//! way falls back to a hardcoded preset. Whatever is produced is cached for the
//! lifetime of the store and handed out as a shared [`Arc`].
//!
//! The cache lock is not held while the chat model is called. Two threads that
//! miss on the same id at the same time may both generate; the first one to
//! insert wins and the other adopts the stored entry, so every caller sees the
//! same `Arc`.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::catalog::{CatalogEntry, PoseCatalog};
use crate::chat::{ChatCompletion, ChatMessage, ChatRequest};
use crate::config::ChatConfig;
use crate::error::{PoseError, Result};
use crate::keypoint::{BodyPart, Keypoint, PoseSnapshot};
use crate::presets::{REFERENCE_SCORE, reference_preset};

const SYSTEM_PROMPT: &str = "You are a knowledgeable computer vision and yoga expert.";

/// Greedy match from the first `{` to the last `}`.
static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[\s\S]*\}").expect("JSON object pattern is valid"));

/// Where a cached reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSource {
    Generated,
    Preset,
}

/// Canonical target pose for one pose id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferencePose {
    pub pose_id: String,
    pub title: Option<String>,
    pub keypoints: PoseSnapshot,
    pub source: ReferenceSource,
}

impl ReferencePose {
    /// Hardcoded reference for `pose_id` (mountain pose for unknown ids).
    #[must_use]
    pub fn preset(pose_id: &str, title: Option<&str>) -> Self {
        Self {
            pose_id: pose_id.to_string(),
            title: title.map(str::to_string),
            keypoints: reference_preset(pose_id),
            source: ReferenceSource::Preset,
        }
    }
}

/// Process-lifetime cache of reference poses.
pub struct ReferenceStore {
    cache: Mutex<HashMap<String, Arc<ReferencePose>>>,
    catalog: PoseCatalog,
    client: Arc<dyn ChatCompletion>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl ReferenceStore {
    #[must_use]
    pub fn new(client: Arc<dyn ChatCompletion>, config: &ChatConfig) -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            catalog: PoseCatalog::default(),
            client,
            model: config.reference_model.clone(),
            temperature: config.temperature,
            max_tokens: config.reference_max_tokens,
        }
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: PoseCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    #[must_use]
    pub const fn catalog(&self) -> &PoseCatalog {
        &self.catalog
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<ReferencePose>>> {
        // Entries are inserted whole, so a poisoned map is still consistent.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached entry for `pose_id`, without populating.
    #[must_use]
    pub fn cached(&self, pose_id: &str) -> Option<Arc<ReferencePose>> {
        self.lock().get(pose_id).cloned()
    }

    /// Number of cached references.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Return the cached entry or run `populate` and cache its result.
    ///
    /// `populate` runs without the cache lock held. If another caller inserted
    /// the same id in the meantime, that entry is kept and returned.
    pub fn get_or_populate<F>(&self, pose_id: &str, populate: F) -> Arc<ReferencePose>
    where
        F: FnOnce() -> ReferencePose,
    {
        if let Some(hit) = self.cached(pose_id) {
            return hit;
        }

        let fresh = Arc::new(populate());
        Arc::clone(
            self.lock()
                .entry(pose_id.to_string())
                .or_insert(fresh),
        )
    }

    /// Reference pose for `pose_id`. Never fails.
    pub fn get_reference(&self, pose_id: &str) -> Arc<ReferencePose> {
        self.get_or_populate(pose_id, || self.build_reference(pose_id))
    }

    fn build_reference(&self, pose_id: &str) -> ReferencePose {
        let Some(entry) = self.catalog.get(pose_id) else {
            tracing::debug!(pose_id, "pose not in catalog, using preset reference");
            return ReferencePose::preset(pose_id, None);
        };

        match self.generate(entry) {
            Ok(keypoints) => {
                tracing::info!(pose_id, title = entry.title, "generated reference pose");
                ReferencePose {
                    pose_id: pose_id.to_string(),
                    title: Some(entry.title.to_string()),
                    keypoints,
                    source: ReferenceSource::Generated,
                }
            }
            Err(err) => {
                if err.is_service_error() {
                    tracing::error!(pose_id, error = %err, "reference generation request failed, using preset");
                } else {
                    tracing::warn!(pose_id, error = %err, "rejected generated reference, using preset");
                }
                ReferencePose::preset(pose_id, Some(entry.title))
            }
        }
    }

    /// Ask the chat model for the keypoints of a catalogued pose.
    ///
    /// # Errors
    ///
    /// Returns the client error or the first structural problem found by
    /// [`parse_generated_keypoints`].
    pub fn generate(&self, entry: &CatalogEntry) -> Result<PoseSnapshot> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(build_reference_prompt(entry)),
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let reply = self.client.complete(&request)?;
        parse_generated_keypoints(&reply)
    }
}

/// Prompt asking for the 17 normalized keypoints of `entry`.
#[must_use]
pub fn build_reference_prompt(entry: &CatalogEntry) -> String {
    let parts = BodyPart::ALL.map(|part| part.as_str()).join(", ");
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You are a computer vision and yoga expert. I need you to generate reference keypoints for a yoga pose."
    );
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Pose: {}", entry.title);
    let _ = writeln!(prompt, "Description: {}", entry.description);
    let _ = writeln!(prompt);
    prompt.push_str(
        "Please generate normalized coordinates (x, y) for each keypoint in a standard pose.\n\
         The coordinates should be normalized between 0 and 1, where:\n\
         - (0,0) is the top left corner\n\
         - (1,1) is the bottom right corner\n\
         - X increases from left to right\n\
         - Y increases from top to bottom\n\n",
    );
    let _ = writeln!(prompt, "I need coordinates for these keypoints:\n{parts}\n");
    prompt.push_str(
        "Response format:\n\
         {\n\
         \x20 \"keypoints\": [\n\
         \x20   {\"part\": \"nose\", \"position\": {\"x\": 0.5, \"y\": 0.1}, \"score\": 1.0},\n\
         \x20   {\"part\": \"left_eye\", \"position\": {\"x\": 0.45, \"y\": 0.09}, \"score\": 1.0},\n\
         \x20   ...and so on for all keypoints...\n\
         \x20 ]\n\
         }\n\n",
    );
    let _ = writeln!(
        prompt,
        "Make sure the coordinates reflect a realistic human pose for {}.",
        entry.title
    );
    prompt.push_str("For pregnant women, ensure the pose is appropriate and safe during pregnancy.\n");
    prompt
}

/// Greedy `{...}` span of a model reply.
///
/// # Errors
///
/// Returns [`PoseError::MissingJson`] if the reply holds no braces.
pub fn extract_json_object(reply: &str) -> Result<&str> {
    JSON_OBJECT
        .find(reply)
        .map(|m| m.as_str())
        .ok_or(PoseError::MissingJson)
}

/// Strictly parse a generated reference reply.
///
/// Checks run in order: JSON object present, valid JSON, `keypoints` array
/// present, at least 17 entries, every entry well formed with a known part, and
/// every part covered. Entries without a score get 1.0. Partial results are
/// never returned.
///
/// # Errors
///
/// Returns the first failed check as a typed [`PoseError`].
pub fn parse_generated_keypoints(reply: &str) -> Result<PoseSnapshot> {
    let json = extract_json_object(reply)?;
    let document: Value = serde_json::from_str(json)?;

    let entries = document
        .get("keypoints")
        .and_then(Value::as_array)
        .ok_or_else(|| PoseError::SchemaError("missing 'keypoints' array".to_string()))?;

    if entries.len() < BodyPart::COUNT {
        return Err(PoseError::IncompleteKeypoints {
            got: entries.len(),
            expected: BodyPart::COUNT,
        });
    }

    let snapshot: PoseSnapshot = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| parse_entry(i, entry))
        .collect::<Result<_>>()?;

    let missing = snapshot.missing_parts();
    if !missing.is_empty() {
        return Err(PoseError::MissingParts(
            missing.iter().map(ToString::to_string).collect(),
        ));
    }

    Ok(snapshot)
}

#[allow(clippy::cast_possible_truncation)]
fn parse_entry(index: usize, entry: &Value) -> Result<Keypoint> {
    let schema = |what: &str| PoseError::SchemaError(format!("keypoint {index}: {what}"));

    let part: BodyPart = entry
        .get("part")
        .and_then(Value::as_str)
        .ok_or_else(|| schema("missing 'part'"))?
        .parse()
        .map_err(|e| schema(&format!("{e}")))?;

    let position = entry.get("position").ok_or_else(|| schema("missing 'position'"))?;
    let coord = |axis: &str| {
        position
            .get(axis)
            .and_then(Value::as_f64)
            .map(|v| v as f32)
            .ok_or_else(|| schema(&format!("missing numeric position.{axis}")))
    };
    let (x, y) = (coord("x")?, coord("y")?);

    let score = entry
        .get("score")
        .and_then(Value::as_f64)
        .map_or(REFERENCE_SCORE, |v| v as f32);

    Ok(Keypoint::new(part, x, y, score))
}
