// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Keypoint detection backends.
//!
//! A [`KeypointDetector`] turns a decoded image into a [`PoseSnapshot`] with
//! normalized coordinates. Two ONNX backends are provided, [`MoveNetDetector`]
//! and [`YoloPoseDetector`], plus the model-less [`FallbackDetector`].
//!
//! Backends report typed errors. Callers that must always obtain a snapshot go
//! through [`detect_or_fallback`], which substitutes the neutral-standing pose.

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use std::path::Path;

use image::DynamicImage;
use ndarray::{Array2, Array4};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::TensorRef;

use crate::config::{DetectorBackend, DetectorConfig};
use crate::error::{PoseError, Result};
use crate::keypoint::{BodyPart, Keypoint, PoseSnapshot};
use crate::preprocessing::{PreprocessResult, letterbox_image, square_resize_nhwc};
use crate::presets::neutral_standing;

/// Values per keypoint in model outputs (x/y/score in some order).
const KPT_DIM: usize = 3;

/// Keypoint features in a YOLO pose prediction row.
const KPT_FEATURES: usize = BodyPart::COUNT * KPT_DIM;

/// Produces a pose snapshot from a decoded image.
pub trait KeypointDetector: Send {
    /// Detect the keypoints of the most prominent person.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails, the output is malformed or no person
    /// is found.
    fn detect(&mut self, image: &DynamicImage) -> Result<PoseSnapshot>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

/// Run `detector`, replacing any failure or empty result with the neutral-standing pose.
pub fn detect_or_fallback(detector: &mut dyn KeypointDetector, image: &DynamicImage) -> PoseSnapshot {
    match detector.detect(image) {
        Ok(snapshot) if !snapshot.is_empty() => snapshot,
        Ok(_) => {
            tracing::warn!(backend = detector.name(), "detector returned no keypoints, using fallback pose");
            neutral_standing()
        }
        Err(err) => {
            tracing::warn!(backend = detector.name(), error = %err, "keypoint detection failed, using fallback pose");
            neutral_standing()
        }
    }
}

/// Build the configured detector.
///
/// # Errors
///
/// Returns [`PoseError::ConfigError`] when a model backend has no model path, or
/// [`PoseError::ModelLoadError`] when the model cannot be loaded.
pub fn try_load_detector(config: &DetectorConfig) -> Result<Box<dyn KeypointDetector>> {
    let model_path = || {
        config.model_path.as_deref().ok_or_else(|| {
            PoseError::ConfigError(format!("backend '{}' requires a model path", config.backend))
        })
    };
    Ok(match config.backend {
        DetectorBackend::None => Box::new(FallbackDetector),
        DetectorBackend::MoveNet => Box::new(MoveNetDetector::load(model_path()?, config)?),
        DetectorBackend::Yolo => Box::new(YoloPoseDetector::load(model_path()?, config)?),
    })
}

/// Build the configured detector, degrading to [`FallbackDetector`] on failure.
#[must_use]
pub fn load_detector(config: &DetectorConfig) -> Box<dyn KeypointDetector> {
    match try_load_detector(config) {
        Ok(detector) => {
            tracing::info!(backend = detector.name(), "keypoint detector ready");
            detector
        }
        Err(err) => {
            tracing::warn!(backend = %config.backend, error = %err, "failed to load keypoint detector, using fallback backend");
            Box::new(FallbackDetector)
        }
    }
}

/// Detector without a model: always reports the neutral-standing pose.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackDetector;

impl KeypointDetector for FallbackDetector {
    fn detect(&mut self, _image: &DynamicImage) -> Result<PoseSnapshot> {
        Ok(neutral_standing())
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}

/// ONNX Runtime session with its first input and output names.
struct OnnxModel {
    session: Session,
    input_name: String,
    output_name: String,
}

impl OnnxModel {
    fn load(path: &Path, num_threads: usize) -> Result<Self> {
        if !path.exists() {
            return Err(PoseError::ModelLoadError(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| PoseError::ModelLoadError(format!("Failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| PoseError::ModelLoadError(format!("Failed to set optimization level: {e}")))?
            .with_intra_threads(num_threads)
            .map_err(|e| PoseError::ModelLoadError(format!("Failed to set intra-thread count: {e}")))?
            .commit_from_file(path)
            .map_err(|e| PoseError::ModelLoadError(format!("Failed to load model: {e}")))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| PoseError::ModelLoadError("Model has no inputs".to_string()))?;
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| PoseError::ModelLoadError("Model has no outputs".to_string()))?;

        Ok(Self {
            session,
            input_name,
            output_name,
        })
    }

    /// Run the session and copy out the first output as `(data, shape)`.
    fn run(&mut self, input: &Array4<f32>) -> Result<(Vec<f32>, Vec<usize>)> {
        let input_contiguous = input.as_standard_layout();
        let input_tensor = TensorRef::from_array_view(&input_contiguous)
            .map_err(|e| PoseError::InferenceError(format!("Failed to create input tensor: {e}")))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| PoseError::InferenceError(format!("Inference failed: {e}")))?;

        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            PoseError::InferenceError(format!("Output '{}' not found", self.output_name))
        })?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| PoseError::InferenceError(format!("Failed to extract output: {e}")))?;

        let shape_vec = shape.iter().map(|&d| d.max(0) as usize).collect();
        Ok((data.to_vec(), shape_vec))
    }
}

/// Single-person `MoveNet` landmark model.
///
/// Input is a square NHWC image; output `[1, 1, 17, 3]` holds `(y, x, score)`
/// already normalized to the input square, which maps directly onto the
/// original image because the resize is a plain stretch.
pub struct MoveNetDetector {
    model: OnnxModel,
    input_size: u32,
}

impl MoveNetDetector {
    /// Load a `MoveNet` ONNX export.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ModelLoadError`] if the file is missing or invalid.
    pub fn load(path: impl AsRef<Path>, config: &DetectorConfig) -> Result<Self> {
        Ok(Self {
            model: OnnxModel::load(path.as_ref(), config.num_threads)?,
            input_size: config
                .input_size
                .unwrap_or_else(|| DetectorBackend::MoveNet.default_input_size()),
        })
    }
}

impl KeypointDetector for MoveNetDetector {
    fn detect(&mut self, image: &DynamicImage) -> Result<PoseSnapshot> {
        let input = square_resize_nhwc(image, self.input_size)?;
        let (data, shape) = self.model.run(&input)?;
        decode_movenet_output(&data, &shape)
    }

    fn name(&self) -> &'static str {
        "movenet"
    }
}

/// Decode a `[1, 1, 17, 3]` `MoveNet` output.
///
/// # Errors
///
/// Returns [`PoseError::MalformedOutput`] if the tensor does not hold 17 triples.
pub fn decode_movenet_output(data: &[f32], shape: &[usize]) -> Result<PoseSnapshot> {
    let expected = BodyPart::COUNT * KPT_DIM;
    if data.len() != expected || shape.last() != Some(&KPT_DIM) {
        return Err(PoseError::MalformedOutput(format!(
            "expected {expected} values shaped [.., 17, 3], got {} values shaped {shape:?}",
            data.len()
        )));
    }

    Ok(BodyPart::ALL
        .iter()
        .zip(data.chunks_exact(KPT_DIM))
        .map(|(&part, triple)| {
            let (y, x, score) = (triple[0], triple[1], triple[2]);
            Keypoint::new(part, x.clamp(0.0, 1.0), y.clamp(0.0, 1.0), score)
        })
        .collect())
}

/// Ultralytics YOLO pose model.
///
/// The image is letterboxed to the model square; the highest-confidence person
/// above the threshold is kept and its keypoints are mapped back to normalized
/// original-image coordinates.
pub struct YoloPoseDetector {
    model: OnnxModel,
    input_size: u32,
    confidence_threshold: f32,
}

impl YoloPoseDetector {
    /// Load a YOLO pose ONNX export.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ModelLoadError`] if the file is missing or invalid.
    pub fn load(path: impl AsRef<Path>, config: &DetectorConfig) -> Result<Self> {
        Ok(Self {
            model: OnnxModel::load(path.as_ref(), config.num_threads)?,
            input_size: config
                .input_size
                .unwrap_or_else(|| DetectorBackend::Yolo.default_input_size()),
            confidence_threshold: config.confidence_threshold,
        })
    }
}

impl KeypointDetector for YoloPoseDetector {
    fn detect(&mut self, image: &DynamicImage) -> Result<PoseSnapshot> {
        let preprocess = letterbox_image(image, (self.input_size, self.input_size))?;
        let (data, shape) = self.model.run(&preprocess.tensor)?;
        decode_yolo_pose_output(&data, &shape, &preprocess, self.confidence_threshold)
    }

    fn name(&self) -> &'static str {
        "yolo"
    }
}

/// Decode a YOLO pose output (`[1, 56, N]` or transposed `[1, N, 56]`).
///
/// # Errors
///
/// Returns [`PoseError::MalformedOutput`] for an unexpected layout and
/// [`PoseError::NoPersonDetected`] when no prediction clears `threshold`.
pub fn decode_yolo_pose_output(
    data: &[f32],
    shape: &[usize],
    preprocess: &PreprocessResult,
    threshold: f32,
) -> Result<PoseSnapshot> {
    let features = 4 + 1 + KPT_FEATURES;
    let (num_preds, is_transposed) = match shape {
        [1, a, b] if *a == features => (*b, false),
        [1, a, b] if *b == features => (*a, true),
        _ => {
            return Err(PoseError::MalformedOutput(format!(
                "expected [1, {features}, N] pose output, got {shape:?}"
            )));
        }
    };
    if num_preds == 0 {
        return Err(PoseError::NoPersonDetected);
    }

    // Rows are predictions, columns are features.
    let preds = if is_transposed {
        Array2::from_shape_vec((num_preds, features), data.to_vec())
    } else {
        Array2::from_shape_vec((features, num_preds), data.to_vec()).map(|a| a.reversed_axes())
    }
    .map_err(|e| PoseError::MalformedOutput(e.to_string()))?;

    let best = preds
        .rows()
        .into_iter()
        .map(|row| (if row[4].is_nan() { 0.0 } else { row[4] }, row))
        .filter(|(conf, _)| *conf >= threshold)
        .max_by(|(a, _), (b, _)| a.total_cmp(b));

    let Some((_, row)) = best else {
        return Err(PoseError::NoPersonDetected);
    };

    Ok(BodyPart::ALL
        .iter()
        .enumerate()
        .map(|(k, &part)| {
            let base = 5 + k * KPT_DIM;
            let (x, y) = preprocess.to_normalized(row[base], row[base + 1]);
            Keypoint::new(part, x, y, row[base + 2])
        })
        .collect())
}
