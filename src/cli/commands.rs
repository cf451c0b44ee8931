// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::fs;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::catalog::PoseCatalog;
use crate::chat::GroqClient;
use crate::cli::args::{EstimateArgs, ReferenceArgs};
use crate::cli::logging::{colored_score, set_verbose};
use crate::config::{ChatConfig, DetectorBackend, DetectorConfig, EstimatorConfig};
use crate::error::Result;
use crate::estimator::{PoseEstimate, PoseEstimator};
use crate::reference::ReferenceStore;
use crate::source::ImageInput;
use crate::{VERSION, field, info, section, success, verbose, warn};

#[derive(Serialize)]
struct EstimateOutput<'a> {
    #[serde(flatten)]
    estimate: &'a PoseEstimate,
    #[serde(skip_serializing_if = "Option::is_none")]
    feedback: Option<&'a str>,
}

/// Run the `estimate` command.
///
/// # Errors
///
/// Returns an error if the image file cannot be read or the JSON output fails.
pub fn run_estimate(args: &EstimateArgs) -> Result<()> {
    set_verbose(args.verbose && !args.json);

    let bytes = fs::read(&args.image)?;
    let backend = args.backend();

    let mut detector = DetectorConfig::new()
        .with_backend(backend)
        .with_confidence(args.conf);
    if let Some(model) = &args.model {
        detector = detector.with_model(model);
    } else if backend != DetectorBackend::None {
        warn!("'--backend {backend}' needs '--model'. Falling back to the neutral pose.");
    }

    let config = EstimatorConfig::from_env().with_detector(detector);
    if args.feedback && config.chat.api_key.is_none() {
        warn!("GROQ_API_KEY is not set. Feedback will use the offline fallback text.");
    }

    let estimator = PoseEstimator::from_config(&config);
    let catalog = estimator.references().catalog();

    section!("MEDAI Pose Inference {VERSION}");
    verbose!("  Image:    {}", args.image.display());
    verbose!("  Pose:     {} ({})", catalog.display_name(&args.pose), args.pose);
    verbose!("  Detector: {}", estimator.detector_name());

    let image = ImageInput::from(bytes);
    let start = Instant::now();
    let estimate = estimator.estimate_pose(&image, &args.pose);
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    let feedback = args
        .feedback
        .then(|| estimator.pose_feedback(&image, &args.pose, args.is_final));

    if args.json {
        let output = EstimateOutput {
            estimate: &estimate,
            feedback: feedback.as_deref(),
        };
        info!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    section!("Keypoints");
    let reference = estimate.reference_keypoints.by_part();
    for kp in &estimate.keypoints {
        let offset = reference
            .get(&kp.part)
            .map_or_else(|| "-".to_string(), |r| format!("{:.3}", kp.position.distance(&r.position)));
        verbose!(
            "  {:<15} x={:.3} y={:.3} score={:.2} offset={offset}",
            kp.part.as_str(),
            kp.position.x,
            kp.position.y,
            kp.score
        );
    }

    println!();
    field!("Accuracy", "{}", colored_score(estimate.accuracy));
    field!("Keypoints", "{}", estimate.keypoints.len());
    field!("Time", "{elapsed_ms:.1}ms");
    if let Some(text) = &feedback {
        println!();
        info!("{text}");
    }
    success!("Done");
    Ok(())
}

/// Run the `reference` command.
///
/// # Errors
///
/// Returns an error if the reference cannot be serialized.
pub fn run_reference(args: &ReferenceArgs) -> Result<()> {
    let chat = ChatConfig::from_env();
    if chat.api_key.is_none() {
        warn!("GROQ_API_KEY is not set. Using the hardcoded reference pose.");
    }
    let store = ReferenceStore::new(Arc::new(GroqClient::new(&chat)), &chat);
    let reference = store.get_reference(&args.pose);
    info!("{}", serde_json::to_string_pretty(reference.as_ref())?);
    Ok(())
}

/// Run the `poses` command.
pub fn run_poses() {
    let catalog = PoseCatalog::default();
    for entry in catalog.entries() {
        field!(entry.pose_id, "{}", entry.title);
        verbose!("  {:<width$} {}", "", entry.description, width = crate::cli::logging::LABEL_WIDTH);
    }
}
