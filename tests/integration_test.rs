// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Integration tests for the pose estimation pipeline

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use medai_inference::presets::{mountain_pose, neutral_standing};
use medai_inference::{
    BodyPart, ChatCompletion, ChatRequest, EstimatorConfig, FallbackDetector, ImageInput,
    PoseError, PoseEstimator, ReferenceSource, ReferenceStore, Result, lookup_medication,
};

/// Chat client that returns a fixed reply, or a 503 when it has none.
struct ScriptedChat {
    reply: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedChat {
    fn new(reply: Option<String>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ChatCompletion for ScriptedChat {
    fn complete(&self, _request: &ChatRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().ok_or_else(|| PoseError::ServiceStatus {
            status: 503,
            body: "unavailable".to_string(),
        })
    }
}

fn keypoint_reply(parts: &[BodyPart]) -> String {
    let keypoints: Vec<String> = parts
        .iter()
        .map(|p| format!(r#"{{"part":"{}","position":{{"x":0.4,"y":0.6}},"score":0.95}}"#, p.as_str()))
        .collect();
    format!("Sure! {{\"keypoints\":[{}]}}", keypoints.join(","))
}

fn jpeg_bytes() -> Vec<u8> {
    let image = RgbImage::from_fn(96, 128, |x, y| Rgb([(x * 2) as u8, (y * 2) as u8, 128]));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .unwrap();
    buffer.into_inner()
}

fn estimator_with(chat: Arc<ScriptedChat>) -> PoseEstimator {
    PoseEstimator::new(Box::new(FallbackDetector), chat, &EstimatorConfig::default())
}

#[test]
fn test_estimate_valid_jpeg_is_well_formed() {
    let estimator = estimator_with(ScriptedChat::new(None));
    let estimate = estimator.estimate_pose(&ImageInput::from(jpeg_bytes()), "1-1");

    assert_eq!(estimate.pose_id, "1-1");
    assert!((0.0..=100.0).contains(&estimate.accuracy));
    assert!(estimate.keypoints.len() <= BodyPart::COUNT);
    assert!(!estimate.reference_keypoints.is_empty());
}

#[test]
fn test_estimate_malformed_bytes_scores_neutral() {
    let estimator = estimator_with(ScriptedChat::new(None));
    let estimate = estimator.estimate_pose(&ImageInput::from(vec![0x00, 0x01, 0x02, 0x03]), "1-1");

    assert!((estimate.accuracy - 50.0).abs() < f32::EPSILON);
    assert_eq!(estimate.keypoints, neutral_standing());
    assert_eq!(estimate.reference_keypoints, mountain_pose());
}

#[test]
fn test_estimate_data_uri_input() {
    let estimator = estimator_with(ScriptedChat::new(None));
    let uri = format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg_bytes()));

    let input = ImageInput::from(uri);
    assert!(estimator.try_estimate_pose(&input, "2-1").is_ok());
}

#[test]
fn test_reference_is_cached_and_shared() {
    let chat = ScriptedChat::new(Some(keypoint_reply(&BodyPart::ALL)));
    let estimator = estimator_with(chat.clone());

    let first = estimator.references().get_reference("2-1");
    let second = estimator.references().get_reference("2-1");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.source, ReferenceSource::Generated);
    assert!(first.keypoints.is_complete());
    assert_eq!(chat.calls(), 1);
}

#[test]
fn test_failing_generation_uses_mountain_preset() {
    let chat = ScriptedChat::new(None);
    let store = ReferenceStore::new(chat.clone(), &EstimatorConfig::default().chat);

    let reference = store.get_reference("1-1");
    assert_eq!(reference.source, ReferenceSource::Preset);
    assert_eq!(reference.keypoints.len(), BodyPart::COUNT);
    assert_eq!(reference.keypoints, mountain_pose());
    assert_eq!(chat.calls(), 1);
}

#[test]
fn test_incomplete_generation_rejected() {
    let chat = ScriptedChat::new(Some(keypoint_reply(&BodyPart::ALL[..10])));
    let store = ReferenceStore::new(chat, &EstimatorConfig::default().chat);

    let reference = store.get_reference("3-1");
    assert_eq!(reference.source, ReferenceSource::Preset);
    assert!(reference.keypoints.is_complete());
}

#[test]
fn test_unknown_pose_defaults_to_mountain() {
    let chat = ScriptedChat::new(Some(keypoint_reply(&BodyPart::ALL)));
    let estimator = estimator_with(chat.clone());

    let estimate = estimator.estimate_pose(&ImageInput::from(jpeg_bytes()), "9-9");
    assert_eq!(estimate.reference_keypoints, mountain_pose());
    assert_eq!(chat.calls(), 0);
}

#[test]
fn test_feedback_falls_back_without_service() {
    let estimator = estimator_with(ScriptedChat::new(None));
    let text = estimator.pose_feedback(&ImageInput::from(jpeg_bytes()), "2-1", false);
    assert!(text.starts_with("I couldn't analyze your pose"));

    let text = estimator.pose_feedback(&ImageInput::from("not base64!"), "2-1", true);
    assert!(text.starts_with("Keep your pose aligned"));
}

#[test]
fn test_medication_lookup() {
    let info = lookup_medication("namenda").unwrap();
    assert_eq!(info.name, "Namenda");
    assert_eq!(info.active_ingredient, "Memantine");
    assert!(lookup_medication("Tylenol").is_none());
}
