// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Coaching feedback from a vision chat model.
//!
//! The photo is sent with a prenatal-yoga instructor prompt. When the service
//! cannot be reached or answers with an error, a canned sentence is returned
//! instead so callers always have something to show.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::catalog::PoseCatalog;
use crate::chat::{ChatCompletion, ChatMessage, ChatRequest};
use crate::config::ChatConfig;
use crate::error::{PoseError, Result};

/// Returned when the service answers with a non-success status.
pub const SERVICE_FALLBACK: &str = "I couldn't analyze your pose at this time. Focus on keeping your alignment comfortable and remember to breathe.";

/// Returned for every other failure.
pub const GENERAL_FALLBACK: &str = "Keep your pose aligned with your breath and maintain a comfortable stance. Remember to modify as needed for your pregnancy.";

const PREGNANCY_SAFETY: &str = "\
Remember that this is a pregnant woman, so feedback must prioritize safety.
Caution against:
- Deep twists that compress the abdomen
- Poses that put pressure on the belly
- Holding breath
- Overstretching (due to relaxin hormone)
- Lying flat on back after first trimester

Encourage:
- Modified poses with props if needed
- Widening stance for balance
- Listening to the body and backing off if uncomfortable";

const FINAL_SESSION_NOTE: &str =
    "This is their final feedback for this practice session, so include overall summary comments.";

/// Builds feedback prompts and calls the vision model.
pub struct FeedbackGenerator {
    client: Arc<dyn ChatCompletion>,
    catalog: PoseCatalog,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl FeedbackGenerator {
    #[must_use]
    pub fn new(client: Arc<dyn ChatCompletion>, config: &ChatConfig) -> Self {
        Self {
            client,
            catalog: PoseCatalog::default(),
            model: config.feedback_model.clone(),
            temperature: config.temperature,
            max_tokens: config.feedback_max_tokens,
        }
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: PoseCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Feedback text for `image` (encoded JPEG/PNG bytes). Never fails.
    #[must_use]
    pub fn generate(&self, image: &[u8], pose_id: &str, is_final: bool) -> String {
        self.try_generate(image, pose_id, is_final)
            .unwrap_or_else(|err| fallback_for(&err, pose_id).to_string())
    }

    /// Feedback text, or the error that prevented it.
    ///
    /// # Errors
    ///
    /// Returns the chat client's error.
    pub fn try_generate(&self, image: &[u8], pose_id: &str, is_final: bool) -> Result<String> {
        let prompt = build_feedback_prompt(self.catalog.display_name(pose_id), is_final);
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user_with_jpeg(prompt, &STANDARD.encode(image))],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        self.client.complete(&request)
    }
}

/// Canned sentence for a failed feedback request.
#[must_use]
pub fn fallback_for(err: &PoseError, pose_id: &str) -> &'static str {
    if let PoseError::ServiceStatus { status, body } = err {
        tracing::error!(pose_id, status, body = %body, "feedback service returned an error");
        SERVICE_FALLBACK
    } else {
        tracing::error!(pose_id, error = %err, "feedback generation failed");
        GENERAL_FALLBACK
    }
}

/// Instructor prompt for `pose_name`.
#[must_use]
pub fn build_feedback_prompt(pose_name: &str, is_final: bool) -> String {
    let final_note = if is_final { FINAL_SESSION_NOTE } else { "" };
    format!(
        "You are a specialized prenatal yoga instructor providing feedback to a pregnant woman.

TASK: Analyze the yoga pose image and provide helpful guidance on proper alignment and technique for the {pose_name}.

{PREGNANCY_SAFETY}

For this specific pose ({pose_name}), provide:
1. Brief 1-2 sentence assessment of overall alignment
2. 2-3 specific, actionable cues to improve the pose
3. One encouraging statement

Your feedback should be clear, supportive, and focused on safety for pregnancy.

{final_note}

Keep your response under 150 words."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;
    use crate::chat::MessageContent;
    use std::sync::Mutex;

    /// Records the last request and replies with a fixed outcome.
    struct RecordingChat {
        outcome: fn() -> Result<String>,
        last: Mutex<Option<ChatRequest>>,
    }

    impl ChatCompletion for RecordingChat {
        fn complete(&self, request: &ChatRequest) -> Result<String> {
            *self.last.lock().unwrap() = Some(request.clone());
            (self.outcome)()
        }
    }

    fn generator(outcome: fn() -> Result<String>) -> (FeedbackGenerator, Arc<RecordingChat>) {
        let chat = Arc::new(RecordingChat {
            outcome,
            last: Mutex::new(None),
        });
        (FeedbackGenerator::new(chat.clone(), &ChatConfig::default()), chat)
    }

    #[test]
    fn test_prompt_contents() {
        let prompt = build_feedback_prompt("Warrior II", false);
        assert!(prompt.contains("technique for the Warrior II"));
        assert!(prompt.contains("Lying flat on back after first trimester"));
        assert!(prompt.contains("Keep your response under 150 words."));
        assert!(!prompt.contains("final feedback"));
        assert!(build_feedback_prompt("Warrior II", true).contains("final feedback for this practice session"));
    }

    #[test]
    fn test_reply_is_returned_verbatim() {
        let (feedback, chat) = generator(|| Ok("  Lovely stance!  ".to_string()));
        assert_eq!(feedback.generate(b"jpeg", "2-1", false), "  Lovely stance!  ");

        let request = chat.last.lock().unwrap().clone().unwrap();
        assert_eq!(request.model, "llama-3.2-11b-vision-preview");
        assert_eq!(request.max_tokens, 1024);
        assert_eq!(request.messages.len(), 1);
        let MessageContent::Parts(parts) = &request.messages[0].content else {
            panic!("expected multi-part content");
        };
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn test_unknown_pose_uses_generic_name() {
        let (feedback, chat) = generator(|| Ok("ok".to_string()));
        let _ = feedback.generate(b"jpeg", "7-7", false);
        let request = chat.last.lock().unwrap().clone().unwrap();
        let serialized = serde_json::to_string(&request).unwrap();
        assert!(serialized.contains("technique for the Yoga Pose"));
    }

    #[test]
    fn test_custom_catalog_names_the_pose() {
        let chat = Arc::new(RecordingChat {
            outcome: || Ok("ok".to_string()),
            last: Mutex::new(None),
        });
        let feedback = FeedbackGenerator::new(chat.clone(), &ChatConfig::default()).with_catalog(
            PoseCatalog::with_entries(vec![CatalogEntry {
                pose_id: "4-1",
                title: "Goddess Pose",
                description: "Wide squat with arms raised.",
            }]),
        );

        let _ = feedback.generate(b"jpeg", "4-1", false);
        let request = chat.last.lock().unwrap().clone().unwrap();
        let serialized = serde_json::to_string(&request).unwrap();
        assert!(serialized.contains("technique for the Goddess Pose"));

        let _ = feedback.generate(b"jpeg", "2-1", false);
        let request = chat.last.lock().unwrap().clone().unwrap();
        let serialized = serde_json::to_string(&request).unwrap();
        assert!(serialized.contains("technique for the Yoga Pose"));
    }

    #[test]
    fn test_fallback_sentences() {
        let (status_failure, _) = generator(|| {
            Err(PoseError::ServiceStatus {
                status: 503,
                body: String::new(),
            })
        });
        assert_eq!(status_failure.generate(b"jpeg", "1-1", true), SERVICE_FALLBACK);

        let (transport_failure, _) = generator(|| Err(PoseError::HttpError("refused".to_string())));
        assert_eq!(transport_failure.generate(b"jpeg", "1-1", false), GENERAL_FALLBACK);

        let (bad_reply, _) = generator(|| Err(PoseError::SchemaError("no content".to_string())));
        assert_eq!(bad_reply.generate(b"jpeg", "1-1", false), GENERAL_FALLBACK);
    }
}
