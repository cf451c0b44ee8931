// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Blocking client for OpenAI-compatible chat-completions endpoints.
//!
//! The reference store and the feedback generator talk to the service through
//! the [`ChatCompletion`] trait so tests can script replies and count calls.

use serde::{Deserialize, Serialize};

use crate::config::ChatConfig;
use crate::error::{PoseError, Result};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One block of a multi-part message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Message body: plain text or a list of blocks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// User message carrying a text block and a base64 JPEG image block.
    #[must_use]
    pub fn user_with_jpeg(text: impl Into<String>, jpeg_base64: &str) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!("data:image/jpeg;base64,{jpeg_base64}"),
                    },
                },
            ]),
        }
    }
}

/// Request body for `POST {endpoint}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// A chat-completions backend.
pub trait ChatCompletion: Send + Sync {
    /// Send `request` and return the text of the first choice.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ConfigError`] when no API key is set,
    /// [`PoseError::HttpError`] for transport failures,
    /// [`PoseError::ServiceStatus`] for non-success replies and
    /// [`PoseError::SchemaError`] when the reply holds no message text.
    fn complete(&self, request: &ChatRequest) -> Result<String>;
}

/// Extract `choices[0].message.content` from a raw response body.
///
/// # Errors
///
/// Returns [`PoseError::JsonError`] for invalid JSON and
/// [`PoseError::SchemaError`] when the content is absent.
pub fn parse_completion(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body)?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| PoseError::SchemaError("reply has no choices[0].message.content".to_string()))
}

/// Groq (or any OpenAI-compatible) chat-completions client.
pub struct GroqClient {
    agent: ureq::Agent,
    endpoint: String,
    api_key: Option<String>,
}

impl GroqClient {
    #[must_use]
    pub fn new(config: &ChatConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_connect(Some(config.connect_timeout))
            .timeout_global(Some(config.request_timeout))
            .http_status_as_error(false)
            .build();

        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

impl ChatCompletion for GroqClient {
    fn complete(&self, request: &ChatRequest) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PoseError::ConfigError("chat API key is not configured".to_string()))?;

        let mut response = self
            .agent
            .post(&self.endpoint)
            .header("Authorization", &format!("Bearer {api_key}"))
            .send_json(request)?;

        let status = response.status();
        let body = response.body_mut().read_to_string()?;

        if !status.is_success() {
            return Err(PoseError::ServiceStatus {
                status: status.as_u16(),
                body,
            });
        }

        parse_completion(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_json_shape() {
        let request = ChatRequest {
            model: "llama-3.2-11b-vision-preview".to_string(),
            messages: vec![
                ChatMessage::system("persona"),
                ChatMessage::user_with_jpeg("look", "QUJD"),
            ],
            temperature: 0.2,
            max_tokens: 1024,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0], json!({"role": "system", "content": "persona"}));
        assert_eq!(
            value["messages"][1]["content"],
            json!([
                {"type": "text", "text": "look"},
                {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,QUJD"}}
            ])
        );
        assert_eq!(value["max_tokens"], 1024);
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Hello"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "Hello");

        assert!(matches!(
            parse_completion(r#"{"choices":[]}"#),
            Err(PoseError::SchemaError(_))
        ));
        assert!(matches!(parse_completion("<html>"), Err(PoseError::JsonError(_))));
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let client = GroqClient::new(&ChatConfig::default());
        let request = ChatRequest {
            model: "m".to_string(),
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.2,
            max_tokens: 10,
        };
        let err = client.complete(&request).unwrap_err();
        assert!(matches!(err, PoseError::ConfigError(_)));
        assert!(!err.is_service_error());
    }
}
