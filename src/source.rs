// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Image input handling.
//!
//! Clients send either raw encoded image bytes or base64 text. The text form may
//! carry a data-URI header such as `data:image/jpeg;base64,` which is stripped
//! before decoding.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::DynamicImage;

use crate::error::{PoseError, Result};

/// Image payload as received from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    /// Encoded image bytes (JPEG, PNG, WebP).
    Bytes(Vec<u8>),
    /// Base64 text, optionally prefixed with a data-URI header.
    Encoded(String),
}

impl ImageInput {
    /// Check if this input is base64 text.
    #[must_use]
    pub const fn is_encoded(&self) -> bool {
        matches!(self, Self::Encoded(_))
    }

    /// Resolve the payload to encoded image bytes.
    ///
    /// Text input is cut after its first comma (if any) and base64-decoded.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::DecodeError`] if the text is not valid base64.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Self::Bytes(bytes) => Ok(bytes.clone()),
            Self::Encoded(text) => decode_base64(text),
        }
    }

    /// Resolve and decode the payload into an image.
    ///
    /// # Errors
    ///
    /// Returns an error if base64 or image decoding fails.
    pub fn decode(&self) -> Result<DynamicImage> {
        match self {
            Self::Bytes(bytes) => decode_image(bytes),
            Self::Encoded(text) => decode_image(&decode_base64(text)?),
        }
    }
}

impl From<Vec<u8>> for ImageInput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for ImageInput {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<String> for ImageInput {
    fn from(text: String) -> Self {
        Self::Encoded(text)
    }
}

impl From<&str> for ImageInput {
    fn from(text: &str) -> Self {
        Self::Encoded(text.to_string())
    }
}

/// Remove a data-URI header, keeping everything after the first comma.
#[must_use]
pub fn strip_data_uri(text: &str) -> &str {
    text.split_once(',').map_or(text, |(_, payload)| payload)
}

/// Decode base64 text (data-URI header allowed) into raw bytes.
///
/// # Errors
///
/// Returns [`PoseError::DecodeError`] if the payload is not valid base64.
pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    let payload = strip_data_uri(text.trim());
    Ok(STANDARD.decode(payload.trim())?)
}

/// Decode encoded image bytes.
///
/// # Errors
///
/// Returns [`PoseError::ImageError`] if the bytes are empty or not a supported format.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(PoseError::ImageError("empty image payload".to_string()));
    }
    Ok(image::load_from_memory(bytes)?)
}
