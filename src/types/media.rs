//! Inline media payloads and generation results.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Output framing accepted by the image and video models.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
pub enum AspectRatio {
    #[default]
    #[strum(serialize = "1:1")]
    #[serde(rename = "1:1")]
    Square,
    #[strum(serialize = "16:9")]
    #[serde(rename = "16:9")]
    Landscape,
    #[strum(serialize = "9:16")]
    #[serde(rename = "9:16")]
    Portrait,
    #[strum(serialize = "4:3")]
    #[serde(rename = "4:3")]
    Standard,
    #[strum(serialize = "3:4")]
    #[serde(rename = "3:4")]
    StandardPortrait,
}

/// A base64-encoded image sent to or received from the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    pub mime_type: String,
    /// Standard base64, no data-URL prefix.
    pub data: String,
}

impl InlineImage {
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Accept either raw base64 or a `data:<mime>;base64,<data>` URL.
    pub fn from_data_url(value: &str) -> Option<Self> {
        let rest = value.strip_prefix("data:")?;
        let (mime_type, data) = rest.split_once(";base64,")?;
        Some(Self {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        })
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.data)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// `inlineData` part for a `generateContent` request.
    pub fn to_part(&self) -> serde_json::Value {
        serde_json::json!({
            "inlineData": {
                "mimeType": self.mime_type,
                "data": self.data,
            }
        })
    }

    /// File extension for the mime type, used when saving outputs.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            _ => "png",
        }
    }
}

/// Images produced by one generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedImages {
    pub images: Vec<InlineImage>,
    /// Model that actually produced the images.
    pub model: String,
    /// True when the primary model was billing-restricted and the fallback served the request.
    pub fell_back: bool,
    /// Text the model returned alongside the images, if any.
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A finished video, downloaded with the key that created it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedVideo {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub model: String,
    pub source_uri: String,
    pub created_at: DateTime<Utc>,
}
