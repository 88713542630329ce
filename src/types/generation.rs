//! Requests accepted by the generation operations.

use bon::Builder;
use serde::{Deserialize, Serialize};

use super::media::{AspectRatio, InlineImage};

/// Text-to-image request.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct ImageRequest {
    #[builder(into)]
    pub prompt: String,
    #[builder(default)]
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    /// Number of images; the fallback path always returns one.
    #[builder(default = 1)]
    #[serde(default = "default_count")]
    pub count: u32,
    /// Job row to link the serving key to.
    #[builder(into)]
    pub job_id: Option<String>,
}

fn default_count() -> u32 {
    1
}

/// Image edit guided by reference images and an optional mask.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct EditRequest {
    #[builder(into)]
    pub prompt: String,
    #[builder(default)]
    #[serde(default)]
    pub references: Vec<InlineImage>,
    /// White marks the region to change.
    pub mask: Option<InlineImage>,
    pub aspect_ratio: Option<AspectRatio>,
    #[builder(into)]
    pub job_id: Option<String>,
}

/// Text-to-video or image-to-video request.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct VideoRequest {
    #[builder(into)]
    pub prompt: String,
    /// Optional first frame.
    pub image: Option<InlineImage>,
    #[builder(default = AspectRatio::Landscape)]
    #[serde(default = "default_video_aspect")]
    pub aspect_ratio: AspectRatio,
    #[builder(into)]
    pub negative_prompt: Option<String>,
    #[builder(into)]
    pub job_id: Option<String>,
}

fn default_video_aspect() -> AspectRatio {
    AspectRatio::Landscape
}

/// Free-form text generation request.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct TextRequest {
    #[builder(into)]
    pub prompt: String,
    #[builder(into)]
    pub system: Option<String>,
    #[builder(default)]
    #[serde(default)]
    pub images: Vec<InlineImage>,
    pub temperature: Option<f64>,
    #[builder(into)]
    pub job_id: Option<String>,
}
