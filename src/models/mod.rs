//! Model identifiers and per-operation model selection.

pub mod google;

pub use google::{ImageModel, TextModel, VideoModel};

use serde::{Deserialize, Serialize};

/// Which model serves each generation operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Primary text-to-image model.
    pub image: ImageModel,
    /// Used once when `image` is billing-restricted.
    pub fallback_image: ImageModel,
    pub edit: ImageModel,
    pub text: TextModel,
    pub video: VideoModel,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            image: ImageModel::Imagen4,
            fallback_image: ImageModel::GeminiFlashImage,
            edit: ImageModel::GeminiFlashImage,
            text: TextModel::Gemini25Flash,
            video: VideoModel::Veo3,
        }
    }
}
