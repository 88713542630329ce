//! Google model identifiers used by the generation operations.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::EnumString;

/// Image generation and editing models.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(from = "String", into = "String")]
pub enum ImageModel {
    #[strum(serialize = "imagen-4.0-generate-001")]
    Imagen4,
    #[strum(serialize = "imagen-4.0-ultra-generate-001")]
    Imagen4Ultra,
    #[strum(serialize = "imagen-4.0-fast-generate-001")]
    Imagen4Fast,
    #[strum(serialize = "imagen-3.0-generate-002")]
    Imagen3,
    #[strum(serialize = "gemini-2.5-flash-image")]
    GeminiFlashImage,
    #[strum(serialize = "gemini-2.5-flash-image-preview")]
    GeminiFlashImagePreview,
    /// Custom/unknown image model.
    #[strum(default)]
    Custom(String),
}

impl ImageModel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Imagen4 => "imagen-4.0-generate-001",
            Self::Imagen4Ultra => "imagen-4.0-ultra-generate-001",
            Self::Imagen4Fast => "imagen-4.0-fast-generate-001",
            Self::Imagen3 => "imagen-3.0-generate-002",
            Self::GeminiFlashImage => "gemini-2.5-flash-image",
            Self::GeminiFlashImagePreview => "gemini-2.5-flash-image-preview",
            Self::Custom(s) => s,
        }
    }

    /// Imagen models use `:predict`; Gemini image models use `:generateContent`.
    pub fn uses_predict(&self) -> bool {
        self.as_str().starts_with("imagen")
    }
}

/// Text models for free-form generation and prompt enhancement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(from = "String", into = "String")]
pub enum TextModel {
    #[strum(serialize = "gemini-2.5-pro")]
    Gemini25Pro,
    #[strum(serialize = "gemini-2.5-flash")]
    Gemini25Flash,
    #[strum(serialize = "gemini-2.5-flash-lite")]
    Gemini25FlashLite,
    /// Custom/unknown text model.
    #[strum(default)]
    Custom(String),
}

impl TextModel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Gemini25Pro => "gemini-2.5-pro",
            Self::Gemini25Flash => "gemini-2.5-flash",
            Self::Gemini25FlashLite => "gemini-2.5-flash-lite",
            Self::Custom(s) => s,
        }
    }
}

/// Long-running video models.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(from = "String", into = "String")]
pub enum VideoModel {
    #[strum(serialize = "veo-3.0-generate-001")]
    Veo3,
    #[strum(serialize = "veo-3.0-fast-generate-001")]
    Veo3Fast,
    #[strum(serialize = "veo-2.0-generate-001")]
    Veo2,
    /// Custom/unknown video model.
    #[strum(default)]
    Custom(String),
}

impl VideoModel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Veo3 => "veo-3.0-generate-001",
            Self::Veo3Fast => "veo-3.0-fast-generate-001",
            Self::Veo2 => "veo-2.0-generate-001",
            Self::Custom(s) => s,
        }
    }
}

macro_rules! model_id_conversions {
    ($($model:ident),+) => {$(
        impl From<String> for $model {
            fn from(id: String) -> Self {
                match id.parse() {
                    Ok(model) => model,
                    Err(_) => Self::Custom(id),
                }
            }
        }

        impl From<$model> for String {
            fn from(model: $model) -> Self {
                model.as_str().to_string()
            }
        }

        impl fmt::Display for $model {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    )+};
}

model_id_conversions!(ImageModel, TextModel, VideoModel);
