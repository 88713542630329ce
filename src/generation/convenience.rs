//! One-call helpers backed by the global configuration.
//!
//! Every helper reuses one [`Generator`] built on first use, so all calls in
//! the process lease from and report to the same key registry.

use std::sync::OnceLock;

use crate::config::KeyRotorConfig;
use crate::error::{KeyRotorError, Result};
use crate::types::{GeneratedImages, GeneratedVideo, ImageRequest, TextRequest, VideoRequest};

use super::Generator;

static SHARED_GENERATOR: OnceLock<std::result::Result<Generator, String>> = OnceLock::new();

/// Get (or build) the process-wide generator from [`KeyRotorConfig::global`].
pub fn shared_generator() -> Result<Generator> {
    SHARED_GENERATOR
        .get_or_init(|| {
            KeyRotorConfig::global()
                .generator()
                .map_err(|e| e.to_string())
        })
        .clone()
        .map_err(KeyRotorError::Configuration)
}

/// Simple image generation: prompt → images.
pub async fn image(prompt: impl Into<String>) -> Result<GeneratedImages> {
    shared_generator()?
        .generate_image(&ImageRequest::builder().prompt(prompt).build())
        .await
}

/// Simple video generation: prompt → video.
pub async fn video(prompt: impl Into<String>) -> Result<GeneratedVideo> {
    shared_generator()?
        .generate_video(&VideoRequest::builder().prompt(prompt).build())
        .await
}

/// Simple text generation: prompt → text.
pub async fn text(prompt: impl Into<String>) -> Result<String> {
    shared_generator()?
        .generate_text(&TextRequest::builder().prompt(prompt).build())
        .await
}

/// Prompt enhancement: short idea → detailed prompt.
pub async fn enhance(prompt: &str) -> Result<String> {
    shared_generator()?.enhance_prompt(prompt).await
}
