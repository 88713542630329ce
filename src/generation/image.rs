//! Image generation with billing fallback, and image editing.

use tracing::info;

use crate::error::Result;
use crate::models::ImageModel;
use crate::provider::{GeminiClient, ProviderError};
use crate::types::{AspectRatio, EditRequest, GeneratedImages, ImageRequest, InlineImage};

use super::{require_prompt, Generator};

impl Generator {
    /// Generate images with the primary model.
    ///
    /// A billing restriction on the primary model triggers exactly one
    /// orchestrated run against the fallback model. Every other failure is
    /// returned unchanged.
    pub async fn generate_image(&self, request: &ImageRequest) -> Result<GeneratedImages> {
        require_prompt(&request.prompt)?;
        let options = self.run_options(request.job_id.as_deref());
        let model = &self.models.image;
        let prompt = request.prompt.as_str();
        let aspect_ratio = request.aspect_ratio;
        let count = request.count;

        let primary = self
            .orchestrator
            .run(&options, move |lease| async move {
                render(&lease.client, model, prompt, aspect_ratio, count).await
            })
            .await;

        match primary {
            Ok(output) => Ok(output.into_generated(model, false)),
            Err(e) if e.is_billing() => {
                info!(
                    primary = %model,
                    fallback = %self.models.fallback_image,
                    "Primary image model is billing-restricted, using fallback"
                );
                self.generate_image_fallback(request).await
            }
            Err(e) => Err(e),
        }
    }

    /// Generate one image with the fallback model.
    pub async fn generate_image_fallback(&self, request: &ImageRequest) -> Result<GeneratedImages> {
        require_prompt(&request.prompt)?;
        let options = self.run_options(request.job_id.as_deref());
        let model = &self.models.fallback_image;
        let prompt = request.prompt.as_str();
        let aspect_ratio = request.aspect_ratio;

        let output = self
            .orchestrator
            .run(&options, move |lease| async move {
                render(&lease.client, model, prompt, aspect_ratio, 1).await
            })
            .await?;
        Ok(output.into_generated(model, true))
    }

    /// Edit or compose images from 0..N references and an optional mask.
    pub async fn edit_image(&self, request: &EditRequest) -> Result<GeneratedImages> {
        require_prompt(&request.prompt)?;
        let options = self.run_options(request.job_id.as_deref());
        let model = &self.models.edit;
        let body = edit_body(request);
        let body = &body;

        let output = self
            .orchestrator
            .run(&options, move |lease| async move {
                let content = lease.client.generate_content(model.as_str(), body).await?;
                if content.images.is_empty() {
                    return Err(ProviderError::InvalidResponse(no_image_message(&content.text)));
                }
                Ok(RenderOutput {
                    images: content.images,
                    text: Some(content.text).filter(|t| !t.is_empty()),
                })
            })
            .await?;
        Ok(output.into_generated(model, false))
    }
}

struct RenderOutput {
    images: Vec<InlineImage>,
    text: Option<String>,
}

impl RenderOutput {
    fn into_generated(self, model: &ImageModel, fell_back: bool) -> GeneratedImages {
        GeneratedImages {
            images: self.images,
            model: model.to_string(),
            fell_back,
            text: self.text,
            created_at: chrono::Utc::now(),
        }
    }
}

/// One text-to-image call against whichever endpoint the model uses.
async fn render(
    client: &GeminiClient,
    model: &ImageModel,
    prompt: &str,
    aspect_ratio: AspectRatio,
    count: u32,
) -> std::result::Result<RenderOutput, ProviderError> {
    if model.uses_predict() {
        let images = client
            .predict_images(model.as_str(), prompt, aspect_ratio, count)
            .await?;
        return Ok(RenderOutput { images, text: None });
    }

    let body = serde_json::json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseModalities": ["IMAGE"],
            "imageConfig": { "aspectRatio": aspect_ratio.to_string() },
        },
    });
    let content = client.generate_content(model.as_str(), &body).await?;
    if content.images.is_empty() {
        return Err(ProviderError::InvalidResponse(no_image_message(&content.text)));
    }
    Ok(RenderOutput {
        images: content.images,
        text: Some(content.text).filter(|t| !t.is_empty()),
    })
}

fn edit_body(request: &EditRequest) -> serde_json::Value {
    let mut parts: Vec<serde_json::Value> =
        request.references.iter().map(InlineImage::to_part).collect();
    if let Some(mask) = &request.mask {
        parts.push(serde_json::json!({
            "text": "The next image is a mask. Only change the white region."
        }));
        parts.push(mask.to_part());
    }
    parts.push(serde_json::json!({ "text": request.prompt }));

    let mut generation_config = serde_json::json!({ "responseModalities": ["IMAGE", "TEXT"] });
    if let Some(aspect_ratio) = request.aspect_ratio {
        generation_config["imageConfig"] =
            serde_json::json!({ "aspectRatio": aspect_ratio.to_string() });
    }

    serde_json::json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": generation_config,
    })
}

fn no_image_message(text: &str) -> String {
    if text.is_empty() {
        "No image in model response".to_string()
    } else {
        format!("No image in model response: {text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_body_orders_references_mask_then_prompt() {
        let request = EditRequest::builder()
            .prompt("swap the sofa for a green velvet one")
            .references(vec![
                InlineImage::from_bytes("image/png", b"room"),
                InlineImage::from_bytes("image/png", b"sofa"),
            ])
            .mask(InlineImage::from_bytes("image/png", b"mask"))
            .aspect_ratio(AspectRatio::Landscape)
            .build();

        let body = edit_body(&request);
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 5);
        assert!(parts[0]["inlineData"].is_object());
        assert!(parts[1]["inlineData"].is_object());
        assert!(parts[2]["text"].is_string());
        assert_eq!(parts[3]["inlineData"]["data"], InlineImage::from_bytes("image/png", b"mask").data);
        assert_eq!(parts[4]["text"], "swap the sofa for a green velvet one");
        assert_eq!(body["generationConfig"]["imageConfig"]["aspectRatio"], "16:9");
    }

    #[test]
    fn edit_body_without_images_is_prompt_only() {
        let request = EditRequest::builder().prompt("add plants").build();
        let body = edit_body(&request);
        assert_eq!(body["contents"][0]["parts"].as_array().unwrap().len(), 1);
        assert!(body["generationConfig"].get("imageConfig").is_none());
    }
}
