//! Google Gemini API client bound to one API key.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::keys::ApiKey;
use crate::types::{AspectRatio, InlineImage};

use super::http::{error_for_status, shared_client};
use super::ProviderError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// A Gemini client authenticated with exactly one key.
///
/// Built fresh for every orchestrated attempt; never cached across calls.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    key: ApiKey,
    base_url: String,
}

/// Text and inline media returned by `generateContent`.
#[derive(Debug, Clone, Default)]
pub struct ContentOutput {
    pub text: String,
    pub images: Vec<InlineImage>,
    pub finish_reason: Option<String>,
}

/// A long-running operation handle.
#[derive(Debug, Clone, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub error: Option<OperationError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationError {
    pub code: Option<u16>,
    pub message: Option<String>,
}

impl Operation {
    /// URI of the first generated video sample, once the operation is done.
    pub fn video_uri(&self) -> Option<&str> {
        let response = self.response.as_ref()?;
        [
            "/generateVideoResponse/generatedSamples/0/video/uri",
            "/generateVideoResponse/generatedSamples/0/videoUri",
            "/generatedVideos/0/video/uri",
        ]
        .iter()
        .find_map(|path| response.pointer(path).and_then(Value::as_str))
    }
}

impl GeminiClient {
    pub fn new(key: ApiKey, base_url: impl Into<String>) -> Self {
        Self {
            key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, ProviderError> {
        let resp = shared_client()
            .post(url)
            .header(API_KEY_HEADER, self.key.expose())
            .json(body)
            .send()
            .await?;
        let resp = error_for_status(resp).await?;
        Ok(resp.json().await?)
    }

    /// Imagen-style `:predict` image generation.
    pub async fn predict_images(
        &self,
        model: &str,
        prompt: &str,
        aspect_ratio: AspectRatio,
        count: u32,
    ) -> Result<Vec<InlineImage>, ProviderError> {
        let url = format!("{}/models/{}:predict", self.base_url, model);
        let body = serde_json::json!({
            "instances": [{ "prompt": prompt }],
            "parameters": {
                "sampleCount": count.max(1),
                "aspectRatio": aspect_ratio.to_string(),
            },
        });

        debug!(model, key = %self.key, "Gemini predict_images");
        let data: PredictResponse = serde_json::from_value(self.post_json(&url, &body).await?)?;

        let images: Vec<InlineImage> = data
            .predictions
            .into_iter()
            .filter_map(|p| {
                p.bytes_base64_encoded.map(|data| InlineImage {
                    mime_type: p.mime_type.unwrap_or_else(|| "image/png".to_string()),
                    data,
                })
            })
            .collect();

        if images.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "No images in predict response".into(),
            ));
        }
        Ok(images)
    }

    /// `:generateContent` with a caller-built request body.
    pub async fn generate_content(
        &self,
        model: &str,
        body: &Value,
    ) -> Result<ContentOutput, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        debug!(model, key = %self.key, "Gemini generate_content");

        let data: GenerateContentResponse =
            serde_json::from_value(self.post_json(&url, body).await?)?;

        if let Some(feedback) = data.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ProviderError::InvalidResponse(format!(
                "Prompt blocked: {feedback}"
            )));
        }

        let candidate = data.candidates.into_iter().next().ok_or_else(|| {
            ProviderError::InvalidResponse("No candidates in Gemini response".into())
        })?;

        let mut output = ContentOutput {
            finish_reason: candidate.finish_reason,
            ..Default::default()
        };
        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            if let Some(text) = part.text {
                output.text.push_str(&text);
            }
            if let Some(inline) = part.inline_data {
                output.images.push(InlineImage {
                    mime_type: inline.mime_type,
                    data: inline.data,
                });
            }
        }
        Ok(output)
    }

    /// Submit a `:predictLongRunning` job.
    pub async fn start_long_running(
        &self,
        model: &str,
        body: &Value,
    ) -> Result<Operation, ProviderError> {
        let url = format!("{}/models/{}:predictLongRunning", self.base_url, model);
        debug!(model, key = %self.key, "Gemini predict_long_running");
        Ok(serde_json::from_value(self.post_json(&url, body).await?)?)
    }

    /// Fetch the current state of an operation.
    pub async fn get_operation(&self, name: &str) -> Result<Operation, ProviderError> {
        let name = name.trim().trim_start_matches('/');
        let url = if name.starts_with("http://") || name.starts_with("https://") {
            name.to_string()
        } else {
            format!("{}/{}", self.base_url, name)
        };
        let resp = shared_client()
            .get(&url)
            .header(API_KEY_HEADER, self.key.expose())
            .send()
            .await?;
        let resp = error_for_status(resp).await?;
        Ok(resp.json().await?)
    }

    /// Download a generated asset with this client's key.
    ///
    /// Assets are only readable by the key that created the job.
    pub async fn download(&self, uri: &str) -> Result<Vec<u8>, ProviderError> {
        let resp = shared_client()
            .get(uri)
            .header(API_KEY_HEADER, self.key.expose())
            .send()
            .await?;
        let resp = error_for_status(resp).await?;
        Ok(resp.bytes().await?.to_vec())
    }
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}
