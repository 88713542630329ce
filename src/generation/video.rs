//! Long-running video generation.

use std::time::Duration;

use tracing::{debug, info};

use crate::error::Result;
use crate::provider::{GeminiClient, Operation, ProviderError};
use crate::types::{GeneratedVideo, VideoRequest};

use super::{require_prompt, Generator};

impl Generator {
    /// Submit a video job, poll it to completion, and download the result.
    ///
    /// Submission, polling, and download run inside one attempt so every
    /// request uses the key that created the job.
    pub async fn generate_video(&self, request: &VideoRequest) -> Result<GeneratedVideo> {
        require_prompt(&request.prompt)?;
        let options = self.run_options(request.job_id.as_deref());
        let model = self.models.video.as_str();
        let poll_interval = self.poll_interval;
        let body = video_body(request);
        let body = &body;

        let (bytes, source_uri) = self
            .orchestrator
            .run(&options, move |lease| async move {
                let operation = lease.client.start_long_running(model, body).await?;
                info!(operation = %operation.name, key = %lease.key, "Video job submitted");
                let uri = wait_for_video(&lease.client, operation, poll_interval).await?;
                let bytes = lease.client.download(&uri).await?;
                Ok((bytes, uri))
            })
            .await?;

        Ok(GeneratedVideo {
            bytes,
            mime_type: "video/mp4".to_string(),
            model: model.to_string(),
            source_uri,
            created_at: chrono::Utc::now(),
        })
    }
}

async fn wait_for_video(
    client: &GeminiClient,
    mut operation: Operation,
    poll_interval: Duration,
) -> std::result::Result<String, ProviderError> {
    let mut polls: u32 = 0;
    while !operation.done {
        tokio::time::sleep(poll_interval).await;
        polls += 1;
        operation = client.get_operation(&operation.name).await?;
        debug!(operation = %operation.name, polls, done = operation.done, "Polled video job");
    }

    if let Some(error) = operation.error {
        return Err(ProviderError::Envelope {
            code: error.code,
            message: error.message,
        });
    }

    operation
        .video_uri()
        .map(str::to_string)
        .ok_or_else(|| ProviderError::InvalidResponse("No video in finished operation".into()))
}

fn video_body(request: &VideoRequest) -> serde_json::Value {
    let mut instance = serde_json::json!({ "prompt": request.prompt });
    if let Some(image) = &request.image {
        instance["image"] = serde_json::json!({
            "bytesBase64Encoded": image.data,
            "mimeType": image.mime_type,
        });
    }

    let mut parameters = serde_json::json!({ "aspectRatio": request.aspect_ratio.to_string() });
    if let Some(negative) = request.negative_prompt.as_deref().filter(|n| !n.is_empty()) {
        parameters["negativePrompt"] = serde_json::json!(negative);
    }

    serde_json::json!({ "instances": [instance], "parameters": parameters })
}
