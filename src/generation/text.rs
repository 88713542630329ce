//! Text generation and prompt enhancement.

use crate::error::Result;
use crate::provider::ProviderError;
use crate::types::{InlineImage, TextRequest};

use super::{require_prompt, Generator};

const ENHANCE_INSTRUCTION: &str = "You rewrite prompts for an image generation model. \
Expand the user's idea with concrete detail about subject, composition, lighting, \
materials and style. Keep the original intent. Reply with the rewritten prompt only.";

impl Generator {
    /// Generate text, optionally grounded on attached images.
    pub async fn generate_text(&self, request: &TextRequest) -> Result<String> {
        require_prompt(&request.prompt)?;
        let options = self.run_options(request.job_id.as_deref());
        let model = self.models.text.as_str();
        let body = text_body(request);
        let body = &body;

        self.orchestrator
            .run(&options, move |lease| async move {
                let content = lease.client.generate_content(model, body).await?;
                if content.text.trim().is_empty() {
                    return Err(ProviderError::InvalidResponse(format!(
                        "Empty text response (finish reason: {})",
                        content.finish_reason.as_deref().unwrap_or("unknown")
                    )));
                }
                Ok(content.text)
            })
            .await
    }

    /// Rewrite a short prompt into a detailed one.
    pub async fn enhance_prompt(&self, prompt: &str) -> Result<String> {
        let request = TextRequest::builder()
            .prompt(prompt)
            .system(ENHANCE_INSTRUCTION)
            .build();
        Ok(self.generate_text(&request).await?.trim().to_string())
    }
}

fn text_body(request: &TextRequest) -> serde_json::Value {
    let mut parts: Vec<serde_json::Value> =
        request.images.iter().map(InlineImage::to_part).collect();
    parts.push(serde_json::json!({ "text": request.prompt }));

    let mut body = serde_json::json!({
        "contents": [{ "role": "user", "parts": parts }],
    });
    if let Some(system) = &request.system {
        body["systemInstruction"] = serde_json::json!({ "parts": [{ "text": system }] });
    }
    if let Some(temperature) = request.temperature {
        body["generationConfig"] = serde_json::json!({ "temperature": temperature });
    }
    body
}
