use crate::error::{Result, VisionError};
use crate::models::{ChatMessage, ChatRequest, ChatResponse};
use crate::{parse, prompt, AnalysisReport, TriageReport, VisionProvider};
use async_trait::async_trait;
use base64::Engine;
use nestwatch_common::types::Scenario;
use reqwest::Client;

/// Vision provider speaking the OpenAI-compatible chat API.
///
/// Covers both the local model gateway (llama.cpp / ollama, no API key)
/// and the hosted cloud endpoints; the fallback chain only cares about
/// the [`VisionProvider`] contract.
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    name: String,
    api_key: Option<String>,
    model: String,
    base_url: String,
    client: Client,
    max_tokens: Option<usize>,
    temperature: Option<f32>,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: &str,
        api_key: Option<String>,
        model: String,
        base_url: String,
        timeout_secs: Option<u64>,
        max_tokens: Option<usize>,
        temperature: Option<f32>,
    ) -> anyhow::Result<Self> {
        let timeout = timeout_secs.unwrap_or(30);
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout))
            .build()?;

        Ok(Self {
            name: name.to_string(),
            api_key,
            model,
            base_url,
            client,
            max_tokens,
            temperature,
        })
    }

    async fn call_api(&self, frame: &[u8], prompt: &str) -> Result<String> {
        let image_url = format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(frame)
        );

        let req = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: serde_json::json!([
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": image_url } },
                ]),
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        tracing::debug!(
            provider = %self.name,
            model = %self.model,
            frame_bytes = frame.len(),
            "Calling vision API"
        );

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let resp = builder
            .json(&req)
            .send()
            .await
            .map_err(|e| VisionError::unavailable(&self.name, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(
                provider = %self.name,
                status = %status,
                body = %body,
                "Vision API request failed"
            );
            return Err(VisionError::unavailable(
                &self.name,
                format!("HTTP {status}: {body}"),
            ));
        }

        let chat_resp: ChatResponse = resp
            .json()
            .await
            .map_err(|e| VisionError::unavailable(&self.name, e))?;

        chat_resp
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| VisionError::InvalidResponse {
                provider: self.name.clone(),
                reason: "empty choices array".to_string(),
            })
    }
}

#[async_trait]
impl VisionProvider for OpenAiCompatProvider {
    fn provider(&self) -> &str {
        &self.name
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn triage(&self, frame: &[u8], scenario: Scenario) -> Result<TriageReport> {
        let prompt = prompt::build_triage_prompt(scenario);
        let content = self.call_api(frame, &prompt).await?;
        parse::parse_triage(&self.name, &content)
    }

    async fn analyze(&self, frame: &[u8], scenario: Scenario) -> Result<AnalysisReport> {
        let prompt = prompt::build_analysis_prompt(scenario);
        let content = self.call_api(frame, &prompt).await?;
        parse::parse_analysis(&self.name, &content)
    }
}
