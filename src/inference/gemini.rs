//! Gemini `generateContent` client.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::InferenceService;
use crate::config::InferenceConfig;
use crate::error::{Result, SaathiError};

pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(config: &InferenceConfig) -> anyhow::Result<Self> {
        if config.api_key.is_empty() {
            tracing::warn!("inference api_key is empty; requests will likely be rejected");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build inference HTTP client")?;

        let endpoint = format!(
            "{}/models/{}:generateContent?key={}",
            config.api_url.trim_end_matches('/'),
            config.model,
            config.api_key
        );

        tracing::info!(model = %config.model, timeout_secs = config.timeout_secs, "inference client ready");
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl InferenceService for GeminiClient {
    async fn generate(&self, prompt: &str, schema: Option<&Value>) -> Result<String> {
        let payload = build_payload(prompt, schema);

        let response = self.client.post(&self.endpoint).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SaathiError::Classification(format!("API error: {status}")));
        }

        let body: Value = response.json().await?;
        extract_text(&body)
    }
}

/// Request body for a single-turn prompt, optionally constrained to a JSON schema.
pub fn build_payload(prompt: &str, schema: Option<&Value>) -> Value {
    let mut payload = json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
    });
    if let Some(schema) = schema {
        payload["generationConfig"] = json!({
            "responseMimeType": "application/json",
            "responseSchema": schema,
        });
    }
    payload
}

/// Pull `candidates[0].content.parts[0].text` out of a response body.
pub fn extract_text(body: &Value) -> Result<String> {
    body.pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SaathiError::Classification("Invalid API response".into()))
}
