//! Hosted language-model access.
//!
//! Provides the [`InferenceService`] trait and a Gemini implementation. The
//! service is created via [`create_service`] from configuration. Output is
//! untrusted: callers parse and validate everything they get back.

pub mod gemini;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Result, SaathiError};

/// One request/response generation call.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Generate text for `prompt`. When `schema` is given the service is asked
    /// for JSON matching it, but the reply may still be anything.
    async fn generate(&self, prompt: &str, schema: Option<&serde_json::Value>) -> Result<String>;
}

/// Create an inference service from config.
///
/// Currently only `"gemini"` is supported. Failures are
/// [`SaathiError::Configuration`].
pub fn create_service(config: &crate::config::InferenceConfig) -> Result<Arc<dyn InferenceService>> {
    match config.provider.as_str() {
        "gemini" => {
            let client = gemini::GeminiClient::new(config).map_err(SaathiError::configuration)?;
            Ok(Arc::new(client))
        }
        other => Err(SaathiError::Configuration(format!(
            "unknown inference provider: {other}. Supported: gemini"
        ))),
    }
}
