//! Generation backend
//!
//! The backend turns a prompt into free text carrying a description and a
//! JSON blueprint. [`HttpGenerationBackend`] talks to a chat service over
//! HTTP; tests substitute their own [`GenerationBackend`].

use crate::config::GenerationConfig;
use crate::error::GenerationError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Provider value meaning "let the backend choose"
pub const NO_PROVIDER: &str = "None";

/// Text generation service
#[async_trait::async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a response for `prompt` using `model`
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    message: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider_name: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Chat backend reached at `<backend_url>/chat`
#[derive(Debug, Clone)]
pub struct HttpGenerationBackend {
    client: Client,
    chat_url: String,
    provider: Option<String>,
    timeout_secs: u64,
}

impl HttpGenerationBackend {
    /// Create from configuration
    ///
    /// # Errors
    /// [`GenerationError::Unreachable`] if the HTTP client cannot be built.
    pub fn new(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let provider = (config.provider != NO_PROVIDER && !config.provider.is_empty())
            .then(|| config.provider.clone());

        Ok(Self {
            client,
            chat_url: format!("{}/chat", config.backend_url.trim_end_matches('/')),
            provider,
            timeout_secs: config.request_timeout_secs,
        })
    }

    /// Endpoint requests are posted to
    #[inline]
    #[must_use]
    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }
}

#[async_trait::async_trait]
impl GenerationBackend for HttpGenerationBackend {
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model,
            message: prompt.trim(),
            stream: false,
            provider_name: self.provider.as_deref(),
        };

        tracing::info!(url = %self.chat_url, model, provider = ?self.provider, "sending generation request");

        let response = self
            .client
            .post(&self.chat_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout { secs: self.timeout_secs }
                } else {
                    GenerationError::from(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.detail)
                .unwrap_or_else(|| {
                    if body.is_empty() {
                        status.canonical_reason().unwrap_or("unknown error").to_string()
                    } else {
                        body
                    }
                });
            tracing::error!(status = status.as_u16(), %detail, "generation backend error");
            return Err(GenerationError::Backend {
                status: status.as_u16(),
                detail,
            });
        }

        let body: ChatResponse = response.json().await?;
        let text = body
            .response
            .ok_or_else(|| GenerationError::InvalidResponse("missing 'response' field".to_string()))?;

        tracing::debug!(len = text.len(), "generation response received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_none_is_omitted() {
        let config = GenerationConfig {
            provider: NO_PROVIDER.to_string(),
            backend_url: "http://localhost:9002/".to_string(),
            ..GenerationConfig::default()
        };
        let backend = HttpGenerationBackend::new(&config).unwrap();
        assert!(backend.provider.is_none());
        assert_eq!(backend.chat_url(), "http://localhost:9002/chat");
    }

    #[test]
    fn request_body_shape() {
        let request = ChatRequest {
            model: "gemini-2.0-flash",
            message: "hi",
            stream: false,
            provider_name: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({ "model": "gemini-2.0-flash", "message": "hi", "stream": false }));
    }
}
