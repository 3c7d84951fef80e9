//! Anthropic Messages API provider.
//!
//! Sends each prompt as a single non-streaming user message and maps HTTP
//! failures onto [`ProviderError`] so the session can tell outages apart
//! from per-unit problems.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::domain::errors::{DriftError, DriftResult, ProviderError};
use crate::domain::models::{AnthropicConfig, ModelConfig};
use crate::domain::ports::ModelProvider;

const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Message role in Anthropic API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Human turn.
    User,
    /// Model turn.
    Assistant,
}

/// Content block in a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    /// Plain text.
    #[serde(rename = "text")]
    Text {
        /// Block text.
        text: String,
    },
    /// Any block type this client does not read.
    #[serde(other)]
    Unsupported,
}

/// One message of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Author of the message.
    pub role: MessageRole,
    /// Message body.
    pub content: Vec<ContentBlock>,
}

/// Request to the Anthropic Messages API.
#[derive(Debug, Serialize)]
pub struct MessagesRequest {
    /// Provider-side model id.
    pub model: String,
    /// Completion token limit.
    pub max_tokens: u32,
    /// Conversation so far.
    pub messages: Vec<Message>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Token accounting for one call.
#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    /// Prompt tokens.
    pub input_tokens: u64,
    /// Completion tokens.
    pub output_tokens: u64,
}

/// Response from the Anthropic Messages API.
#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    /// Message id.
    pub id: String,
    /// Returned content blocks.
    pub content: Vec<ContentBlock>,
    /// Why generation stopped.
    pub stop_reason: Option<String>,
    /// Token usage.
    pub usage: Usage,
}

/// Map a non-success HTTP status to a provider error.
pub fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let detail = format!("{status}: {body}");
    match status.as_u16() {
        429 => ProviderError::RateLimited(detail),
        401 | 403 => ProviderError::Authentication(detail),
        400 => ProviderError::Validation(detail),
        503 | 529 => ProviderError::Unavailable(detail),
        500..=599 => ProviderError::ServiceException(detail),
        _ => ProviderError::Other(format!("API error {detail}")),
    }
}

/// Provider backed by the Anthropic Messages API for one configured model.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    config: AnthropicConfig,
    model: ModelConfig,
    client: Client,
}

impl AnthropicProvider {
    /// Build a provider for `model` with its own HTTP client.
    pub fn new(config: AnthropicConfig, model: ModelConfig) -> DriftResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DriftError::configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            model,
            client,
        })
    }

    /// API key from config, falling back to `ANTHROPIC_API_KEY`.
    pub fn api_key(&self) -> Option<String> {
        self.config
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }

    fn build_request(&self, prompt: &str) -> MessagesRequest {
        MessagesRequest {
            model: self.model.model_id.clone(),
            max_tokens: self.model.max_tokens,
            messages: vec![Message {
                role: MessageRole::User,
                content: vec![ContentBlock::Text {
                    text: prompt.to_string(),
                }],
            }],
            temperature: self.model.temperature,
        }
    }

    fn transport_error(&self, error: &reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            ProviderError::Timeout(self.config.timeout_secs)
        } else if error.is_connect() {
            ProviderError::Unavailable(format!("provider unavailable: {error}"))
        } else {
            ProviderError::Other(format!("API request failed: {error}"))
        }
    }
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    fn provider_id(&self) -> &str {
        "anthropic"
    }

    async fn is_available(&self) -> bool {
        self.api_key().is_some()
    }

    #[instrument(skip(self, prompt), fields(model = %self.model.model_id, prompt_length = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let api_key = self
            .api_key()
            .ok_or_else(|| ProviderError::Authentication(format!("{API_KEY_ENV} not set")))?;

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url.trim_end_matches('/')))
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", &api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Anthropic API returned an error");
            return Err(classify_status(status, &body));
        }

        let result: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Other(format!("Failed to parse response: {e}")))?;

        debug!(
            id = %result.id,
            input_tokens = result.usage.input_tokens,
            output_tokens = result.usage.output_tokens,
            stop_reason = ?result.stop_reason,
            "completion received"
        );

        let text = result
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Unsupported => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ProviderKind;
    use mockito::Server;

    fn model() -> ModelConfig {
        ModelConfig {
            provider: ProviderKind::Anthropic,
            model_id: "claude-sonnet-4-5".to_string(),
            max_tokens: 1024,
            temperature: Some(0.0),
        }
    }

    fn provider(base_url: String) -> AnthropicProvider {
        let config = AnthropicConfig {
            api_key: Some("test-api-key".to_string()),
            base_url,
            ..AnthropicConfig::default()
        };
        AnthropicProvider::new(config, model()).unwrap()
    }

    #[test]
    fn test_build_request() {
        let provider = provider("http://localhost".to_string());
        let request = provider.build_request("Hello!");

        assert_eq!(request.model, "claude-sonnet-4-5");
        assert_eq!(request.max_tokens, 1024);
        assert_eq!(request.messages.len(), 1);
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ProviderError::RateLimited(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, ""),
            ProviderError::Authentication(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, ""),
            ProviderError::Validation(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, ""),
            ProviderError::Unavailable(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, ""),
            ProviderError::ServiceException(_)
        ));
        let not_found = classify_status(StatusCode::NOT_FOUND, "missing");
        assert!(!not_found.is_systemic());
    }

    #[tokio::test]
    async fn test_generate_success_with_mock() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "test-api-key")
            .match_header("anthropic-version", "2023-06-01")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "id": "msg_01",
                    "type": "message",
                    "role": "assistant",
                    "content": [{"type": "text", "text": "[]"}],
                    "model": "claude-sonnet-4-5",
                    "stop_reason": "end_turn",
                    "usage": {"input_tokens": 10, "output_tokens": 1}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let output = provider(server.url()).generate("find drift").await.unwrap();

        assert_eq!(output, "[]");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_is_systemic() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(429)
            .with_body(r#"{"type":"error","error":{"type":"rate_limit_error"}}"#)
            .create_async()
            .await;

        let err = provider(server.url()).generate("find drift").await.unwrap_err();

        assert!(matches!(err, ProviderError::RateLimited(_)));
        assert!(err.is_systemic());
    }

    #[test]
    fn test_api_key_falls_back_to_env() {
        temp_env::with_var(API_KEY_ENV, Some("env-key"), || {
            let provider = AnthropicProvider::new(AnthropicConfig::default(), model()).unwrap();
            assert_eq!(provider.api_key().as_deref(), Some("env-key"));
        });
        temp_env::with_var_unset(API_KEY_ENV, || {
            let provider = AnthropicProvider::new(AnthropicConfig::default(), model()).unwrap();
            assert!(provider.api_key().is_none());
        });
    }

    #[tokio::test]
    async fn test_blank_api_key_is_authentication_error() {
        let config = AnthropicConfig {
            api_key: Some("   ".to_string()),
            ..AnthropicConfig::default()
        };
        let provider = AnthropicProvider::new(config, model()).unwrap();

        assert!(!provider.is_available().await);
        let err = provider.generate("x").await.unwrap_err();
        assert!(matches!(err, ProviderError::Authentication(_)));
    }
}
