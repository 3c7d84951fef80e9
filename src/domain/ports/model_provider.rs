//! Model provider port - interface for LLM backends.

use async_trait::async_trait;

use crate::domain::errors::ProviderError;

/// Trait for LLM provider implementations.
///
/// A provider turns a fully built prompt into raw completion text. The text
/// usually contains one JSON object (multi-phase rules) or one JSON array
/// (single-phase rules), possibly wrapped in prose; callers parse it
/// leniently.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Get the provider identifier (e.g. "anthropic", "scripted").
    fn provider_id(&self) -> &str;

    /// Check if the provider is reachable and configured.
    async fn is_available(&self) -> bool;

    /// Generate a completion for the prompt.
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}
