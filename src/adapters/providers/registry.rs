//! Model provider factory.

use std::sync::Arc;

use tracing::debug;

use crate::domain::errors::DriftResult;
use crate::domain::models::{Config, ProviderKind};
use crate::domain::ports::ModelProvider;
use crate::services::ModelRegistry;

use super::anthropic_api::AnthropicProvider;

/// Build a registry with one provider per configured model.
pub fn build_model_registry(config: &Config) -> DriftResult<ModelRegistry> {
    let mut registry = ModelRegistry::new(&config.default_model);

    for (name, model) in &config.models {
        let provider: Arc<dyn ModelProvider> = match model.provider {
            ProviderKind::Anthropic => {
                Arc::new(AnthropicProvider::new(config.anthropic.clone(), model.clone())?)
            }
        };
        debug!(model = %name, model_id = %model.model_id, "registered model");
        registry = registry.with_model(name, provider);
    }

    Ok(registry)
}
