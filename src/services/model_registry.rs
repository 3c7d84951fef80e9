//! Model registry.
//!
//! Maps configured model names to provider instances. Built once at
//! startup and shared read-only for the rest of the run.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::domain::errors::{DriftError, DriftResult};
use crate::domain::ports::ModelProvider;

/// Named model providers plus the default model name.
pub struct ModelRegistry {
    providers: BTreeMap<String, Arc<dyn ModelProvider>>,
    default_model: String,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.providers.keys().collect::<Vec<_>>())
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl ModelRegistry {
    /// Create an empty registry with a default model name.
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            providers: BTreeMap::new(),
            default_model: default_model.into(),
        }
    }

    /// Register (or replace) the provider serving `name`.
    #[must_use]
    pub fn with_model(mut self, name: impl Into<String>, provider: Arc<dyn ModelProvider>) -> Self {
        self.providers.insert(name.into(), provider);
        self
    }

    /// Model used when a phase names none.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Registered model names.
    pub fn model_names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// Look up a model; `None` selects the default model.
    pub fn resolve(&self, name: Option<&str>) -> DriftResult<&Arc<dyn ModelProvider>> {
        let name = name.unwrap_or(&self.default_model);
        self.providers
            .get(name)
            .ok_or_else(|| DriftError::configuration(format!("unknown model '{name}'")))
    }

    /// Check that every named model's provider is reachable.
    ///
    /// Returns the first unavailable model name.
    pub async fn first_unavailable<'a, I>(&self, names: I) -> DriftResult<Option<String>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for name in names {
            let provider = self.resolve(Some(name))?;
            if !provider.is_available().await {
                return Ok(Some(name.to_string()));
            }
            info!(model = name, provider = provider.provider_id(), "model provider available");
        }
        Ok(None)
    }
}
