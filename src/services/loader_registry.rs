//! Resource loader registry, one loader per agent tool.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::ports::ResourceLoader;

/// Central registry of resource loaders keyed by agent tool.
///
/// Built once at session start and treated as read-only afterwards.
#[derive(Default)]
pub struct LoaderRegistry {
    loaders: BTreeMap<String, Arc<dyn ResourceLoader>>,
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderRegistry")
            .field("agent_tools", &self.loaders.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl LoaderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loader under the agent tool it reports.
    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn ResourceLoader>) -> Self {
        self.loaders.insert(loader.agent_tool().to_string(), loader);
        self
    }

    /// Look up the loader for an agent tool.
    pub fn get(&self, agent_tool: &str) -> Option<&dyn ResourceLoader> {
        self.loaders.get(agent_tool).map(|loader| &**loader)
    }

    /// Registered agent tools.
    pub fn agent_tools(&self) -> Vec<&str> {
        self.loaders.keys().map(String::as_str).collect()
    }
}
