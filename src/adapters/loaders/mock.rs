//! In-memory resource loader for testing.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::domain::errors::DriftResult;
use crate::domain::models::{ResourceRequest, ResourceResponse};
use crate::domain::ports::ResourceLoader;

/// Loader serving resources from a map and recording every lookup.
#[derive(Debug)]
pub struct InMemoryLoader {
    agent_tool: String,
    resources: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl InMemoryLoader {
    /// Create an empty loader registered under `agent_tool`.
    pub fn new(agent_tool: impl Into<String>) -> Self {
        Self {
            agent_tool: agent_tool.into(),
            resources: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Make `type:id` resolvable with `content`.
    #[must_use]
    pub fn with_resource(
        mut self,
        resource_type: &str,
        resource_id: &str,
        content: impl Into<String>,
    ) -> Self {
        self.resources
            .insert(format!("{resource_type}:{resource_id}"), content.into());
        self
    }

    /// `type:id` of every lookup, in call order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of lookups so far.
    pub fn call_count(&self) -> usize {
        self.requests().len()
    }
}

#[async_trait]
impl ResourceLoader for InMemoryLoader {
    fn agent_tool(&self) -> &str {
        &self.agent_tool
    }

    async fn get_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
        project_path: &Path,
    ) -> DriftResult<ResourceResponse> {
        let request = ResourceRequest::new(resource_type, resource_id, "");
        let key = request.key();
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(key.clone());

        Ok(match self.resources.get(&key) {
            Some(content) => ResourceResponse::found(
                &request,
                content.clone(),
                project_path.join(&key).display().to_string(),
            ),
            None => ResourceResponse::not_found(&request, format!("{key} is not defined")),
        })
    }
}
