//! Resource loader port - per-agent-tool access to project resources.

use std::path::Path;

use async_trait::async_trait;

use crate::domain::errors::DriftResult;
use crate::domain::models::ResourceResponse;

/// Loads auxiliary project resources (commands, skills, agents, config)
/// for one agent tool.
///
/// A missing resource is a normal `Ok` response with `found == false`;
/// `Err` is reserved for infrastructure failures such as unreadable files.
#[async_trait]
pub trait ResourceLoader: Send + Sync {
    /// Agent tool this loader understands (e.g. "claude-code").
    fn agent_tool(&self) -> &str;

    async fn get_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
        project_path: &Path,
    ) -> DriftResult<ResourceResponse>;
}
