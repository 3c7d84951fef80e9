//! Resource loader for Claude Code projects.
//!
//! Resources live at conventional locations under the project root:
//!
//! | type          | path                              |
//! |---------------|-----------------------------------|
//! | `command`     | `.claude/commands/<id>.md`        |
//! | `skill`       | `.claude/skills/<id>/SKILL.md`    |
//! | `agent`       | `.claude/agents/<id>.md`          |
//! | `main_config` | `CLAUDE.md`                       |
//! | `settings`    | `.claude/settings.json`           |
//! | `mcp_config`  | `.mcp.json`                       |

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::errors::{DriftError, DriftResult};
use crate::domain::models::{ResourceRequest, ResourceResponse};
use crate::domain::ports::ResourceLoader;

/// Agent tool served by this loader.
pub const AGENT_TOOL: &str = "claude-code";

/// Resource types addressed by id; the others are fixed project files.
const ID_RESOURCE_TYPES: &[&str] = &["command", "skill", "agent"];

/// Loads commands, skills, agents and config files of a Claude Code project.
#[derive(Debug, Clone, Default)]
pub struct ClaudeCodeLoader;

impl ClaudeCodeLoader {
    /// Create a loader for the Claude Code project layout.
    pub fn new() -> Self {
        Self
    }

    /// Path of a resource relative to the project root.
    pub fn resource_path(resource_type: &str, resource_id: &str) -> Option<PathBuf> {
        let claude = Path::new(".claude");
        let path = match resource_type {
            "command" => claude.join("commands").join(format!("{resource_id}.md")),
            "skill" => claude.join("skills").join(resource_id).join("SKILL.md"),
            "agent" => claude.join("agents").join(format!("{resource_id}.md")),
            "main_config" => PathBuf::from("CLAUDE.md"),
            "settings" => claude.join("settings.json"),
            "mcp_config" => PathBuf::from(".mcp.json"),
            _ => return None,
        };
        Some(path)
    }
}

/// Ids are single path components; anything else cannot name a resource.
fn is_plain_id(resource_id: &str) -> bool {
    !resource_id.is_empty()
        && !resource_id.contains(['/', '\\'])
        && resource_id != "."
        && resource_id != ".."
}

#[async_trait]
impl ResourceLoader for ClaudeCodeLoader {
    fn agent_tool(&self) -> &str {
        AGENT_TOOL
    }

    async fn get_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
        project_path: &Path,
    ) -> DriftResult<ResourceResponse> {
        let request = ResourceRequest::new(resource_type, resource_id, "");

        let Some(relative) = Self::resource_path(resource_type, resource_id) else {
            return Ok(ResourceResponse::not_found(
                &request,
                format!("Unknown resource type '{resource_type}'"),
            ));
        };
        if ID_RESOURCE_TYPES.contains(&resource_type) && !is_plain_id(resource_id) {
            return Ok(ResourceResponse::not_found(
                &request,
                format!("Invalid resource id '{resource_id}'"),
            ));
        }

        let path = project_path.join(&relative);
        debug!(path = %path.display(), "loading resource");

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(ResourceResponse::found(
                &request,
                content,
                path.display().to_string(),
            )),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(ResourceResponse::not_found(
                &request,
                format!("{} not found", relative.display()),
            )),
            Err(err) => Err(DriftError::ResourceLoad {
                resource: request.key(),
                reason: format!("{}: {err}", path.display()),
            }),
        }
    }
}
