//! Phase execution records.
//!
//! Resource requests and responses are ephemeral values that live for one
//! orchestrator run. Phase results are appended to a per-rule history that
//! serves as the audit trail for that run.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A resource an LLM phase asked to see.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceRequest {
    /// Resource kind, e.g. `command`.
    pub resource_type: String,
    /// Resource identifier within its kind.
    pub resource_id: String,
    /// Why the model wants it.
    #[serde(default)]
    pub reason: String,
}

impl ResourceRequest {
    /// Create a request.
    pub fn new(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            reason: reason.into(),
        }
    }

    /// `type:id` identifier.
    pub fn key(&self) -> String {
        format!("{}:{}", self.resource_type, self.resource_id)
    }
}

/// Result of fetching a resource.
///
/// Built through [`ResourceResponse::found`] and
/// [`ResourceResponse::not_found`] so that `found` always agrees with the
/// presence of `content`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceResponse {
    /// Requested resource kind.
    pub resource_type: String,
    /// Requested resource identifier.
    pub resource_id: String,
    /// Whether the resource exists.
    pub found: bool,
    /// Resource contents when found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// File the resource was read from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Why the resource was not found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResourceResponse {
    /// Response for an existing resource.
    pub fn found(
        request: &ResourceRequest,
        content: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: request.resource_type.clone(),
            resource_id: request.resource_id.clone(),
            found: true,
            content: Some(content.into()),
            file_path: Some(file_path.into()),
            error: None,
        }
    }

    /// Response for an absent resource.
    pub fn not_found(request: &ResourceRequest, error: impl Into<String>) -> Self {
        Self {
            resource_type: request.resource_type.clone(),
            resource_id: request.resource_id.clone(),
            found: false,
            content: None,
            file_path: None,
            error: Some(error.into()),
        }
    }

    /// `type:id` identifier.
    pub fn key(&self) -> String {
        format!("{}:{}", self.resource_type, self.resource_id)
    }
}

/// Output of executing one phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PhaseResult {
    /// 1-based position of the phase in its rule.
    pub phase_number: usize,
    /// Raw finding mappings, validated at finalization.
    pub findings: Vec<Value>,
    /// Resources asked for by the phase.
    pub resource_requests: Vec<ResourceRequest>,
    /// Whether the phase considers its findings final.
    pub final_determination: bool,
}

impl PhaseResult {
    /// Fail-safe result for output nothing could be extracted from.
    pub fn exhausted(phase_number: usize) -> Self {
        Self {
            phase_number,
            findings: Vec::new(),
            resource_requests: Vec::new(),
            final_determination: true,
        }
    }
}

/// Why a multi-phase run stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The model declared its determination final.
    FinalDetermination,
    /// The phase asked for no further resources.
    NoRequests,
    /// The configured phase count was reached.
    PhaseExhausted,
    /// Every requested resource was missing.
    ResourcesMissing,
}

impl TerminationReason {
    /// Snake-case name as serialized.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FinalDetermination => "final_determination",
            Self::NoRequests => "no_requests",
            Self::PhaseExhausted => "phase_exhausted",
            Self::ResourcesMissing => "resources_missing",
        }
    }
}
