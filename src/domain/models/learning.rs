//! Normalized drift findings.

use serde::{Deserialize, Serialize};

/// Where a learning was observed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LearningSource {
    /// Found in a conversation.
    Conversation {
        /// Session the drift happened in.
        session_id: String,
        /// Agent tool of the session.
        agent_tool: String,
        /// Conversation log file.
        file_path: String,
        /// Turn the finding points at.
        #[serde(skip_serializing_if = "Option::is_none")]
        turn_number: Option<u32>,
    },
    /// Found in a document bundle.
    Document {
        /// Bundle the drift was found in.
        bundle_id: String,
        /// Files the finding refers to.
        affected_files: Vec<String>,
    },
}

/// One detected drift instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Learning {
    /// Rule that produced this learning.
    pub rule_type: String,
    /// What actually happened.
    pub observed_behavior: String,
    /// What should have happened.
    pub expected_behavior: String,
    /// Supporting detail.
    #[serde(default)]
    pub context: String,
    /// 1-based phase the learning came from (multi-phase rules only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_phase: Option<usize>,
    /// Number of phases executed (multi-phase rules only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phases_count: Option<usize>,
    /// `type:id` of every resource found during the run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources_consulted: Vec<String>,
    /// Where the drift was observed.
    pub source: LearningSource,
}

impl Learning {
    /// Agent tool for conversation learnings.
    pub fn agent_tool(&self) -> Option<&str> {
        match &self.source {
            LearningSource::Conversation { agent_tool, .. } => Some(agent_tool),
            LearningSource::Document { .. } => None,
        }
    }
}
