//! Analysis result records consumed by output formatters.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::learning::Learning;
use super::phase::{PhaseResult, TerminationReason};

/// What kind of units a run analyzed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Conversations were analyzed.
    Conversation,
    /// Document bundles were analyzed.
    Document,
}

/// Outcome of one rule against one unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleExecutionStatus {
    /// Ran without findings.
    Passed,
    /// Produced findings.
    Failed,
    /// Failed without findings.
    Errored,
    /// Not applicable to the unit.
    Skipped,
}

impl RuleExecutionStatus {
    /// Lowercase name as serialized.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Errored => "errored",
            Self::Skipped => "skipped",
        }
    }
}

/// Telemetry for one attempted (rule, unit) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionDetail {
    /// Rule that ran.
    pub rule_name: String,
    /// Unit it ran against.
    pub unit_id: String,
    /// Outcome.
    pub status: RuleExecutionStatus,
    /// Phase history (multi-phase runs only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_results: Option<Vec<PhaseResult>>,
    /// Resources found during the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources_consulted: Option<Vec<String>>,
    /// Why the phase loop stopped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination: Option<TerminationReason>,
    /// Error or warning message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionDetail {
    /// Create a detail with no phase data.
    pub fn new(
        rule_name: impl Into<String>,
        unit_id: impl Into<String>,
        status: RuleExecutionStatus,
    ) -> Self {
        Self {
            rule_name: rule_name.into(),
            unit_id: unit_id.into(),
            status,
            phase_results: None,
            resources_consulted: None,
            termination: None,
            error: None,
        }
    }

    /// Attach an error message.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Run-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisMetadata {
    /// When the run started.
    pub generated_at: DateTime<Utc>,
    /// Unique id of the run.
    pub session_id: Uuid,
    /// Conversation or document run.
    pub mode: AnalysisMode,
    /// Model forced for every prompt phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_override: Option<String>,
    /// Per (rule, unit) telemetry.
    pub execution_details: Vec<ExecutionDetail>,
}

impl AnalysisMetadata {
    /// Stamp a new run.
    pub fn new(mode: AnalysisMode, model_override: Option<String>) -> Self {
        Self {
            generated_at: Utc::now(),
            session_id: Uuid::new_v4(),
            mode,
            model_override,
            execution_details: Vec::new(),
        }
    }
}

/// Aggregate counters and rule classification for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisSummary {
    /// Units analyzed.
    pub total_units: usize,
    /// Units with at least one learning.
    pub units_with_drift: usize,
    /// Units with no learnings.
    pub units_without_drift: usize,
    /// Learnings across all units.
    pub total_learnings: usize,
    /// Learning count per rule.
    pub by_rule: BTreeMap<String, usize>,
    /// Learning count per agent tool.
    pub by_agent_tool: BTreeMap<String, usize>,
    /// Every rule that was selected.
    pub rules_checked: Vec<String>,
    /// Rules with neither findings nor errors.
    pub rules_passed: Vec<String>,
    /// Rules whose findings classify as warnings.
    pub rules_warned: Vec<String>,
    /// Rules whose findings classify as failures.
    pub rules_failed: Vec<String>,
    /// Rules that only produced errors.
    pub rules_errored: Vec<String>,
}

/// Findings for one conversation or document bundle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitAnalysis {
    /// Session id or bundle id.
    pub unit_id: String,
    /// Agent tool of a conversation unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_tool: Option<String>,
    /// Log file or project path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    /// Learnings found in the unit.
    pub learnings: Vec<Learning>,
    /// Error message per rule.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rule_errors: BTreeMap<String, String>,
}

impl UnitAnalysis {
    /// Empty result for a unit.
    pub fn new(unit_id: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            agent_tool: None,
            source_path: None,
            learnings: Vec::new(),
            rule_errors: BTreeMap::new(),
        }
    }

    /// Whether any learning was found.
    pub fn has_drift(&self) -> bool {
        !self.learnings.is_empty()
    }
}

/// Complete output of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    /// Run metadata.
    pub metadata: AnalysisMetadata,
    /// Aggregates.
    pub summary: AnalysisSummary,
    /// Per-unit results.
    pub results: Vec<UnitAnalysis>,
}
