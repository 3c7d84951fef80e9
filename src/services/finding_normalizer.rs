//! Conversion of raw finding mappings into [`Learning`] records.

use serde_json::Value;

use crate::domain::models::{AnalysisUnit, Learning, LearningSource, RuleDefinition};

/// Run-level facts stamped onto every learning of one rule run.
#[derive(Debug, Clone, Default)]
pub struct Provenance {
    /// Phase the findings came from.
    pub source_phase: Option<usize>,
    /// Phases executed.
    pub phases_count: Option<usize>,
    /// Resources found during the run.
    pub resources_consulted: Vec<String>,
}

/// Normalized learnings plus the number of malformed findings dropped.
#[derive(Debug, Default)]
pub struct Normalized {
    /// Well-formed learnings.
    pub learnings: Vec<Learning>,
    /// Malformed findings skipped.
    pub dropped: usize,
}

impl Normalized {
    /// Single aggregated message describing dropped findings, if any.
    pub fn drop_message(&self) -> Option<String> {
        (self.dropped > 0).then(|| {
            format!(
                "Dropped {} malformed finding(s) missing observed or expected behavior",
                self.dropped
            )
        })
    }
}

fn text_field(finding: &Value, key: &str) -> Option<String> {
    finding
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn affected_files(finding: &Value, fallback: impl FnOnce() -> Vec<String>) -> Vec<String> {
    if let Some(paths) = finding.get("file_paths").and_then(Value::as_array) {
        let paths: Vec<String> = paths
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        if !paths.is_empty() {
            return paths;
        }
    }
    match finding.get("file_path").and_then(Value::as_str) {
        Some(path) if !path.is_empty() => vec![path.to_string()],
        _ => fallback(),
    }
}

fn source_for(finding: &Value, unit: AnalysisUnit<'_>) -> LearningSource {
    match unit {
        AnalysisUnit::Conversation(conversation) => LearningSource::Conversation {
            session_id: conversation.session_id.clone(),
            agent_tool: conversation.agent_tool.clone(),
            file_path: conversation.file_path.clone(),
            turn_number: finding
                .get("turn_number")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok()),
        },
        AnalysisUnit::Bundle(bundle) => LearningSource::Document {
            bundle_id: bundle.bundle_id.clone(),
            affected_files: affected_files(finding, || bundle.file_paths()),
        },
    }
}

/// Convert one raw finding, or `None` when it is malformed.
///
/// A finding is malformed when it is not an object or when its observed or
/// expected behavior is missing or blank.
pub fn to_learning(
    finding: &Value,
    rule: &RuleDefinition,
    unit: AnalysisUnit<'_>,
    provenance: &Provenance,
) -> Option<Learning> {
    let observed_behavior = text_field(finding, "observed_behavior")?;
    let expected_behavior = text_field(finding, "expected_behavior")?;

    Some(Learning {
        rule_type: rule.name.clone(),
        observed_behavior,
        expected_behavior,
        context: text_field(finding, "context").unwrap_or_default(),
        source_phase: provenance.source_phase,
        phases_count: provenance.phases_count,
        resources_consulted: provenance.resources_consulted.clone(),
        source: source_for(finding, unit),
    })
}

/// Normalize a batch of raw findings, counting the ones dropped.
pub fn normalize_findings(
    findings: &[Value],
    rule: &RuleDefinition,
    unit: AnalysisUnit<'_>,
    provenance: &Provenance,
) -> Normalized {
    let mut normalized = Normalized::default();
    for finding in findings {
        match to_learning(finding, rule, unit, provenance) {
            Some(learning) => normalized.learnings.push(learning),
            None => normalized.dropped += 1,
        }
    }
    normalized
}
