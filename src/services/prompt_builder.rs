//! Prompt assembly for rule phases.
//!
//! Every phase call is stateless from the model's point of view, so each
//! prompt carries the full rule description and the complete unit under
//! analysis. Later phases additionally carry every resource fetched so far
//! and the previous phase's findings.

use std::fmt::Write as _;

use serde_json::Value;

use crate::domain::models::{AnalysisUnit, PhaseDefinition, PhaseKind, ResourceResponse, RuleDefinition};

const MULTI_PHASE_OUTPUT_FORMAT: &str = r#"Respond with a single JSON object and nothing else:
{
  "findings": [
    {"observed_behavior": "...", "expected_behavior": "...", "turn_number": 1, "context": "..."}
  ],
  "resource_requests": [
    {"resource_type": "...", "resource_id": "...", "reason": "..."}
  ],
  "final_determination": false
}
Set "final_determination" to true once no further resources are needed."#;

const SINGLE_PHASE_OUTPUT_FORMAT: &str = r#"Respond with a JSON array and nothing else. Each element:
{"observed_behavior": "...", "expected_behavior": "...", "turn_number": 1, "context": "..."}
Return [] when no drift is present."#;

/// Context accumulated across the phases of one run.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhaseContext<'a> {
    /// Every resource response collected so far, in fetch order.
    pub resources: &'a [ResourceResponse],
    /// Findings of the immediately preceding phase.
    pub previous_findings: &'a [Value],
}

fn write_rule_header(out: &mut String, rule: &RuleDefinition) {
    let _ = writeln!(out, "# Drift Rule: {}\n", rule.name);
    let _ = writeln!(out, "{}\n", rule.description.trim());
    if !rule.context.trim().is_empty() {
        let _ = writeln!(out, "## Context\n{}\n", rule.context.trim());
    }
}

fn write_unit(out: &mut String, unit: AnalysisUnit<'_>) {
    match unit {
        AnalysisUnit::Conversation(conversation) => {
            let _ = writeln!(
                out,
                "## Conversation ({} session {})\n{}",
                conversation.agent_tool,
                conversation.session_id,
                conversation.transcript()
            );
        }
        AnalysisUnit::Bundle(bundle) => {
            let _ = writeln!(
                out,
                "## Documents ({} bundle {})\n{}",
                bundle.bundle_type,
                bundle.bundle_id,
                bundle.formatted_documents()
            );
        }
    }
}

/// Build the prompt for phase `index` (0-based) of a multi-phase rule.
pub fn build_phase_prompt(
    rule: &RuleDefinition,
    phase: &PhaseDefinition,
    index: usize,
    unit: AnalysisUnit<'_>,
    context: PhaseContext<'_>,
) -> String {
    let mut out = String::new();
    write_rule_header(&mut out, rule);

    let _ = writeln!(
        out,
        "## Phase {} of {}: {}",
        index + 1,
        rule.phases.len(),
        phase.name
    );
    if let PhaseKind::Prompt {
        instructions,
        available_resources,
        ..
    } = &phase.kind
    {
        let _ = writeln!(out, "{}\n", instructions.trim());
        if available_resources.is_empty() {
            out.push_str("No project resources may be requested in this phase.\n\n");
        } else {
            let _ = writeln!(
                out,
                "You may request these project resources: {}\n",
                available_resources.join(", ")
            );
        }
    }

    write_unit(&mut out, unit);

    if index > 0 {
        out.push_str("## Loaded Resources\n");
        if context.resources.is_empty() {
            out.push_str("(none)\n");
        }
        for response in context.resources {
            let _ = writeln!(out, "### {}", response.key());
            match (&response.content, &response.error) {
                (Some(content), _) => {
                    let _ = writeln!(out, "{content}\n");
                }
                (None, error) => {
                    let _ = writeln!(out, "NOT FOUND: {}\n", error.as_deref().unwrap_or("unknown"));
                }
            }
        }

        let previous = serde_json::to_string_pretty(context.previous_findings)
            .unwrap_or_else(|_| "[]".to_string());
        let _ = writeln!(out, "## Findings From Previous Phase\n```json\n{previous}\n```\n");
    }

    out.push_str(MULTI_PHASE_OUTPUT_FORMAT);
    out
}

/// Build the prompt for a single-phase rule.
pub fn build_single_phase_prompt(
    rule: &RuleDefinition,
    phase: &PhaseDefinition,
    unit: AnalysisUnit<'_>,
) -> String {
    let mut out = String::new();
    write_rule_header(&mut out, rule);

    if let PhaseKind::Prompt { instructions, .. } = &phase.kind {
        let _ = writeln!(out, "## Instructions\n{}\n", instructions.trim());
    }

    write_unit(&mut out, unit);
    out.push_str(SINGLE_PHASE_OUTPUT_FORMAT);
    out
}
