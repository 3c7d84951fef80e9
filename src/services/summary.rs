//! Analysis summary aggregation.
//!
//! Built once after every unit has been processed, as a reduce over the
//! per-unit results.

use std::collections::BTreeMap;

use crate::domain::models::{AnalysisSummary, RuleDefinition, Severity, UnitAnalysis};

/// Aggregate per-unit results into counters and rule classifications.
///
/// A rule that produced learnings is classified by its effective severity.
/// A rule with errors and no learnings is errored; any other checked rule
/// passed.
pub fn build_summary(
    rules: &BTreeMap<String, RuleDefinition>,
    results: &[UnitAnalysis],
) -> AnalysisSummary {
    let mut summary = AnalysisSummary {
        total_units: results.len(),
        ..AnalysisSummary::default()
    };

    for unit in results {
        if unit.has_drift() {
            summary.units_with_drift += 1;
        } else {
            summary.units_without_drift += 1;
        }

        for learning in &unit.learnings {
            summary.total_learnings += 1;
            *summary.by_rule.entry(learning.rule_type.clone()).or_default() += 1;
            if let Some(tool) = learning.agent_tool().or(unit.agent_tool.as_deref()) {
                *summary.by_agent_tool.entry(tool.to_string()).or_default() += 1;
            }
        }
    }

    for (name, rule) in rules {
        summary.rules_checked.push(name.clone());

        let has_findings = summary.by_rule.get(name).is_some_and(|count| *count > 0);
        let has_errors = results.iter().any(|unit| unit.rule_errors.contains_key(name));

        let bucket = if has_findings {
            match rule.effective_severity() {
                Severity::Pass => &mut summary.rules_passed,
                Severity::Warning => &mut summary.rules_warned,
                Severity::Fail => &mut summary.rules_failed,
            }
        } else if has_errors {
            &mut summary.rules_errored
        } else {
            &mut summary.rules_passed
        };
        bucket.push(name.clone());
    }

    summary
}
