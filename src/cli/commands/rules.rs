//! `driftwatch rules`

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{list_table, output, render_list, truncate, CommandOutput};
use crate::domain::models::{Config, RuleDefinition, Severity};

/// One configured rule.
#[derive(Debug, Serialize)]
pub struct RuleOutput {
    /// Rule name.
    pub name: String,
    /// Override group, defaulted when unset.
    pub group: String,
    /// Rule scope.
    pub scope: String,
    /// Effective severity.
    pub severity: Severity,
    /// Phase names in order.
    pub phases: Vec<String>,
    /// Rule description.
    pub description: String,
    /// Agent tools the rule is limited to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_clients: Option<Vec<String>>,
}

impl RuleOutput {
    fn new(rule: &RuleDefinition, default_group: &str) -> Self {
        Self {
            name: rule.name.clone(),
            group: rule.group.clone().unwrap_or_else(|| default_group.to_string()),
            scope: rule.scope.as_str().to_string(),
            severity: rule.effective_severity(),
            phases: rule.phases.iter().map(|p| p.name.clone()).collect(),
            description: rule.description.clone(),
            supported_clients: rule.supported_clients.clone(),
        }
    }
}

/// Every configured rule.
#[derive(Debug, Serialize)]
pub struct RuleListOutput {
    /// Rules in name order.
    pub rules: Vec<RuleOutput>,
    /// Number of rules.
    pub total: usize,
}

impl RuleListOutput {
    /// Collect the rules of `config`.
    pub fn from_config(config: &Config) -> Self {
        let rules: Vec<RuleOutput> = config
            .rule_definitions
            .values()
            .map(|rule| RuleOutput::new(rule, &config.default_group_name))
            .collect();
        Self {
            total: rules.len(),
            rules,
        }
    }
}

const fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Pass => "pass",
        Severity::Warning => "warning",
        Severity::Fail => "fail",
    }
}

impl CommandOutput for RuleListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["name", "group", "scope", "severity", "phases", "description"]);
        for rule in &self.rules {
            table.add_row(vec![
                rule.name.clone(),
                rule.group.clone(),
                rule.scope.clone(),
                severity_label(rule.severity).to_string(),
                rule.phases.join(" > "),
                truncate(&rule.description, 50),
            ]);
        }
        render_list("rule", &table, self.total)
    }
}

/// Print the configured rules.
pub fn execute(config: &Config, json_mode: bool) -> Result<()> {
    output(&RuleListOutput::from_config(config), json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{PhaseDefinition, RuleScope};

    fn config() -> Config {
        let mut config = Config::default();
        let mut rule = RuleDefinition::new("missed_command", "Agent ignored a command", RuleScope::ConversationLevel)
            .with_phase(PhaseDefinition::prompt("detect", "x"))
            .with_phase(PhaseDefinition::prompt("confirm", "y"));
        rule.group = Some("Quality".into());
        config.rule_definitions.insert(rule.name.clone(), rule);
        config.rule_definitions.insert(
            "readme".into(),
            RuleDefinition::new("readme", "README exists", RuleScope::ProjectLevel).with_phase(
                PhaseDefinition::programmatic("check", "core:file_exists", serde_json::Map::new()),
            ),
        );
        config
    }

    #[test]
    fn test_rule_list_output() {
        let list = RuleListOutput::from_config(&config());
        assert_eq!(list.total, 2);

        let readme = list.rules.iter().find(|r| r.name == "readme").unwrap();
        assert_eq!(readme.group, "General");
        assert_eq!(readme.severity, Severity::Fail);

        let human = list.to_human();
        assert!(human.starts_with("2 rules:"));
        assert!(human.contains("detect > confirm"));
        assert!(human.contains("Quality"));
    }

    #[test]
    fn test_rule_list_json() {
        let json = RuleListOutput::from_config(&config()).to_json();
        assert_eq!(json["total"], 2);
        assert_eq!(json["rules"][0]["name"], "missed_command");
        assert_eq!(json["rules"][0]["severity"], "warning");
    }

    #[test]
    fn test_empty_rules() {
        let list = RuleListOutput::from_config(&Config::default());
        assert_eq!(list.to_human(), "No rules found.");
    }
}
