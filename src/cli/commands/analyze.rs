//! `driftwatch analyze`

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Args};
use serde::Serialize;
use tracing::info;

use crate::adapters::loaders::ClaudeCodeLoader;
use crate::adapters::providers::build_model_registry;
use crate::cli::output::{list_table, output, spinner, truncate, CommandOutput};
use crate::cli::EXIT_DRIFT;
use crate::domain::models::{AnalysisResult, AnalysisSummary, Config, RuleDefinition};
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::input::{load_bundles, load_conversations};
use crate::services::{
    AnalysisOrchestrator, LoaderRegistry, MultiPhaseOrchestrator, ParameterMerger, PhaseExecutor,
    ValidatorRegistry,
};

/// Arguments of `driftwatch analyze`.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("input").required(true).args(["conversations", "bundles"])))]
pub struct AnalyzeArgs {
    /// JSON file of conversations to analyze
    #[arg(long)]
    pub conversations: Option<PathBuf>,

    /// JSON file of document bundles to analyze
    #[arg(long)]
    pub bundles: Option<PathBuf>,

    /// Model used for every prompt phase
    #[arg(short, long)]
    pub model: Option<String>,

    /// Only run these rules (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub rules: Vec<String>,

    /// Include per-rule execution details
    #[arg(short, long)]
    pub detailed: bool,
}

/// Restrict configured rules to the requested names.
pub fn select_rules(
    rules: &BTreeMap<String, RuleDefinition>,
    names: &[String],
) -> Result<BTreeMap<String, RuleDefinition>> {
    if names.is_empty() {
        return Ok(rules.clone());
    }

    let unknown: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| !rules.contains_key(*name))
        .collect();
    if !unknown.is_empty() {
        bail!("Unknown rule(s): {}", unknown.join(", "));
    }

    Ok(rules
        .iter()
        .filter(|(name, _)| names.contains(name))
        .map(|(name, rule)| (name.clone(), rule.clone()))
        .collect())
}

/// Wire providers, loaders and validators into a session orchestrator.
pub fn build_orchestrator(config: &Config) -> Result<AnalysisOrchestrator> {
    let validators = ValidatorRegistry::with_builtins();
    ConfigLoader::validate_validator_types(config, &validators.validator_types())?;

    let models = build_model_registry(config).context("Failed to build model registry")?;
    let executor = Arc::new(PhaseExecutor::new(Arc::new(models), Arc::new(validators)));
    let loaders = LoaderRegistry::new().with_loader(Arc::new(ClaudeCodeLoader::new()));
    let merger = ParameterMerger::new(
        config.parameter_overrides.clone(),
        config.default_group_name.clone(),
    );

    let runner = MultiPhaseOrchestrator::new(executor, Arc::new(loaders), Arc::new(merger))
        .with_document_agent_tool(config.document_agent_tool.clone());
    Ok(AnalysisOrchestrator::new(Arc::new(runner)))
}

/// Exit status for a finished run.
pub fn exit_code(summary: &AnalysisSummary) -> ExitCode {
    if summary.rules_failed.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_DRIFT)
    }
}

/// Run an analysis and print the report.
pub async fn execute(
    args: &AnalyzeArgs,
    config: &Config,
    project: &Path,
    json_mode: bool,
) -> Result<ExitCode> {
    if let Some(model) = &args.model {
        if !config.models.contains_key(model) {
            bail!("Unknown model '{model}'");
        }
    }

    let rules = select_rules(&config.rule_definitions, &args.rules)?;
    let orchestrator = build_orchestrator(config)?;
    let model = args.model.as_deref();

    let mut result = if let Some(path) = &args.conversations {
        let conversations = load_conversations(path)?;
        let pb = spinner(
            format!("Analyzing {} conversation(s)", conversations.len()),
            json_mode,
        );
        let result = orchestrator
            .analyze_conversations(&conversations, &rules, model)
            .await;
        pb.finish_and_clear();
        result?
    } else if let Some(path) = &args.bundles {
        let bundles = load_bundles(path)?;
        let pb = spinner(format!("Analyzing {} bundle(s)", bundles.len()), json_mode);
        let result = orchestrator
            .analyze_documents(&bundles, project, &rules, model)
            .await;
        pb.finish_and_clear();
        result?
    } else {
        bail!("Either --conversations or --bundles is required");
    };

    info!(
        session_id = %result.metadata.session_id,
        learnings = result.summary.total_learnings,
        "analysis finished"
    );

    if !args.detailed {
        result.metadata.execution_details.clear();
    }
    let code = exit_code(&result.summary);
    output(
        &AnalysisReport {
            result,
            detailed: args.detailed,
        },
        json_mode,
    );
    Ok(code)
}

/// Printable analysis result.
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    /// Result of the run.
    #[serde(flatten)]
    pub result: AnalysisResult,
    /// Whether execution details are rendered.
    #[serde(skip)]
    pub detailed: bool,
}

impl CommandOutput for AnalysisReport {
    fn to_human(&self) -> String {
        let summary = &self.result.summary;
        let mut out = format!(
            "Analyzed {} unit(s): {} with drift, {} clean. {} learning(s).\n",
            summary.total_units,
            summary.units_with_drift,
            summary.units_without_drift,
            summary.total_learnings
        );

        for (label, rules) in [
            ("Failed", &summary.rules_failed),
            ("Warned", &summary.rules_warned),
            ("Errored", &summary.rules_errored),
            ("Passed", &summary.rules_passed),
        ] {
            if !rules.is_empty() {
                let _ = writeln!(out, "{label}: {}", rules.join(", "));
            }
        }

        let mut learnings = list_table(&["unit", "rule", "observed", "expected"]);
        let mut errors = list_table(&["unit", "rule", "error"]);
        let mut error_count = 0;
        for unit in &self.result.results {
            for learning in &unit.learnings {
                learnings.add_row(vec![
                    truncate(&unit.unit_id, 24),
                    learning.rule_type.clone(),
                    truncate(&learning.observed_behavior, 60),
                    truncate(&learning.expected_behavior, 60),
                ]);
            }
            for (rule, error) in &unit.rule_errors {
                error_count += 1;
                errors.add_row(vec![truncate(&unit.unit_id, 24), rule.clone(), truncate(error, 80)]);
            }
        }

        if summary.total_learnings > 0 {
            let _ = write!(out, "\n{learnings}\n");
        }
        if error_count > 0 {
            let _ = write!(out, "\nErrors:\n{errors}\n");
        }

        if self.detailed {
            let mut details =
                list_table(&["rule", "unit", "status", "termination", "phases", "resources"]);
            for detail in &self.result.metadata.execution_details {
                details.add_row(vec![
                    detail.rule_name.clone(),
                    truncate(&detail.unit_id, 24),
                    detail.status.as_str().to_string(),
                    detail
                        .termination
                        .map(|t| t.as_str().to_string())
                        .unwrap_or_default(),
                    detail
                        .phase_results
                        .as_ref()
                        .map(|p| p.len().to_string())
                        .unwrap_or_default(),
                    detail
                        .resources_consulted
                        .as_ref()
                        .map(|r| r.join(", "))
                        .unwrap_or_default(),
                ]);
            }
            let _ = write!(out, "\nExecution details:\n{details}\n");
        }

        out.trim_end().to_string()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.result).unwrap_or_default()
    }
}
