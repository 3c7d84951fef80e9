//! Multi-phase rule orchestrator.
//!
//! Drives one rule's phase sequence against one analysis unit. Each prompt
//! phase may ask for project resources; permitted requests are loaded and
//! fed into the next phase together with the current phase's findings.
//! A run stops when the model declares its determination final, asks for
//! nothing more, asks only for resources that do not exist, or runs out of
//! phases. Only the last executed phase's findings survive finalization.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DriftError, DriftResult};
use crate::domain::models::{
    AnalysisUnit, Learning, PhaseDefinition, PhaseKind, PhaseResult, ResourceResponse,
    RuleDefinition, TerminationReason,
};
use crate::domain::ports::ResourceLoader;
use crate::services::finding_normalizer::{normalize_findings, Provenance};
use crate::services::loader_registry::LoaderRegistry;
use crate::services::parameter_merger::ParameterMerger;
use crate::services::phase_executor::{validation_phase_result, PhaseExecutor};
use crate::services::phase_response_parser::{parse_findings_array, parse_phase_response};
use crate::services::prompt_builder::{build_phase_prompt, build_single_phase_prompt, PhaseContext};

/// Agent tool whose loader serves resource requests in document runs.
pub const DEFAULT_DOCUMENT_AGENT_TOOL: &str = "claude-code";

/// Outcome of running one rule against one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleRun {
    /// Normalized findings of the run.
    pub learnings: Vec<Learning>,
    /// Non-fatal problem worth reporting (missing loader, dropped findings).
    pub error: Option<String>,
    /// Ordered history of executed phases (multi-phase runs only).
    pub phase_results: Vec<PhaseResult>,
    /// Why the phase loop stopped (multi-phase runs only).
    pub termination: Option<TerminationReason>,
    /// `type:id` of every resource found during the run.
    pub resources_consulted: Vec<String>,
}

impl RuleRun {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Runs rules against analysis units.
#[derive(Debug, Clone)]
pub struct MultiPhaseOrchestrator {
    executor: Arc<PhaseExecutor>,
    loaders: Arc<LoaderRegistry>,
    merger: Arc<ParameterMerger>,
    document_agent_tool: String,
}

impl MultiPhaseOrchestrator {
    /// Create an orchestrator serving document runs with the Claude Code loader.
    pub fn new(
        executor: Arc<PhaseExecutor>,
        loaders: Arc<LoaderRegistry>,
        merger: Arc<ParameterMerger>,
    ) -> Self {
        Self {
            executor,
            loaders,
            merger,
            document_agent_tool: DEFAULT_DOCUMENT_AGENT_TOOL.to_string(),
        }
    }

    /// Use the loader of `agent_tool` for document runs.
    #[must_use]
    pub fn with_document_agent_tool(mut self, agent_tool: impl Into<String>) -> Self {
        self.document_agent_tool = agent_tool.into();
        self
    }

    /// Phase executor shared with the session orchestrator.
    pub fn executor(&self) -> &PhaseExecutor {
        &self.executor
    }

    /// Run a rule through the single-phase or multi-phase path.
    pub async fn execute(
        &self,
        rule: &RuleDefinition,
        unit: AnalysisUnit<'_>,
        model_override: Option<&str>,
    ) -> DriftResult<RuleRun> {
        if rule.is_multi_phase() {
            self.run(rule, unit, model_override).await
        } else {
            self.run_single_phase(rule, unit, model_override).await
        }
    }

    /// Execute the full phase sequence of `rule` against `unit`.
    ///
    /// Provider and loader failures propagate. A conversation whose agent
    /// tool has no registered loader is reported through
    /// [`RuleRun::error`] instead.
    #[instrument(skip(self, rule, unit, model_override), fields(rule = %rule.name, unit = %unit.id(), phases = rule.phases.len()))]
    pub async fn run(
        &self,
        rule: &RuleDefinition,
        unit: AnalysisUnit<'_>,
        model_override: Option<&str>,
    ) -> DriftResult<RuleRun> {
        if rule.phases.is_empty() {
            return Err(DriftError::configuration(format!(
                "rule '{}' has no phases",
                rule.name
            )));
        }

        let agent_tool = match unit {
            AnalysisUnit::Conversation(conversation) => conversation.agent_tool.as_str(),
            AnalysisUnit::Bundle(_) => self.document_agent_tool.as_str(),
        };
        let loader = self.loaders.get(agent_tool);
        if loader.is_none() && unit.is_conversation() {
            warn!(agent_tool, "no resource loader registered");
            return Ok(RuleRun::failed(format!(
                "No resource loader available for agent tool '{agent_tool}'"
            )));
        }

        let mut history: Vec<PhaseResult> = Vec::new();
        let mut resources: Vec<ResourceResponse> = Vec::new();
        let mut previous_findings: Vec<Value> = Vec::new();
        let mut missing_findings: Option<Vec<Value>> = None;
        let mut termination = TerminationReason::PhaseExhausted;
        let last_index = rule.phases.len() - 1;

        for (index, phase) in rule.phases.iter().enumerate() {
            let phase_number = index + 1;

            let result = match &phase.kind {
                PhaseKind::Programmatic {
                    validator_type,
                    params,
                } => {
                    let AnalysisUnit::Bundle(bundle) = unit else {
                        debug!(phase = %phase.name, "skipping programmatic phase in conversation run");
                        continue;
                    };
                    let merged = self.merger.merge(
                        params,
                        validator_type,
                        &rule.name,
                        rule.group.as_deref(),
                        Some(&phase.name),
                    );
                    let outcome = self
                        .executor
                        .execute_validator(validator_type, &merged, bundle)?;
                    validation_phase_result(phase_number, outcome.as_ref())
                }
                PhaseKind::Prompt { .. } => {
                    let context = PhaseContext {
                        resources: &resources,
                        previous_findings: &previous_findings,
                    };
                    let prompt = build_phase_prompt(rule, phase, index, unit, context);
                    let raw = self
                        .executor
                        .execute_prompt(phase, &prompt, model_override)
                        .await?;
                    parse_phase_response(&raw, phase_number)
                }
            };

            debug!(
                phase_number,
                findings = result.findings.len(),
                requests = result.resource_requests.len(),
                final_determination = result.final_determination,
                "phase completed"
            );
            history.push(result);
            let Some(current) = history.last() else {
                break;
            };
            previous_findings.clone_from(&current.findings);

            if current.final_determination {
                termination = TerminationReason::FinalDetermination;
                break;
            }
            if !phase.is_prompt() {
                continue;
            }
            if current.resource_requests.is_empty() {
                termination = TerminationReason::NoRequests;
                break;
            }
            let is_last = index == last_index;

            let Some(loader) = loader else {
                warn!(agent_tool, "ignoring resource requests, no loader registered");
                if !is_last {
                    termination = TerminationReason::NoRequests;
                }
                break;
            };

            let fetched = self.load_permitted(phase, current, loader, unit).await?;
            if fetched.is_empty() {
                termination = TerminationReason::NoRequests;
                break;
            }
            if fetched.iter().all(|response| !response.found) {
                info!(
                    phase_number,
                    missing = fetched.len(),
                    "every requested resource is missing, terminating"
                );
                missing_findings = Some(fetched.iter().map(missing_resource_finding).collect());
                resources.extend(fetched);
                termination = TerminationReason::ResourcesMissing;
                break;
            }
            resources.extend(fetched);
            if is_last {
                break;
            }
        }

        let resources_consulted = found_resource_keys(&resources);
        let source_phase = history.last().map(|result| result.phase_number);
        let final_findings = match missing_findings {
            Some(findings) => findings,
            None => history
                .last()
                .map(|result| result.findings.clone())
                .unwrap_or_default(),
        };

        let provenance = Provenance {
            source_phase,
            phases_count: Some(history.len()),
            resources_consulted: resources_consulted.clone(),
        };
        let normalized = normalize_findings(&final_findings, rule, unit, &provenance);

        info!(
            termination = ?termination,
            phases_executed = history.len(),
            learnings = normalized.learnings.len(),
            dropped = normalized.dropped,
            "rule run finished"
        );

        Ok(RuleRun {
            error: normalized.drop_message(),
            learnings: normalized.learnings,
            phase_results: history,
            termination: Some(termination),
            resources_consulted,
        })
    }

    /// Dispatch the permitted requests of `result` to the loader.
    async fn load_permitted(
        &self,
        phase: &PhaseDefinition,
        result: &PhaseResult,
        loader: &dyn ResourceLoader,
        unit: AnalysisUnit<'_>,
    ) -> DriftResult<Vec<ResourceResponse>> {
        let mut fetched = Vec::new();
        for request in &result.resource_requests {
            if !phase.permits(request) {
                debug!(resource = %request.key(), phase = %phase.name, "dropping unlisted resource request");
                continue;
            }
            let response = loader
                .get_resource(&request.resource_type, &request.resource_id, unit.project_path())
                .await?;
            debug!(resource = %response.key(), found = response.found, "resource loaded");
            fetched.push(response);
        }
        Ok(fetched)
    }

    /// Run a rule with exactly one phase, bypassing the resource loop.
    #[instrument(skip(self, rule, unit, model_override), fields(rule = %rule.name, unit = %unit.id()))]
    pub async fn run_single_phase(
        &self,
        rule: &RuleDefinition,
        unit: AnalysisUnit<'_>,
        model_override: Option<&str>,
    ) -> DriftResult<RuleRun> {
        let Some(phase) = rule.phases.first() else {
            return Err(DriftError::configuration(format!(
                "rule '{}' has no phases",
                rule.name
            )));
        };

        let findings = match (&phase.kind, unit) {
            (
                PhaseKind::Programmatic {
                    validator_type,
                    params,
                },
                AnalysisUnit::Bundle(bundle),
            ) => {
                let merged = self.merger.merge(
                    params,
                    validator_type,
                    &rule.name,
                    rule.group.as_deref(),
                    Some(&phase.name),
                );
                let outcome = self
                    .executor
                    .execute_validator(validator_type, &merged, bundle)?;
                validation_phase_result(1, outcome.as_ref()).findings
            }
            (PhaseKind::Programmatic { .. }, AnalysisUnit::Conversation(_)) => {
                debug!("skipping programmatic phase in conversation run");
                Vec::new()
            }
            (PhaseKind::Prompt { .. }, _) => {
                let prompt = build_single_phase_prompt(rule, phase, unit);
                let raw = self
                    .executor
                    .execute_prompt(phase, &prompt, model_override)
                    .await?;
                parse_findings_array(&raw)
            }
        };

        let normalized = normalize_findings(&findings, rule, unit, &Provenance::default());
        debug!(
            learnings = normalized.learnings.len(),
            dropped = normalized.dropped,
            "single-phase rule finished"
        );

        Ok(RuleRun {
            error: normalized.drop_message(),
            learnings: normalized.learnings,
            ..RuleRun::default()
        })
    }
}

fn missing_resource_finding(response: &ResourceResponse) -> Value {
    let key = response.key();
    json!({
        "observed_behavior": format!("Resource '{key}' not found"),
        "expected_behavior": format!("Resource '{key}' should exist"),
        "context": response.error.clone().unwrap_or_default(),
    })
}

fn found_resource_keys(resources: &[ResourceResponse]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for response in resources.iter().filter(|response| response.found) {
        let key = response.key();
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}
