//! Analysis session orchestrator.
//!
//! Runs every applicable rule against every applicable unit, one at a time.
//! A systemic provider failure aborts the whole session; any other failure
//! is recorded against the (rule, unit) pair and the batch continues.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::domain::errors::{DriftError, DriftResult, ProviderError};
use crate::domain::models::{
    AnalysisMetadata, AnalysisMode, AnalysisResult, AnalysisUnit, BundleStrategy, Conversation,
    DocumentBundle, ExecutionDetail, PhaseKind, RuleDefinition, RuleExecutionStatus, UnitAnalysis,
};
use crate::services::multi_phase_orchestrator::{MultiPhaseOrchestrator, RuleRun};
use crate::services::summary::build_summary;

/// Rules whose scope matches the analysis mode.
pub fn rules_for_mode(
    rules: &BTreeMap<String, RuleDefinition>,
    mode: AnalysisMode,
) -> BTreeMap<String, RuleDefinition> {
    rules
        .iter()
        .filter(|(_, rule)| match mode {
            AnalysisMode::Conversation => rule.scope.is_conversation_scope(),
            AnalysisMode::Document => rule.scope.is_document_scope(),
        })
        .map(|(name, rule)| (name.clone(), rule.clone()))
        .collect()
}

/// Model names the given rules will call.
pub fn required_models<'a>(
    rules: impl IntoIterator<Item = &'a RuleDefinition>,
    model_override: Option<&str>,
    default_model: &str,
) -> BTreeSet<String> {
    let mut models = BTreeSet::new();
    for rule in rules {
        for phase in &rule.phases {
            if let PhaseKind::Prompt { model, .. } = &phase.kind {
                let name = model_override.or(model.as_deref()).unwrap_or(default_model);
                models.insert(name.to_string());
            }
        }
    }
    models
}

/// Per-unit results in first-seen order.
#[derive(Debug, Default)]
struct UnitResults {
    units: Vec<UnitAnalysis>,
    index: HashMap<String, usize>,
}

impl UnitResults {
    fn entry(&mut self, unit: AnalysisUnit<'_>) -> &mut UnitAnalysis {
        let id = unit.id();
        let position = match self.index.get(id) {
            Some(position) => *position,
            None => {
                let mut analysis = UnitAnalysis::new(id);
                match unit {
                    AnalysisUnit::Conversation(conversation) => {
                        analysis.agent_tool = Some(conversation.agent_tool.clone());
                        analysis.source_path = Some(conversation.file_path.clone());
                    }
                    AnalysisUnit::Bundle(bundle) => {
                        analysis.source_path = Some(bundle.project_path.display().to_string());
                    }
                }
                self.units.push(analysis);
                self.index.insert(id.to_string(), self.units.len() - 1);
                self.units.len() - 1
            }
        };
        &mut self.units[position]
    }
}

/// Batch driver over conversations or document bundles.
#[derive(Debug, Clone)]
pub struct AnalysisOrchestrator {
    runner: Arc<MultiPhaseOrchestrator>,
}

impl AnalysisOrchestrator {
    /// Create a session orchestrator around `runner`.
    pub fn new(runner: Arc<MultiPhaseOrchestrator>) -> Self {
        Self { runner }
    }

    /// Analyze conversations against the conversation-scoped rules.
    #[instrument(skip_all, fields(conversations = conversations.len(), rules = rules.len()))]
    pub async fn analyze_conversations(
        &self,
        conversations: &[Conversation],
        rules: &BTreeMap<String, RuleDefinition>,
        model_override: Option<&str>,
    ) -> DriftResult<AnalysisResult> {
        let rules = rules_for_mode(rules, AnalysisMode::Conversation);
        let mut metadata =
            AnalysisMetadata::new(AnalysisMode::Conversation, model_override.map(String::from));
        let mut results = UnitResults::default();

        if !conversations.is_empty() {
            self.ensure_models_available(rules.values(), model_override).await?;
        }

        for conversation in conversations {
            let unit = AnalysisUnit::Conversation(conversation);
            results.entry(unit);

            for rule in rules.values() {
                if !rule.supports_client(&conversation.agent_tool) {
                    debug!(
                        rule = %rule.name,
                        agent_tool = %conversation.agent_tool,
                        "rule does not support agent tool, skipping"
                    );
                    metadata.execution_details.push(ExecutionDetail::new(
                        &rule.name,
                        unit.id(),
                        RuleExecutionStatus::Skipped,
                    ));
                    continue;
                }

                self.run_rule(rule, unit, model_override, false, &mut results, &mut metadata)
                    .await?;
            }
        }

        info!(
            conversations = conversations.len(),
            details = metadata.execution_details.len(),
            "conversation analysis complete"
        );
        Ok(Self::finish(metadata, &rules, results))
    }

    /// Analyze document bundles against the document-scoped rules.
    ///
    /// `project_path` roots the synthetic project bundle used by
    /// programmatic rules that have no bundle selector.
    #[instrument(skip_all, fields(bundles = bundles.len(), rules = rules.len()))]
    pub async fn analyze_documents(
        &self,
        bundles: &[DocumentBundle],
        project_path: &Path,
        rules: &BTreeMap<String, RuleDefinition>,
        model_override: Option<&str>,
    ) -> DriftResult<AnalysisResult> {
        let rules = rules_for_mode(rules, AnalysisMode::Document);
        let mut metadata =
            AnalysisMetadata::new(AnalysisMode::Document, model_override.map(String::from));
        let mut results = UnitResults::default();
        let project_bundle = DocumentBundle::project(project_path);

        for bundle in bundles {
            results.entry(AnalysisUnit::Bundle(bundle));
        }

        self.ensure_models_available(rules.values(), model_override).await?;

        for rule in rules.values() {
            let Some(selector) = &rule.document_bundle else {
                if rule.has_programmatic_phases() {
                    self.run_rule(
                        rule,
                        AnalysisUnit::Bundle(&project_bundle),
                        model_override,
                        false,
                        &mut results,
                        &mut metadata,
                    )
                    .await?;
                } else {
                    debug!(rule = %rule.name, "no bundle selector and no programmatic phases, skipping");
                    metadata.execution_details.push(ExecutionDetail::new(
                        &rule.name,
                        &project_bundle.bundle_id,
                        RuleExecutionStatus::Skipped,
                    ));
                }
                continue;
            };

            let matching: Vec<&DocumentBundle> = bundles
                .iter()
                .filter(|bundle| bundle.bundle_type == selector.bundle_type)
                .collect();
            if matching.is_empty() {
                debug!(rule = %rule.name, bundle_type = %selector.bundle_type, "no matching bundles");
                continue;
            }

            match selector.bundle_strategy {
                BundleStrategy::Individual => {
                    for bundle in matching {
                        self.run_rule(
                            rule,
                            AnalysisUnit::Bundle(bundle),
                            model_override,
                            false,
                            &mut results,
                            &mut metadata,
                        )
                        .await?;
                    }
                }
                BundleStrategy::Collection => {
                    if let Some(merged) = DocumentBundle::merge_collection(&matching) {
                        debug!(
                            rule = %rule.name,
                            bundles = matching.len(),
                            files = merged.files.len(),
                            "analyzing merged collection"
                        );
                        self.run_rule(
                            rule,
                            AnalysisUnit::Bundle(&merged),
                            model_override,
                            true,
                            &mut results,
                            &mut metadata,
                        )
                        .await?;
                    }
                }
            }
        }

        info!(
            bundles = bundles.len(),
            details = metadata.execution_details.len(),
            "document analysis complete"
        );
        Ok(Self::finish(metadata, &rules, results))
    }

    /// Fail fast when a provider needed by the session is unreachable.
    async fn ensure_models_available<'a>(
        &self,
        rules: impl IntoIterator<Item = &'a RuleDefinition>,
        model_override: Option<&str>,
    ) -> DriftResult<()> {
        let registry = self.runner.executor().models();
        let needed = required_models(rules, model_override, registry.default_model());
        match registry
            .first_unavailable(needed.iter().map(String::as_str))
            .await?
        {
            Some(model) => {
                error!(model = %model, "model provider unavailable, aborting analysis");
                Err(DriftError::Provider(ProviderError::Unavailable(format!(
                    "provider for model '{model}' is unavailable"
                ))))
            }
            None => Ok(()),
        }
    }

    /// Run one rule against one unit and record the outcome.
    ///
    /// Only systemic provider failures escape.
    async fn run_rule(
        &self,
        rule: &RuleDefinition,
        unit: AnalysisUnit<'_>,
        model_override: Option<&str>,
        collection: bool,
        results: &mut UnitResults,
        metadata: &mut AnalysisMetadata,
    ) -> DriftResult<()> {
        let outcome = self.runner.execute(rule, unit, model_override).await;
        let analysis = results.entry(unit);

        let detail = match outcome {
            Ok(mut run) => {
                if collection && run.learnings.len() > 1 {
                    debug!(rule = %rule.name, kept = 1, found = run.learnings.len(), "collection keeps one finding");
                    run.learnings.truncate(1);
                }
                Self::record_run(rule, unit, run, analysis)
            }
            Err(err) if err.is_systemic() => {
                error!(rule = %rule.name, unit = %unit.id(), error = %err, "systemic failure, aborting analysis");
                return Err(err);
            }
            Err(err) => {
                warn!(rule = %rule.name, unit = %unit.id(), error = %err, "rule failed for unit");
                let message = err.to_string();
                analysis.rule_errors.insert(rule.name.clone(), message.clone());
                ExecutionDetail::new(&rule.name, unit.id(), RuleExecutionStatus::Errored)
                    .with_error(message)
            }
        };

        metadata.execution_details.push(detail);
        Ok(())
    }

    fn record_run(
        rule: &RuleDefinition,
        unit: AnalysisUnit<'_>,
        run: RuleRun,
        analysis: &mut UnitAnalysis,
    ) -> ExecutionDetail {
        let status = if !run.learnings.is_empty() {
            RuleExecutionStatus::Failed
        } else if run.error.is_some() {
            RuleExecutionStatus::Errored
        } else {
            RuleExecutionStatus::Passed
        };

        if let Some(message) = &run.error {
            analysis.rule_errors.insert(rule.name.clone(), message.clone());
        }
        analysis.learnings.extend(run.learnings);

        let mut detail = ExecutionDetail::new(&rule.name, unit.id(), status);
        if rule.is_multi_phase() {
            detail.phase_results = Some(run.phase_results);
            detail.resources_consulted = Some(run.resources_consulted);
            detail.termination = run.termination;
        }
        detail.error = run.error;
        detail
    }

    fn finish(
        metadata: AnalysisMetadata,
        rules: &BTreeMap<String, RuleDefinition>,
        results: UnitResults,
    ) -> AnalysisResult {
        let summary = build_summary(rules, &results.units);
        AnalysisResult {
            metadata,
            summary,
            results: results.units,
        }
    }
}
