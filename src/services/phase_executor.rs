//! Phase executor: runs one phase.
//!
//! Prompt phases go to the model resolved for the phase; programmatic
//! phases go to the registered validator. Provider errors are returned
//! untouched so callers can tell systemic outages from per-unit failures.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, instrument};

use crate::domain::errors::DriftResult;
use crate::domain::models::{DocumentBundle, PhaseDefinition, PhaseKind, PhaseResult};
use crate::domain::ports::ValidatorFinding;
use crate::services::model_registry::ModelRegistry;
use crate::services::validator_registry::ValidatorRegistry;

/// Executes individual phases against the model and validator registries.
#[derive(Debug, Clone)]
pub struct PhaseExecutor {
    models: Arc<ModelRegistry>,
    validators: Arc<ValidatorRegistry>,
}

impl PhaseExecutor {
    /// Create an executor over the given registries.
    pub fn new(models: Arc<ModelRegistry>, validators: Arc<ValidatorRegistry>) -> Self {
        Self { models, validators }
    }

    /// Model registry.
    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    /// Validator registry.
    pub fn validators(&self) -> &ValidatorRegistry {
        &self.validators
    }

    /// Model name a prompt phase runs on.
    ///
    /// A session-wide override beats the phase's own model, which beats the
    /// configured default.
    pub fn model_for<'a>(&'a self, phase: &'a PhaseDefinition, model_override: Option<&'a str>) -> &'a str {
        let phase_model = match &phase.kind {
            PhaseKind::Prompt { model, .. } => model.as_deref(),
            PhaseKind::Programmatic { .. } => None,
        };
        model_override
            .or(phase_model)
            .unwrap_or_else(|| self.models.default_model())
    }

    /// Send a prompt for `phase` to its model and return the raw output.
    #[instrument(skip(self, phase, prompt), fields(phase = %phase.name, prompt_length = prompt.len()))]
    pub async fn execute_prompt(
        &self,
        phase: &PhaseDefinition,
        prompt: &str,
        model_override: Option<&str>,
    ) -> DriftResult<String> {
        let model = self.model_for(phase, model_override);
        let provider = self.models.resolve(Some(model))?;

        debug!(model, provider = provider.provider_id(), "executing prompt phase");
        let output = provider.generate(prompt).await?;
        debug!(model, output_length = output.len(), "prompt phase completed");

        Ok(output)
    }

    /// Run a validator with already-merged parameters.
    #[instrument(skip(self, params, bundle), fields(bundle_id = %bundle.bundle_id))]
    pub fn execute_validator(
        &self,
        validator_type: &str,
        params: &Map<String, Value>,
        bundle: &DocumentBundle,
    ) -> DriftResult<Option<ValidatorFinding>> {
        let validator = self.validators.get(validator_type)?;
        let outcome = validator.execute_rule(params, bundle)?;
        debug!(passed = outcome.is_none(), "validator completed");
        Ok(outcome)
    }
}

/// Phase result for a programmatic phase.
///
/// A failure is a final determination carrying one finding; a pass carries
/// nothing and lets the run continue.
pub fn validation_phase_result(phase_number: usize, outcome: Option<&ValidatorFinding>) -> PhaseResult {
    match outcome {
        Some(finding) => PhaseResult {
            phase_number,
            findings: vec![json!({
                "observed_behavior": finding.observed_behavior,
                "expected_behavior": finding.expected_behavior,
                "context": finding.context,
                "file_paths": finding.file_paths,
            })],
            resource_requests: Vec::new(),
            final_determination: true,
        },
        None => PhaseResult {
            phase_number,
            ..PhaseResult::default()
        },
    }
}
