//! Common test utilities for integration tests
//!
//! Builds orchestrators over scripted providers and in-memory loaders so
//! tests can count model calls and resource lookups.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use driftwatch::adapters::loaders::InMemoryLoader;
use driftwatch::adapters::providers::ScriptedProvider;
use driftwatch::domain::models::{
    Conversation, DocumentBundle, DocumentFile, ParameterOverrides, Turn,
};
use driftwatch::services::{
    AnalysisOrchestrator, LoaderRegistry, ModelRegistry, MultiPhaseOrchestrator,
    ParameterMerger, PhaseExecutor, ValidatorRegistry,
};

pub const AGENT_TOOL: &str = "claude-code";

/// Orchestrators plus handles on their test doubles.
pub struct Harness {
    pub provider: Arc<ScriptedProvider>,
    pub loader: Arc<InMemoryLoader>,
    pub runner: Arc<MultiPhaseOrchestrator>,
    pub session: AnalysisOrchestrator,
}

pub fn harness(provider: ScriptedProvider, loader: InMemoryLoader) -> Harness {
    harness_with_overrides(provider, loader, ParameterOverrides::default())
}

pub fn harness_with_overrides(
    provider: ScriptedProvider,
    loader: InMemoryLoader,
    overrides: ParameterOverrides,
) -> Harness {
    let provider = Arc::new(provider);
    let loader = Arc::new(loader);
    let models = ModelRegistry::new("sonnet").with_model("sonnet", provider.clone());
    let executor = PhaseExecutor::new(Arc::new(models), Arc::new(ValidatorRegistry::with_builtins()));
    let loaders = LoaderRegistry::new().with_loader(loader.clone());
    let runner = Arc::new(MultiPhaseOrchestrator::new(
        Arc::new(executor),
        Arc::new(loaders),
        Arc::new(ParameterMerger::new(overrides, "General")),
    ));

    Harness {
        provider,
        loader,
        session: AnalysisOrchestrator::new(runner.clone()),
        runner,
    }
}

pub fn loader() -> InMemoryLoader {
    InMemoryLoader::new(AGENT_TOOL)
}

pub fn conversation(session_id: &str, agent_tool: &str) -> Conversation {
    Conversation {
        session_id: session_id.to_string(),
        agent_tool: agent_tool.to_string(),
        file_path: format!("/logs/{session_id}.jsonl"),
        project_path: Some(PathBuf::from("/proj")),
        turns: vec![
            Turn {
                number: 1,
                user_message: "Run /test before committing".to_string(),
                ai_message: "Committed without running anything".to_string(),
            },
            Turn {
                number: 2,
                user_message: "Why?".to_string(),
                ai_message: "I forgot.".to_string(),
            },
        ],
    }
}

pub fn bundle(bundle_id: &str, bundle_type: &str, project: PathBuf, files: &[(&str, &str)]) -> DocumentBundle {
    DocumentBundle {
        bundle_id: bundle_id.to_string(),
        bundle_type: bundle_type.to_string(),
        bundle_strategy: Default::default(),
        project_path: project.clone(),
        files: files
            .iter()
            .map(|(relative, content)| DocumentFile {
                relative_path: (*relative).to_string(),
                file_path: project.join(relative).display().to_string(),
                content: (*content).to_string(),
            })
            .collect(),
    }
}

/// Phase response JSON with resource requests and no findings.
pub fn request_response(requests: &[(&str, &str)]) -> String {
    let requests: Vec<serde_json::Value> = requests
        .iter()
        .map(|(kind, id)| {
            serde_json::json!({"resource_type": kind, "resource_id": id, "reason": "need it"})
        })
        .collect();
    serde_json::json!({
        "resource_requests": requests,
        "findings": [],
        "final_determination": false
    })
    .to_string()
}

/// Phase response JSON with one finding and a final determination.
pub fn finding_response(observed: &str, expected: &str) -> String {
    serde_json::json!({
        "resource_requests": [],
        "findings": [{"observed_behavior": observed, "expected_behavior": expected}],
        "final_determination": true
    })
    .to_string()
}
