//! Analysis engine services.
//!
//! Leaf-first: parameter merging, response parsing and prompt assembly feed
//! the phase executor, which the multi-phase orchestrator drives per rule;
//! the analysis orchestrator runs whole batches.

pub mod analysis_orchestrator;
pub mod finding_normalizer;
pub mod loader_registry;
pub mod model_registry;
pub mod multi_phase_orchestrator;
pub mod parameter_merger;
pub mod phase_executor;
pub mod phase_response_parser;
pub mod prompt_builder;
pub mod summary;
pub mod validator_registry;

pub use analysis_orchestrator::AnalysisOrchestrator;
pub use loader_registry::LoaderRegistry;
pub use model_registry::ModelRegistry;
pub use multi_phase_orchestrator::{MultiPhaseOrchestrator, RuleRun};
pub use parameter_merger::ParameterMerger;
pub use phase_executor::PhaseExecutor;
pub use phase_response_parser::{parse_findings_array, parse_phase_response};
pub use summary::build_summary;
pub use validator_registry::ValidatorRegistry;
