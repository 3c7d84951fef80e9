//! Driftwatch - drift detection for AI-agent work
//!
//! Runs configured rules against agent conversations and project document
//! bundles. A rule is an ordered list of phases; each phase is either an LLM
//! prompt that may ask for project resources before deciding, or a
//! programmatic validator. Confirmed findings become learnings.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, ports and error types
//! - **Service Layer** (`services`): phase execution and session orchestration
//! - **Adapters** (`adapters`): model providers, resource loaders and validators
//! - **Infrastructure Layer** (`infrastructure`): configuration, logging and input files
//! - **CLI Layer** (`cli`): command-line interface

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{DriftError, DriftResult, ProviderError};
pub use domain::models::{
    AnalysisResult, AnalysisSummary, Config, Conversation, DocumentBundle, Learning,
    PhaseDefinition, RuleDefinition,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{AnalysisOrchestrator, MultiPhaseOrchestrator};
