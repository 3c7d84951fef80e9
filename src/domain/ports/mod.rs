//! Port trait definitions (Hexagonal Architecture)
//!
//! Interfaces the analysis engine consumes:
//! - ModelProvider: LLM completions
//! - ResourceLoader: project resources for one agent tool
//! - Validator: programmatic document checks

pub mod model_provider;
pub mod resource_loader;
pub mod validator;

pub use model_provider::ModelProvider;
pub use resource_loader::ResourceLoader;
pub use validator::{Validator, ValidatorFinding};
