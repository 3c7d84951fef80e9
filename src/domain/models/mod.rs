//! Domain models.

pub mod analysis;
pub mod config;
pub mod conversation;
pub mod learning;
pub mod phase;
pub mod rule;

pub use analysis::{
    AnalysisMetadata, AnalysisMode, AnalysisResult, AnalysisSummary, ExecutionDetail,
    RuleExecutionStatus, UnitAnalysis,
};
pub use config::{
    AnthropicConfig, Config, LoggingConfig, ModelConfig, OverrideEntry, ParameterOverrides,
    ProviderKind,
};
pub use conversation::{AnalysisUnit, Conversation, DocumentBundle, DocumentFile, Turn};
pub use learning::{Learning, LearningSource};
pub use phase::{PhaseResult, ResourceRequest, ResourceResponse, TerminationReason};
pub use rule::{
    BundleStrategy, DocumentBundleSelector, PhaseDefinition, PhaseKind, RuleDefinition, RuleScope,
    Severity,
};
