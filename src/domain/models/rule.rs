//! Rule and phase definitions.
//!
//! Rules are loaded once from configuration and never mutated during
//! analysis. Each rule owns an ordered list of phases; a phase is either an
//! LLM prompt call or a programmatic validator check.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::phase::ResourceRequest;

/// Phase type tag that selects an LLM prompt phase.
pub const PROMPT_PHASE_TYPE: &str = "prompt";

/// Granularity a rule operates at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    /// Individual turns of a conversation.
    TurnLevel,
    /// A whole conversation.
    ConversationLevel,
    /// A document bundle.
    DocumentLevel,
    /// The project as a whole.
    ProjectLevel,
}

impl RuleScope {
    /// Whether this scope is analyzed against conversations.
    pub const fn is_conversation_scope(self) -> bool {
        matches!(self, Self::TurnLevel | Self::ConversationLevel)
    }

    /// Whether this scope is analyzed against document bundles.
    pub const fn is_document_scope(self) -> bool {
        matches!(self, Self::DocumentLevel | Self::ProjectLevel)
    }

    /// Snake-case name as serialized.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TurnLevel => "turn_level",
            Self::ConversationLevel => "conversation_level",
            Self::DocumentLevel => "document_level",
            Self::ProjectLevel => "project_level",
        }
    }
}

/// How a rule with findings is classified in the summary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Findings are informational.
    Pass,
    /// Findings warn.
    Warning,
    /// Findings fail the run.
    Fail,
}

/// How matching document bundles are grouped before analysis.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BundleStrategy {
    /// One full pass per bundle.
    #[default]
    Individual,
    /// All matching bundles merged and analyzed once.
    Collection,
}

/// Selects which document bundles a rule applies to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentBundleSelector {
    /// Bundle type to match (e.g. "skill", "command", "agent").
    pub bundle_type: String,

    /// File patterns used by bundle discovery.
    #[serde(default)]
    pub file_patterns: Vec<String>,

    /// How matching bundles are grouped.
    #[serde(default)]
    pub bundle_strategy: BundleStrategy,
}

/// The work a phase performs.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseKind {
    /// LLM prompt call.
    Prompt {
        /// Model name; falls back to the configured default.
        model: Option<String>,
        /// Phase-specific instructions appended to the rule prompt.
        instructions: String,
        /// `type` or `type:id` specifiers this phase may request.
        available_resources: Vec<String>,
    },
    /// Programmatic validator check.
    Programmatic {
        /// Registered validator type (e.g. `core:file_exists`).
        validator_type: String,
        /// Base parameters before overrides are applied.
        params: Map<String, Value>,
    },
}

/// One step in a rule's pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPhaseDefinition", into = "RawPhaseDefinition")]
pub struct PhaseDefinition {
    /// Phase name, unique within its rule.
    pub name: String,
    /// What the phase does.
    pub kind: PhaseKind,
}

impl PhaseDefinition {
    /// Create a prompt phase.
    pub fn prompt(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PhaseKind::Prompt {
                model: None,
                instructions: instructions.into(),
                available_resources: Vec::new(),
            },
        }
    }

    /// Create a programmatic phase.
    pub fn programmatic(
        name: impl Into<String>,
        validator_type: impl Into<String>,
        params: Map<String, Value>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: PhaseKind::Programmatic {
                validator_type: validator_type.into(),
                params,
            },
        }
    }

    /// Set the permitted resources of a prompt phase. No-op for programmatic phases.
    #[must_use]
    pub fn with_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let PhaseKind::Prompt {
            available_resources,
            ..
        } = &mut self.kind
        {
            *available_resources = resources.into_iter().map(Into::into).collect();
        }
        self
    }

    /// Set the model of a prompt phase. No-op for programmatic phases.
    #[must_use]
    pub fn with_model(mut self, name: impl Into<String>) -> Self {
        if let PhaseKind::Prompt { model, .. } = &mut self.kind {
            *model = Some(name.into());
        }
        self
    }

    /// Whether this is an LLM prompt phase.
    pub const fn is_prompt(&self) -> bool {
        matches!(self.kind, PhaseKind::Prompt { .. })
    }

    /// Whether this phase may request the given resource.
    ///
    /// A request is permitted when its `type:id` or bare `type` appears in
    /// the allowlist. Programmatic phases permit nothing.
    pub fn permits(&self, request: &ResourceRequest) -> bool {
        match &self.kind {
            PhaseKind::Prompt {
                available_resources,
                ..
            } => {
                let qualified = request.key();
                available_resources
                    .iter()
                    .any(|allowed| *allowed == qualified || *allowed == request.resource_type)
            }
            PhaseKind::Programmatic { .. } => false,
        }
    }
}

/// Flat on-disk representation of a phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawPhaseDefinition {
    name: String,
    #[serde(rename = "type")]
    phase_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    available_resources: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    params: Map<String, Value>,
}

impl TryFrom<RawPhaseDefinition> for PhaseDefinition {
    type Error = String;

    fn try_from(raw: RawPhaseDefinition) -> Result<Self, Self::Error> {
        let phase_type = raw.phase_type.trim();
        if phase_type.is_empty() {
            return Err(format!("phase '{}' has an empty type", raw.name));
        }

        let kind = if phase_type == PROMPT_PHASE_TYPE {
            PhaseKind::Prompt {
                model: raw.model,
                instructions: raw.prompt.unwrap_or_default(),
                available_resources: raw.available_resources,
            }
        } else {
            PhaseKind::Programmatic {
                validator_type: phase_type.to_string(),
                params: raw.params,
            }
        };

        Ok(Self {
            name: raw.name,
            kind,
        })
    }
}

impl From<PhaseDefinition> for RawPhaseDefinition {
    fn from(phase: PhaseDefinition) -> Self {
        match phase.kind {
            PhaseKind::Prompt {
                model,
                instructions,
                available_resources,
            } => Self {
                name: phase.name,
                phase_type: PROMPT_PHASE_TYPE.to_string(),
                model,
                prompt: Some(instructions),
                available_resources,
                params: Map::new(),
            },
            PhaseKind::Programmatic {
                validator_type,
                params,
            } => Self {
                name: phase.name,
                phase_type: validator_type,
                model: None,
                prompt: None,
                available_resources: Vec::new(),
                params,
            },
        }
    }
}

/// A configured drift rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Filled from the configuration map key when loaded.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// What drift the rule detects.
    pub description: String,

    /// Granularity the rule works at.
    pub scope: RuleScope,

    /// Explicit summary severity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,

    /// Background the model needs to judge this rule.
    #[serde(default)]
    pub context: String,

    /// Group used for parameter-override lookups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Phases in execution order.
    pub phases: Vec<PhaseDefinition>,

    /// Bundles the rule applies to in document mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_bundle: Option<DocumentBundleSelector>,

    /// Agent tools this rule applies to; `None` means all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_clients: Option<Vec<String>>,
}

impl RuleDefinition {
    /// Create a rule with no phases.
    pub fn new(name: impl Into<String>, description: impl Into<String>, scope: RuleScope) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            scope,
            severity: None,
            context: String::new(),
            group: None,
            phases: Vec::new(),
            document_bundle: None,
            supported_clients: None,
        }
    }

    /// Append a phase.
    #[must_use]
    pub fn with_phase(mut self, phase: PhaseDefinition) -> Self {
        self.phases.push(phase);
        self
    }

    /// Set an explicit severity.
    #[must_use]
    pub const fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Set the background context.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Limit the rule to the given agent tools.
    #[must_use]
    pub fn with_supported_clients<I, S>(mut self, clients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_clients = Some(clients.into_iter().map(Into::into).collect());
        self
    }

    /// Set the bundle selector.
    #[must_use]
    pub fn with_document_bundle(mut self, selector: DocumentBundleSelector) -> Self {
        self.document_bundle = Some(selector);
        self
    }

    /// Whether the rule runs the phase loop.
    pub fn is_multi_phase(&self) -> bool {
        self.phases.len() > 1
    }

    /// Whether any phase runs a programmatic validator.
    pub fn has_programmatic_phases(&self) -> bool {
        self.phases.iter().any(|p| !p.is_prompt())
    }

    /// Whether this rule applies to conversations from the given agent tool.
    pub fn supports_client(&self, agent_tool: &str) -> bool {
        self.supported_clients
            .as_ref()
            .map_or(true, |clients| clients.iter().any(|c| c == agent_tool))
    }

    /// Severity used for summary classification.
    ///
    /// Explicit severity wins; otherwise project-level rules fail and all
    /// others warn.
    pub fn effective_severity(&self) -> Severity {
        self.severity.unwrap_or(match self.scope {
            RuleScope::ProjectLevel => Severity::Fail,
            _ => Severity::Warning,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_yaml_parsing_selects_kind() {
        let yaml = r"
- name: initial_analysis
  type: prompt
  model: sonnet
  prompt: Look for missed slash commands.
  available_resources: [command, skill:testing]
- name: readme_present
  type: core:file_exists
  params:
    file_path: README.md
";
        let phases: Vec<PhaseDefinition> = serde_yaml::from_str(yaml).expect("phases parse");
        assert_eq!(phases.len(), 2);

        match &phases[0].kind {
            PhaseKind::Prompt {
                model,
                instructions,
                available_resources,
            } => {
                assert_eq!(model.as_deref(), Some("sonnet"));
                assert_eq!(instructions, "Look for missed slash commands.");
                assert_eq!(available_resources, &["command", "skill:testing"]);
            }
            other => panic!("expected prompt phase, got {other:?}"),
        }

        match &phases[1].kind {
            PhaseKind::Programmatic {
                validator_type,
                params,
            } => {
                assert_eq!(validator_type, "core:file_exists");
                assert_eq!(params["file_path"], "README.md");
            }
            other => panic!("expected programmatic phase, got {other:?}"),
        }
    }

    #[test]
    fn test_phase_with_empty_type_is_rejected() {
        let yaml = "name: broken\ntype: ''\n";
        assert!(serde_yaml::from_str::<PhaseDefinition>(yaml).is_err());
    }

    #[test]
    fn test_permits_qualified_and_bare_specifiers() {
        let phase = PhaseDefinition::prompt("p", "x").with_resources(["command", "skill:testing"]);

        assert!(phase.permits(&ResourceRequest::new("command", "deploy", "")));
        assert!(phase.permits(&ResourceRequest::new("skill", "testing", "")));
        assert!(!phase.permits(&ResourceRequest::new("skill", "linting", "")));
        assert!(!phase.permits(&ResourceRequest::new("agent", "reviewer", "")));
    }

    #[test]
    fn test_effective_severity_defaults() {
        let project = RuleDefinition::new("p", "d", RuleScope::ProjectLevel);
        assert_eq!(project.effective_severity(), Severity::Fail);

        let conversation = RuleDefinition::new("c", "d", RuleScope::ConversationLevel);
        assert_eq!(conversation.effective_severity(), Severity::Warning);

        let explicit = RuleDefinition::new("e", "d", RuleScope::ProjectLevel).with_severity(Severity::Pass);
        assert_eq!(explicit.effective_severity(), Severity::Pass);
    }

    #[test]
    fn test_supports_client() {
        let rule = RuleDefinition::new("r", "d", RuleScope::ConversationLevel);
        assert!(rule.supports_client("cursor"));

        let rule = rule.with_supported_clients(["claude-code"]);
        assert!(rule.supports_client("claude-code"));
        assert!(!rule.supports_client("cursor"));
    }
}
