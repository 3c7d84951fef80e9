//! Configuration model.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::rule::RuleDefinition;

/// Main configuration structure for driftwatch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Group substituted when a rule declares none
    #[serde(default = "default_group_name")]
    pub default_group_name: String,

    /// Model used by prompt phases that do not name one
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Named model configurations
    #[serde(default = "default_models")]
    pub models: BTreeMap<String, ModelConfig>,

    /// Anthropic API settings shared by all anthropic models
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Agent tool whose resource loader serves document-mode requests
    #[serde(default = "default_document_agent_tool")]
    pub document_agent_tool: String,

    /// Drift rules keyed by rule name
    #[serde(default)]
    pub rule_definitions: BTreeMap<String, RuleDefinition>,

    /// Validator parameter overrides
    #[serde(default)]
    pub parameter_overrides: ParameterOverrides,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_group_name() -> String {
    "General".to_string()
}

fn default_model() -> String {
    "sonnet".to_string()
}

fn default_models() -> BTreeMap<String, ModelConfig> {
    let mut models = BTreeMap::new();
    models.insert(
        "sonnet".to_string(),
        ModelConfig {
            provider: ProviderKind::Anthropic,
            model_id: "claude-sonnet-4-5".to_string(),
            max_tokens: default_max_tokens(),
            temperature: Some(0.0),
        },
    );
    models.insert(
        "haiku".to_string(),
        ModelConfig {
            provider: ProviderKind::Anthropic,
            model_id: "claude-haiku-4-5".to_string(),
            max_tokens: default_max_tokens(),
            temperature: Some(0.0),
        },
    );
    models
}

fn default_document_agent_tool() -> String {
    "claude-code".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_group_name: default_group_name(),
            default_model: default_model(),
            models: default_models(),
            anthropic: AnthropicConfig::default(),
            document_agent_tool: default_document_agent_tool(),
            rule_definitions: BTreeMap::new(),
            parameter_overrides: ParameterOverrides::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Rules with their names filled in from the map keys.
    pub fn named_rules(&self) -> BTreeMap<String, RuleDefinition> {
        self.rule_definitions
            .iter()
            .map(|(name, rule)| {
                let mut rule = rule.clone();
                rule.name.clone_from(name);
                (name.clone(), rule)
            })
            .collect()
    }
}

/// Backend a model is served by
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Anthropic Messages API.
    Anthropic,
}

/// A named model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ModelConfig {
    /// Backend serving the model.
    pub provider: ProviderKind,

    /// Provider-side model identifier
    pub model_id: String,

    /// Completion token limit.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f32>,
}

const fn default_max_tokens() -> u32 {
    4096
}

/// Anthropic Messages API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AnthropicConfig {
    /// API key; read from `ANTHROPIC_API_KEY` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// API root URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// `anthropic-version` header value.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

const fn default_timeout_secs() -> u64 {
    300
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// One override source.
///
/// `replace` keys overwrite the base value; `merge` keys append to lists and
/// shallow-merge into maps.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OverrideEntry {
    /// Keys that overwrite base parameters.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub replace: Map<String, Value>,

    /// Keys merged into base parameters.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub merge: Map<String, Value>,
}

/// Validator parameter overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParameterOverrides {
    /// Keyed by validator type, e.g. `core:file_exists`
    #[serde(default)]
    pub validators: HashMap<String, OverrideEntry>,

    /// Keyed by `group::rule::phase`, `group::rule` or `rule`
    #[serde(default)]
    pub rules: HashMap<String, OverrideEntry>,
}

impl ParameterOverrides {
    /// Whether no overrides are configured.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty() && self.rules.is_empty()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation for file output: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
