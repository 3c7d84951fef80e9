//! Validator parameter resolution.
//!
//! Final validator parameters are layered from three sources in increasing
//! specificity: the phase's base parameters, the validator-type-wide
//! override, and the most specific rule override. Rule overrides are applied
//! last, so they win over validator-type overrides on shared keys.

use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::models::{OverrideEntry, ParameterOverrides};

/// Separator between group, rule and phase in rule override keys.
pub const KEY_SEPARATOR: &str = "::";

/// Resolves effective validator parameters from configured overrides.
#[derive(Debug, Clone, Default)]
pub struct ParameterMerger {
    overrides: ParameterOverrides,
    default_group_name: String,
}

impl ParameterMerger {
    /// Create a merger over the configured overrides.
    pub fn new(overrides: ParameterOverrides, default_group_name: impl Into<String>) -> Self {
        Self {
            overrides,
            default_group_name: default_group_name.into(),
        }
    }

    /// Compute the parameters passed to a validator.
    ///
    /// `group_name` falls back to the configured default group. Missing
    /// override sources are not an error; the base parameters come back
    /// unchanged.
    pub fn merge(
        &self,
        base: &Map<String, Value>,
        validator_type: &str,
        rule_name: &str,
        group_name: Option<&str>,
        phase_name: Option<&str>,
    ) -> Map<String, Value> {
        let mut params = base.clone();

        if let Some(entry) = self.overrides.validators.get(validator_type) {
            debug!(validator_type, "applying validator-type parameter override");
            apply_entry(&mut params, entry);
        }

        let group = group_name.unwrap_or(&self.default_group_name);
        if let Some((key, entry)) = self.most_specific_rule_override(group, rule_name, phase_name) {
            debug!(override_key = %key, "applying rule parameter override");
            apply_entry(&mut params, entry);
        }

        params
    }

    /// Find the first existing rule override among
    /// `group::rule::phase`, `group::rule`, `rule`.
    fn most_specific_rule_override(
        &self,
        group: &str,
        rule_name: &str,
        phase_name: Option<&str>,
    ) -> Option<(String, &OverrideEntry)> {
        candidate_keys(group, rule_name, phase_name)
            .into_iter()
            .find_map(|key| self.overrides.rules.get(&key).map(|entry| (key, entry)))
    }
}

/// Rule override keys from most to least specific.
pub fn candidate_keys(group: &str, rule_name: &str, phase_name: Option<&str>) -> Vec<String> {
    let mut keys = Vec::with_capacity(3);
    if let Some(phase) = phase_name {
        keys.push([group, rule_name, phase].join(KEY_SEPARATOR));
    }
    keys.push([group, rule_name].join(KEY_SEPARATOR));
    keys.push(rule_name.to_string());
    keys
}

/// Apply one override entry: `replace` first, then `merge`.
fn apply_entry(params: &mut Map<String, Value>, entry: &OverrideEntry) {
    for (key, value) in &entry.replace {
        params.insert(key.clone(), value.clone());
    }

    for (key, value) in &entry.merge {
        match (params.get_mut(key), value) {
            (Some(Value::Array(base)), Value::Array(extra)) => {
                base.extend(extra.iter().cloned());
            }
            (Some(Value::Object(base)), Value::Object(extra)) => {
                for (k, v) in extra {
                    base.insert(k.clone(), v.clone());
                }
            }
            // Absent key or mismatched types: replace
            _ => {
                params.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            other => panic!("expected object, got {other}"),
        }
    }

    fn entry(replace: Value, merge: Value) -> OverrideEntry {
        OverrideEntry {
            replace: map(replace),
            merge: map(merge),
        }
    }

    fn merger(
        validators: Vec<(&str, OverrideEntry)>,
        rules: Vec<(&str, OverrideEntry)>,
    ) -> ParameterMerger {
        ParameterMerger::new(
            ParameterOverrides {
                validators: validators
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect::<HashMap<_, _>>(),
                rules: rules
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect::<HashMap<_, _>>(),
            },
            "General",
        )
    }

    #[test]
    fn test_no_overrides_returns_base() {
        let base = map(json!({"file_path": "README.md", "ignore_patterns": ["*.log"]}));
        let merged = ParameterMerger::default().merge(&base, "core:file_exists", "readme", None, None);
        assert_eq!(merged, base);
    }

    #[test]
    fn test_list_merge_order_validator_then_rule() {
        let merger = merger(
            vec![("core:file_exists", entry(json!({}), json!({"ignore_patterns": ["*.git"]})))],
            vec![("readme", entry(json!({}), json!({"ignore_patterns": ["*.tmp"]})))],
        );
        let base = map(json!({"ignore_patterns": ["*.log"]}));

        let merged = merger.merge(&base, "core:file_exists", "readme", None, None);

        assert_eq!(merged["ignore_patterns"], json!(["*.log", "*.git", "*.tmp"]));
    }

    #[test]
    fn test_replace_and_merge_on_different_keys_do_not_interfere() {
        let merger = merger(
            vec![("core:file_size", entry(json!({"max_size": 2048}), json!({})))],
            vec![("size_rule", entry(json!({}), json!({"tags": ["docs"]})))],
        );
        let base = map(json!({"max_size": 1024, "tags": ["core"]}));

        let merged = merger.merge(&base, "core:file_size", "size_rule", None, None);

        assert_eq!(merged["max_size"], json!(2048));
        assert_eq!(merged["tags"], json!(["core", "docs"]));
    }

    #[test]
    fn test_rule_override_wins_over_validator_override() {
        let merger = merger(
            vec![("core:file_size", entry(json!({"max_size": 2048}), json!({})))],
            vec![("size_rule", entry(json!({"max_size": 4096}), json!({})))],
        );
        let merged = merger.merge(&Map::new(), "core:file_size", "size_rule", None, None);
        assert_eq!(merged["max_size"], json!(4096));
    }

    #[test]
    fn test_most_specific_rule_override_is_exclusive() {
        let merger = merger(
            vec![],
            vec![
                ("Docs::readme::check", entry(json!({}), json!({"ignore_patterns": ["phase"]}))),
                ("Docs::readme", entry(json!({}), json!({"ignore_patterns": ["group"]}))),
                ("readme", entry(json!({}), json!({"ignore_patterns": ["rule"]}))),
            ],
        );
        let base = map(json!({"ignore_patterns": []}));

        let phase = merger.merge(&base, "core:regex_match", "readme", Some("Docs"), Some("check"));
        assert_eq!(phase["ignore_patterns"], json!(["phase"]));

        let group = merger.merge(&base, "core:regex_match", "readme", Some("Docs"), Some("other"));
        assert_eq!(group["ignore_patterns"], json!(["group"]));

        let bare = merger.merge(&base, "core:regex_match", "readme", Some("Elsewhere"), None);
        assert_eq!(bare["ignore_patterns"], json!(["rule"]));
    }

    #[test]
    fn test_default_group_substituted_when_missing() {
        let merger = merger(
            vec![],
            vec![("General::readme", entry(json!({"file_path": "docs/README.md"}), json!({})))],
        );
        let merged = merger.merge(&Map::new(), "core:file_exists", "readme", None, None);
        assert_eq!(merged["file_path"], json!("docs/README.md"));
    }

    #[test]
    fn test_dict_merge_is_shallow_with_override_winning() {
        let merger = merger(
            vec![("core:regex_match", entry(json!({}), json!({"flags": {"multiline": true, "case": "insensitive"}})))],
            vec![],
        );
        let base = map(json!({"flags": {"case": "sensitive", "dotall": false}}));

        let merged = merger.merge(&base, "core:regex_match", "r", None, None);

        assert_eq!(
            merged["flags"],
            json!({"case": "insensitive", "dotall": false, "multiline": true})
        );
    }

    #[test]
    fn test_merge_type_mismatch_degrades_to_replace() {
        let merger = merger(
            vec![],
            vec![("r", entry(json!({}), json!({"ignore_patterns": "*.bak"})))],
        );
        let base = map(json!({"ignore_patterns": ["*.log"]}));

        let merged = merger.merge(&base, "core:regex_match", "r", None, None);
        assert_eq!(merged["ignore_patterns"], json!("*.bak"));
    }

    #[test]
    fn test_replace_runs_before_merge_within_entry() {
        let merger = merger(
            vec![("core:regex_match", entry(json!({"ignore_patterns": ["*.md"]}), json!({"ignore_patterns": ["*.txt"]})))],
            vec![],
        );
        let base = map(json!({"ignore_patterns": ["*.log"]}));

        let merged = merger.merge(&base, "core:regex_match", "r", None, None);
        assert_eq!(merged["ignore_patterns"], json!(["*.md", "*.txt"]));
    }

    #[test]
    fn test_candidate_keys_order() {
        assert_eq!(
            candidate_keys("G", "r", Some("p")),
            vec!["G::r::p".to_string(), "G::r".to_string(), "r".to_string()]
        );
        assert_eq!(candidate_keys("G", "r", None), vec!["G::r".to_string(), "r".to_string()]);
    }
}
