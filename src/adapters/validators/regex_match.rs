//! `core:regex_match`: every bundle file must contain a pattern.

use glob::Pattern;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::errors::{DriftError, DriftResult};
use crate::domain::models::DocumentBundle;
use crate::domain::ports::{Validator, ValidatorFinding};

use super::{optional_str, required_str, str_list};

/// Type tag of this validator.
pub const VALIDATOR_TYPE: &str = "core:regex_match";

/// Fails when a non-ignored bundle file has fewer than `min_matches`
/// (default 1) matches of `pattern`. `ignore_patterns` are globs matched
/// against bundle-relative paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexMatchValidator;

fn compile_ignores(patterns: &[String]) -> DriftResult<Vec<Pattern>> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|e| DriftError::Validator {
                validator: VALIDATOR_TYPE.to_string(),
                reason: format!("invalid ignore pattern '{pattern}': {e}"),
            })
        })
        .collect()
}

impl Validator for RegexMatchValidator {
    fn validator_type(&self) -> &'static str {
        VALIDATOR_TYPE
    }

    fn execute_rule(
        &self,
        params: &Map<String, Value>,
        bundle: &DocumentBundle,
    ) -> DriftResult<Option<ValidatorFinding>> {
        let pattern = required_str(params, VALIDATOR_TYPE, "pattern")?;
        let regex = Regex::new(pattern).map_err(|e| DriftError::Validator {
            validator: VALIDATOR_TYPE.to_string(),
            reason: format!("invalid pattern '{pattern}': {e}"),
        })?;
        let ignores = compile_ignores(&str_list(params, VALIDATOR_TYPE, "ignore_patterns")?)?;
        let min_matches = params
            .get("min_matches")
            .and_then(Value::as_u64)
            .map_or(1, |n| usize::try_from(n).unwrap_or(usize::MAX));

        let violations: Vec<String> = bundle
            .files
            .iter()
            .filter(|file| !ignores.iter().any(|glob| glob.matches(&file.relative_path)))
            .filter(|file| regex.find_iter(&file.content).take(min_matches).count() < min_matches)
            .map(|file| file.relative_path.clone())
            .collect();

        debug!(
            files = bundle.files.len(),
            violations = violations.len(),
            "regex match check complete"
        );

        if violations.is_empty() {
            return Ok(None);
        }

        Ok(Some(ValidatorFinding {
            observed_behavior: optional_str(params, "failure_message").map_or_else(
                || format!("{} file(s) do not match pattern '{pattern}'", violations.len()),
                str::to_string,
            ),
            expected_behavior: optional_str(params, "expected_behavior").map_or_else(
                || format!("Every file should contain at least {min_matches} match(es) of '{pattern}'"),
                str::to_string,
            ),
            context: format!("Non-matching files: {}", violations.join(", ")),
            file_paths: violations,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::DocumentFile;
    use serde_json::json;

    fn bundle() -> DocumentBundle {
        let mut bundle = DocumentBundle::project("/proj");
        bundle.files = vec![
            DocumentFile {
                relative_path: "docs/a.md".into(),
                file_path: "/proj/docs/a.md".into(),
                content: "## Usage\nrun it".into(),
            },
            DocumentFile {
                relative_path: "docs/b.md".into(),
                file_path: "/proj/docs/b.md".into(),
                content: "no headings".into(),
            },
            DocumentFile {
                relative_path: "build/out.log".into(),
                file_path: "/proj/build/out.log".into(),
                content: "noise".into(),
            },
        ];
        bundle
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_reports_non_matching_files() {
        let finding = RegexMatchValidator
            .execute_rule(&params(json!({"pattern": "^## ", "ignore_patterns": ["*.log"]})), &bundle())
            .unwrap()
            .expect("docs/b.md has no heading");

        assert_eq!(finding.file_paths, vec!["docs/b.md"]);
    }

    #[test]
    fn test_ignored_files_pass() {
        let outcome = RegexMatchValidator
            .execute_rule(
                &params(json!({"pattern": "(?m)^## ", "ignore_patterns": ["docs/b.md", "build/*"]})),
                &bundle(),
            )
            .unwrap();
        assert!(outcome.is_none());
    }

    #[test]
    fn test_min_matches() {
        let outcome = RegexMatchValidator
            .execute_rule(
                &params(json!({"pattern": "run", "min_matches": 2, "ignore_patterns": ["docs/b.md", "build/*"]})),
                &bundle(),
            )
            .unwrap();
        assert_eq!(outcome.unwrap().file_paths, vec!["docs/a.md"]);
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let err = RegexMatchValidator
            .execute_rule(&params(json!({"pattern": "("})), &bundle())
            .unwrap_err();
        assert!(matches!(err, DriftError::Validator { .. }));
    }
}
