//! `core:file_exists`: a required file must be present in the project.

use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::errors::DriftResult;
use crate::domain::models::DocumentBundle;
use crate::domain::ports::{Validator, ValidatorFinding};

use super::{optional_str, required_str};

/// Type tag of this validator.
pub const VALIDATOR_TYPE: &str = "core:file_exists";

/// Fails when `file_path` (relative to the bundle's project) does not exist.
///
/// Optional `failure_message` and `expected_behavior` replace the default
/// finding text.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileExistsValidator;

impl Validator for FileExistsValidator {
    fn validator_type(&self) -> &'static str {
        VALIDATOR_TYPE
    }

    fn execute_rule(
        &self,
        params: &Map<String, Value>,
        bundle: &DocumentBundle,
    ) -> DriftResult<Option<ValidatorFinding>> {
        let file_path = required_str(params, VALIDATOR_TYPE, "file_path")?;
        let absolute = bundle.project_path.join(file_path);
        debug!(path = %absolute.display(), "checking file exists");

        if absolute.exists() {
            return Ok(None);
        }

        Ok(Some(ValidatorFinding {
            observed_behavior: optional_str(params, "failure_message")
                .map_or_else(|| format!("File '{file_path}' does not exist"), str::to_string),
            expected_behavior: optional_str(params, "expected_behavior")
                .map_or_else(|| format!("File '{file_path}' should exist"), str::to_string),
            context: format!("Checked {}", absolute.display()),
            file_paths: vec![file_path.to_string()],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DriftError;
    use serde_json::json;
    use tempfile::TempDir;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_present_file_passes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("README.md"), "# Readme").unwrap();
        let bundle = DocumentBundle::project(dir.path());

        let outcome = FileExistsValidator
            .execute_rule(&params(json!({"file_path": "README.md"})), &bundle)
            .unwrap();

        assert!(outcome.is_none());
    }

    #[test]
    fn test_missing_file_fails_with_custom_message() {
        let dir = TempDir::new().unwrap();
        let bundle = DocumentBundle::project(dir.path());

        let finding = FileExistsValidator
            .execute_rule(
                &params(json!({"file_path": "CLAUDE.md", "failure_message": "No CLAUDE.md"})),
                &bundle,
            )
            .unwrap()
            .unwrap();

        assert_eq!(finding.observed_behavior, "No CLAUDE.md");
        assert_eq!(finding.expected_behavior, "File 'CLAUDE.md' should exist");
        assert_eq!(finding.file_paths, vec!["CLAUDE.md"]);
    }

    #[test]
    fn test_missing_param_is_error() {
        let bundle = DocumentBundle::project(".");
        let err = FileExistsValidator
            .execute_rule(&Map::new(), &bundle)
            .unwrap_err();
        assert!(matches!(err, DriftError::Validator { .. }));
    }
}
