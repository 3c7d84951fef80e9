//! Validator port - programmatic checks run against document bundles.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::errors::DriftResult;
use crate::domain::models::DocumentBundle;

/// A failed programmatic check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidatorFinding {
    /// What the check found.
    pub observed_behavior: String,
    /// What the check expected.
    pub expected_behavior: String,
    /// Supporting detail.
    #[serde(default)]
    pub context: String,
    /// Bundle-relative paths the failure refers to.
    #[serde(default)]
    pub file_paths: Vec<String>,
}

/// A programmatic validator.
///
/// `Ok(None)` means the bundle passed; `Ok(Some(_))` describes the drift.
pub trait Validator: Send + Sync {
    /// Type tag used in phase definitions, e.g. `core:file_exists`.
    fn validator_type(&self) -> &'static str;

    fn execute_rule(
        &self,
        params: &Map<String, Value>,
        bundle: &DocumentBundle,
    ) -> DriftResult<Option<ValidatorFinding>>;
}
