//! Registry of programmatic validators.
//!
//! Constructed once at process start and passed by `Arc` to whatever runs
//! programmatic phases.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::adapters::validators::{FileExistsValidator, RegexMatchValidator};
use crate::domain::errors::{DriftError, DriftResult};
use crate::domain::ports::Validator;

/// Validators keyed by their type tag.
#[derive(Default)]
pub struct ValidatorRegistry {
    validators: BTreeMap<String, Arc<dyn Validator>>,
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("validators", &self.validators.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ValidatorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in `core:` validators.
    pub fn with_builtins() -> Self {
        Self::new()
            .with_validator(Arc::new(FileExistsValidator))
            .with_validator(Arc::new(RegexMatchValidator))
    }

    /// Register a validator under its type.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validators
            .insert(validator.validator_type().to_string(), validator);
        self
    }

    /// Whether `validator_type` is registered.
    pub fn contains(&self, validator_type: &str) -> bool {
        self.validators.contains_key(validator_type)
    }

    /// Look up a validator; unknown types are configuration errors.
    pub fn get(&self, validator_type: &str) -> DriftResult<&Arc<dyn Validator>> {
        self.validators.get(validator_type).ok_or_else(|| {
            DriftError::configuration(format!("unknown validator type '{validator_type}'"))
        })
    }

    /// Registered validator types.
    pub fn validator_types(&self) -> Vec<&str> {
        self.validators.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered() {
        let registry = ValidatorRegistry::with_builtins();
        assert_eq!(registry.validator_types(), vec!["core:file_exists", "core:regex_match"]);
        assert!(registry.get("core:file_exists").is_ok());
    }

    #[test]
    fn test_unknown_validator() {
        let registry = ValidatorRegistry::new();
        assert!(!registry.contains("core:file_exists"));
        assert!(matches!(
            registry.get("core:file_exists"),
            Err(DriftError::Configuration(_))
        ));
    }
}
