//! Built-in programmatic validators.

pub mod file_exists;
pub mod regex_match;

pub use file_exists::FileExistsValidator;
pub use regex_match::RegexMatchValidator;

use serde_json::{Map, Value};

use crate::domain::errors::{DriftError, DriftResult};

fn invalid(validator: &str, reason: impl Into<String>) -> DriftError {
    DriftError::Validator {
        validator: validator.to_string(),
        reason: reason.into(),
    }
}

/// Required string parameter.
pub(crate) fn required_str<'a>(
    params: &'a Map<String, Value>,
    validator: &str,
    key: &str,
) -> DriftResult<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| invalid(validator, format!("missing string parameter '{key}'")))
}

/// Optional string parameter.
pub(crate) fn optional_str<'a>(params: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str)
}

/// Optional list of strings; a bare string counts as a one-element list.
pub(crate) fn str_list(
    params: &Map<String, Value>,
    validator: &str,
    key: &str,
) -> DriftResult<Vec<String>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(value)) => Ok(vec![value.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid(validator, format!("'{key}' must contain strings")))
            })
            .collect(),
        Some(_) => Err(invalid(validator, format!("'{key}' must be a list of strings"))),
    }
}
