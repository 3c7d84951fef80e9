//! JSON input files for conversations and document bundles.
//!
//! Either file may hold a single object or an array of objects.

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::domain::models::{Conversation, DocumentBundle};

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

fn load_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<Vec<T>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {what} file {}", path.display()))?;
    let parsed: OneOrMany<T> = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid {what} JSON in {}", path.display()))?;
    Ok(parsed.into_vec())
}

/// Load conversations from a JSON file.
pub fn load_conversations(path: impl AsRef<Path>) -> Result<Vec<Conversation>> {
    let conversations = load_json(path.as_ref(), "conversation")?;
    tracing::debug!(count = conversations.len(), "loaded conversations");
    Ok(conversations)
}

/// Load document bundles from a JSON file.
pub fn load_bundles(path: impl AsRef<Path>) -> Result<Vec<DocumentBundle>> {
    let bundles = load_json(path.as_ref(), "bundle")?;
    tracing::debug!(count = bundles.len(), "loaded document bundles");
    Ok(bundles)
}
