//! Units of analysis: conversations and document bundles.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::rule::BundleStrategy;

/// One user/agent exchange.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    /// 1-based turn number.
    pub number: u32,
    /// What the user said.
    pub user_message: String,
    /// What the agent answered.
    pub ai_message: String,
}

/// A loaded AI-agent conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    /// Session identifier.
    pub session_id: String,
    /// Agent tool that produced the conversation (e.g. `claude-code`).
    pub agent_tool: String,
    /// Log file the conversation was loaded from.
    #[serde(default)]
    pub file_path: String,
    /// Project the conversation was recorded in.
    #[serde(default)]
    pub project_path: Option<PathBuf>,
    /// Turns in order.
    #[serde(default)]
    pub turns: Vec<Turn>,
}

impl Conversation {
    /// Full transcript with every turn, unelided.
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        for turn in &self.turns {
            let _ = write!(
                out,
                "[Turn {}]\nUser: {}\nAI: {}\n\n",
                turn.number, turn.user_message, turn.ai_message
            );
        }
        out
    }
}

/// One file inside a document bundle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentFile {
    /// Path relative to the project root; identity for deduplication.
    pub relative_path: String,
    /// Absolute path on disk.
    #[serde(default)]
    pub file_path: String,
    /// File contents.
    #[serde(default)]
    pub content: String,
}

/// A grouped set of documents analyzed together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentBundle {
    /// Bundle identifier.
    pub bundle_id: String,
    /// Bundle type matched by rule selectors.
    pub bundle_type: String,
    /// How the bundle was formed.
    #[serde(default)]
    pub bundle_strategy: BundleStrategy,
    /// Project the documents belong to.
    pub project_path: PathBuf,
    /// Files in the bundle.
    #[serde(default)]
    pub files: Vec<DocumentFile>,
}

impl DocumentBundle {
    /// Synthetic bundle used by project-wide programmatic rules that have no
    /// bundle selector.
    pub fn project(project_path: impl Into<PathBuf>) -> Self {
        Self {
            bundle_id: "project".to_string(),
            bundle_type: "project".to_string(),
            bundle_strategy: BundleStrategy::Individual,
            project_path: project_path.into(),
            files: Vec::new(),
        }
    }

    /// Merge bundles into one deduplicated collection bundle.
    ///
    /// Files are kept in discovery order; a relative path seen again in a
    /// later bundle is dropped. Returns `None` for an empty input.
    pub fn merge_collection(bundles: &[&Self]) -> Option<Self> {
        let first = bundles.first()?;
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for bundle in bundles {
            for file in &bundle.files {
                if seen.insert(file.relative_path.clone()) {
                    files.push(file.clone());
                }
            }
        }

        Some(Self {
            bundle_id: format!("{}_collection", first.bundle_type),
            bundle_type: first.bundle_type.clone(),
            bundle_strategy: BundleStrategy::Collection,
            project_path: first.project_path.clone(),
            files,
        })
    }

    /// Relative paths of the bundled files.
    pub fn file_paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.relative_path.clone()).collect()
    }

    /// Documents rendered for inclusion in a prompt.
    pub fn formatted_documents(&self) -> String {
        let mut out = String::new();
        for file in &self.files {
            let _ = write!(out, "### {}\n```\n{}\n```\n\n", file.relative_path, file.content);
        }
        out
    }
}

/// The thing a rule is run against.
#[derive(Debug, Clone, Copy)]
pub enum AnalysisUnit<'a> {
    /// A conversation.
    Conversation(&'a Conversation),
    /// A document bundle.
    Bundle(&'a DocumentBundle),
}

impl<'a> AnalysisUnit<'a> {
    /// Identifier used in results and execution details.
    pub fn id(&self) -> &'a str {
        match *self {
            Self::Conversation(c) => &c.session_id,
            Self::Bundle(b) => &b.bundle_id,
        }
    }

    /// Project directory resources are resolved against.
    pub fn project_path(&self) -> &'a Path {
        match *self {
            Self::Conversation(c) => c.project_path.as_deref().unwrap_or_else(|| Path::new(".")),
            Self::Bundle(b) => &b.project_path,
        }
    }

    /// Whether this unit is a conversation.
    pub const fn is_conversation(&self) -> bool {
        matches!(self, Self::Conversation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(id: &str, paths: &[&str]) -> DocumentBundle {
        DocumentBundle {
            bundle_id: id.to_string(),
            bundle_type: "skill".to_string(),
            bundle_strategy: BundleStrategy::Collection,
            project_path: PathBuf::from("/proj"),
            files: paths
                .iter()
                .map(|p| DocumentFile {
                    relative_path: (*p).to_string(),
                    file_path: format!("/proj/{p}"),
                    content: format!("from {id}"),
                })
                .collect(),
        }
    }

    #[test]
    fn test_merge_collection_drops_later_duplicates() {
        let a = bundle("a", &["skills/x.md", "skills/y.md"]);
        let b = bundle("b", &["skills/y.md", "skills/z.md"]);

        let merged = DocumentBundle::merge_collection(&[&a, &b]).expect("non-empty");

        assert_eq!(merged.file_paths(), vec!["skills/x.md", "skills/y.md", "skills/z.md"]);
        let y = merged.files.iter().find(|f| f.relative_path == "skills/y.md").unwrap();
        assert_eq!(y.content, "from a");
        assert_eq!(merged.bundle_id, "skill_collection");
    }

    #[test]
    fn test_merge_collection_empty() {
        assert!(DocumentBundle::merge_collection(&[]).is_none());
    }

    #[test]
    fn test_transcript_includes_every_turn() {
        let conversation = Conversation {
            session_id: "s1".into(),
            agent_tool: "claude-code".into(),
            file_path: "/logs/s1.jsonl".into(),
            project_path: None,
            turns: (1..=3)
                .map(|n| Turn {
                    number: n,
                    user_message: format!("question {n}"),
                    ai_message: format!("answer {n}"),
                })
                .collect(),
        };

        let transcript = conversation.transcript();
        for n in 1..=3 {
            assert!(transcript.contains(&format!("[Turn {n}]")));
            assert!(transcript.contains(&format!("answer {n}")));
        }
    }
}
