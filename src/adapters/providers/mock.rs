//! Scripted model provider for testing.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::errors::ProviderError;
use crate::domain::ports::ModelProvider;

/// One queued reply.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Completion text.
    Output(String),
    /// Error returned instead of a completion.
    Failure(ProviderError),
}

#[derive(Debug, Default)]
struct ScriptState {
    replies: VecDeque<ScriptedReply>,
    prompts: Vec<String>,
}

/// Provider that replays queued replies in order and records every prompt.
///
/// Once the queue is drained it answers with the fallback output, if one was
/// set, and otherwise fails with a non-systemic error.
#[derive(Debug)]
pub struct ScriptedProvider {
    state: Mutex<ScriptState>,
    fallback: Option<String>,
    available: bool,
}

impl ScriptedProvider {
    /// Create a provider with an empty script.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ScriptState::default()),
            fallback: None,
            available: true,
        }
    }

    /// Queue a successful completion.
    #[must_use]
    pub fn with_response(self, output: impl Into<String>) -> Self {
        self.push(ScriptedReply::Output(output.into()));
        self
    }

    /// Queue a provider failure.
    #[must_use]
    pub fn with_error(self, error: ProviderError) -> Self {
        self.push(ScriptedReply::Failure(error));
        self
    }

    /// Output returned once the queue is empty.
    #[must_use]
    pub fn with_fallback(mut self, output: impl Into<String>) -> Self {
        self.fallback = Some(output.into());
        self
    }

    /// Report the provider as unreachable.
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Queue a reply on a shared provider.
    pub fn push(&self, reply: ScriptedReply) {
        self.lock().replies.push_back(reply);
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.lock().prompts.clone()
    }

    /// Number of completions requested.
    pub fn call_count(&self) -> usize {
        self.lock().prompts.len()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn provider_id(&self) -> &str {
        "scripted"
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let reply = {
            let mut state = self.lock();
            state.prompts.push(prompt.to_string());
            state.replies.pop_front()
        };

        match (reply, &self.fallback) {
            (Some(ScriptedReply::Output(output)), _) => Ok(output),
            (Some(ScriptedReply::Failure(error)), _) => Err(error),
            (None, Some(fallback)) => Ok(fallback.clone()),
            (None, None) => Err(ProviderError::Other(
                "scripted provider has no reply left".to_string(),
            )),
        }
    }
}
