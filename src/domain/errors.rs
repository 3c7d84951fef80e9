//! Domain errors for the drift analysis engine.

use thiserror::Error;

/// Error text signatures that identify a provider-wide outage when a
/// provider only reports an untyped message.
const SYSTEMIC_SIGNATURES: &[&str] = &[
    "ThrottlingException",
    "ServiceUnavailableException",
    "ServiceException",
    "ValidationException",
    "AccessDeniedException",
    "provider unavailable",
    "rate limit",
];

/// Errors raised by a model provider while generating a completion.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider cannot serve requests at all.
    #[error("Model provider unavailable: {0}")]
    Unavailable(String),

    /// The provider throttled the request.
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// A single request exceeded its timeout.
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Credentials were missing or rejected.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The provider rejected the request shape or model id.
    #[error("Request rejected by provider (ValidationException): {0}")]
    Validation(String),

    /// Internal provider failure.
    #[error("Provider service error (ServiceException): {0}")]
    ServiceException(String),

    /// Untyped provider error, classified by its message.
    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    /// Whether every subsequent call would fail the same way.
    ///
    /// Typed variants decide directly; `Other` falls back to matching the
    /// message against known provider exception names.
    pub fn is_systemic(&self) -> bool {
        match self {
            Self::Unavailable(_)
            | Self::RateLimited(_)
            | Self::Authentication(_)
            | Self::Validation(_)
            | Self::ServiceException(_) => true,
            Self::Timeout(_) => false,
            Self::Other(message) => matches_systemic_signature(message),
        }
    }
}

fn matches_systemic_signature(message: &str) -> bool {
    let lowered = message.to_lowercase();
    SYSTEMIC_SIGNATURES
        .iter()
        .any(|sig| lowered.contains(&sig.to_lowercase()))
}

/// Domain-level errors that can occur while analyzing drift.
#[derive(Debug, Error)]
pub enum DriftError {
    /// Invalid rules, models, validators or parameters.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Model provider failure.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A resource loader failed for reasons other than absence.
    #[error("Resource loading failed for {resource}: {reason}")]
    ResourceLoad {
        /// `type:id` of the resource.
        resource: String,
        /// Underlying failure.
        reason: String,
    },

    /// A programmatic validator could not run.
    #[error("Validator '{validator}' failed: {reason}")]
    Validator {
        /// Validator type.
        validator: String,
        /// Underlying failure.
        reason: String,
    },

    /// Malformed analysis input.
    #[error("Input error: {0}")]
    Input(String),

    /// JSON encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriftError {
    /// Whether this error must abort the whole analysis run.
    pub fn is_systemic(&self) -> bool {
        match self {
            Self::Provider(err) => err.is_systemic(),
            _ => false,
        }
    }

    /// Shorthand for building a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// Result alias for domain operations.
pub type DriftResult<T> = Result<T, DriftError>;

impl From<serde_json::Error> for DriftError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
