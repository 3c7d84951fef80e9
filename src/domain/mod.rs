//! Domain layer for driftwatch
//!
//! Core models, port traits and error types for drift analysis.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DriftError, DriftResult, ProviderError};
