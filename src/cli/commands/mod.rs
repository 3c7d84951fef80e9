//! CLI command handlers.

pub mod analyze;
pub mod rules;
