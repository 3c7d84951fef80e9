//! Adapters for external systems: model providers, per-tool resource
//! loaders and the built-in validators.

pub mod loaders;
pub mod providers;
pub mod validators;
