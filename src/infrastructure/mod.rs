//! Infrastructure layer module
//!
//! Configuration loading, logging setup and input file parsing.

pub mod config;
pub mod input;
pub mod logging;
