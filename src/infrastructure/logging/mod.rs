//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber. Logs go to
//! stderr so JSON results on stdout stay machine-readable; an optional
//! rolling file sink is added when a log directory is configured.

pub mod logger;

pub use logger::{parse_log_level, LoggerImpl};
