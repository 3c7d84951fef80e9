//! Resource loader adapters, one per agent tool.

pub mod claude_code;
pub mod mock;

pub use claude_code::ClaudeCodeLoader;
pub use mock::InMemoryLoader;
