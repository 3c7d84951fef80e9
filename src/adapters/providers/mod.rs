//! Model provider adapters.

pub mod anthropic_api;
pub mod mock;
pub mod registry;

pub use anthropic_api::AnthropicProvider;
pub use mock::{ScriptedProvider, ScriptedReply};
pub use registry::build_model_registry;
