//! Core types - pure abstractions shared across the codebase.

mod identity;
mod module;
mod state;

pub use identity::ScriptIdentity;
pub use module::{Instance, Module};
pub use state::{is_shutdown, register_shutdown, setup_shutdown_handler};
