//! Command-line interface module.

mod args;
pub mod backups;
pub mod watch;

pub use args::{Cli, Commands, WatchArgs};
