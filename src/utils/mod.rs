//! Utility modules shared across the reload subsystem.

pub mod exec;
pub mod glob;
pub mod hash;
pub mod path;
pub mod plural;
