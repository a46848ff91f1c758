//! Compilation pipelines: source file to loadable module.
//!
//! The reload orchestrator only sees the [`CompilationPipeline`] contract.
//! Two implementations ship with the crate:
//!
//! - [`CommandPipeline`]: runs an external compiler command and parses its
//!   diagnostics
//! - [`SourcePipeline`]: loads the source text itself as the module
//!
//! # Contract
//!
//! ```text
//! compile(path) ─┬─► Ok(success = true, module)      install
//!                ├─► Ok(success = false, diagnostics) expected failure, roll back
//!                └─► Err(_) / panic                   unexpected, emergency rollback
//! ```
//!
//! `compile` runs on the blocking pool and may be called concurrently for
//! different scripts, so implementations must be `Send + Sync`.

mod command;
pub mod diagnostic;
mod result;
mod source;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use command::CommandPipeline;
pub use result::{CompilationDiagnostic, CompilationResult, Severity};
pub use source::SourcePipeline;

/// Source-to-module compiler used by the reload orchestrator.
pub trait CompilationPipeline: Send + Sync + 'static {
    /// Compile the script at `path`.
    ///
    /// A syntax error is `Ok` with `success == false`; `Err` is reserved for
    /// the pipeline itself breaking (missing compiler, unreadable file).
    fn compile(&self, path: &Path) -> Result<CompilationResult, PipelineError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Pipeline failures that are not compile errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read `{0}`")]
    Io(PathBuf, #[source] io::Error),

    #[error("failed to run `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Other(String),
}
