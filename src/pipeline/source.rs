//! Passthrough pipeline: the script source is the module.
//!
//! Used when no compile command is configured, for hosts that interpret
//! source directly. The only check is that the file is valid UTF-8.

use std::fs;
use std::path::Path;

use super::{CompilationDiagnostic, CompilationPipeline, CompilationResult, PipelineError};
use crate::core::Module;

#[derive(Debug, Clone, Copy, Default)]
pub struct SourcePipeline;

impl CompilationPipeline for SourcePipeline {
    fn compile(&self, path: &Path) -> Result<CompilationResult, PipelineError> {
        let bytes = fs::read(path).map_err(|e| PipelineError::Io(path.to_path_buf(), e))?;

        match std::str::from_utf8(&bytes) {
            Ok(_) => Ok(CompilationResult::compiled(Module::new(bytes))),
            Err(e) => {
                let (line, column) = position_of(&bytes[..e.valid_up_to()]);
                Ok(CompilationResult::failed(vec![CompilationDiagnostic::error(
                    "source is not valid UTF-8",
                    line,
                    column,
                )]))
            }
        }
    }

    fn name(&self) -> &str {
        "source"
    }
}

/// 1-based line/column just past `valid`, which is known to be UTF-8.
fn position_of(valid: &[u8]) -> (u32, u32) {
    let text = String::from_utf8_lossy(valid);
    let line = text.matches('\n').count() + 1;
    let column = text.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    (
        u32::try_from(line).unwrap_or(u32::MAX),
        u32::try_from(column).unwrap_or(u32::MAX),
    )
}
