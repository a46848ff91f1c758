//! External compiler command pipeline.
//!
//! # Placeholders
//!
//! | Placeholder | Replaced with                                  |
//! |-------------|------------------------------------------------|
//! | `{input}`   | absolute path of the script being compiled     |
//! | `{output}`  | scratch file the compiler must write to        |
//!
//! The module payload is the `{output}` file when the command names one,
//! otherwise the source itself (the command is then a checker, e.g.
//! `luac -p {input}`). Without `{input}` the source is piped on stdin.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use super::diagnostic::parse_diagnostics;
use super::{CompilationPipeline, CompilationResult, PipelineError};
use crate::core::{Module, ScriptIdentity};
use crate::debug;
use crate::utils::exec::{Cmd, strip_ansi};

const INPUT: &str = "{input}";
const OUTPUT: &str = "{output}";

/// Environment variable carrying the script path to the compiler.
pub const IDENTITY_ENV: &str = "SCRIPTSWAP_IDENTITY";

/// Scratch files are never shared, not even by two compiles of one script.
static SCRATCH_SEQ: AtomicU64 = AtomicU64::new(0);

/// Runs a configured compiler command per script.
#[derive(Debug, Clone)]
pub struct CommandPipeline {
    command: Vec<String>,
    cwd: Option<PathBuf>,
    scratch_dir: PathBuf,
    name: String,
}

impl CommandPipeline {
    /// `command[0]` is the program; remaining items are arguments.
    pub fn new(command: Vec<String>) -> Self {
        let name = command
            .first()
            .map(|p| {
                Path::new(p)
                    .file_name()
                    .map_or_else(|| p.clone(), |n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_default();
        Self {
            command,
            cwd: None,
            scratch_dir: std::env::temp_dir(),
            name,
        }
    }

    /// Working directory for the compiler process.
    pub fn with_cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Directory holding `{output}` scratch files.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    fn scratch_path(&self, identity: &ScriptIdentity) -> PathBuf {
        let seq = SCRATCH_SEQ.fetch_add(1, Ordering::Relaxed);
        self.scratch_dir.join(format!(
            "scriptswap-{}-{}-{seq}.out",
            &identity.key()[..16],
            std::process::id()
        ))
    }

    fn uses(&self, placeholder: &str) -> bool {
        self.command.iter().any(|arg| arg.contains(placeholder))
    }

    fn expand(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.command
            .iter()
            .map(|arg| arg.replace(INPUT, &input).replace(OUTPUT, &output))
            .collect()
    }
}

impl CompilationPipeline for CommandPipeline {
    fn compile(&self, path: &Path) -> Result<CompilationResult, PipelineError> {
        if self.command.is_empty() {
            return Err(PipelineError::Other("compile command is empty".into()));
        }

        let identity = ScriptIdentity::from_path(path);
        let source = fs::read(identity.path())
            .map_err(|e| PipelineError::Io(identity.path().to_path_buf(), e))?;

        let writes_output = self.uses(OUTPUT);
        let output_path = self.scratch_path(&identity);

        let argv = self.expand(identity.path(), &output_path);
        let mut cmd = Cmd::from_slice(&argv).envs([(
            IDENTITY_ENV,
            identity.path().to_string_lossy().as_ref(),
        )]);
        if let Some(dir) = &self.cwd {
            cmd = cmd.cwd(dir);
        }
        if !self.uses(INPUT) {
            cmd = cmd.stdin(&source);
        }

        let program = cmd.program_name();
        debug!("compile"; "{} {}", program, identity.name());
        let output = cmd
            .output()
            .map_err(|source| PipelineError::Spawn { program, source })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let diagnostics = parse_diagnostics(&format!("{stderr}\n{stdout}"));

        if !output.status.success() {
            let _ = fs::remove_file(&output_path);
            let result = CompilationResult::failed(diagnostics);
            if result.error_count() > 0 {
                return Ok(result);
            }
            // Nothing parseable; keep the raw stderr so the user sees something.
            let mut errors: Vec<String> = stderr
                .lines()
                .map(|l| strip_ansi(l).trim().to_string())
                .filter(|l| !l.is_empty())
                .collect();
            if errors.is_empty() {
                errors.push(format!("{} exited with {}", self.name, output.status));
            }
            return Ok(CompilationResult::failed_with_errors(errors)
                .with_diagnostics(result.diagnostics));
        }

        let payload = if writes_output {
            let bytes = fs::read(&output_path).map_err(|e| PipelineError::Io(output_path.clone(), e));
            let _ = fs::remove_file(&output_path);
            bytes?
        } else {
            source
        };

        Ok(CompilationResult::compiled(Module::new(payload)).with_diagnostics(diagnostics))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::pipeline::Severity;
    use tempfile::TempDir;

    fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    fn sh(script: &str) -> CommandPipeline {
        CommandPipeline::new(vec!["sh".into(), "-c".into(), script.into()])
    }

    #[test]
    fn test_name_is_program_file_name() {
        let pipeline = CommandPipeline::new(vec!["/usr/bin/luac".into(), "-p".into()]);
        assert_eq!(pipeline.name(), "luac");
    }

    #[test]
    fn test_checker_command_uses_source_as_module() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "ok.lua", "return 1");

        let result = sh("test -f {input}").compile(&path).unwrap();
        assert!(result.is_installable());
        assert_eq!(result.module.unwrap().payload(), b"return 1");
    }

    #[test]
    fn test_output_placeholder_becomes_payload() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "ok.lua", "return 1");
        let pipeline = sh("printf compiled > {output}").with_scratch_dir(dir.path());

        let result = pipeline.compile(&path).unwrap();
        assert_eq!(result.module.unwrap().payload(), b"compiled");

        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().ends_with(".out"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_scratch_paths_are_unique() {
        let pipeline = sh("true");
        let id = ScriptIdentity::from_path(Path::new("/scripts/a.lua"));
        assert_ne!(pipeline.scratch_path(&id), pipeline.scratch_path(&id));
    }

    #[test]
    fn test_failure_parses_diagnostics() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "bad.lua", "x = ");
        let pipeline = sh("echo \"{input}:1:5: error[E1]: unexpected end\" >&2; exit 1");

        let result = pipeline.compile(&path).unwrap();
        assert!(!result.success);
        assert_eq!(result.diagnostics.len(), 1);
        let diag = &result.diagnostics[0];
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!((diag.line, diag.column), (1, 5));
    }

    #[test]
    fn test_unparseable_failure_keeps_stderr() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "bad.lua", "x = ");

        let result = sh("echo 'segfault in parser' >&2; exit 2").compile(&path).unwrap();
        assert!(!result.success);
        assert_eq!(result.errors, vec!["segfault in parser".to_string()]);
    }

    #[test]
    fn test_source_piped_without_input_placeholder() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "piped.lua", "abc");
        let pipeline = sh("cat > {output}").with_scratch_dir(dir.path());

        let result = pipeline.compile(&path).unwrap();
        assert_eq!(result.module.unwrap().payload(), b"abc");
    }

    #[test]
    fn test_identity_env_is_set() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "env.lua", "");
        let pipeline = sh("printf \"$SCRIPTSWAP_IDENTITY\" > {output}").with_scratch_dir(dir.path());

        let result = pipeline.compile(&path).unwrap();
        let expected = ScriptIdentity::from_path(&path);
        assert_eq!(
            result.module.unwrap().payload(),
            expected.path().to_string_lossy().as_bytes()
        );
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "a.lua", "");
        let pipeline = CommandPipeline::new(vec!["scriptswap-no-such-compiler".into()]);

        let err = pipeline.compile(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Spawn { .. }));
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = sh("true").compile(&dir.path().join("gone.lua")).unwrap_err();
        assert!(matches!(err, PipelineError::Io(..)));
    }
}
