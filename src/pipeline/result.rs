//! Compilation results and diagnostics.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::Module;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    /// Parse the severity word compilers print (`error`, `warning`, `note`, ...).
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "error" | "fatal" | "fatal error" => Some(Self::Error),
            "warning" | "warn" => Some(Self::Warning),
            "info" | "note" | "help" | "hint" => Some(Self::Info),
            _ => None,
        }
    }
}

/// A single compiler diagnostic. `line` and `column` are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationDiagnostic {
    pub severity: Severity,
    pub message: String,
    pub line: u32,
    pub column: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl CompilationDiagnostic {
    pub fn new(severity: Severity, message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            severity,
            message: message.into(),
            line: line.max(1),
            column: column.max(1),
            code: None,
        }
    }

    pub fn error(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self::new(Severity::Error, message, line, column)
    }

    pub fn warning(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self::new(Severity::Warning, message, line, column)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for CompilationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.severity.label())?;
        if let Some(code) = &self.code {
            write!(f, "[{code}]")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Outcome of one compilation attempt.
///
/// `success == false` is an expected outcome (a syntax or semantic error in
/// the edited script), not an exceptional one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilationResult {
    pub success: bool,
    pub module: Option<Module>,
    pub diagnostics: Vec<CompilationDiagnostic>,
    pub errors: Vec<String>,
}

impl CompilationResult {
    /// A successful compilation producing `module`.
    pub fn compiled(module: Module) -> Self {
        Self {
            success: true,
            module: Some(module),
            ..Self::default()
        }
    }

    /// A failed compilation with diagnostics.
    pub fn failed(diagnostics: Vec<CompilationDiagnostic>) -> Self {
        Self {
            success: false,
            diagnostics,
            ..Self::default()
        }
    }

    /// A failed compilation described only by free-form error lines.
    pub fn failed_with_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            errors,
            ..Self::default()
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<CompilationDiagnostic>) -> Self {
        self.diagnostics.extend(diagnostics);
        self
    }

    /// Success with a module attached. `success == true` without a module is
    /// malformed and handled as a failure.
    pub fn is_installable(&self) -> bool {
        self.success && self.module.is_some()
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count() + self.errors.len()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &CompilationDiagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    /// Multi-line human summary of the diagnostics and error lines.
    pub fn summary(&self) -> String {
        let mut lines: Vec<String> = self.diagnostics.iter().map(ToString::to_string).collect();
        lines.extend(self.errors.iter().cloned());
        if lines.is_empty() && self.success && self.module.is_none() {
            lines.push("pipeline reported success without a module".to_string());
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_parse() {
        assert_eq!(Severity::parse("error"), Some(Severity::Error));
        assert_eq!(Severity::parse("Warning"), Some(Severity::Warning));
        assert_eq!(Severity::parse("note"), Some(Severity::Info));
        assert_eq!(Severity::parse("bogus"), None);
    }

    #[test]
    fn test_diagnostic_positions_are_one_based() {
        let diag = CompilationDiagnostic::error("unexpected symbol", 0, 0);
        assert_eq!((diag.line, diag.column), (1, 1));
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = CompilationDiagnostic::error("unexpected symbol", 3, 7).with_code("E042");
        assert_eq!(diag.to_string(), "3:7: error[E042]: unexpected symbol");
    }

    #[test]
    fn test_malformed_success_is_not_installable() {
        let result = CompilationResult {
            success: true,
            ..CompilationResult::default()
        };
        assert!(!result.is_installable());
        assert!(result.summary().contains("without a module"));
    }

    #[test]
    fn test_error_count_includes_free_form_errors() {
        let result = CompilationResult::failed_with_errors(vec!["linker exploded".into()])
            .with_diagnostics(vec![
                CompilationDiagnostic::error("a", 1, 1),
                CompilationDiagnostic::warning("b", 2, 1),
            ]);
        assert_eq!(result.error_count(), 2);
        assert_eq!(result.warnings().count(), 1);
    }
}
