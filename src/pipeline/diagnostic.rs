//! Parse compiler output into structured diagnostics.
//!
//! Recognized line shapes:
//!
//! ```text
//! enemy.lua:3:7: error[E042]: unexpected symbol     (path:line:col: severity[code]: msg)
//! enemy.lua:3: warning: unused local 'x'            (column defaults to 1)
//! luac: enemy.lua:3: '=' expected near 'x'          (program prefix, no severity = error)
//! ```

use regex::Regex;
use std::sync::LazyLock;

use super::result::{CompilationDiagnostic, Severity};
use crate::utils::exec::strip_ansi;

static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[A-Za-z0-9_.-]+:[ \t]+)?(?P<file>[^: \t][^:]*):(?P<line>[0-9]+):(?:(?P<col>[0-9]+):)?[ \t]*(?P<rest>.*)$",
    )
    .expect("static location pattern")
});

static SEVERITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<sev>(?i-u:fatal error|error|warning|warn|note|info|help|hint))(?:\[(?P<code>[^\]]+)\])?:[ \t]*(?P<msg>.*)$",
    )
    .expect("static severity pattern")
});

/// Parse every recognizable diagnostic line in `output`.
pub fn parse_diagnostics(output: &str) -> Vec<CompilationDiagnostic> {
    output
        .lines()
        .filter_map(|line| parse_line(strip_ansi(line).trim()))
        .collect()
}

/// Parse a single line; `None` for lines that carry no location.
pub fn parse_line(line: &str) -> Option<CompilationDiagnostic> {
    let caps = LOCATION.captures(line)?;
    // Positions are 1-based; some tools print 0 for "unknown".
    let line_no: u32 = caps.name("line")?.as_str().parse::<u32>().ok()?.max(1);
    let column: u32 = caps
        .name("col")
        .and_then(|c| c.as_str().parse::<u32>().ok())
        .unwrap_or(1)
        .max(1);
    let rest = caps.name("rest").map_or("", |m| m.as_str()).trim();

    let diagnostic = match SEVERITY.captures(rest) {
        Some(sev) => {
            let severity = sev
                .name("sev")
                .and_then(|s| Severity::parse(s.as_str()))
                .unwrap_or(Severity::Error);
            let message = sev.name("msg").map_or("", |m| m.as_str()).trim();
            let diagnostic = CompilationDiagnostic::new(severity, message, line_no, column);
            match sev.name("code") {
                Some(code) => diagnostic.with_code(code.as_str()),
                None => diagnostic,
            }
        }
        None => CompilationDiagnostic::error(rest, line_no, column),
    };

    Some(diagnostic)
}
