//! Logging utilities with colored output.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `debug!` macro, only printed with `--verbose`
//! - `WatchStatus` for timestamped reload status lines
//!
//! # Example
//!
//! ```ignore
//! log!("reload"; "compiled {} in {:?}", identity, elapsed);
//! debug!("debounce"; "coalesced change: {}", path.display());
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{Write, stdout},
    sync::LazyLock,
    sync::atomic::{AtomicBool, Ordering},
};

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when --verbose is enabled)
///
/// # Usage
/// ```ignore
/// debug!("module"; "debug info: {}", value);
/// ```
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
#[inline]
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);

    let mut stdout = stdout().lock();
    execute!(stdout, Clear(ClearType::UntilNewLine)).ok();
    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
    drop(stdout);

    // A plain log line breaks the status block; never move the cursor over it.
    WATCH_STATUS.lock().detach();
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> String {
    let prefix = format!("[{module}]");
    match module_lower {
        "watch" | "debounce" => prefix.bright_green().bold().to_string(),
        "reload" | "compile" => prefix.bright_blue().bold().to_string(),
        "rollback" | "backup" => prefix.bright_magenta().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Watch Status (timestamped status block with overwrite)
// ============================================================================

/// Get current UTC time formatted as HH:MM:SS
fn now() -> String {
    use std::time::SystemTime;
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Status display for watch mode
///
/// Dismissable messages overwrite the previous dismissable block, keeping
/// the terminal clean during edit loops. Sticky messages stay on screen.
///
/// # Example
///
/// ```ignore
/// let mut status = WatchStatus::new();
/// status.success("reloaded enemy.lua (v3)", true);
/// status.error("enemy.lua: no backup", "3:5 unexpected symbol", false);
/// ```
pub struct WatchStatus {
    /// Lines of previous dismissable output to clear
    last_lines: usize,
}

/// Global watch status display shared by every notification source.
static WATCH_STATUS: LazyLock<Mutex<WatchStatus>> =
    LazyLock::new(|| Mutex::new(WatchStatus::new()));

impl WatchStatus {
    /// Create a new watch status display.
    pub const fn new() -> Self {
        Self { last_lines: 0 }
    }

    /// Display info message (dimmed, no symbol).
    pub fn info(&mut self, message: &str, dismiss: bool) {
        self.display(String::new(), &format!("{}", message.dimmed()), dismiss);
    }

    /// Display success message (✓ prefix, green).
    pub fn success(&mut self, message: &str, dismiss: bool) {
        self.display(format!("{}", "✓".green()), message, dismiss);
    }

    /// Display error message (✗ prefix, red) with optional detail.
    pub fn error(&mut self, summary: &str, detail: &str, dismiss: bool) {
        self.display(format!("{}", "✗".red()), &join_detail(summary, detail), dismiss);
    }

    /// Display warning message (⚠ prefix, yellow) with optional detail.
    pub fn warning(&mut self, summary: &str, detail: &str, dismiss: bool) {
        self.display(format!("{}", "⚠".yellow()), &join_detail(summary, detail), dismiss);
    }

    /// Forget the previous block so the next message never overwrites it.
    fn detach(&mut self) {
        self.last_lines = 0;
    }

    fn display(&mut self, symbol: String, message: &str, dismiss: bool) {
        let mut stdout = stdout().lock();

        if self.last_lines > 0 {
            #[allow(clippy::cast_possible_truncation)]
            let lines = self.last_lines as u16;
            execute!(stdout, cursor::MoveUp(lines)).ok();
            execute!(stdout, Clear(ClearType::FromCursorDown)).ok();
        }

        let timestamp = format!("[{}]", now()).dimmed().to_string();
        let line = if symbol.is_empty() {
            format!("{timestamp} {message}")
        } else {
            format!("{timestamp} {symbol} {message}")
        };

        writeln!(stdout, "{line}").ok();
        stdout.flush().ok();

        self.last_lines = if dismiss {
            message.matches('\n').count() + 1
        } else {
            0
        };
    }
}

impl Default for WatchStatus {
    fn default() -> Self {
        Self::new()
    }
}

fn join_detail(summary: &str, detail: &str) -> String {
    if detail.is_empty() {
        summary.to_string()
    } else {
        format!("{summary}\n{detail}")
    }
}

/// Global watch status: info
pub fn status_info(message: &str, dismiss: bool) {
    WATCH_STATUS.lock().info(message, dismiss);
}

/// Global watch status: success
pub fn status_success(message: &str, dismiss: bool) {
    WATCH_STATUS.lock().success(message, dismiss);
}

/// Global watch status: error
pub fn status_error(summary: &str, detail: &str, dismiss: bool) {
    WATCH_STATUS.lock().error(summary, detail, dismiss);
}

/// Global watch status: warning
pub fn status_warning(summary: &str, detail: &str, dismiss: bool) {
    WATCH_STATUS.lock().warning(summary, detail, dismiss);
}
