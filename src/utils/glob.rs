//! File-name glob matching for watch patterns.
//!
//! Supports `*` (any run of characters), `?` (one character) and
//! comma-separated alternatives inside braces (`*.{lua,luau}`).
//! Patterns match against the file name only, never the directory.

use regex::Regex;
use std::path::Path;

/// A compiled file-name pattern.
#[derive(Debug, Clone)]
pub struct Glob {
    source: String,
    regex: Regex,
}

impl Glob {
    /// Compile a glob pattern. An empty pattern matches every file.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let pattern = pattern.trim();
        let source = if pattern.is_empty() { "*" } else { pattern };
        let regex = Regex::new(&to_regex(source))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Check a file name against the pattern.
    pub fn matches_name(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// Check the file name component of `path`.
    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.matches_name(name))
    }
}

impl Default for Glob {
    /// Matches every file.
    fn default() -> Self {
        Self::new("*").expect("static glob")
    }
}

fn to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');
    let mut in_group = false;
    for c in glob.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '{' if !in_group => {
                in_group = true;
                out.push_str("(?:");
            }
            '}' if in_group => {
                in_group = false;
                out.push(')');
            }
            ',' if in_group => out.push('|'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    if in_group {
        out.push(')');
    }
    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_extension() {
        let glob = Glob::new("*.lua").unwrap();
        assert!(glob.matches(Path::new("/scripts/enemy.lua")));
        assert!(!glob.matches(Path::new("/scripts/enemy.luac")));
        assert!(!glob.matches(Path::new("/scripts/lua")));
    }

    #[test]
    fn test_question_mark() {
        let glob = Glob::new("ai_?.script").unwrap();
        assert!(glob.matches_name("ai_1.script"));
        assert!(!glob.matches_name("ai_12.script"));
    }

    #[test]
    fn test_alternatives() {
        let glob = Glob::new("*.{lua,luau}").unwrap();
        assert!(glob.matches_name("a.lua"));
        assert!(glob.matches_name("b.luau"));
        assert!(!glob.matches_name("c.rs"));
    }

    #[test]
    fn test_empty_matches_everything() {
        let glob = Glob::new("").unwrap();
        assert_eq!(glob.as_str(), "*");
        assert!(glob.matches_name("anything.txt"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let glob = Glob::new("a+b.(x)").unwrap();
        assert!(glob.matches_name("a+b.(x)"));
        assert!(!glob.matches_name("aab.x"));
    }
}
