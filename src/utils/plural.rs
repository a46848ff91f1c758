//! Count formatting for log lines.

/// `count` followed by `noun`, with a plural `s` unless `count == 1`.
///
/// - `plural_count(0, "script")` -> `"0 scripts"`
/// - `plural_count(1, "backup")` -> `"1 backup"`
#[inline]
pub fn plural_count(count: usize, noun: &str) -> String {
    let suffix = if count == 1 { "" } else { "s" };
    format!("{count} {noun}{suffix}")
}
