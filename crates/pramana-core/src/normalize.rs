//! Canonical forms for comparing gold and produced field values.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// Lowercased, trimmed form of `s`; absent input normalizes to `""`.
pub fn normalize_string(s: Option<&str>) -> String {
    match s {
        Some(s) if !s.is_empty() => s.trim().to_lowercase(),
        _ => String::new(),
    }
}

/// All maximal digit runs in `s`, in order of appearance.
///
/// Devanagari digits count as digits, so `"श्लोक ४२"` yields `["४२"]`.
pub fn extract_numbers(s: Option<&str>) -> Vec<String> {
    let Some(s) = s else {
        return Vec::new();
    };
    digit_runs()
        .find_iter(s)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Integer value of a digit run produced by [`extract_numbers`].
/// `None` when the run contains a non-digit or overflows.
pub fn parse_number(run: &str) -> Option<u64> {
    let mut value: u64 = 0;
    for c in run.chars() {
        let digit = match c {
            '0'..='9' => c as u32 - '0' as u32,
            '\u{0966}'..='\u{096F}' => c as u32 - '\u{0966}' as u32,
            _ => return None,
        };
        value = value.checked_mul(10)?.checked_add(digit as u64)?;
    }
    if run.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Text form of a JSON scalar as the graders see it.
///
/// Strings pass through, numbers and booleans use their JSON spelling, and
/// `null` counts as absent.
pub fn value_text(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn digit_runs() -> &'static Regex {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    DIGITS.get_or_init(|| Regex::new(r"[0-9\x{0966}-\x{096F}]+").expect("digit pattern is valid"))
}
