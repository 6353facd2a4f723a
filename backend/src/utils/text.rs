// src/utils/text.rs

use std::sync::LazyLock;

use regex::Regex;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?").expect("static regex is valid"));

/// Removes markdown code fence markers (```json / ```) that models like to wrap
/// JSON in, then trims.
pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text, "").trim().to_string()
}

/// Test-case comparison: trim both sides, then exact, case-sensitive equality.
/// Inner whitespace and line endings are left alone.
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    actual.trim() == expected.trim()
}

/// Lesson quiz shortcut: `expected` may list alternatives separated by `|`;
/// any of them matching the student's answer (case-insensitive, trimmed) counts.
pub fn matches_any_alternative(expected: &str, student: &str) -> bool {
    let student = student.trim().to_lowercase();
    expected
        .to_lowercase()
        .split('|')
        .any(|alt| alt.trim() == student)
}

pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}
