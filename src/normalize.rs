//! Free-text cleanup applied to inbound payloads before they reach a repository.
//!
//! Every function here is idempotent: running it over its own output is a no-op.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref MULTI_SPACE: Regex = Regex::new(r"\s{2,}").unwrap();
}

/// Trims the value and collapses every run of two or more whitespace
/// characters into a single space.
pub fn normalize_text(value: &str) -> String {
    MULTI_SPACE.replace_all(value.trim(), " ").into_owned()
}

/// Same as [`normalize_text`], but a value that ends up empty becomes `None`
/// so that "absent" never turns into an empty string.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| normalize_text(&v))
        .filter(|v| !v.is_empty())
}

/// Normalizes each skill, drops blanks and removes case-insensitive
/// duplicates. The first spelling seen wins and relative order is kept.
pub fn normalize_skills(skills: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    skills
        .into_iter()
        .map(|s| normalize_text(&s))
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .collect()
}
