#![forbid(unsafe_code)]

//! Splitting pasted text into per-field integer tokens.

use std::sync::LazyLock;

use regex::Regex;

static INTEGER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-]?[0-9]+").expect("integer token pattern compiles"));

/// Whether a paste was consumed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteOutcome {
    /// Tokens were spread across the view's fields and a cycle ran.
    Applied,
    /// The paste was not split; the host should apply its default paste.
    Ignored,
}

/// All signed integer tokens in `text`, left to right.
#[must_use]
pub fn integer_tokens(text: &str) -> Vec<&str> {
    INTEGER_TOKEN.find_iter(text).map(|m| m.as_str()).collect()
}

/// Tokens of `text` if there are exactly `field_count` of them.
#[must_use]
pub fn split_for_fields(text: &str, field_count: usize) -> Option<Vec<&str>> {
    let tokens = integer_tokens(text);
    (tokens.len() == field_count).then_some(tokens)
}
