#![forbid(unsafe_code)]

//! Editable field slots and their format-level validity.
//!
//! Each view owns an ordered list of [`Field`]s. A host binds every field to
//! an editable text box: it reads [`Field::text`], renders
//! [`Field::validity`], and writes user input back through the engine.
//!
//! Validity has two sources:
//!
//! 1. The field's [`FieldFormat`] (a pattern check on the current text).
//! 2. An error attached by the owning view ([`Field::set_error`]), which
//!    stays until the text changes.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Error code for text that does not match the field's pattern.
pub const ERROR_CODE_PATTERN: &str = "pattern";
/// Error code for a lookup that found nothing.
pub const ERROR_CODE_NOT_FOUND: &str = "not_found";
/// Error code for a lookup whose transport failed.
pub const ERROR_CODE_LOOKUP: &str = "lookup";

static UUID_HEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:[0-9A-Fa-f]{1,32}|[0-9A-Fa-f]{1,8}-[0-9A-Fa-f]{1,4}-[0-9A-Fa-f]{1,4}-[0-9A-Fa-f]{1,4}-[0-9A-Fa-f]{1,12})\s*$",
    )
    .expect("uuid hex pattern compiles")
});

static SIGNED_INT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[+-]?[0-9]+\s*$").expect("signed int pattern compiles"));

/// A field-level error with a stable code and a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Stable identifier for programmatic handling.
    pub code: &'static str,
    /// Message shown next to the field.
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for FieldError {}

/// The validity flag of a field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Validity {
    #[default]
    Valid,
    Invalid(FieldError),
}

impl Validity {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    #[must_use]
    pub fn error(&self) -> Option<&FieldError> {
        match self {
            Self::Valid => None,
            Self::Invalid(err) => Some(err),
        }
    }
}

/// Text constraint a field enforces on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    /// 1-32 contiguous hex digits, or five hyphenated groups of at most
    /// 8-4-4-4-12 digits.
    UuidHex,
    /// Optional sign followed by decimal digits.
    SignedInt,
    /// Any text.
    Free,
}

impl FieldFormat {
    /// Check `text` against this format.
    #[must_use]
    pub fn check(self, text: &str) -> Validity {
        let (ok, message) = match self {
            Self::UuidHex => (UUID_HEX.is_match(text), "Expected a hexadecimal UUID"),
            Self::SignedInt => (SIGNED_INT.is_match(text), "Expected a whole number"),
            Self::Free => (true, ""),
        };
        if ok {
            Validity::Valid
        } else {
            Validity::Invalid(FieldError::new(ERROR_CODE_PATTERN, message))
        }
    }
}

/// One editable text slot of a view.
#[derive(Debug, Clone)]
pub struct Field {
    label: &'static str,
    text: String,
    format: FieldFormat,
    error: Option<FieldError>,
}

impl Field {
    /// Create an empty field.
    #[must_use]
    pub fn new(label: &'static str, format: FieldFormat) -> Self {
        Self {
            label,
            text: String::new(),
            format,
            error: None,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn format(&self) -> FieldFormat {
        self.format
    }

    /// Replace the text. A view-attached error does not survive a text change.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.error = None;
    }

    /// Attach a view-level error; the field reports invalid until the text
    /// changes or [`clear_error`](Self::clear_error) is called.
    pub fn set_error(&mut self, error: FieldError) {
        self.error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// The attached view-level error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&FieldError> {
        self.error.as_ref()
    }

    /// Whether the text matches the field's own format.
    #[must_use]
    pub fn format_valid(&self) -> bool {
        self.format.check(&self.text).is_valid()
    }

    /// Combined validity: an attached error wins over the format check.
    #[must_use]
    pub fn validity(&self) -> Validity {
        match &self.error {
            Some(err) => Validity::Invalid(err.clone()),
            None => self.format.check(&self.text),
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validity().is_valid()
    }
}

/// Parse signed decimal text into an `i64`, wrapping modulo 2^64.
///
/// Returns `None` unless the trimmed text is an optional sign followed by at
/// least one ASCII digit.
#[must_use]
pub fn parse_wrapping_i64(text: &str) -> Option<i64> {
    let (negative, digits) = split_sign(text.trim())?;
    let mut acc: u64 = 0;
    for b in digits.bytes() {
        acc = acc.wrapping_mul(10).wrapping_add(u64::from(b - b'0'));
    }
    let acc = if negative { acc.wrapping_neg() } else { acc };
    Some(acc as i64)
}

/// Parse signed decimal text into an `i32`, wrapping modulo 2^32.
#[must_use]
pub fn parse_wrapping_i32(text: &str) -> Option<i32> {
    let (negative, digits) = split_sign(text.trim())?;
    let mut acc: u32 = 0;
    for b in digits.bytes() {
        acc = acc.wrapping_mul(10).wrapping_add(u32::from(b - b'0'));
    }
    let acc = if negative { acc.wrapping_neg() } else { acc };
    Some(acc as i32)
}

fn split_sign(text: &str) -> Option<(bool, &str)> {
    let (negative, digits) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((negative, digits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_hex_accepts_contiguous_and_grouped() {
        assert!(FieldFormat::UuidHex.check("0").is_valid());
        assert!(FieldFormat::UuidHex.check(" DEADbeef ").is_valid());
        assert!(FieldFormat::UuidHex.check(&"f".repeat(32)).is_valid());
        assert!(
            FieldFormat::UuidHex
                .check("00000000-0000-0000-0000-000000000000")
                .is_valid()
        );
        assert!(FieldFormat::UuidHex.check("1-2-3-4-5").is_valid());
    }

    #[test]
    fn uuid_hex_rejects_overlong_and_malformed() {
        assert!(!FieldFormat::UuidHex.check(&"f".repeat(33)).is_valid());
        assert!(!FieldFormat::UuidHex.check("123456789-0-0-0-0").is_valid());
        assert!(!FieldFormat::UuidHex.check("1-2-3-4").is_valid());
        assert!(!FieldFormat::UuidHex.check("xyz").is_valid());
        assert!(!FieldFormat::UuidHex.check("").is_valid());
    }

    #[test]
    fn signed_int_pattern() {
        assert!(FieldFormat::SignedInt.check("-42").is_valid());
        assert!(FieldFormat::SignedInt.check("+7").is_valid());
        assert!(!FieldFormat::SignedInt.check("4.2").is_valid());
        assert!(!FieldFormat::SignedInt.check("-").is_valid());
        let err = FieldFormat::SignedInt.check("abc");
        assert_eq!(err.error().map(|e| e.code), Some(ERROR_CODE_PATTERN));
    }

    #[test]
    fn attached_error_clears_on_text_change() {
        let mut field = Field::new("name", FieldFormat::Free);
        field.set_text("bob");
        field.set_error(FieldError::new(ERROR_CODE_NOT_FOUND, "No such player"));
        assert!(!field.is_valid());
        assert!(field.format_valid());
        field.set_text("bobby");
        assert!(field.is_valid());
        assert!(field.error().is_none());
    }

    #[test]
    fn clear_error_keeps_text() {
        let mut field = Field::new("name", FieldFormat::Free);
        field.set_text("bob");
        field.set_error(FieldError::new(ERROR_CODE_NOT_FOUND, "No such player"));
        field.clear_error();
        assert!(field.is_valid());
        assert_eq!(field.text(), "bob");
    }

    #[test]
    fn wrapping_parse_in_range() {
        assert_eq!(parse_wrapping_i64("42"), Some(42));
        assert_eq!(parse_wrapping_i64("-9223372036854775808"), Some(i64::MIN));
        assert_eq!(parse_wrapping_i32(" -2147483648 "), Some(i32::MIN));
        assert_eq!(parse_wrapping_i32("+0"), Some(0));
    }

    #[test]
    fn wrapping_parse_out_of_range_wraps() {
        assert_eq!(parse_wrapping_i64("9223372036854775808"), Some(i64::MIN));
        assert_eq!(parse_wrapping_i64("18446744073709551615"), Some(-1));
        assert_eq!(parse_wrapping_i32("4294967296"), Some(0));
        assert_eq!(parse_wrapping_i32("2147483648"), Some(i32::MIN));
    }

    #[test]
    fn wrapping_parse_rejects_garbage() {
        assert_eq!(parse_wrapping_i64(""), None);
        assert_eq!(parse_wrapping_i64("+"), None);
        assert_eq!(parse_wrapping_i64("1e3"), None);
        assert_eq!(parse_wrapping_i32("--1"), None);
    }
}
