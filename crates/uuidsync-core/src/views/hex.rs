#![forbid(unsafe_code)]

//! Canonical hyphenated hex view.

use crate::field::{Field, FieldFormat};
use crate::value::{HEX_GROUPS, UuidValue};
use crate::view::{SyncContext, View};

/// Registry key of the hex view.
pub const HEX_KEY: &str = "hex";

const HEX_DIGITS: usize = 32;

/// One text field holding 32 hex digits, optionally as 8-4-4-4-12 groups.
#[derive(Debug, Clone)]
pub struct HexView {
    fields: [Field; 1],
}

impl Default for HexView {
    fn default() -> Self {
        Self::new()
    }
}

impl HexView {
    #[must_use]
    pub fn new() -> Self {
        Self {
            fields: [Field::new("hex", FieldFormat::UuidHex)],
        }
    }
}

/// Normalise hex input to exactly 32 digits.
///
/// Hyphenated input is split into groups and each group is left-padded to its
/// canonical width; contiguous input is left-padded to 32 digits. Anything
/// that would exceed 32 digits is rejected rather than truncated.
#[must_use]
pub fn normalize_hex(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let digits = if trimmed.contains('-') {
        let groups: Vec<&str> = trimmed.split('-').collect();
        if groups.len() != HEX_GROUPS.len() {
            return None;
        }
        let mut out = String::with_capacity(HEX_DIGITS);
        for (group, width) in groups.iter().zip(HEX_GROUPS) {
            if group.len() > width {
                return None;
            }
            out.push_str(&format!("{group:0>width$}"));
        }
        out
    } else {
        if trimmed.len() > HEX_DIGITS {
            return None;
        }
        format!("{trimmed:0>width$}", width = HEX_DIGITS)
    };
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Some(digits)
}

/// Parse hex text (see [`normalize_hex`]) into a value.
#[must_use]
pub fn parse_hex(text: &str) -> Option<UuidValue> {
    let digits = normalize_hex(text)?;
    let hi = u64::from_str_radix(&digits[..16], 16).ok()?;
    let lo = u64::from_str_radix(&digits[16..], 16).ok()?;
    Some(UuidValue::from_u64_pair(hi, lo))
}

impl View for HexView {
    fn key(&self) -> &str {
        HEX_KEY
    }

    fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    fn parse(&mut self, value: &mut UuidValue, _ctx: &SyncContext) {
        let field = &self.fields[0];
        if !field.is_valid() {
            tracing::debug!(view = HEX_KEY, "skipping invalid field");
            return;
        }
        match parse_hex(field.text()) {
            Some(parsed) => {
                let (hi, lo) = parsed.u64_pair();
                value.set_u64_pair(hi, lo);
            }
            None => tracing::debug!(view = HEX_KEY, "hex text rejected"),
        }
    }

    fn unparse(&mut self, value: &UuidValue, _ctx: &SyncContext) {
        self.fields[0].set_text(value.hyphenated());
    }

    fn export_text(&self) -> Option<String> {
        Some(format!("\"{}\"", self.fields[0].text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use web_time::Instant;

    fn ctx() -> SyncContext {
        SyncContext {
            is_final: false,
            now: Instant::now(),
            cycle: 1,
        }
    }

    fn parse_text(text: &str, start: UuidValue) -> UuidValue {
        let mut view = HexView::new();
        view.fields_mut()[0].set_text(text);
        let mut value = start;
        view.parse(&mut value, &ctx());
        value
    }

    #[test]
    fn contiguous_is_left_padded() {
        let value = parse_text("ff", UuidValue::nil());
        assert_eq!(value.u64_pair(), (0, 0xff));
    }

    #[test]
    fn groups_are_padded_individually() {
        let value = parse_text("1-2-3-4-5", UuidValue::nil());
        assert_eq!(value.hyphenated(), "00000001-0002-0003-0004-000000000005");
    }

    #[test]
    fn upper_case_and_whitespace_accepted() {
        let value = parse_text("  0123456789ABCDEF0123456789ABCDEF ", UuidValue::nil());
        assert_eq!(value.u64_pair(), (0x0123_4567_89ab_cdef, 0x0123_4567_89ab_cdef));
    }

    #[test]
    fn invalid_field_leaves_value() {
        let start = UuidValue::from_u64_pair(1, 2);
        assert_eq!(parse_text("not hex", start), start);
        assert_eq!(parse_text(&"a".repeat(33), start), start);
    }

    #[test]
    fn overlong_is_rejected_not_truncated() {
        assert_eq!(normalize_hex(&"1".repeat(33)), None);
        assert_eq!(normalize_hex("123456789-1-1-1-1"), None);
        assert_eq!(normalize_hex("1-1-1-1-1-1"), None);
    }

    #[test]
    fn unparse_renders_canonical_groups() {
        let mut view = HexView::new();
        let value = UuidValue::from_u64_pair(0xdead_beef_0000_0001, 0xabc);
        view.unparse(&value, &ctx());
        assert_eq!(view.fields()[0].text(), "deadbeef-0000-0001-0000-000000000abc");
        assert_eq!(
            view.export_text().as_deref(),
            Some("\"deadbeef-0000-0001-0000-000000000abc\"")
        );
    }
}
