#![forbid(unsafe_code)]

//! Signed 64-bit most/least halves view.

use crate::field::{Field, FieldFormat, parse_wrapping_i64};
use crate::value::UuidValue;
use crate::view::{SyncContext, View};

/// Registry key of the halves view.
pub const HALVES_KEY: &str = "halves";

const MOST: usize = 0;
const LEAST: usize = 1;

/// Two decimal fields: most-significant and least-significant signed words.
///
/// Each field is written independently; an invalid field keeps the previous
/// bits of its half.
#[derive(Debug, Clone)]
pub struct HalvesView {
    fields: [Field; 2],
}

impl Default for HalvesView {
    fn default() -> Self {
        Self::new()
    }
}

impl HalvesView {
    #[must_use]
    pub fn new() -> Self {
        Self {
            fields: [
                Field::new("most", FieldFormat::SignedInt),
                Field::new("least", FieldFormat::SignedInt),
            ],
        }
    }
}

impl View for HalvesView {
    fn key(&self) -> &str {
        HALVES_KEY
    }

    fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    fn parse(&mut self, value: &mut UuidValue, _ctx: &SyncContext) {
        let most = &self.fields[MOST];
        match most.is_valid().then(|| parse_wrapping_i64(most.text())).flatten() {
            Some(word) => value.set_most(word),
            None => tracing::debug!(view = HALVES_KEY, field = "most", "skipping invalid field"),
        }
        let least = &self.fields[LEAST];
        match least.is_valid().then(|| parse_wrapping_i64(least.text())).flatten() {
            Some(word) => value.set_least(word),
            None => tracing::debug!(view = HALVES_KEY, field = "least", "skipping invalid field"),
        }
    }

    fn unparse(&mut self, value: &UuidValue, _ctx: &SyncContext) {
        let (most, least) = value.i64_pair();
        self.fields[MOST].set_text(most.to_string());
        self.fields[LEAST].set_text(least.to_string());
    }

    fn export_text(&self) -> Option<String> {
        Some(format!(
            "Most:{}L,Least:{}L",
            self.fields[MOST].text(),
            self.fields[LEAST].text()
        ))
    }

    fn allows_bulk_paste(&self) -> bool {
        true
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

    #[test]
    fn invalid_most_keeps_high_bits() {
        let mut view = HalvesView::new();
        view.fields_mut()[MOST].set_text("twelve");
        view.fields_mut()[LEAST].set_text("42");
        let mut value = UuidValue::from_u64_pair(0xaaaa_bbbb_cccc_dddd, 0xffff);
        view.parse(&mut value, &ctx());
        assert_eq!(value.u64_pair(), (0xaaaa_bbbb_cccc_dddd, 42));
    }

    #[test]
    fn negative_halves_round_trip() {
        let mut view = HalvesView::new();
        let value = UuidValue::from_u64_pair(u64::MAX, 0x8000_0000_0000_0000);
        view.unparse(&value, &ctx());
        assert_eq!(view.texts(), vec!["-1", "-9223372036854775808"]);
        let mut parsed = UuidValue::nil();
        view.parse(&mut parsed, &ctx());
        assert_eq!(parsed, value);
    }

    #[test]
    fn export_uses_long_literal_suffix() {
        let mut view = HalvesView::new();
        view.unparse(&UuidValue::from_u64_pair(1, u64::MAX), &ctx());
        assert_eq!(view.export_text().as_deref(), Some("Most:1L,Least:-1L"));
        assert!(view.allows_bulk_paste());
    }
}
