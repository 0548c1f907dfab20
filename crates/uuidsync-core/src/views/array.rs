#![forbid(unsafe_code)]

//! Four signed 32-bit words view.

use crate::field::{Field, FieldFormat, parse_wrapping_i32};
use crate::value::{UuidValue, WORD_COUNT};
use crate::view::{SyncContext, View};

/// Registry key of the array view.
pub const ARRAY_KEY: &str = "array";

const LABELS: [&str; WORD_COUNT] = ["word0", "word1", "word2", "word3"];

/// Four decimal fields; field `i` covers bytes `4*i..4*i+4`.
#[derive(Debug, Clone)]
pub struct ArrayView {
    fields: [Field; WORD_COUNT],
}

impl Default for ArrayView {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrayView {
    #[must_use]
    pub fn new() -> Self {
        Self {
            fields: LABELS.map(|label| Field::new(label, FieldFormat::SignedInt)),
        }
    }
}

impl View for ArrayView {
    fn key(&self) -> &str {
        ARRAY_KEY
    }

    fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    fn parse(&mut self, value: &mut UuidValue, _ctx: &SyncContext) {
        for (index, field) in self.fields.iter().enumerate() {
            match field.is_valid().then(|| parse_wrapping_i32(field.text())).flatten() {
                Some(word) => value.set_i32_word(index, word),
                None => tracing::debug!(view = ARRAY_KEY, index, "skipping invalid field"),
            }
        }
    }

    fn unparse(&mut self, value: &UuidValue, _ctx: &SyncContext) {
        for (field, word) in self.fields.iter_mut().zip(value.i32_words()) {
            field.set_text(word.to_string());
        }
    }

    fn export_text(&self) -> Option<String> {
        let words: Vec<&str> = self.fields.iter().map(Field::text).collect();
        Some(format!("[I;{}]", words.join(",")))
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
            is_final: true,
            now: Instant::now(),
            cycle: 1,
        }
    }

    #[test]
    fn words_follow_byte_order() {
        let mut view = ArrayView::new();
        for (field, text) in view.fields_mut().iter_mut().zip(["1", "2", "3", "4"]) {
            field.set_text(text);
        }
        let mut value = UuidValue::nil();
        view.parse(&mut value, &ctx());
        assert_eq!(value.hyphenated(), "00000001-0000-0002-0000-000300000004");
    }

    #[test]
    fn invalid_word_is_skipped() {
        let mut view = ArrayView::new();
        for (field, text) in view.fields_mut().iter_mut().zip(["9", "", "x", "-1"]) {
            field.set_text(text);
        }
        let mut value = UuidValue::from_u64_pair(0x1111_1111_2222_2222, 0x3333_3333_4444_4444);
        view.parse(&mut value, &ctx());
        assert_eq!(value.i32_words(), [9, 0x2222_2222, 0x3333_3333, -1]);
    }

    #[test]
    fn export_format() {
        let mut view = ArrayView::new();
        view.unparse(&UuidValue::from_u64_pair(u64::MAX, 5), &ctx());
        assert_eq!(view.export_text().as_deref(), Some("[I;-1,-1,0,5]"));
    }
}
