#![forbid(unsafe_code)]

//! Canonical 16-byte identifier store.
//!
//! [`UuidValue`] owns one fixed 16-byte buffer and exposes it through typed,
//! big-endian accessors. There is no "true" representation: the unsigned
//! 64-bit pair, the signed 64-bit pair and the four signed 32-bit words are
//! all bit-for-bit reinterpretations of the same bytes, so a write through one
//! accessor is immediately visible through every other.
//!
//! # Invariants
//!
//! - All accessors are big-endian.
//! - No accessor validates range beyond the width it writes; callers that
//!   narrow wider input wrap modulo 2^n before writing.
//!
//! # Example
//!
//! ```
//! use uuidsync_core::value::UuidValue;
//!
//! let mut value = UuidValue::nil();
//! value.set_i32_word(3, -1);
//! assert_eq!(value.u64_pair(), (0, 0x0000_0000_ffff_ffff));
//! assert_eq!(value.i64_pair(), (0, 0x0000_0000_ffff_ffff));
//! ```

use std::fmt;

/// Number of bytes in the canonical value.
pub const UUID_LEN: usize = 16;

/// Number of signed 32-bit words in the canonical value.
pub const WORD_COUNT: usize = 4;

/// Hex group lengths of the canonical hyphenated form.
pub const HEX_GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

/// The single authoritative 128-bit identifier every view encodes and decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UuidValue {
    bytes: [u8; UUID_LEN],
}

impl UuidValue {
    /// The all-zero value.
    #[must_use]
    pub const fn nil() -> Self {
        Self {
            bytes: [0; UUID_LEN],
        }
    }

    /// Wrap raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; UUID_LEN]) -> Self {
        Self { bytes }
    }

    /// Build a value from an unsigned high/low pair.
    #[must_use]
    pub fn from_u64_pair(hi: u64, lo: u64) -> Self {
        let mut value = Self::nil();
        value.set_u64_pair(hi, lo);
        value
    }

    /// Borrow the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; UUID_LEN] {
        &self.bytes
    }

    /// Mutable access to the raw bytes.
    pub fn as_bytes_mut(&mut self) -> &mut [u8; UUID_LEN] {
        &mut self.bytes
    }

    /// Whether every byte is zero.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.bytes.iter().all(|b| *b == 0)
    }

    /// Reset to the all-zero value.
    pub fn clear(&mut self) {
        self.bytes = [0; UUID_LEN];
    }

    /// Read the (high, low) unsigned 64-bit words.
    #[must_use]
    pub fn u64_pair(&self) -> (u64, u64) {
        (self.read_u64(0), self.read_u64(8))
    }

    /// Write the (high, low) unsigned 64-bit words.
    pub fn set_u64_pair(&mut self, hi: u64, lo: u64) {
        self.bytes[..8].copy_from_slice(&hi.to_be_bytes());
        self.bytes[8..].copy_from_slice(&lo.to_be_bytes());
    }

    /// Read the (most, least) signed 64-bit words.
    #[must_use]
    pub fn i64_pair(&self) -> (i64, i64) {
        (self.most(), self.least())
    }

    /// Write the (most, least) signed 64-bit words.
    pub fn set_i64_pair(&mut self, most: i64, least: i64) {
        self.set_most(most);
        self.set_least(least);
    }

    /// Most-significant signed 64-bit word (bytes 0..8).
    #[must_use]
    pub fn most(&self) -> i64 {
        self.read_u64(0) as i64
    }

    /// Least-significant signed 64-bit word (bytes 8..16).
    #[must_use]
    pub fn least(&self) -> i64 {
        self.read_u64(8) as i64
    }

    /// Overwrite bytes 0..8 only.
    pub fn set_most(&mut self, most: i64) {
        self.bytes[..8].copy_from_slice(&most.to_be_bytes());
    }

    /// Overwrite bytes 8..16 only.
    pub fn set_least(&mut self, least: i64) {
        self.bytes[8..].copy_from_slice(&least.to_be_bytes());
    }

    /// Read signed 32-bit word `index` (word 0 = bytes 0..4).
    ///
    /// # Panics
    ///
    /// Panics if `index >= WORD_COUNT`.
    #[must_use]
    pub fn i32_word(&self, index: usize) -> i32 {
        let start = index * 4;
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.bytes[start..start + 4]);
        i32::from_be_bytes(word)
    }

    /// Write signed 32-bit word `index`, leaving the other twelve bytes alone.
    ///
    /// # Panics
    ///
    /// Panics if `index >= WORD_COUNT`.
    pub fn set_i32_word(&mut self, index: usize, word: i32) {
        let start = index * 4;
        self.bytes[start..start + 4].copy_from_slice(&word.to_be_bytes());
    }

    /// All four signed 32-bit words in byte order.
    #[must_use]
    pub fn i32_words(&self) -> [i32; WORD_COUNT] {
        std::array::from_fn(|i| self.i32_word(i))
    }

    /// 32 lower-case hex digits without separators.
    #[must_use]
    pub fn simple_hex(&self) -> String {
        let (hi, lo) = self.u64_pair();
        format!("{hi:016x}{lo:016x}")
    }

    /// Canonical 8-4-4-4-12 lower-case hyphenated form.
    #[must_use]
    pub fn hyphenated(&self) -> String {
        let simple = self.simple_hex();
        let mut out = String::with_capacity(36);
        let mut start = 0;
        for (i, len) in HEX_GROUPS.iter().enumerate() {
            if i > 0 {
                out.push('-');
            }
            out.push_str(&simple[start..start + len]);
            start += len;
        }
        out
    }

    fn read_u64(&self, offset: usize) -> u64 {
        let mut word = [0u8; 8];
        word.copy_from_slice(&self.bytes[offset..offset + 8]);
        u64::from_be_bytes(word)
    }
}

impl From<[u8; UUID_LEN]> for UuidValue {
    fn from(bytes: [u8; UUID_LEN]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl fmt::Display for UuidValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hyphenated())
    }
}
