#![forbid(unsafe_code)]

//! Random version-4 identifiers.

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::value::UuidValue;

/// Fill a value from the operating system's secure random source and stamp
/// the RFC 4122 version (4) and variant (`10`) bits.
#[must_use]
pub fn random_v4() -> UuidValue {
    random_v4_with(&mut OsRng)
}

/// Like [`random_v4`] with a caller-provided cryptographic generator.
pub fn random_v4_with<R: RngCore + CryptoRng>(rng: &mut R) -> UuidValue {
    let mut value = UuidValue::nil();
    rng.fill_bytes(value.as_bytes_mut());
    stamp_v4(&mut value);
    value
}

/// Force version nibble 4 in byte 6 and variant bits `10` in byte 8.
pub fn stamp_v4(value: &mut UuidValue) {
    let bytes = value.as_bytes_mut();
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
}
