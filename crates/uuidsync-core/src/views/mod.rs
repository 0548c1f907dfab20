#![forbid(unsafe_code)]

//! Built-in numeric views.

pub mod array;
pub mod halves;
pub mod hex;

pub use array::{ARRAY_KEY, ArrayView};
pub use halves::{HALVES_KEY, HalvesView};
pub use hex::{HEX_KEY, HexView, normalize_hex, parse_hex};
