#![forbid(unsafe_code)]

//! Core: canonical value store, views, and the synchronization engine.
//!
//! One 128-bit identifier is edited through several simultaneously visible
//! encodings. Every encoding is a [`View`](view::View); the
//! [`Engine`](engine::Engine) keeps them consistent by routing each change
//! through the shared [`UuidValue`](value::UuidValue).

pub mod clock;
pub mod config;
pub mod engine;
pub mod field;
pub mod fragment;
pub mod paste;
pub mod random;
pub mod value;
pub mod view;
pub mod views;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, EngineConfig};
pub use engine::{Engine, EngineError, EngineHandle, SyncMsg};
pub use field::{Field, FieldError, FieldFormat, Validity};
pub use fragment::{FragmentOutcome, FragmentStore, MemoryFragment};
pub use paste::PasteOutcome;
pub use value::UuidValue;
pub use view::{Notice, SyncContext, TickOutcome, View};
