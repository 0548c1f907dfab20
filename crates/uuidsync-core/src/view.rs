#![forbid(unsafe_code)]

//! The view abstraction.
//!
//! A view is one user-facing encoding of the canonical value. It owns its
//! [`Field`]s and knows how to `parse` them into a [`UuidValue`] and how to
//! `unparse` a value back into them. Views never read each other; the
//! [`Engine`](crate::engine::Engine) routes every change through the value.

use web_time::Instant;

use crate::field::Field;
use crate::value::UuidValue;

/// Per-cycle information handed to `parse`/`unparse`.
#[derive(Debug, Clone, Copy)]
pub struct SyncContext {
    /// The change is final (commit, fragment load, random generation) rather
    /// than live typing.
    pub is_final: bool,
    /// Current time from the engine clock.
    pub now: Instant,
    /// Synchronization cycle number.
    pub cycle: u64,
}

/// A notification raised by a view outside of a synchronization cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// An external resolution completed and was applied.
    Loaded {
        view: String,
        name: String,
        id: UuidValue,
    },
    /// An external resolution failed on a committed edit.
    Error {
        view: String,
        key: String,
        message: String,
    },
}

/// Result of polling a view for asynchronous progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// The view's canonical contribution changed; the engine should run a
    /// cycle rooted at this view.
    pub resync: bool,
    /// Notifications to forward to the host.
    pub notices: Vec<Notice>,
}

impl TickOutcome {
    /// Nothing happened.
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }
}

/// One representation of the canonical value.
pub trait View {
    /// Stable key (`hex`, `halves`, `array`, `player`, ...).
    fn key(&self) -> &str;

    /// Ordered field slots.
    fn fields(&self) -> &[Field];

    /// Mutable field slots (used by paste and fragment decoding).
    fn fields_mut(&mut self) -> &mut [Field];

    /// Write this view's valid fields into `value`. Invalid fields are
    /// skipped; parsing never fails.
    fn parse(&mut self, value: &mut UuidValue, ctx: &SyncContext);

    /// Render `value` into this view's fields.
    fn unparse(&mut self, value: &UuidValue, ctx: &SyncContext);

    /// Text intended for copy-to-clipboard, if this view offers one.
    fn export_text(&self) -> Option<String> {
        None
    }

    /// Whether pasted text may be split across this view's fields.
    fn allows_bulk_paste(&self) -> bool {
        false
    }

    /// Poll for asynchronous progress (timers, background results).
    fn tick(&mut self, _now: Instant) -> TickOutcome {
        TickOutcome::idle()
    }

    /// Number of field slots.
    fn field_count(&self) -> usize {
        self.fields().len()
    }

    /// Field texts in slot order.
    fn texts(&self) -> Vec<String> {
        self.fields().iter().map(|f| f.text().to_owned()).collect()
    }
}
