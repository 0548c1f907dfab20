#![forbid(unsafe_code)]

//! View registry and synchronizer.
//!
//! The [`Engine`] owns the canonical [`UuidValue`] and the ordered set of
//! registered views. A synchronization cycle parses the triggering view into
//! the value, then unparses the value into every other view in registration
//! order:
//!
//! ```text
//! edit(view) ──► parse(view) ──► value ──► unparse(every other view)
//! ```
//!
//! # Invariants
//!
//! - **Single writer per cycle**: only the triggering view's `parse` mutates
//!   the value during a cycle.
//! - **Run to completion**: every cycle borrows the engine mutably, so no
//!   other cycle can start until the fan-out has finished. Events produced by
//!   collaborators while a cycle runs are posted through an [`EngineHandle`]
//!   and drained one at a time by [`Engine::pump`].
//! - **Never fails**: parse-side problems stay local to the originating view;
//!   the fan-out always completes.
//!
//! # Example
//!
//! ```
//! use uuidsync_core::engine::Engine;
//! use uuidsync_core::views::{ArrayView, HalvesView, HexView};
//!
//! let mut engine = Engine::default();
//! engine.register(HexView::new()).unwrap();
//! engine.register(HalvesView::new()).unwrap();
//! engine.register(ArrayView::new()).unwrap();
//!
//! engine.edit("array", 3, "42").unwrap();
//! assert_eq!(engine.texts("halves").unwrap(), vec!["0", "42"]);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc;

use rand::{CryptoRng, RngCore};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::fragment::{self, FragmentOutcome, FragmentPlan, FragmentStore};
use crate::paste::{self, PasteOutcome};
use crate::random;
use crate::value::UuidValue;
use crate::view::{Notice, SyncContext, View};

/// Misuse of the engine API by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// No view is registered under this key.
    UnknownView(String),
    /// A view with this key is already registered.
    DuplicateView(String),
    /// The view has fewer fields than the index addressed.
    FieldOutOfRange { view: String, index: usize },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownView(key) => write!(f, "unknown view: {key}"),
            Self::DuplicateView(key) => write!(f, "view already registered: {key}"),
            Self::FieldOutOfRange { view, index } => {
                write!(f, "view {view} has no field {index}")
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Discrete external events the engine reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncMsg {
    /// Live typing in a field.
    Edit {
        view: String,
        field: usize,
        text: String,
    },
    /// Field blur or explicit confirm.
    Commit {
        view: String,
        field: usize,
        text: String,
    },
    /// Clipboard text pasted into a view.
    Paste { view: String, text: String },
    /// The URL fragment changed.
    Fragment(String),
    /// Generate a random value.
    Randomize,
    /// Poll views for timers and background results.
    Tick,
}

/// Posts [`SyncMsg`]s to an engine from collaborators.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    sender: mpsc::Sender<SyncMsg>,
}

impl EngineHandle {
    /// Queue a message. Returns `false` if the engine is gone.
    pub fn send(&self, msg: SyncMsg) -> bool {
        self.sender.send(msg).is_ok()
    }
}

/// The synchronization engine.
pub struct Engine {
    value: UuidValue,
    views: Vec<Box<dyn View>>,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    active: usize,
    cycle: u64,
    notices: VecDeque<Notice>,
    sender: mpsc::Sender<SyncMsg>,
    receiver: mpsc::Receiver<SyncMsg>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.views.iter().map(|v| v.key()).collect();
        f.debug_struct("Engine")
            .field("value", &self.value.hyphenated())
            .field("views", &keys)
            .field("active", &self.active)
            .field("cycle", &self.cycle)
            .finish()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// Create an engine with a zero value and the system clock.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create an engine driven by `clock`.
    #[must_use]
    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            value: UuidValue::nil(),
            views: Vec::new(),
            config,
            clock,
            active: 0,
            cycle: 0,
            notices: VecDeque::new(),
            sender,
            receiver,
        }
    }

    /// Register a view after the existing ones and render the current value
    /// into it.
    pub fn register<V: View + 'static>(&mut self, mut view: V) -> Result<(), EngineError> {
        if self.index_of(view.key()).is_some() {
            return Err(EngineError::DuplicateView(view.key().to_owned()));
        }
        let ctx = self.context(true);
        view.unparse(&self.value, &ctx);
        tracing::debug!(view = view.key(), fields = view.field_count(), "view registered");
        self.views.push(Box::new(view));
        Ok(())
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The canonical value.
    #[must_use]
    pub fn value(&self) -> UuidValue {
        self.value
    }

    /// Number of synchronization cycles run so far.
    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Key of the view the user last changed.
    #[must_use]
    pub fn active_view(&self) -> Option<&str> {
        self.views.get(self.active).map(|v| v.key())
    }

    /// Registered view keys in registration order.
    #[must_use]
    pub fn view_keys(&self) -> Vec<&str> {
        self.views.iter().map(|v| v.key()).collect()
    }

    #[must_use]
    pub fn view(&self, key: &str) -> Option<&dyn View> {
        self.index_of(key).map(|i| self.views[i].as_ref())
    }

    /// Field texts of a view.
    pub fn texts(&self, key: &str) -> Result<Vec<String>, EngineError> {
        self.view(key)
            .map(|v| v.texts())
            .ok_or_else(|| EngineError::UnknownView(key.to_owned()))
    }

    /// Copy-to-clipboard text of a view, if it offers one.
    pub fn export_text(&self, key: &str) -> Result<Option<String>, EngineError> {
        self.view(key)
            .map(|v| v.export_text())
            .ok_or_else(|| EngineError::UnknownView(key.to_owned()))
    }

    /// Replace the value and render it into every view as a final change.
    pub fn set_value(&mut self, value: UuidValue) {
        self.value = value;
        self.run_cycle(None, true);
    }

    /// Run one synchronization cycle.
    ///
    /// If `changed` names a registered view, that view is parsed first; every
    /// other view is then unparsed. With `None` (or an unknown key) the parse
    /// step is skipped and all views are unparsed.
    pub fn update(&mut self, changed: Option<&str>, is_final: bool) {
        let source = changed.and_then(|key| self.index_of(key));
        if source.is_none()
            && let Some(key) = changed
        {
            tracing::debug!(view = key, "update for unknown view; unparsing all");
        }
        self.run_cycle(source, is_final);
    }

    /// Live edit of one field.
    pub fn edit(&mut self, key: &str, field: usize, text: &str) -> Result<(), EngineError> {
        self.apply_edit(key, field, text, false)
    }

    /// Committed edit of one field (blur or confirm).
    pub fn commit(&mut self, key: &str, field: usize, text: &str) -> Result<(), EngineError> {
        self.apply_edit(key, field, text, true)
    }

    /// Split pasted text across a multi-field view.
    ///
    /// Only views that allow bulk paste take part, and only when the number of
    /// integer tokens equals the view's field count. Otherwise nothing changes
    /// and [`PasteOutcome::Ignored`] tells the host to paste normally.
    pub fn paste(&mut self, key: &str, text: &str) -> Result<PasteOutcome, EngineError> {
        let index = self.require(key)?;
        let view = &mut self.views[index];
        if !view.allows_bulk_paste() {
            return Ok(PasteOutcome::Ignored);
        }
        let Some(tokens) = paste::split_for_fields(text, view.field_count()) else {
            tracing::debug!(view = key, "paste token count mismatch; ignoring");
            return Ok(PasteOutcome::Ignored);
        };
        for (field, token) in view.fields_mut().iter_mut().zip(tokens) {
            field.set_text(token);
        }
        self.active = index;
        self.run_cycle(Some(index), false);
        Ok(PasteOutcome::Applied)
    }

    /// Generate a random version-4 value and render it everywhere.
    pub fn randomize(&mut self) {
        self.set_value(random::random_v4());
    }

    /// Like [`randomize`](Self::randomize) with a caller-provided generator.
    pub fn randomize_with<R: RngCore + CryptoRng>(&mut self, rng: &mut R) {
        self.set_value(random::random_v4_with(rng));
    }

    /// Encode the active view as a URL fragment (without `#`).
    ///
    /// The active view is used only if decoding would route back to it;
    /// otherwise the fallback view is encoded.
    #[must_use]
    pub fn fragment(&self) -> String {
        let counts = self.field_counts();
        let active = self
            .views
            .get(self.active)
            .filter(|v| fragment::route(v.field_count(), &counts) == Some(self.active));
        let view = active.or_else(|| {
            self.index_of(&self.config.fallback_view)
                .map(|i| &self.views[i])
        });
        view.map(|v| v.texts().join(",")).unwrap_or_default()
    }

    /// Decode a URL fragment into the engine.
    pub fn load_fragment(&mut self, text: &str) -> FragmentOutcome {
        let counts = self.field_counts();
        let Some(plan) = fragment::plan(text, &self.config.random_directive, &counts) else {
            return FragmentOutcome::Empty;
        };
        let (index, tokens) = match plan {
            FragmentPlan::Random => {
                self.randomize();
                return FragmentOutcome::Randomized;
            }
            FragmentPlan::Fields { view, tokens } => (view, tokens),
            FragmentPlan::Fallback { text } => match self.index_of(&self.config.fallback_view) {
                Some(index) => (index, vec![text]),
                None => {
                    tracing::warn!(
                        view = %self.config.fallback_view,
                        "fallback view not registered; fragment ignored"
                    );
                    return FragmentOutcome::Empty;
                }
            },
        };
        let view = &mut self.views[index];
        for (field, token) in view.fields_mut().iter_mut().zip(tokens) {
            field.set_text(token);
        }
        let key = view.key().to_owned();
        tracing::debug!(view = %key, "fragment decoded");
        self.active = index;
        self.run_cycle(Some(index), true);
        FragmentOutcome::Decoded { view: key }
    }

    /// Load the store's current fragment.
    pub fn load_from<S: FragmentStore + ?Sized>(&mut self, store: &S) -> FragmentOutcome {
        self.load_fragment(&store.read())
    }

    /// Write the current encoding into the store.
    pub fn sync_fragment<S: FragmentStore + ?Sized>(&self, store: &mut S) {
        store.write(&self.fragment());
    }

    /// Poll every view for timers and background results.
    ///
    /// A view reporting `resync` roots a cycle of its own. That cycle is not
    /// final: it reflects a background result, not a user commit. Notices are
    /// queued for [`take_notices`](Self::take_notices).
    pub fn tick(&mut self) {
        let now = self.clock.now();
        for index in 0..self.views.len() {
            let outcome = self.views[index].tick(now);
            self.notices.extend(outcome.notices);
            if outcome.resync {
                self.run_cycle(Some(index), false);
            }
        }
    }

    /// Drain queued notifications.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    /// A sender collaborators use to post events.
    #[must_use]
    pub fn handle_sender(&self) -> EngineHandle {
        EngineHandle {
            sender: self.sender.clone(),
        }
    }

    /// Process one event to completion.
    pub fn handle(&mut self, msg: SyncMsg) -> Result<(), EngineError> {
        match msg {
            SyncMsg::Edit { view, field, text } => self.edit(&view, field, &text),
            SyncMsg::Commit { view, field, text } => self.commit(&view, field, &text),
            SyncMsg::Paste { view, text } => self.paste(&view, &text).map(|_| ()),
            SyncMsg::Fragment(text) => {
                self.load_fragment(&text);
                Ok(())
            }
            SyncMsg::Randomize => {
                self.randomize();
                Ok(())
            }
            SyncMsg::Tick => {
                self.tick();
                Ok(())
            }
        }
    }

    /// Drain posted events one at a time. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(msg) = self.receiver.try_recv() {
            if let Err(err) = self.handle(msg) {
                tracing::warn!(error = %err, "posted event rejected");
            }
            handled += 1;
        }
        handled
    }

    fn apply_edit(
        &mut self,
        key: &str,
        field: usize,
        text: &str,
        is_final: bool,
    ) -> Result<(), EngineError> {
        let index = self.require(key)?;
        let slot = self.views[index]
            .fields_mut()
            .get_mut(field)
            .ok_or_else(|| EngineError::FieldOutOfRange {
                view: key.to_owned(),
                index: field,
            })?;
        slot.set_text(text);
        self.active = index;
        self.run_cycle(Some(index), is_final);
        Ok(())
    }

    fn run_cycle(&mut self, source: Option<usize>, is_final: bool) {
        self.cycle += 1;
        let ctx = self.context(is_final);
        let _span = tracing::debug_span!("sync_cycle", cycle = self.cycle, is_final).entered();
        if let Some(index) = source {
            let view = &mut self.views[index];
            tracing::trace!(view = view.key(), "parse");
            view.parse(&mut self.value, &ctx);
        }
        for (index, view) in self.views.iter_mut().enumerate() {
            if Some(index) != source {
                view.unparse(&self.value, &ctx);
            }
        }
        tracing::debug!(value = %self.value, "sync cycle complete");
    }

    fn context(&self, is_final: bool) -> SyncContext {
        SyncContext {
            is_final,
            now: self.clock.now(),
            cycle: self.cycle,
        }
    }

    fn field_counts(&self) -> Vec<usize> {
        self.views.iter().map(|v| v.field_count()).collect()
    }

    fn index_of(&self, key: &str) -> Option<usize> {
        self.views.iter().position(|v| v.key() == key)
    }

    fn require(&self, key: &str) -> Result<usize, EngineError> {
        self.index_of(key)
            .ok_or_else(|| EngineError::UnknownView(key.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::{ArrayView, HalvesView, HexView};

    fn engine() -> Engine {
        let mut engine = Engine::default();
        engine.register(HexView::new()).unwrap();
        engine.register(HalvesView::new()).unwrap();
        engine.register(ArrayView::new()).unwrap();
        engine
    }

    #[test]
    fn registration_renders_current_value() {
        let engine = engine();
        assert_eq!(
            engine.texts("hex").unwrap(),
            vec!["00000000-0000-0000-0000-000000000000"]
        );
        assert_eq!(engine.texts("array").unwrap(), vec!["0", "0", "0", "0"]);
    }

    #[test]
    fn duplicate_key_rejected() {
        let mut engine = engine();
        assert_eq!(
            engine.register(HexView::new()),
            Err(EngineError::DuplicateView("hex".into()))
        );
    }

    #[test]
    fn edit_fans_out_to_other_views() {
        let mut engine = engine();
        engine
            .edit("hex", 0, "ffffffff-ffff-ffff-0000-000000000001")
            .unwrap();
        assert_eq!(engine.texts("halves").unwrap(), vec!["-1", "1"]);
        assert_eq!(engine.texts("array").unwrap(), vec!["-1", "-1", "0", "1"]);
        assert_eq!(engine.active_view(), Some("hex"));
    }

    #[test]
    fn triggering_view_text_is_not_rewritten() {
        let mut engine = engine();
        engine.edit("hex", 0, "ABC").unwrap();
        assert_eq!(engine.texts("hex").unwrap(), vec!["ABC"]);
        assert_eq!(engine.value().u64_pair(), (0, 0xabc));
    }

    #[test]
    fn update_without_key_unparses_everything() {
        let mut engine = engine();
        engine.edit("array", 0, "5").unwrap();
        engine.update(None, true);
        assert_eq!(
            engine.texts("hex").unwrap(),
            vec!["00000005-0000-0000-0000-000000000000"]
        );
        assert_eq!(engine.texts("array").unwrap(), vec!["5", "0", "0", "0"]);
    }

    #[test]
    fn unknown_view_and_field_errors() {
        let mut engine = engine();
        assert_eq!(
            engine.edit("nope", 0, "1"),
            Err(EngineError::UnknownView("nope".into()))
        );
        assert_eq!(
            engine.edit("halves", 2, "1"),
            Err(EngineError::FieldOutOfRange {
                view: "halves".into(),
                index: 2
            })
        );
    }

    #[test]
    fn paste_into_single_field_view_is_ignored() {
        let mut engine = engine();
        assert_eq!(engine.paste("hex", "1 2"), Ok(PasteOutcome::Ignored));
    }

    #[test]
    fn paste_spreads_tokens() {
        let mut engine = engine();
        assert_eq!(
            engine.paste("halves", "Most:-1L,Least:2L"),
            Ok(PasteOutcome::Applied)
        );
        assert_eq!(engine.value().i64_pair(), (-1, 2));
        assert_eq!(engine.active_view(), Some("halves"));
    }

    #[test]
    fn fragment_encodes_active_view() {
        let mut engine = engine();
        engine.edit("array", 1, "7").unwrap();
        assert_eq!(engine.fragment(), "0,7,0,0");
        engine.edit("halves", 0, "3").unwrap();
        assert_eq!(engine.fragment(), "3,0");
    }

    #[test]
    fn fragment_round_trip_through_halves() {
        let mut engine = engine();
        engine.paste("halves", "-5 9").unwrap();
        let fragment = engine.fragment();
        let mut other = self::engine();
        assert_eq!(
            other.load_fragment(&format!("#{fragment}")),
            FragmentOutcome::Decoded {
                view: "halves".into()
            }
        );
        assert_eq!(other.value(), engine.value());
    }

    #[test]
    fn fallback_fragment_goes_to_hex() {
        let mut engine = engine();
        assert_eq!(
            engine.load_fragment("1,2,3"),
            FragmentOutcome::Decoded { view: "hex".into() }
        );
        // "1,2,3" is not valid hex, so the value stays put.
        assert!(engine.value().is_nil());
        assert_eq!(engine.texts("hex").unwrap(), vec!["1,2,3"]);
    }

    #[test]
    fn random_fragment_randomizes() {
        let mut engine = engine();
        assert_eq!(engine.load_fragment("RAND"), FragmentOutcome::Randomized);
        assert_eq!(engine.value().as_bytes()[6] >> 4, 4);
    }

    #[test]
    fn posted_events_run_in_order() {
        let mut engine = engine();
        let handle = engine.handle_sender();
        assert!(handle.send(SyncMsg::Edit {
            view: "array".into(),
            field: 0,
            text: "1".into(),
        }));
        assert!(handle.send(SyncMsg::Commit {
            view: "array".into(),
            field: 1,
            text: "2".into(),
        }));
        let before = engine.cycle();
        assert_eq!(engine.pump(), 2);
        assert_eq!(engine.cycle(), before + 2);
        assert_eq!(engine.value().i32_words(), [1, 2, 0, 0]);
    }
}
