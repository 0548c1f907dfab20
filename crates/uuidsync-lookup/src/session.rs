#![forbid(unsafe_code)]

//! Resolution session: debounce, single-flight and staleness tokens.
//!
//! A [`LookupSession`] owns at most one pending debounce and at most one
//! in-flight request. Every request that reaches the resolver gets a fresh,
//! strictly increasing [`LookupToken`]; a completion is applied only if its
//! token still names the in-flight request, so a superseded lookup can never
//! overwrite a newer one.
//!
//! ```text
//! Idle ──live──► Debouncing ──deadline──► Requesting ──► Loaded | NotFound | Failed
//!   └───────────final─────────────────────────┘
//! ```
//!
//! Any new request cancels whatever is debouncing or in flight (unless it asks
//! for the same key). The session also remembers exactly one resolution, the
//! last success or the last failure, and skips requests for that key.
//!
//! The session never blocks: completions arrive on a channel and are applied
//! by [`LookupSession::poll`], which the owning view calls from its tick.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use uuidsync_core::config::{ConfigError, env_u64};
use web_time::Instant;

use crate::dispatch::Dispatcher;
use crate::resolver::{CancelToken, LookupError, LookupKey, Profile, Resolver};

const ENV_DEBOUNCE_MS: &str = "UUIDSYNC_LOOKUP_DEBOUNCE_MS";
const ENV_TRACE_CAPACITY: &str = "UUIDSYNC_LOOKUP_TRACE";

// ---------------------------------------------------------------------------
// LookupConfig
// ---------------------------------------------------------------------------

/// Lookup session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupConfig {
    /// Quiet period after live typing before a request is sent.
    pub debounce: Duration,
    /// Maximum number of retained trace events.
    pub trace_capacity: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1000),
            trace_capacity: 256,
        }
    }
}

impl LookupConfig {
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    #[must_use]
    pub fn with_trace_capacity(mut self, capacity: usize) -> Self {
        self.trace_capacity = capacity;
        self
    }

    /// Read `UUIDSYNC_LOOKUP_DEBOUNCE_MS` and `UUIDSYNC_LOOKUP_TRACE`.
    pub fn try_from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(ms) = env_u64(ENV_DEBOUNCE_MS) {
            let ms = ms.map_err(|value| ConfigError::InvalidEnv {
                name: ENV_DEBOUNCE_MS,
                value,
            })?;
            config.debounce = Duration::from_millis(ms);
        }
        if let Some(capacity) = env_u64(ENV_TRACE_CAPACITY) {
            let capacity = capacity.map_err(|value| ConfigError::InvalidEnv {
                name: ENV_TRACE_CAPACITY,
                value,
            })?;
            config.trace_capacity = usize::try_from(capacity).unwrap_or(usize::MAX);
        }
        Ok(config)
    }

    /// Like [`try_from_env`](Self::try_from_env), falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::try_from_env().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "ignoring lookup environment overrides");
            Self::default()
        })
    }
}

// ---------------------------------------------------------------------------
// LookupToken
// ---------------------------------------------------------------------------

/// Monotonic id of a request sent to the resolver. Token 0 means "none".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LookupToken(u64);

impl LookupToken {
    pub const NONE: Self = Self(0);

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for LookupToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Requests and resolutions
// ---------------------------------------------------------------------------

/// Which way a lookup goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupDirection {
    /// The user typed a name or id into the lookup view.
    Forward,
    /// Another view changed the value; fetch the matching name.
    Reverse,
}

/// One resolution request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub key: LookupKey,
    /// Raised by a commit rather than live typing; failures are surfaced.
    pub commit: bool,
    pub direction: LookupDirection,
}

impl LookupRequest {
    #[must_use]
    pub fn forward(key: LookupKey, commit: bool) -> Self {
        Self {
            key,
            commit,
            direction: LookupDirection::Forward,
        }
    }

    #[must_use]
    pub fn reverse(key: LookupKey) -> Self {
        Self {
            key,
            commit: false,
            direction: LookupDirection::Reverse,
        }
    }
}

/// An applied resolution, returned by [`LookupSession::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub token: LookupToken,
    pub request: LookupRequest,
    pub outcome: Result<Profile, LookupError>,
}

/// The remembered failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupFailure {
    pub key: LookupKey,
    pub error: LookupError,
}

/// Where the current resolution attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupPhase {
    Idle,
    Debouncing { deadline: Instant },
    Requesting { token: LookupToken },
    Loaded,
    NotFound,
    Failed,
}

// ---------------------------------------------------------------------------
// Trace
// ---------------------------------------------------------------------------

/// A lifecycle event, recorded in the session trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupEvent {
    /// A request was parked until the debounce deadline.
    Debounced { key: String },
    /// A parked request was dropped before it was sent.
    DebounceCancelled { key: String },
    /// A request was sent to the resolver.
    Started { token: LookupToken, key: String },
    /// An in-flight request was cancelled. `superseded_by` is
    /// [`LookupToken::NONE`] when nothing replaced it immediately.
    Cancelled {
        token: LookupToken,
        superseded_by: LookupToken,
    },
    /// The request matched the remembered resolution and was not sent.
    Skipped { key: String },
    /// The resolver answered (whether or not the answer is used).
    Completed { token: LookupToken, found: bool },
    /// The answer was applied.
    Applied { token: LookupToken },
    /// The answer belonged to a superseded request and was dropped.
    StaleDiscarded {
        token: LookupToken,
        current: LookupToken,
    },
}

impl LookupEvent {
    #[must_use]
    pub fn token(&self) -> LookupToken {
        match self {
            Self::Started { token, .. }
            | Self::Cancelled { token, .. }
            | Self::Completed { token, .. }
            | Self::Applied { token }
            | Self::StaleDiscarded { token, .. } => *token,
            Self::Debounced { .. } | Self::DebounceCancelled { .. } | Self::Skipped { .. } => {
                LookupToken::NONE
            }
        }
    }

    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Debounced { .. } => "debounced",
            Self::DebounceCancelled { .. } => "debounce_cancelled",
            Self::Started { .. } => "started",
            Self::Cancelled { .. } => "cancelled",
            Self::Skipped { .. } => "skipped",
            Self::Completed { .. } => "completed",
            Self::Applied { .. } => "applied",
            Self::StaleDiscarded { .. } => "stale_discarded",
        }
    }
}

/// Bounded event log; the oldest events are dropped first.
#[derive(Debug, Clone)]
pub struct LookupTrace {
    events: VecDeque<LookupEvent>,
    capacity: usize,
}

impl LookupTrace {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn push(&mut self, event: LookupEvent) {
        if self.capacity == 0 {
            return;
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn events(&self) -> impl Iterator<Item = &LookupEvent> {
        self.events.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events of the given type.
    #[must_use]
    pub fn count(&self, event_type: &str) -> usize {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }

    #[must_use]
    pub fn contains_event_type(&self, token: LookupToken, event_type: &str) -> bool {
        self.events
            .iter()
            .any(|e| e.token() == token && e.event_type() == event_type)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Check ordering invariants; returns a description of each violation.
    #[must_use]
    pub fn verify_invariants(&self) -> Vec<String> {
        let mut violations = Vec::new();
        let mut last_started = LookupToken::NONE;
        let mut outstanding: Option<LookupToken> = None;
        for event in &self.events {
            match event {
                LookupEvent::Started { token, .. } => {
                    if *token <= last_started {
                        violations.push(format!(
                            "non-monotonic start token: {token} after {last_started}"
                        ));
                    }
                    if let Some(previous) = outstanding {
                        violations.push(format!("{token} started while {previous} in flight"));
                    }
                    last_started = *token;
                    outstanding = Some(*token);
                }
                LookupEvent::Cancelled { token, .. }
                | LookupEvent::Completed { token, .. }
                | LookupEvent::Applied { token } => {
                    if outstanding == Some(*token) {
                        outstanding = None;
                    }
                }
                LookupEvent::StaleDiscarded { token, current } => {
                    if token > current {
                        violations.push(format!("stale {token} newer than current {current}"));
                    }
                }
                _ => {}
            }
        }
        violations
    }
}

// ---------------------------------------------------------------------------
// LookupSession
// ---------------------------------------------------------------------------

struct Completion {
    token: LookupToken,
    outcome: Result<Profile, LookupError>,
}

struct Pending {
    deadline: Instant,
    request: LookupRequest,
}

struct InFlight {
    token: LookupToken,
    request: LookupRequest,
    cancel: CancelToken,
}

/// Debounced, single-flight resolution of player names and ids.
pub struct LookupSession {
    resolver: Arc<dyn Resolver>,
    dispatcher: Box<dyn Dispatcher>,
    config: LookupConfig,
    phase: LookupPhase,
    pending: Option<Pending>,
    in_flight: Option<InFlight>,
    next_token: u64,
    current: LookupToken,
    loaded: Option<Profile>,
    failure: Option<LookupFailure>,
    tx: mpsc::Sender<Completion>,
    rx: mpsc::Receiver<Completion>,
    trace: LookupTrace,
}

impl fmt::Debug for LookupSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupSession")
            .field("phase", &self.phase)
            .field("current", &self.current)
            .field("loaded", &self.loaded.as_ref().map(|p| &p.name))
            .field("trace_events", &self.trace.len())
            .finish()
    }
}

impl LookupSession {
    #[must_use]
    pub fn new(
        resolver: Arc<dyn Resolver>,
        dispatcher: Box<dyn Dispatcher>,
        config: LookupConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let trace = LookupTrace::with_capacity(config.trace_capacity);
        Self {
            resolver,
            dispatcher,
            config,
            phase: LookupPhase::Idle,
            pending: None,
            in_flight: None,
            next_token: 1,
            current: LookupToken::NONE,
            loaded: None,
            failure: None,
            tx,
            rx,
            trace,
        }
    }

    #[must_use]
    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    #[must_use]
    pub fn phase(&self) -> LookupPhase {
        self.phase
    }

    /// The most recently issued token.
    #[must_use]
    pub fn current_token(&self) -> LookupToken {
        self.current
    }

    #[must_use]
    pub fn trace(&self) -> &LookupTrace {
        &self.trace
    }

    /// The last successful resolution.
    #[must_use]
    pub fn loaded(&self) -> Option<&Profile> {
        self.loaded.as_ref()
    }

    /// The last failed resolution.
    #[must_use]
    pub fn failure(&self) -> Option<&LookupFailure> {
        self.failure.as_ref()
    }

    /// The loaded profile, if `key` names it (by name, ignoring ASCII case,
    /// or by id).
    #[must_use]
    pub fn loaded_for(&self, key: &LookupKey) -> Option<&Profile> {
        self.loaded.as_ref().filter(|profile| match key {
            LookupKey::Name(name) => name.eq_ignore_ascii_case(&profile.name),
            LookupKey::Id(id) => *id == profile.id,
        })
    }

    /// The remembered failure, if it was for `key`.
    #[must_use]
    pub fn failure_for(&self, key: &LookupKey) -> Option<&LookupFailure> {
        self.failure
            .as_ref()
            .filter(|failure| failure.key.label().eq_ignore_ascii_case(&key.label()))
    }

    /// Whether anything is debouncing or in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.pending.is_some() || self.in_flight.is_some()
    }

    /// Ask for a resolution.
    ///
    /// `immediate` skips the debounce. A request for the key already parked
    /// or in flight keeps that attempt; a live one restarts the parked
    /// deadline and an `immediate` one sends it now.
    pub fn request(&mut self, request: LookupRequest, now: Instant, immediate: bool) {
        if self.loaded_for(&request.key).is_some() || self.failure_for(&request.key).is_some() {
            self.cancel_all(LookupToken::NONE);
            self.phase = if self.loaded_for(&request.key).is_some() {
                LookupPhase::Loaded
            } else {
                self.failure_phase()
            };
            tracing::debug!(key = %request.key, "lookup memoized; skipped");
            self.trace.push(LookupEvent::Skipped {
                key: request.key.label(),
            });
            return;
        }

        if self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.request.key == request.key)
        {
            if immediate {
                if let Some(pending) = self.pending.take() {
                    let mut parked = pending.request;
                    parked.commit |= request.commit;
                    self.start(parked);
                }
            } else if let Some(pending) = &mut self.pending {
                // Still typing: push the deadline out.
                pending.request.commit |= request.commit;
                pending.deadline = now + self.config.debounce;
                self.phase = LookupPhase::Debouncing {
                    deadline: pending.deadline,
                };
            }
            return;
        }

        if let Some(flight) = &mut self.in_flight
            && flight.request.key == request.key
        {
            flight.request.commit |= request.commit;
            return;
        }

        if immediate {
            self.start(request);
        } else {
            self.cancel_all(LookupToken::NONE);
            let deadline = now + self.config.debounce;
            tracing::trace!(key = %request.key, "lookup debounced");
            self.trace.push(LookupEvent::Debounced {
                key: request.key.label(),
            });
            self.pending = Some(Pending { deadline, request });
            self.phase = LookupPhase::Debouncing { deadline };
        }
    }

    /// Drop any parked or in-flight request and forget the loaded profile.
    pub fn clear(&mut self) {
        self.cancel_all(LookupToken::NONE);
        self.loaded = None;
        self.phase = LookupPhase::Idle;
    }

    /// Fire an expired debounce and apply finished lookups.
    pub fn poll(&mut self, now: Instant) -> Vec<Resolution> {
        if self.pending.as_ref().is_some_and(|p| now >= p.deadline)
            && let Some(pending) = self.pending.take()
        {
            self.start(pending.request);
        }

        let mut applied = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            let token = completion.token;
            self.trace.push(LookupEvent::Completed {
                token,
                found: completion.outcome.is_ok(),
            });
            let Some(flight) = self.in_flight.take_if(|flight| flight.token == token) else {
                tracing::debug!(%token, current = %self.current, "stale lookup result discarded");
                self.trace.push(LookupEvent::StaleDiscarded {
                    token,
                    current: self.current,
                });
                continue;
            };
            match &completion.outcome {
                Ok(profile) => {
                    tracing::info!(name = %profile.name, id = %profile.id, "player loaded");
                    self.loaded = Some(profile.clone());
                    self.failure = None;
                    self.phase = LookupPhase::Loaded;
                }
                Err(LookupError::Cancelled) => {
                    tracing::debug!(%token, "lookup cancelled");
                    self.phase = LookupPhase::Idle;
                    continue;
                }
                Err(error) => {
                    match error {
                        LookupError::Transport(message) => {
                            tracing::warn!(key = %flight.request.key, %message, "lookup failed");
                        }
                        _ => tracing::debug!(key = %flight.request.key, "player not found"),
                    }
                    self.loaded = None;
                    self.failure = Some(LookupFailure {
                        key: flight.request.key.clone(),
                        error: error.clone(),
                    });
                    self.phase = self.failure_phase();
                }
            }
            self.trace.push(LookupEvent::Applied { token });
            applied.push(Resolution {
                token,
                request: flight.request,
                outcome: completion.outcome,
            });
        }
        applied
    }

    fn start(&mut self, request: LookupRequest) {
        let token = LookupToken(self.next_token);
        self.next_token += 1;
        self.cancel_all(token);
        self.current = token;

        let cancel = CancelToken::new();
        tracing::debug!(%token, key = %request.key, "lookup started");
        self.trace.push(LookupEvent::Started {
            token,
            key: request.key.label(),
        });
        self.phase = LookupPhase::Requesting { token };

        let resolver = Arc::clone(&self.resolver);
        let tx = self.tx.clone();
        let key = request.key.clone();
        let job_cancel = cancel.clone();
        self.in_flight = Some(InFlight {
            token,
            request,
            cancel,
        });
        self.dispatcher.dispatch(Box::new(move || {
            let outcome = resolver.resolve(&key, &job_cancel);
            // The session may be gone; nothing to deliver to then.
            let _ = tx.send(Completion { token, outcome });
        }));
    }

    fn cancel_all(&mut self, superseded_by: LookupToken) {
        if let Some(pending) = self.pending.take() {
            self.trace.push(LookupEvent::DebounceCancelled {
                key: pending.request.key.label(),
            });
        }
        if let Some(flight) = self.in_flight.take() {
            flight.cancel.cancel();
            tracing::debug!(token = %flight.token, %superseded_by, "lookup cancelled");
            self.trace.push(LookupEvent::Cancelled {
                token: flight.token,
                superseded_by,
            });
        }
    }

    fn failure_phase(&self) -> LookupPhase {
        match self.failure.as_ref().map(|f| &f.error) {
            Some(LookupError::NotFound) => LookupPhase::NotFound,
            Some(_) => LookupPhase::Failed,
            None => LookupPhase::Idle,
        }
    }
}
