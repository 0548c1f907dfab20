#![forbid(unsafe_code)]

//! External lookup view: resolves a player name to its 128-bit id (and back)
//! through a pluggable [`Resolver`](resolver::Resolver).
//!
//! Lookups are debounced while the user types, single-flight per view, and
//! memoized against the last resolution only. Completions arrive on a channel
//! and are applied when the engine ticks the view; a completion for a
//! superseded request is discarded.

pub mod dispatch;
pub mod resolver;
pub mod session;
pub mod view;

pub use dispatch::{Dispatcher, InlineDispatcher, LookupJob, ThreadDispatcher};
pub use resolver::{
    CancelToken, Directory, DirectoryError, LookupError, LookupKey, Profile, Resolver,
};
pub use session::{
    LookupConfig, LookupDirection, LookupEvent, LookupFailure, LookupPhase, LookupRequest,
    LookupSession, LookupToken, LookupTrace, Resolution,
};
pub use view::{PLAYER_KEY, PlayerView};
