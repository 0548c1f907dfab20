#![forbid(unsafe_code)]

//! The name-resolution collaborator.
//!
//! A [`Resolver`] turns a player name or id into a [`Profile`]. The engine
//! does not care about transport; it needs a three-way outcome (found, not
//! found, failed) and cooperative cancellation through [`CancelToken`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use uuidsync_core::UuidValue;
use uuidsync_core::views::parse_hex;
use web_time::Instant;

/// A resolved player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: UuidValue,
    /// Canonical spelling of the name.
    pub name: String,
    /// Rendered avatar, if the resolver provides one.
    pub image: Option<Vec<u8>>,
}

impl Profile {
    #[must_use]
    pub fn new(id: UuidValue, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            image: None,
        }
    }

    #[must_use]
    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.image = Some(image);
        self
    }
}

/// What to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LookupKey {
    /// Name to id.
    Name(String),
    /// Id to name.
    Id(UuidValue),
}

impl LookupKey {
    /// Text that looks like a UUID resolves by id; anything else by name.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        let hex_like = trimmed.len() == 32 || trimmed.len() == 36;
        match parse_hex(trimmed).filter(|_| hex_like) {
            Some(id) => Self::Id(id),
            None => Self::Name(trimmed.to_owned()),
        }
    }

    /// Stable text form used for memoization and error reporting.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Name(name) => name.clone(),
            Self::Id(id) => id.hyphenated(),
        }
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

/// Why a lookup did not produce a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The resolver answered, but knows no such player.
    NotFound,
    /// The resolver could not answer.
    Transport(String),
    /// The request was cancelled before it finished.
    Cancelled,
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "player not found"),
            Self::Transport(msg) => write!(f, "lookup failed: {msg}"),
            Self::Cancelled => write!(f, "lookup cancelled"),
        }
    }
}

impl std::error::Error for LookupError {}

/// Cooperative cancellation flag shared between a request and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Resolves names and ids to profiles.
///
/// Called from a dispatcher, possibly on a background thread. Implementations
/// should check the token during long waits and return
/// [`LookupError::Cancelled`] once it is set.
pub trait Resolver: Send + Sync {
    fn resolve(&self, key: &LookupKey, cancel: &CancelToken) -> Result<Profile, LookupError>;
}

impl<F> Resolver for F
where
    F: Fn(&LookupKey, &CancelToken) -> Result<Profile, LookupError> + Send + Sync,
{
    fn resolve(&self, key: &LookupKey, cancel: &CancelToken) -> Result<Profile, LookupError> {
        self(key, cancel)
    }
}

/// A malformed line in a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryError {
    /// 1-based line number.
    pub line: usize,
    pub message: String,
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for DirectoryError {}

/// In-memory resolver with case-insensitive names.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    by_name: HashMap<String, Profile>,
    by_id: HashMap<UuidValue, String>,
    latency: Duration,
}

impl Directory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a player (builder).
    #[must_use]
    pub fn with_player(mut self, name: &str, id: UuidValue) -> Self {
        self.insert(Profile::new(id, name));
        self
    }

    /// Simulated response time; cancellation is honoured while waiting.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn insert(&mut self, profile: Profile) {
        let folded = profile.name.to_ascii_lowercase();
        self.by_id.insert(profile.id, folded.clone());
        self.by_name.insert(folded, profile);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Parse `name uuid` pairs, one per line. Blank lines and lines starting
    /// with `#` are skipped.
    pub fn parse(listing: &str) -> Result<Self, DirectoryError> {
        let mut directory = Self::new();
        for (index, line) in listing.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let err = |message: &str| DirectoryError {
                line: index + 1,
                message: message.to_owned(),
            };
            let mut parts = line.split_whitespace();
            let (Some(name), Some(id), None) = (parts.next(), parts.next(), parts.next()) else {
                return Err(err("expected `name uuid`"));
            };
            let id = parse_hex(id).ok_or_else(|| err("invalid uuid"))?;
            directory.insert(Profile::new(id, name));
        }
        Ok(directory)
    }

    fn wait(&self, cancel: &CancelToken) -> Result<(), LookupError> {
        if self.latency.is_zero() {
            return Ok(());
        }
        let deadline = Instant::now() + self.latency;
        let step = Duration::from_millis(5);
        while Instant::now() < deadline {
            if cancel.is_cancelled() {
                return Err(LookupError::Cancelled);
            }
            std::thread::sleep(step);
        }
        Ok(())
    }
}

impl Resolver for Directory {
    fn resolve(&self, key: &LookupKey, cancel: &CancelToken) -> Result<Profile, LookupError> {
        self.wait(cancel)?;
        if cancel.is_cancelled() {
            return Err(LookupError::Cancelled);
        }
        let folded = match key {
            LookupKey::Name(name) => name.to_ascii_lowercase(),
            LookupKey::Id(id) => self.by_id.get(id).cloned().ok_or(LookupError::NotFound)?,
        };
        self.by_name.get(&folded).cloned().ok_or(LookupError::NotFound)
    }
}
