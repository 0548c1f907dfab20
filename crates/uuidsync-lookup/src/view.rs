#![forbid(unsafe_code)]

//! The player view.
//!
//! One free-text field holding a player name (or a pasted id). Its canonical
//! contribution is the resolved id, or all-zero bytes while unresolved.
//! Resolution runs through a [`LookupSession`]; results are applied from
//! [`View::tick`], which asks the engine for a resync when a name resolved.

use std::sync::Arc;

use uuidsync_core::field::{ERROR_CODE_LOOKUP, ERROR_CODE_NOT_FOUND};
use uuidsync_core::{
    Field, FieldError, FieldFormat, Notice, SyncContext, TickOutcome, UuidValue, View,
};
use web_time::Instant;

use crate::dispatch::Dispatcher;
use crate::resolver::{LookupError, LookupKey, Profile, Resolver};
use crate::session::{LookupConfig, LookupDirection, LookupFailure, LookupRequest, LookupSession};

/// View key of [`PlayerView`].
pub const PLAYER_KEY: &str = "player";

/// Resolves player names to ids and back.
#[derive(Debug)]
pub struct PlayerView {
    fields: [Field; 1],
    session: LookupSession,
    notices: Vec<Notice>,
}

impl PlayerView {
    #[must_use]
    pub fn new(
        resolver: Arc<dyn Resolver>,
        dispatcher: Box<dyn Dispatcher>,
        config: LookupConfig,
    ) -> Self {
        Self {
            fields: [Field::new("name", FieldFormat::Free)],
            session: LookupSession::new(resolver, dispatcher, config),
            notices: Vec::new(),
        }
    }

    #[must_use]
    pub fn session(&self) -> &LookupSession {
        &self.session
    }

    #[must_use]
    pub fn loaded(&self) -> Option<&Profile> {
        self.session.loaded()
    }

    /// Avatar of the loaded player.
    #[must_use]
    pub fn image(&self) -> Option<&[u8]> {
        self.session.loaded().and_then(|p| p.image.as_deref())
    }

    fn show_name(&mut self, name: &str) {
        // set_text clears any attached error, so only touch a stale text.
        if self.fields[0].text() != name {
            self.fields[0].set_text(name);
        }
    }

    fn surface(&mut self, failure: &LookupFailure) {
        let code = match failure.error {
            LookupError::NotFound => ERROR_CODE_NOT_FOUND,
            _ => ERROR_CODE_LOOKUP,
        };
        let message = failure.error.to_string();
        self.fields[0].set_error(FieldError::new(code, message.clone()));
        self.notices.push(Notice::Error {
            view: PLAYER_KEY.to_owned(),
            key: failure.key.label(),
            message,
        });
    }
}

impl View for PlayerView {
    fn key(&self) -> &str {
        PLAYER_KEY
    }

    fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    fn parse(&mut self, value: &mut UuidValue, ctx: &SyncContext) {
        let text = self.fields[0].text().trim().to_owned();
        if text.is_empty() {
            self.session.clear();
            value.clear();
            return;
        }
        let key = LookupKey::from_text(&text);
        self.session.request(
            LookupRequest::forward(key.clone(), ctx.is_final),
            ctx.now,
            ctx.is_final,
        );
        if let Some(profile) = self.session.loaded_for(&key) {
            *value = profile.id;
            return;
        }
        value.clear();
        if ctx.is_final
            && let Some(failure) = self.session.failure_for(&key).cloned()
        {
            self.surface(&failure);
        }
    }

    fn unparse(&mut self, value: &UuidValue, ctx: &SyncContext) {
        if value.is_nil() {
            self.session.clear();
            self.show_name("");
            return;
        }
        let key = LookupKey::Id(*value);
        self.session
            .request(LookupRequest::reverse(key.clone()), ctx.now, ctx.is_final);
        if let Some(name) = self.session.loaded_for(&key).map(|p| p.name.clone()) {
            self.show_name(&name);
        } else if self.session.failure_for(&key).is_some() {
            self.show_name("");
        }
    }

    fn tick(&mut self, now: Instant) -> TickOutcome {
        let mut outcome = TickOutcome::idle();
        for resolution in self.session.poll(now) {
            match (resolution.request.direction, resolution.outcome) {
                (direction, Ok(profile)) => {
                    self.show_name(&profile.name);
                    self.notices.push(Notice::Loaded {
                        view: PLAYER_KEY.to_owned(),
                        name: profile.name,
                        id: profile.id,
                    });
                    // A reverse lookup started from the value; nothing to push back.
                    outcome.resync |= direction == LookupDirection::Forward;
                }
                (LookupDirection::Forward, Err(error)) => {
                    if resolution.request.commit {
                        self.surface(&LookupFailure {
                            key: resolution.request.key,
                            error,
                        });
                    }
                }
                (LookupDirection::Reverse, Err(_)) => self.show_name(""),
            }
        }
        outcome.notices = std::mem::take(&mut self.notices);
        outcome
    }
}
