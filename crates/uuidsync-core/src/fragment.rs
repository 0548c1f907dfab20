#![forbid(unsafe_code)]

//! URL-fragment persistence of the canonical value.
//!
//! # Format
//!
//! A fragment is either the random directive (`rand`, case-insensitive) or a
//! comma-joined list of one view's field texts. Decoding routes the tokens to
//! the first registered view whose field count equals the token count; when
//! no view matches, the whole fragment is treated as hex text.
//!
//! No percent-encoding is applied here; the host environment owns that.

use std::sync::{Arc, Mutex};

/// How a fragment should be applied to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentPlan {
    /// Generate a random value.
    Random,
    /// Assign `tokens` positionally to the fields of view `view`.
    Fields { view: usize, tokens: Vec<String> },
    /// Assign the whole fragment to the fallback view's single field.
    Fallback { text: String },
}

/// Outcome of loading a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentOutcome {
    /// A random value was generated.
    Randomized,
    /// The fragment was decoded into the named view.
    Decoded { view: String },
    /// The fragment was empty; nothing changed.
    Empty,
}

/// Strip one leading `#`, as hosts differ on whether they include it.
#[must_use]
pub fn strip_hash(fragment: &str) -> &str {
    fragment.strip_prefix('#').unwrap_or(fragment)
}

/// Decide how to apply `fragment` given each registered view's field count
/// in registration order.
#[must_use]
pub fn plan(fragment: &str, random_directive: &str, field_counts: &[usize]) -> Option<FragmentPlan> {
    let fragment = strip_hash(fragment);
    if fragment.is_empty() {
        return None;
    }
    if fragment.eq_ignore_ascii_case(random_directive) {
        return Some(FragmentPlan::Random);
    }
    let tokens: Vec<String> = fragment.split(',').map(str::to_owned).collect();
    match route(tokens.len(), field_counts) {
        Some(view) => Some(FragmentPlan::Fields { view, tokens }),
        None => Some(FragmentPlan::Fallback {
            text: fragment.to_owned(),
        }),
    }
}

/// Index of the view a fragment with `token_count` tokens decodes into.
#[must_use]
pub fn route(token_count: usize, field_counts: &[usize]) -> Option<usize> {
    field_counts.iter().position(|count| *count == token_count)
}

/// Read/write access to the host's URL fragment.
pub trait FragmentStore {
    /// Current fragment, with or without a leading `#`.
    fn read(&self) -> String;
    /// Replace the fragment.
    fn write(&mut self, fragment: &str);
}

/// An in-memory fragment, shareable between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryFragment {
    inner: Arc<Mutex<String>>,
}

impl MemoryFragment {
    #[must_use]
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial.into())),
        }
    }
}

impl FragmentStore for MemoryFragment {
    fn read(&self) -> String {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn write(&mut self, fragment: &str) {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = fragment.to_owned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTS: [usize; 4] = [1, 2, 4, 1];

    #[test]
    fn random_directive_is_case_insensitive() {
        assert_eq!(plan("#RaNd", "rand", &COUNTS), Some(FragmentPlan::Random));
    }

    #[test]
    fn first_matching_view_wins() {
        assert_eq!(
            plan("1,2,3,4", "rand", &COUNTS),
            Some(FragmentPlan::Fields {
                view: 2,
                tokens: vec!["1".into(), "2".into(), "3".into(), "4".into()],
            })
        );
        assert_eq!(
            plan("abc", "rand", &COUNTS),
            Some(FragmentPlan::Fields {
                view: 0,
                tokens: vec!["abc".into()],
            })
        );
    }

    #[test]
    fn unmatched_count_falls_back_to_hex() {
        assert_eq!(
            plan("1,2,3", "rand", &COUNTS),
            Some(FragmentPlan::Fallback {
                text: "1,2,3".into()
            })
        );
    }

    #[test]
    fn empty_fragment_has_no_plan() {
        assert_eq!(plan("#", "rand", &COUNTS), None);
        assert_eq!(plan("", "rand", &COUNTS), None);
    }

    #[test]
    fn memory_fragment_shares_state() {
        let store = MemoryFragment::new("#1,2");
        let mut writer = store.clone();
        writer.write("rand");
        assert_eq!(store.read(), "rand");
    }
}
