#![forbid(unsafe_code)]

//! Engine configuration.
//!
//! Defaults are usable as-is; hosts override them with the `with_*` builders
//! or from the environment:
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `UUIDSYNC_RANDOM_DIRECTIVE` | `random_directive` | `rand` |
//! | `UUIDSYNC_FALLBACK_VIEW` | `fallback_view` | `hex` |

use std::fmt;

use crate::views::HEX_KEY;

const ENV_RANDOM_DIRECTIVE: &str = "UUIDSYNC_RANDOM_DIRECTIVE";
const ENV_FALLBACK_VIEW: &str = "UUIDSYNC_FALLBACK_VIEW";

/// A malformed configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable held a value that could not be used.
    InvalidEnv { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnv { name, value } => write!(f, "invalid value for {name}: {value:?}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Synchronization engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Fragment text that requests a random value (compared
    /// case-insensitively).
    pub random_directive: String,
    /// View that receives fragments no view's field count matches, and that
    /// encodes the fragment when the active view cannot.
    pub fallback_view: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            random_directive: "rand".to_owned(),
            fallback_view: HEX_KEY.to_owned(),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_random_directive(mut self, directive: impl Into<String>) -> Self {
        self.random_directive = directive.into();
        self
    }

    #[must_use]
    pub fn with_fallback_view(mut self, key: impl Into<String>) -> Self {
        self.fallback_view = key.into();
        self
    }

    /// Read overrides from the environment, rejecting unusable values.
    pub fn try_from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(directive) = env_string(ENV_RANDOM_DIRECTIVE) {
            // A directive containing a comma could never be told apart from
            // field tokens.
            if directive.contains(',') {
                return Err(ConfigError::InvalidEnv {
                    name: ENV_RANDOM_DIRECTIVE,
                    value: directive,
                });
            }
            config.random_directive = directive;
        }
        if let Some(view) = env_string(ENV_FALLBACK_VIEW) {
            config.fallback_view = view;
        }
        Ok(config)
    }

    /// Like [`try_from_env`](Self::try_from_env), falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::try_from_env().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "ignoring engine environment overrides");
            Self::default()
        })
    }
}

/// Non-empty, trimmed value of an environment variable.
#[must_use]
pub fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Environment variable parsed as `u64`; `Err` carries the raw text.
pub fn env_u64(name: &str) -> Option<Result<u64, String>> {
    env_string(name).map(|value| value.parse::<u64>().map_err(|_| value))
}
