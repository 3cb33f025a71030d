//! Repository configuration.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use serde::Deserialize;

/// Source of the current time for timestamp fields.
#[derive(Clone)]
pub struct Clock(Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>);

impl Clock {
    /// Creates a clock from a function.
    pub fn new(now: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self(Arc::new(now))
    }

    /// Creates a clock that always returns the same instant.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::new(move || at)
    }

    /// Returns the current time.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        (self.0)()
    }
}

impl Default for Clock {
    /// Wall clock, truncated to whole seconds.
    fn default() -> Self {
        Self::new(|| Utc::now().trunc_subsecs(0))
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Clock").field(&self.now()).finish()
    }
}

/// Configuration of a [`Repo`](crate::Repo).
///
/// Every plain field can be deserialized, so the configuration can live in an
/// application's own config file:
///
/// ```
/// use oxide_orm::RepoConfig;
///
/// let config: RepoConfig =
///     serde_json::from_str(r#"{ "created_at": "inserted_at" }"#).unwrap();
/// assert_eq!(config.created_at, "inserted_at");
/// assert_eq!(config.updated_at, "updated_at");
/// assert!(config.timestamps);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Whether `created_at` / `updated_at` are filled in automatically.
    pub timestamps: bool,
    /// Name of the creation timestamp field.
    pub created_at: String,
    /// Name of the modification timestamp field.
    pub updated_at: String,
    /// Primary key used when a record shape declares none.
    pub primary_key: String,
    /// Time source for timestamp fields.
    #[serde(skip)]
    pub clock: Clock,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            timestamps: true,
            created_at: "created_at".to_string(),
            updated_at: "updated_at".to_string(),
            primary_key: "id".to_string(),
            clock: Clock::default(),
        }
    }
}

impl RepoConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables automatic timestamps.
    #[must_use]
    pub const fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    /// Sets the creation timestamp field name.
    #[must_use]
    pub fn with_created_at(mut self, name: impl Into<String>) -> Self {
        self.created_at = name.into();
        self
    }

    /// Sets the modification timestamp field name.
    #[must_use]
    pub fn with_updated_at(mut self, name: impl Into<String>) -> Self {
        self.updated_at = name.into();
        self
    }

    /// Sets the fallback primary key name.
    #[must_use]
    pub fn with_primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_key = name.into();
        self
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the current time according to the configured clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
