//! Time utilities and constants for the currencies service.

use chrono::{DateTime, Duration, Utc};

/// Service timing constants.
pub mod constants {
    use super::Duration;

    /// Upstream rate provider request timeout (5 seconds).
    pub fn provider_timeout() -> Duration {
        Duration::seconds(5)
    }
}

/// A timestamp with timezone (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Convert a Unix timestamp in seconds, as quoted by rate providers.
pub fn from_unix_seconds(seconds: i64) -> Option<Timestamp> {
    DateTime::from_timestamp(seconds, 0)
}

/// Age of a quote relative to now. Quotes from the future report zero.
pub fn quote_age(quoted_at: Timestamp) -> Duration {
    let age = now() - quoted_at;
    if age < Duration::zero() {
        Duration::zero()
    } else {
        age
    }
}

/// Duration extensions for convenient construction.
pub trait DurationExt {
    fn as_std(&self) -> std::time::Duration;
}

impl DurationExt for Duration {
    fn as_std(&self) -> std::time::Duration {
        self.to_std().unwrap_or(std::time::Duration::ZERO)
    }
}
