//! Synchronization behaviour configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for session synchronization behaviour.
///
/// Groups the tunables that control drift correction, echo suppression,
/// session lifetime, and topic buffering.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SyncConfig {
    /// Drift tolerance in percentage points of track duration.
    ///
    /// A follower whose position diverges from the host's by more than this
    /// is hard-seeked; anything below is left alone so network and clock
    /// jitter don't cause constant micro-seeking and audible stutter.
    pub drift_threshold: f32,

    /// How long outbound publishing stays suppressed after a remote snapshot
    /// has been applied, in milliseconds.
    pub suppress_window_ms: u64,

    /// Session lifetime in seconds. Joining after expiry fails.
    pub session_ttl_secs: u64,

    /// Capacity of each session's broadcast topic.
    pub channel_capacity: usize,
}

impl SyncConfig {
    /// Creates a new `SyncConfig` with validated values.
    ///
    /// # Errors
    ///
    /// Returns an error if any value would cause runtime issues.
    pub fn new(
        drift_threshold: f32,
        suppress_window_ms: u64,
        session_ttl_secs: u64,
        channel_capacity: usize,
    ) -> Result<Self, String> {
        let config = Self {
            drift_threshold,
            suppress_window_ms,
            session_ttl_secs,
            channel_capacity,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if !self.drift_threshold.is_finite() || self.drift_threshold < 0.0 {
            return Err("drift_threshold must be a finite value >= 0".to_string());
        }
        if self.drift_threshold > 100.0 {
            return Err("drift_threshold is in percentage points, must be <= 100".to_string());
        }
        if self.session_ttl_secs == 0 {
            return Err("session_ttl_secs must be >= 1".to_string());
        }
        if self.channel_capacity == 0 {
            return Err(
                "channel_capacity must be >= 1 (broadcast::channel panics on 0)".to_string(),
            );
        }
        Ok(())
    }

    /// The suppression window as a [`Duration`].
    #[must_use]
    pub fn suppress_window(&self) -> Duration {
        Duration::from_millis(self.suppress_window_ms)
    }

    /// Session lifetime in milliseconds.
    #[must_use]
    pub fn session_ttl_millis(&self) -> u64 {
        self.session_ttl_secs * 1000
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            drift_threshold: 5.0,
            suppress_window_ms: 300,
            session_ttl_secs: 6 * 60 * 60,
            channel_capacity: 256,
        }
    }
}
