//! Supervisor configuration.

use std::time::Duration;

use thiserror::Error;

/// Configuration for the [`ConnectionSupervisor`](crate::ConnectionSupervisor).
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Minimum spacing between two subscription attempts.
    pub reconnect_interval: Duration,
    /// Longest a hand-off may hold the lock before it is force-expired and
    /// its candidate abandoned. Must exceed `reconnect_interval`, since the
    /// pacing wait happens while the lock is held.
    pub max_lock_duration: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            reconnect_interval: Duration::from_secs(10),
            max_lock_duration: Duration::from_secs(60),
        }
    }
}

impl SupervisorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_lock_duration <= self.reconnect_interval {
            return Err(ConfigError::LockWindowTooShort {
                max_lock_duration: self.max_lock_duration,
                reconnect_interval: self.reconnect_interval,
            });
        }
        Ok(())
    }
}

/// Invalid supervisor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max lock duration ({max_lock_duration:?}) must exceed the reconnect interval ({reconnect_interval:?})")]
    LockWindowTooShort {
        max_lock_duration: Duration,
        reconnect_interval: Duration,
    },
}
