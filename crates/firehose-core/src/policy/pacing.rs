//! Minimum spacing between connection attempts.
//!
//! Streaming endpoints penalise clients that reconnect in bursts. A `Pacer`
//! remembers when the last attempt was made and reports how long the next
//! one has to wait so attempts are never closer together than
//! `min_interval`.

use std::time::Duration;

use tokio::time::Instant;

/// Tracks the last attempt and enforces a minimum interval.
#[derive(Debug, Clone)]
pub struct Pacer {
    min_interval: Duration,
    last_attempt: Option<Instant>,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_attempt: None,
        }
    }

    /// Time left before an attempt at `now` is allowed. Zero if none is
    /// needed (including when no attempt has been made yet).
    pub fn wait_time(&self, now: Instant) -> Duration {
        match self.last_attempt {
            None => Duration::ZERO,
            Some(last) => self
                .min_interval
                .saturating_sub(now.saturating_duration_since(last)),
        }
    }

    /// Record that an attempt was made at `now`.
    pub fn record_attempt(&mut self, now: Instant) {
        self.last_attempt = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_is_free() {
        let pacer = Pacer::new(Duration::from_secs(10));
        assert_eq!(pacer.wait_time(Instant::now()), Duration::ZERO);
    }

    #[test]
    fn waits_for_the_remainder() {
        let mut pacer = Pacer::new(Duration::from_secs(10));
        let t0 = Instant::now();
        pacer.record_attempt(t0);
        assert_eq!(pacer.wait_time(t0), Duration::from_secs(10));
        assert_eq!(pacer.wait_time(t0 + Duration::from_secs(4)), Duration::from_secs(6));
        assert_eq!(pacer.wait_time(t0 + Duration::from_secs(10)), Duration::ZERO);
        assert_eq!(pacer.wait_time(t0 + Duration::from_secs(60)), Duration::ZERO);
    }

    #[test]
    fn later_attempt_resets_the_window() {
        let mut pacer = Pacer::new(Duration::from_millis(500));
        let t0 = Instant::now();
        pacer.record_attempt(t0);
        pacer.record_attempt(t0 + Duration::from_millis(800));
        assert_eq!(
            pacer.wait_time(t0 + Duration::from_millis(900)),
            Duration::from_millis(400)
        );
    }
}
