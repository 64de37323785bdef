//! The hand-off lock: at most one hand-off in flight, held for a bounded time.

use std::time::Duration;

use tokio::time::Instant;

use firehose_core::LockTimeoutError;

/// Identifies one acquisition of the lock, so a late watchdog or a pacing
/// wait can tell whether the lock it took is still the one being held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HandoffToken(u64);

#[derive(Debug, Clone, Copy)]
struct Hold {
    token: HandoffToken,
    acquired_at: Instant,
}

#[derive(Debug, Default)]
pub(crate) struct HandoffLock {
    hold: Option<Hold>,
    acquisitions: u64,
}

impl HandoffLock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn acquire(&mut self, now: Instant) -> HandoffToken {
        self.acquisitions += 1;
        let token = HandoffToken(self.acquisitions);
        self.hold = Some(Hold { token, acquired_at: now });
        token
    }

    pub(crate) fn release(&mut self) {
        self.hold = None;
    }

    pub(crate) fn is_held(&self) -> bool {
        self.hold.is_some()
    }

    pub(crate) fn holds(&self, token: HandoffToken) -> bool {
        self.hold.is_some_and(|h| h.token == token)
    }

    /// `Ok(None)` when free, `Ok(Some(held_for))` when held within `limit`,
    /// `Err` once it has been held for `limit` or longer.
    pub(crate) fn check(
        &self,
        now: Instant,
        limit: Duration,
    ) -> Result<Option<Duration>, LockTimeoutError> {
        let Some(hold) = self.hold else {
            return Ok(None);
        };
        let held = now.saturating_duration_since(hold.acquired_at);
        if held >= limit {
            Err(LockTimeoutError { held, limit })
        } else {
            Ok(Some(held))
        }
    }
}
