//! Single-flight gate in front of the broadcast cycle.
//!
//! The gate closes on a successful [`PlaybackGate::try_enter`] and reopens
//! once the cooldown has elapsed, whether or not the cycle has finished.
//! It limits broadcast *starts* to one per cooldown window.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
pub struct PlaybackGate {
    entered_at: Mutex<Option<Instant>>,
    cooldown: Duration,
}

impl PlaybackGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            entered_at: Mutex::new(None),
            cooldown,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Non-blocking. Returns `false` when a cycle started less than one
    /// cooldown ago; the request is dropped, not queued.
    pub fn try_enter(&self) -> bool {
        let mut entered_at = self.entered_at.lock();
        let now = Instant::now();

        if let Some(since) = *entered_at {
            if now.duration_since(since) < self.cooldown {
                debug!(
                    "Gate busy for another {:?}",
                    self.cooldown - now.duration_since(since)
                );
                return false;
            }
        }

        *entered_at = Some(now);
        true
    }

    pub fn is_busy(&self) -> bool {
        match *self.entered_at.lock() {
            Some(since) => since.elapsed() < self.cooldown,
            None => false,
        }
    }
}
