//! Poll scheduler.
//!
//! Driven by the caller's monotonic millisecond counter. When the
//! configured interval has elapsed since the last fire, the scheduler
//! hands control to a [`PollDelegate`] for exactly one cycle.
//!
//! ```text
//!   main loop ──tick(now_ms)──▶ PollScheduler ──on_poll_due──▶ UpdateCycle
//!                                   │
//!                                   └─ last_fire_ms = now_ms (any outcome)
//! ```
//!
//! The counter is a wrapping `u32` (≈49.7 days per lap); elapsed time is
//! always computed with `wrapping_sub`, so a wrap never double-fires or
//! stalls.

use log::debug;

use crate::app::ports::PollDelegate;

/// Default time between update checks.
pub const DEFAULT_CHECK_INTERVAL_SECS: u32 = 60;

pub struct PollScheduler {
    interval_ms: u32,
    last_fire_ms: u32,
}

impl PollScheduler {
    /// Counts from zero, so the first check fires one interval after boot.
    pub fn new(interval_secs: u32) -> Self {
        Self {
            interval_ms: secs_to_ms(interval_secs),
            last_fire_ms: 0,
        }
    }

    /// Takes effect on the next tick; elapsed time is measured against the
    /// existing `last_fire_ms`, never backdated.
    pub fn set_interval_secs(&mut self, secs: u32) {
        self.interval_ms = secs_to_ms(secs);
        debug!("poll interval set to {} ms", self.interval_ms);
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    pub fn last_fire_ms(&self) -> u32 {
        self.last_fire_ms
    }

    /// Whether a tick at `now_ms` would fire.
    pub fn is_due(&self, now_ms: u32) -> bool {
        now_ms.wrapping_sub(self.last_fire_ms) >= self.interval_ms
    }

    /// Run one cycle through `delegate` if the interval has elapsed.
    pub fn tick<D: PollDelegate>(&mut self, now_ms: u32, delegate: &mut D) -> Option<D::Outcome> {
        if !self.is_due(now_ms) {
            return None;
        }
        let outcome = delegate.on_poll_due(now_ms);
        self.last_fire_ms = now_ms;
        Some(outcome)
    }
}

impl Default for PollScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_CHECK_INTERVAL_SECS)
    }
}

fn secs_to_ms(secs: u32) -> u32 {
    secs.saturating_mul(1000)
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
