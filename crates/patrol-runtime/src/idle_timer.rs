//! Dwell sampling and interruptible waits.
//!
//! [`IdleTimer`] draws a dwell duration per stop from a [`DwellRange`].
//! [`Countdown`] is the suspension primitive the controller holds while
//! settling or idling; it only advances when the controller is ticked, so
//! dropping it is all it takes to cancel a wait.

use patrol_types::DwellRange;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

/// Samples randomized dwell durations.
pub struct IdleTimer {
    range: DwellRange,
    rng: StdRng,
}

impl IdleTimer {
    pub fn new(range: DwellRange, seed: u64) -> Self {
        Self::with_rng(range, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(range: DwellRange, rng: StdRng) -> Self {
        Self { range, rng }
    }

    /// Replace the dwell bounds.  Takes effect at the next [`sample`][Self::sample].
    ///
    /// Invalid bounds are clamped (see [`DwellRange::new`]) and a warning is
    /// logged.
    pub fn set_range(&mut self, min_secs: f32, max_secs: f32) {
        if DwellRange::was_clamped(min_secs, max_secs) {
            warn!(min_secs, max_secs, "invalid idle duration bounds; clamping");
        }
        self.range = DwellRange::new(min_secs, max_secs);
    }

    pub fn range(&self) -> DwellRange {
        self.range
    }

    /// Draw a dwell duration uniformly from `[min, max]`, in seconds.
    pub fn sample(&mut self) -> f32 {
        let (min, max) = (self.range.min_secs(), self.range.max_secs());
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..=max)
    }
}

/// A wait that completes after a fixed amount of ticked time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Countdown {
    remaining: f32,
}

impl Countdown {
    pub fn new(secs: f32) -> Self {
        Self {
            remaining: secs.max(0.0),
        }
    }

    /// Consume `dt` seconds.  Returns `true` once the wait has elapsed.
    pub fn advance(&mut self, dt: f32) -> bool {
        if dt > 0.0 {
            self.remaining -= dt;
        }
        self.remaining <= 0.0
    }

    pub fn remaining(&self) -> f32 {
        self.remaining.max(0.0)
    }
}
