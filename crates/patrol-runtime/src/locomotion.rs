//! Speed-driven locomotion blend.
//!
//! [`LocomotionBlender`] converts the agent's instantaneous speed into a
//! normalised `[0, 1]` blend value and smooths it with a critically damped
//! spring so the animation never pops.  The filter is frame-rate
//! independent: the same wall-clock motion produces the same curve whether
//! it is ticked at 30 Hz or 240 Hz (up to the accuracy of the exponential
//! approximation).
//!
//! # Example
//!
//! ```rust
//! use patrol_runtime::locomotion::LocomotionBlender;
//!
//! let mut blender = LocomotionBlender::new(0.05);
//! let mut value = 0.0;
//! for _ in 0..60 {
//!     value = blender.update(1.0, 1.0, 1.0 / 60.0); // full speed
//! }
//! assert!(value > 0.99);
//! ```

/// Critically damped smoother from speed to blend value.
#[derive(Debug, Clone)]
pub struct LocomotionBlender {
    smoothing_time: f32,
    current: f32,
    velocity: f32,
}

/// Lower bound on the smoothing time constant to keep `2 / τ` finite.
const MIN_SMOOTHING_TIME: f32 = 1e-4;

impl LocomotionBlender {
    /// Create a blender at rest with response time constant `smoothing_time`
    /// seconds.
    pub fn new(smoothing_time: f32) -> Self {
        Self {
            smoothing_time: smoothing_time.max(MIN_SMOOTHING_TIME),
            current: 0.0,
            velocity: 0.0,
        }
    }

    /// Map `speed` against `move_speed` to a `[0, 1]` target.
    ///
    /// A non-positive or non-finite `move_speed` maps everything to `0.0`.
    pub fn target_for(speed: f32, move_speed: f32) -> f32 {
        if !(move_speed > 0.0 && move_speed.is_finite()) || !speed.is_finite() {
            return 0.0;
        }
        (speed / move_speed).clamp(0.0, 1.0)
    }

    /// Advance the filter by `dt` seconds toward the blend for `speed`.
    ///
    /// Returns the new blend value, always in `[0, 1]`.  A non-positive `dt`
    /// returns the current value without touching the filter state.
    pub fn update(&mut self, speed: f32, move_speed: f32, dt: f32) -> f32 {
        if dt <= 0.0 {
            return self.current;
        }
        let target = Self::target_for(speed, move_speed);

        let omega = 2.0 / self.smoothing_time;
        let x = omega * dt;
        // Padé-style approximation of e^-x, accurate over the useful range.
        let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

        let change = self.current - target;
        let temp = (self.velocity + omega * change) * dt;
        self.velocity = (self.velocity - omega * temp) * decay;
        let mut output = target + (change + temp) * decay;

        // Never overshoot the target.
        if (target - self.current > 0.0) == (output > target) {
            output = target;
            self.velocity = (output - target) / dt;
        }

        self.current = output.clamp(0.0, 1.0);
        self.current
    }

    /// Current blend value.
    pub fn value(&self) -> f32 {
        self.current
    }

    /// Current rate of change of the blend value, per second.
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn smoothing_time(&self) -> f32 {
        self.smoothing_time
    }

    pub fn set_smoothing_time(&mut self, smoothing_time: f32) {
        self.smoothing_time = smoothing_time.max(MIN_SMOOTHING_TIME);
    }

    /// Drop the filter back to rest at zero.
    pub fn reset(&mut self) {
        self.current = 0.0;
        self.velocity = 0.0;
    }
}

impl Default for LocomotionBlender {
    fn default() -> Self {
        Self::new(0.05)
    }
}
