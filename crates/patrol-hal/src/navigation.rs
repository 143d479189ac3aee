//! Generic `NavigationPort` trait for anything that can walk an agent to a
//! point: a nav-mesh agent, a physics character controller, or the
//! [`SimNavigator`][crate::sim::SimNavigator].
//!
//! The patrol runtime only ever talks to this trait.  Path computation,
//! steering, and avoidance all live behind it.

use patrol_types::{PatrolError, Vec3};

/// A path-following agent driven by destination commands.
///
/// The arrival predicate used by the patrol controller is
/// `!is_path_pending() && remaining_distance() <= stopping_distance()`.
pub trait NavigationPort: Send {
    /// Stable identifier used in logs and error reports.
    fn id(&self) -> &str;

    /// Maximum travel speed in units per second.
    fn set_speed(&mut self, speed: f32);

    /// Distance from the destination at which the agent counts as arrived.
    fn set_stopping_distance(&mut self, distance: f32);

    /// Currently configured stopping distance.
    fn stopping_distance(&self) -> f32;

    /// Maximum acceleration in units per second squared.
    fn set_acceleration(&mut self, acceleration: f32);

    /// Maximum turn rate in degrees per second.
    fn set_angular_speed(&mut self, degrees_per_sec: f32);

    /// Whether the agent slows down when approaching its destination.
    fn set_auto_braking(&mut self, enabled: bool);

    /// Begin moving toward `point`.
    ///
    /// # Errors
    ///
    /// Returns [`PatrolError::Navigation`] if the destination cannot be
    /// accepted at all (e.g. it is not a finite point).  An accepted but
    /// unreachable destination is *not* an error.
    fn set_destination(&mut self, point: Vec3) -> Result<(), PatrolError>;

    /// `true` while a path to the last destination is still being computed.
    fn is_path_pending(&self) -> bool;

    /// Distance left along the current path.
    fn remaining_distance(&self) -> f32;

    /// Current velocity vector.
    fn velocity(&self) -> Vec3;

    /// Overwrite the current velocity.  Used to kill residual motion.
    fn set_velocity(&mut self, velocity: Vec3);

    /// Halt or release motion without discarding the destination.
    fn set_motion_halted(&mut self, halted: bool);
}

/// Static tuning applied to a [`NavigationPort`] before patrolling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationSettings {
    pub speed: f32,
    pub stopping_distance: f32,
    pub acceleration: f32,
    pub angular_speed: f32,
    pub auto_braking: bool,
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self {
            speed: 1.0,
            stopping_distance: 0.5,
            acceleration: 8.0,
            angular_speed: 120.0,
            auto_braking: true,
        }
    }
}

impl NavigationSettings {
    /// Push every setting to `port`.
    pub fn apply(&self, port: &mut dyn NavigationPort) {
        port.set_speed(self.speed);
        port.set_stopping_distance(self.stopping_distance);
        port.set_acceleration(self.acceleration);
        port.set_angular_speed(self.angular_speed);
        port.set_auto_braking(self.auto_braking);
    }
}

/// Evaluate the arrival predicate against `port`.
pub fn has_arrived(port: &dyn NavigationPort) -> bool {
    !port.is_path_pending() && port.remaining_distance() <= port.stopping_distance()
}
