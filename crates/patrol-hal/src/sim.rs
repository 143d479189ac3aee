//! In-process simulation drivers for headless runs and CI testing.
//!
//! [`SimNavigator`] is a straight-line kinematic agent: no path planning, no
//! obstacles, just acceleration-limited motion toward the destination with
//! optional braking.  Every command it receives is recorded so tests can
//! assert on the exact call sequence.  [`SimAnimator`] records blend
//! parameter writes.
//!
//! # Example
//!
//! ```rust
//! use patrol_hal::navigation::NavigationPort;
//! use patrol_hal::sim::SimNavigator;
//! use patrol_types::Vec3;
//!
//! let mut nav = SimNavigator::new("walker", Vec3::zero());
//! nav.set_speed(2.0);
//! nav.set_destination(Vec3::new(1.0, 0.0, 0.0)).expect("finite destination");
//! for _ in 0..50 {
//!     nav.step(0.05);
//! }
//! assert!(nav.remaining_distance() <= nav.stopping_distance());
//! ```

use std::collections::HashMap;

use patrol_types::{PatrolError, Vec3};
use tracing::trace;

use crate::animation::AnimationSink;
use crate::navigation::NavigationPort;

/// Positional slack within which the agent counts as resting on its stop
/// point.
const ARRIVAL_TOLERANCE: f32 = 1e-4;

// ────────────────────────────────────────────────────────────────────────────
// Command log
// ────────────────────────────────────────────────────────────────────────────

/// A command received by [`SimNavigator`], in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum NavCommand {
    SetSpeed(f32),
    SetStoppingDistance(f32),
    SetAcceleration(f32),
    SetAngularSpeed(f32),
    SetAutoBraking(bool),
    SetDestination(Vec3),
    SetVelocity(Vec3),
    SetMotionHalted(bool),
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated navigator
// ────────────────────────────────────────────────────────────────────────────

/// A simulated navigation agent moving in a straight line.
///
/// Call [`SimNavigator::step`] once per frame *before* ticking the
/// controller so the controller observes the post-move state.
pub struct SimNavigator {
    id: String,
    position: Vec3,
    velocity: Vec3,
    destination: Option<Vec3>,
    speed: f32,
    stopping_distance: f32,
    acceleration: f32,
    angular_speed: f32,
    auto_braking: bool,
    halted: bool,
    path_latency_ticks: u32,
    pending_ticks: u32,
    commands: Vec<NavCommand>,
}

impl SimNavigator {
    /// Create a navigator at `position` with default tuning and no latency.
    pub fn new(id: impl Into<String>, position: Vec3) -> Self {
        Self {
            id: id.into(),
            position,
            velocity: Vec3::zero(),
            destination: None,
            speed: 1.0,
            stopping_distance: 0.5,
            acceleration: 8.0,
            angular_speed: 120.0,
            auto_braking: true,
            halted: false,
            path_latency_ticks: 0,
            pending_ticks: 0,
            commands: Vec::new(),
        }
    }

    /// Report the path as pending for `ticks` steps after every new
    /// destination, emulating asynchronous path computation.
    pub fn with_path_latency(mut self, ticks: u32) -> Self {
        self.path_latency_ticks = ticks;
        self
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn destination(&self) -> Option<Vec3> {
        self.destination
    }

    /// Last commanded turn rate; unused by the straight-line model.
    pub fn angular_speed(&self) -> f32 {
        self.angular_speed
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Every command received so far.
    pub fn commands(&self) -> &[NavCommand] {
        &self.commands
    }

    /// Only the destinations, in the order they were commanded.
    pub fn destinations(&self) -> Vec<Vec3> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                NavCommand::SetDestination(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    /// Advance the simulation by `dt` seconds.  Non-positive `dt` is a no-op.
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        if self.pending_ticks > 0 {
            self.pending_ticks -= 1;
            return;
        }
        let Some(dest) = self.destination else {
            self.velocity = Vec3::zero();
            return;
        };
        if self.halted {
            self.velocity = Vec3::zero();
            return;
        }

        let offset = dest.sub(self.position);
        let dist = offset.length();
        let to_stop = dist - self.stopping_distance;
        if to_stop <= ARRIVAL_TOLERANCE || dist <= f32::EPSILON {
            self.velocity = Vec3::zero();
            return;
        }

        let mut desired = self.speed.max(0.0);
        if self.auto_braking && self.acceleration > 0.0 {
            desired = desired.min((2.0 * self.acceleration * to_stop).sqrt());
        }

        let current = self.velocity.length();
        let new_speed = if self.acceleration > 0.0 {
            let max_delta = self.acceleration * dt;
            current + (desired - current).clamp(-max_delta, max_delta)
        } else {
            desired
        };

        let travel = (new_speed * dt).min(to_stop);
        let dir = offset.scale(1.0 / dist);
        self.position = self.position.add(dir.scale(travel));
        self.velocity = dir.scale(travel / dt);
        trace!(
            navigator = %self.id,
            x = self.position.x,
            y = self.position.y,
            z = self.position.z,
            speed = travel / dt,
            "sim step"
        );
    }
}

impl NavigationPort for SimNavigator {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_speed(&mut self, speed: f32) {
        self.commands.push(NavCommand::SetSpeed(speed));
        self.speed = speed;
    }

    fn set_stopping_distance(&mut self, distance: f32) {
        self.commands.push(NavCommand::SetStoppingDistance(distance));
        self.stopping_distance = distance.max(0.0);
    }

    fn stopping_distance(&self) -> f32 {
        self.stopping_distance
    }

    fn set_acceleration(&mut self, acceleration: f32) {
        self.commands.push(NavCommand::SetAcceleration(acceleration));
        self.acceleration = acceleration;
    }

    fn set_angular_speed(&mut self, degrees_per_sec: f32) {
        // Straight-line motion has no turning; recorded for completeness.
        self.commands.push(NavCommand::SetAngularSpeed(degrees_per_sec));
        self.angular_speed = degrees_per_sec;
    }

    fn set_auto_braking(&mut self, enabled: bool) {
        self.commands.push(NavCommand::SetAutoBraking(enabled));
        self.auto_braking = enabled;
    }

    fn set_destination(&mut self, point: Vec3) -> Result<(), PatrolError> {
        if !(point.x.is_finite() && point.y.is_finite() && point.z.is_finite()) {
            return Err(PatrolError::Navigation {
                component: self.id.clone(),
                details: format!("destination {point:?} is not a finite point"),
            });
        }
        self.commands.push(NavCommand::SetDestination(point));
        self.destination = Some(point);
        self.pending_ticks = self.path_latency_ticks;
        Ok(())
    }

    fn is_path_pending(&self) -> bool {
        self.pending_ticks > 0
    }

    fn remaining_distance(&self) -> f32 {
        match self.destination {
            _ if self.pending_ticks > 0 => f32::INFINITY,
            Some(dest) => {
                let dist = dest.distance(self.position);
                if dist - self.stopping_distance <= ARRIVAL_TOLERANCE {
                    dist.min(self.stopping_distance)
                } else {
                    dist
                }
            }
            None => 0.0,
        }
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.commands.push(NavCommand::SetVelocity(velocity));
        self.velocity = velocity;
    }

    fn set_motion_halted(&mut self, halted: bool) {
        self.commands.push(NavCommand::SetMotionHalted(halted));
        self.halted = halted;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated animator
// ────────────────────────────────────────────────────────────────────────────

/// Records every blend parameter write.  Always succeeds.
#[derive(Debug, Default)]
pub struct SimAnimator {
    parameters: HashMap<String, f32>,
    history: Vec<(String, f32)>,
}

impl SimAnimator {
    /// Create an animator with no parameters set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent value written to `name`.
    pub fn parameter(&self, name: &str) -> Option<f32> {
        self.parameters.get(name).copied()
    }

    /// Every write, oldest first.
    pub fn history(&self) -> &[(String, f32)] {
        &self.history
    }
}

impl AnimationSink for SimAnimator {
    fn set_blend_parameter(&mut self, name: &str, value: f32) {
        self.parameters.insert(name.to_string(), value);
        self.history.push((name.to_string(), value));
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
