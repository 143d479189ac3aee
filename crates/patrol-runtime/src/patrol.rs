//! [`PatrolController`] – the patrol/idle state machine.
//!
//! Drives one agent around its waypoints.  Each call to
//! [`PatrolController::tick`] runs one frame:
//!
//! 1. **Blend** – sample the navigator's speed, smooth it through the
//!    [`LocomotionBlender`], and write the result to the [`AnimationSink`].
//!    This happens every frame whatever the lifecycle.
//! 2. **Advance** – move the active traversal cycle forward by at most one
//!    phase:
//!
//! | Phase          | Leaves when                                            |
//! |----------------|--------------------------------------------------------|
//! | `Traveling`    | the arrival predicate holds; motion is halted, velocity zeroed, blend snapped to 0 |
//! | `ArrivalHold`  | always after one tick; motion is released              |
//! | `Settling`     | the settle interval has elapsed; a dwell is sampled    |
//! | `Idling`       | the dwell has elapsed; the next target is selected     |
//!
//! # Cancellation
//!
//! Every cycle carries the generation number it was started under.  Lifecycle
//! operations drop the active cycle directly; other threads can do the same
//! through a [`CancelHandle`], which the controller observes at the top of
//! its next tick.  A cancelled cycle always leaves the navigator halted.
//!
//! # Unreachable targets
//!
//! The travel wait has no timeout.  A destination the navigator never
//! reaches keeps the cycle in `Traveling` forever; use `pause`, `restart`,
//! or a [`CancelHandle`] to get out of it.
//!
//! # Example
//!
//! ```rust
//! use patrol_hal::sim::{SimAnimator, SimNavigator};
//! use patrol_runtime::patrol::{PatrolConfig, PatrolController};
//! use patrol_types::{ControllerLifecycle, Vec3, Waypoint};
//!
//! let nav = SimNavigator::new("guard", Vec3::zero());
//! let mut patrol = PatrolController::new(PatrolConfig::default(), nav, SimAnimator::new());
//! patrol.add_waypoint(Waypoint::new(Vec3::new(3.0, 0.0, 0.0)));
//! patrol.start();
//! assert_eq!(patrol.lifecycle(), ControllerLifecycle::Running);
//!
//! for _ in 0..60 {
//!     patrol.navigator_mut().step(1.0 / 30.0);
//!     patrol.tick(1.0 / 30.0);
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use patrol_hal::{AnimationSink, NavigationPort, NavigationSettings, has_arrived};
use patrol_types::{
    ControllerLifecycle, CycleEndReason, DwellRange, PatrolEvent, SequencingMode, Vec3, Waypoint,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::idle_timer::{Countdown, IdleTimer};
use crate::locomotion::LocomotionBlender;
use crate::sequencer::TargetSequencer;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration bundle for [`PatrolController`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatrolConfig {
    /// Travel speed pushed to the navigator; also the speed that maps to a
    /// full locomotion blend.
    pub move_speed: f32,
    pub stopping_distance: f32,
    pub acceleration: f32,
    /// Turn rate in degrees per second.
    pub angular_speed: f32,
    pub auto_braking: bool,
    pub sequencing: SequencingMode,
    /// Wrap to the first waypoint after the last (sequential mode only).
    pub loop_targets: bool,
    pub min_idle: f32,
    pub max_idle: f32,
    /// Name of the animation float the blend value is written to.
    pub blend_parameter: String,
    /// Hold after arrival before the dwell starts, in seconds.
    pub settle_interval: f32,
    /// Response time constant of the blend smoothing, in seconds.
    pub blend_smoothing_time: f32,
    /// Seed for waypoint and dwell randomness.  `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for PatrolConfig {
    fn default() -> Self {
        Self {
            move_speed: 1.0,
            stopping_distance: 0.5,
            acceleration: 8.0,
            angular_speed: 120.0,
            auto_braking: true,
            sequencing: SequencingMode::Sequential,
            loop_targets: true,
            min_idle: 2.0,
            max_idle: 5.0,
            blend_parameter: "locomotion".to_string(),
            settle_interval: 0.1,
            blend_smoothing_time: 0.05,
            seed: None,
        }
    }
}

impl PatrolConfig {
    /// The navigator tuning described by this config.
    pub fn navigation_settings(&self) -> NavigationSettings {
        NavigationSettings {
            speed: self.move_speed,
            stopping_distance: self.stopping_distance,
            acceleration: self.acceleration,
            angular_speed: self.angular_speed,
            auto_braking: self.auto_braking,
        }
    }

    /// The dwell bounds, clamped to a valid range.
    pub fn dwell_range(&self) -> DwellRange {
        DwellRange::new(self.min_idle, self.max_idle)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cancellation
// ─────────────────────────────────────────────────────────────────────────────

/// Cloneable, thread-safe handle that cancels a controller's active cycle.
///
/// Cancellation is observed at the controller's next tick, never mid-step.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    generation: Arc<AtomicU64>,
}

impl CancelHandle {
    /// Invalidate whatever cycle is currently active.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Phases
// ─────────────────────────────────────────────────────────────────────────────

/// Where the active traversal cycle currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum PatrolPhase {
    /// Waiting for the navigator to reach `target`.
    Traveling { target: Waypoint },
    /// Arrived and halted; motion is released on the next tick.
    ArrivalHold { target: Waypoint },
    /// Short debounce after arrival before the dwell is sampled.
    Settling { wait: Countdown },
    /// Dwelling at the waypoint.
    Idling { wait: Countdown },
}

struct Cycle {
    token: u64,
    phase: PatrolPhase,
}

// ─────────────────────────────────────────────────────────────────────────────
// PatrolController
// ─────────────────────────────────────────────────────────────────────────────

/// The patrol state machine for a single agent.
///
/// Owns its navigator and animation sink; the frame loop reaches the
/// navigator through [`navigator_mut`][Self::navigator_mut] to advance
/// physics before calling [`tick`][Self::tick].
pub struct PatrolController<N: NavigationPort, A: AnimationSink> {
    config: PatrolConfig,
    navigator: N,
    animator: A,
    sequencer: TargetSequencer,
    idle: IdleTimer,
    blender: LocomotionBlender,
    generation: Arc<AtomicU64>,
    cycle: Option<Cycle>,
    lifecycle: ControllerLifecycle,
    /// Set once [`NavigationSettings`] have been pushed to the navigator.
    settings_applied: bool,
    events: Vec<PatrolEvent>,
}

impl<N: NavigationPort, A: AnimationSink> PatrolController<N, A> {
    /// Build a controller around `navigator` and `animator`.  No waypoints are
    /// assigned and nothing moves until [`start`][Self::start].
    pub fn new(config: PatrolConfig, navigator: N, animator: A) -> Self {
        let mut root = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let sequencer = TargetSequencer::with_rng(
            config.sequencing,
            config.loop_targets,
            StdRng::seed_from_u64(root.r#gen()),
        );
        let idle = IdleTimer::with_rng(config.dwell_range(), StdRng::seed_from_u64(root.r#gen()));
        let blender = LocomotionBlender::new(config.blend_smoothing_time);

        Self {
            config,
            navigator,
            animator,
            sequencer,
            idle,
            blender,
            generation: Arc::new(AtomicU64::new(0)),
            cycle: None,
            lifecycle: ControllerLifecycle::NotStarted,
            settings_applied: false,
            events: Vec::new(),
        }
    }

    /// Build a controller with an initial waypoint set.
    pub fn with_waypoints(
        config: PatrolConfig,
        navigator: N,
        animator: A,
        waypoints: impl IntoIterator<Item = Waypoint>,
    ) -> Self {
        let mut controller = Self::new(config, navigator, animator);
        for wp in waypoints {
            controller.sequencer.add_waypoint(wp);
        }
        controller
    }

    // -------------------------------------------------------------------------
    // Lifecycle API
    // -------------------------------------------------------------------------

    /// Apply the navigation settings and begin patrolling from the cursor.
    ///
    /// With no waypoints assigned this logs a warning, records
    /// [`PatrolEvent::NoWaypoints`], and leaves the controller stopped.
    /// Calling `start` while a cycle is active replaces that cycle.
    pub fn start(&mut self) {
        if self.sequencer.is_empty() {
            warn!(
                navigator = self.navigator.id(),
                "no waypoints assigned; patrol not started"
            );
            self.events.push(PatrolEvent::NoWaypoints);
            self.lifecycle = ControllerLifecycle::Stopped;
            return;
        }
        self.apply_navigation_settings();
        info!(
            navigator = self.navigator.id(),
            waypoints = self.sequencer.len(),
            mode = %self.sequencer.mode(),
            "starting patrol"
        );
        self.begin_cycle();
    }

    /// Cancel the active cycle, rewind to the first waypoint, and start over.
    pub fn restart(&mut self) {
        info!(navigator = self.navigator.id(), "restarting patrol");
        self.cancel_active();
        self.sequencer.reset();
        self.begin_cycle();
    }

    /// Halt the navigator immediately and cancel the active cycle.  The
    /// cursor is kept so [`resume`][Self::resume] continues where it left off.
    ///
    /// Only a running patrol becomes `Paused`; on an idle controller this just
    /// halts the navigator.
    pub fn pause(&mut self) {
        self.halt_motion();
        if self.lifecycle != ControllerLifecycle::Running {
            debug!(navigator = self.navigator.id(), lifecycle = %self.lifecycle, "pause ignored; patrol not running");
            return;
        }
        info!(navigator = self.navigator.id(), "pausing patrol");
        self.cancel_active();
        self.lifecycle = ControllerLifecycle::Paused;
        self.events.push(PatrolEvent::Paused);
    }

    /// Release the navigator and begin a new cycle from the current cursor.
    ///
    /// A leg interrupted by [`pause`][Self::pause] is not resumed mid-way:
    /// the next selection decides the target.
    pub fn resume(&mut self) {
        info!(navigator = self.navigator.id(), "resuming patrol");
        self.events.push(PatrolEvent::Resumed);
        self.begin_cycle();
    }

    /// Remove every waypoint and cancel the active cycle.
    pub fn clear_waypoints(&mut self) {
        info!(navigator = self.navigator.id(), "clearing waypoints");
        self.sequencer.clear();
        self.cancel_active();
        self.lifecycle = ControllerLifecycle::Stopped;
    }

    /// A handle other threads can use to cancel the active cycle.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            generation: Arc::clone(&self.generation),
        }
    }

    // -------------------------------------------------------------------------
    // Configuration setters
    // -------------------------------------------------------------------------

    /// Change the travel speed.  Applied to the navigator immediately.
    ///
    /// Negative or non-finite speeds are rejected with a warning and the
    /// previous speed is kept.
    pub fn set_move_speed(&mut self, speed: f32) {
        if !(speed >= 0.0 && speed.is_finite()) {
            warn!(speed, current = self.config.move_speed, "invalid move speed; keeping current");
            return;
        }
        self.config.move_speed = speed;
        self.navigator.set_speed(speed);
    }

    /// Change the dwell bounds.  Used from the next dwell on.
    pub fn set_idle_duration(&mut self, min_secs: f32, max_secs: f32) {
        self.idle.set_range(min_secs, max_secs);
        let range = self.idle.range();
        self.config.min_idle = range.min_secs();
        self.config.max_idle = range.max_secs();
    }

    /// Append a waypoint.  Used from the next selection on.
    pub fn add_waypoint(&mut self, waypoint: Waypoint) {
        debug!(waypoint = %waypoint, "waypoint added");
        self.sequencer.add_waypoint(waypoint);
    }

    pub fn set_sequencing_mode(&mut self, mode: SequencingMode) {
        self.config.sequencing = mode;
        self.sequencer.set_mode(mode);
    }

    pub fn set_loop_targets(&mut self, loop_targets: bool) {
        self.config.loop_targets = loop_targets;
        self.sequencer.set_loop(loop_targets);
    }

    // -------------------------------------------------------------------------
    // Frame tick
    // -------------------------------------------------------------------------

    /// Run one frame: update the locomotion blend, then advance the cycle.
    pub fn tick(&mut self, dt: f32) {
        self.update_blend(dt);
        self.advance(dt);
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn lifecycle(&self) -> ControllerLifecycle {
        self.lifecycle
    }

    /// Phase of the active cycle, if any.
    pub fn phase(&self) -> Option<&PatrolPhase> {
        self.cycle.as_ref().map(|c| &c.phase)
    }

    pub fn config(&self) -> &PatrolConfig {
        &self.config
    }

    pub fn sequencer(&self) -> &TargetSequencer {
        &self.sequencer
    }

    /// Current smoothed blend value.
    pub fn blend_value(&self) -> f32 {
        self.blender.value()
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn navigator_mut(&mut self) -> &mut N {
        &mut self.navigator
    }

    pub fn animator(&self) -> &A {
        &self.animator
    }

    /// Events recorded since the last drain, oldest first.
    pub fn events(&self) -> &[PatrolEvent] {
        &self.events
    }

    /// Take every recorded event, oldest first.
    pub fn drain_events(&mut self) -> Vec<PatrolEvent> {
        std::mem::take(&mut self.events)
    }

    // -------------------------------------------------------------------------
    // Private helpers
    // -------------------------------------------------------------------------

    fn update_blend(&mut self, dt: f32) {
        let speed = self.navigator.velocity().length();
        let value = self.blender.update(speed, self.config.move_speed, dt);
        self.animator
            .set_blend_parameter(&self.config.blend_parameter, value);
    }

    fn advance(&mut self, dt: f32) {
        let Some(cycle) = self.cycle.take() else {
            return;
        };

        if cycle.token != self.generation.load(Ordering::SeqCst) {
            info!(navigator = self.navigator.id(), "patrol cycle cancelled");
            self.halt_motion();
            self.finish_cycle(CycleEndReason::Cancelled);
            return;
        }

        let phase = match cycle.phase {
            PatrolPhase::Traveling { target } => {
                if has_arrived(&self.navigator) {
                    self.on_arrival(&target);
                    PatrolPhase::ArrivalHold { target }
                } else {
                    PatrolPhase::Traveling { target }
                }
            }
            PatrolPhase::ArrivalHold { .. } => {
                self.navigator.set_motion_halted(false);
                PatrolPhase::Settling {
                    wait: Countdown::new(self.config.settle_interval),
                }
            }
            PatrolPhase::Settling { mut wait } => {
                if wait.advance(dt) {
                    let duration_secs = self.idle.sample();
                    debug!(duration_secs, "idling at waypoint");
                    self.events.push(PatrolEvent::IdleStarted { duration_secs });
                    PatrolPhase::Idling {
                        wait: Countdown::new(duration_secs),
                    }
                } else {
                    PatrolPhase::Settling { wait }
                }
            }
            PatrolPhase::Idling { mut wait } => {
                if wait.advance(dt) {
                    self.next_leg(cycle.token);
                    return;
                }
                PatrolPhase::Idling { wait }
            }
        };

        self.cycle = Some(Cycle {
            token: cycle.token,
            phase,
        });
    }

    /// Start a fresh cycle under a new generation, replacing any active one.
    fn begin_cycle(&mut self) {
        if !self.settings_applied {
            self.apply_navigation_settings();
        }
        self.cancel_active();
        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.navigator.set_motion_halted(false);
        self.lifecycle = ControllerLifecycle::Running;
        self.events.push(PatrolEvent::CycleStarted);
        self.next_leg(token);
    }

    /// Select the next target and send the navigator toward it, or end the
    /// cycle when there is none.
    fn next_leg(&mut self, token: u64) {
        let Some(target) = self.sequencer.select_next() else {
            debug!(navigator = self.navigator.id(), "no further targets; cycle complete");
            self.finish_cycle(CycleEndReason::Exhausted);
            return;
        };

        match self.navigator.set_destination(target.position) {
            Ok(()) => {
                info!(navigator = self.navigator.id(), target = %target, "departing");
                self.events.push(PatrolEvent::Departed {
                    target: target.clone(),
                });
                self.cycle = Some(Cycle {
                    token,
                    phase: PatrolPhase::Traveling { target },
                });
            }
            Err(e) => {
                warn!(error = %e, target = %target, "destination rejected; ending patrol cycle");
                self.halt_motion();
                self.finish_cycle(CycleEndReason::NavigationFailed);
            }
        }
    }

    fn on_arrival(&mut self, target: &Waypoint) {
        info!(navigator = self.navigator.id(), target = %target, "arrived");
        self.halt_motion();
        // Snap the output straight to idle; the filter state is left alone.
        self.animator
            .set_blend_parameter(&self.config.blend_parameter, 0.0);
        self.events.push(PatrolEvent::Arrived {
            target: target.clone(),
        });
    }

    /// Drop the active cycle, halting the navigator if it was mid-travel.
    fn cancel_active(&mut self) {
        if let Some(cycle) = self.cycle.take() {
            if matches!(cycle.phase, PatrolPhase::Traveling { .. }) {
                self.halt_motion();
            }
            debug!(navigator = self.navigator.id(), "active cycle cancelled");
            self.events.push(PatrolEvent::CycleEnded {
                reason: CycleEndReason::Cancelled,
            });
        }
    }

    fn finish_cycle(&mut self, reason: CycleEndReason) {
        self.cycle = None;
        self.lifecycle = ControllerLifecycle::Stopped;
        self.events.push(PatrolEvent::CycleEnded { reason });
    }

    fn apply_navigation_settings(&mut self) {
        self.config.navigation_settings().apply(&mut self.navigator);
        self.settings_applied = true;
    }

    fn halt_motion(&mut self) {
        self.navigator.set_motion_halted(true);
        self.navigator.set_velocity(Vec3::zero());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use patrol_hal::sim::{NavCommand, SimAnimator, SimNavigator};
    use patrol_types::PatrolError;

    const DT: f32 = 0.05;

    fn a() -> Waypoint {
        Waypoint::labelled("A", Vec3::new(2.0, 0.0, 0.0))
    }

    fn b() -> Waypoint {
        Waypoint::labelled("B", Vec3::new(-2.0, 0.0, 0.0))
    }

    fn c() -> Waypoint {
        Waypoint::labelled("C", Vec3::new(0.0, 0.0, 4.0))
    }

    fn quick_config() -> PatrolConfig {
        PatrolConfig {
            min_idle: 0.0,
            max_idle: 0.0,
            seed: Some(7),
            ..Default::default()
        }
    }

    fn controller(
        config: PatrolConfig,
        waypoints: Vec<Waypoint>,
    ) -> PatrolController<SimNavigator, SimAnimator> {
        PatrolController::with_waypoints(
            config,
            SimNavigator::new("guard", Vec3::zero()),
            SimAnimator::new(),
            waypoints,
        )
    }

    fn run<A: AnimationSink>(patrol: &mut PatrolController<SimNavigator, A>, ticks: usize) {
        for _ in 0..ticks {
            patrol.navigator_mut().step(DT);
            patrol.tick(DT);
        }
    }

    /// Tick until `done` holds or `limit` ticks pass; returns ticks used.
    fn run_until(
        patrol: &mut PatrolController<SimNavigator, SimAnimator>,
        limit: usize,
        done: impl Fn(&PatrolController<SimNavigator, SimAnimator>) -> bool,
    ) -> usize {
        for i in 0..limit {
            if done(&*patrol) {
                return i;
            }
            run(patrol, 1);
        }
        panic!("condition not reached within {limit} ticks");
    }

    fn count_events(
        patrol: &PatrolController<SimNavigator, SimAnimator>,
        f: impl Fn(&PatrolEvent) -> bool,
    ) -> usize {
        patrol.events().iter().filter(|e| f(e)).count()
    }

    /// Navigator that accepts destinations but never gets anywhere.
    #[derive(Default)]
    struct StuckNavigator {
        destinations: Vec<Vec3>,
        halted: bool,
    }

    impl NavigationPort for StuckNavigator {
        fn id(&self) -> &str {
            "stuck"
        }
        fn set_speed(&mut self, _speed: f32) {}
        fn set_stopping_distance(&mut self, _distance: f32) {}
        fn stopping_distance(&self) -> f32 {
            0.5
        }
        fn set_acceleration(&mut self, _acceleration: f32) {}
        fn set_angular_speed(&mut self, _degrees_per_sec: f32) {}
        fn set_auto_braking(&mut self, _enabled: bool) {}
        fn set_destination(&mut self, point: Vec3) -> Result<(), PatrolError> {
            self.destinations.push(point);
            Ok(())
        }
        fn is_path_pending(&self) -> bool {
            false
        }
        fn remaining_distance(&self) -> f32 {
            100.0
        }
        fn velocity(&self) -> Vec3 {
            Vec3::zero()
        }
        fn set_velocity(&mut self, _velocity: Vec3) {}
        fn set_motion_halted(&mut self, halted: bool) {
            self.halted = halted;
        }
    }

    #[test]
    fn looping_pair_alternates_destinations() {
        let mut patrol = controller(quick_config(), vec![a(), b()]);
        patrol.start();
        run(&mut patrol, 300);

        let dests = patrol.navigator().destinations();
        assert!(dests.len() >= 3, "expected at least three legs, got {dests:?}");
        for (i, d) in dests.iter().enumerate() {
            let expected = if i % 2 == 0 { a() } else { b() };
            assert_eq!(*d, expected.position, "leg {i}");
        }
        assert_eq!(patrol.lifecycle(), ControllerLifecycle::Running);
    }

    #[test]
    fn start_without_waypoints_warns_once_and_stays_stopped() {
        let mut patrol = controller(quick_config(), vec![]);
        patrol.start();
        run(&mut patrol, 50);

        assert_eq!(patrol.lifecycle(), ControllerLifecycle::Stopped);
        assert!(patrol.navigator().destinations().is_empty());
        assert_eq!(count_events(&patrol, |e| *e == PatrolEvent::NoWaypoints), 1);
    }

    #[test]
    fn non_looping_single_waypoint_ends_after_dwell() {
        let config = PatrolConfig {
            loop_targets: false,
            ..quick_config()
        };
        let mut patrol = controller(config, vec![a()]);
        patrol.start();
        run(&mut patrol, 400);

        assert_eq!(patrol.navigator().destinations(), vec![a().position]);
        assert_eq!(patrol.lifecycle(), ControllerLifecycle::Stopped);
        assert!(patrol.phase().is_none());
        assert_eq!(
            count_events(&patrol, |e| *e == PatrolEvent::CycleEnded {
                reason: CycleEndReason::Exhausted
            }),
            1
        );
        assert_eq!(count_events(&patrol, |e| matches!(e, PatrolEvent::IdleStarted { .. })), 1);
    }

    #[test]
    fn leg_produces_events_in_order() {
        let mut patrol = controller(quick_config(), vec![a(), b()]);
        patrol.start();
        run_until(&mut patrol, 400, |p| p.navigator().destinations().len() == 2);

        let events = patrol.drain_events();
        assert_eq!(
            events,
            vec![
                PatrolEvent::CycleStarted,
                PatrolEvent::Departed { target: a() },
                PatrolEvent::Arrived { target: a() },
                PatrolEvent::IdleStarted { duration_secs: 0.0 },
                PatrolEvent::Departed { target: b() },
            ]
        );
        assert!(patrol.events().is_empty());
    }

    #[test]
    fn arrival_halts_then_releases_motion() {
        let mut patrol = controller(quick_config(), vec![a(), b()]);
        patrol.start();
        run_until(&mut patrol, 400, |p| {
            matches!(p.phase(), Some(PatrolPhase::ArrivalHold { .. }))
        });

        assert!(patrol.navigator().is_halted());
        assert_eq!(patrol.navigator().velocity(), Vec3::zero());
        let tail: Vec<_> = patrol.navigator().commands().iter().rev().take(2).cloned().collect();
        assert_eq!(
            tail,
            vec![
                NavCommand::SetVelocity(Vec3::zero()),
                NavCommand::SetMotionHalted(true),
            ]
        );

        run(&mut patrol, 1);
        assert!(!patrol.navigator().is_halted(), "released one tick after arrival");
        assert!(matches!(patrol.phase(), Some(PatrolPhase::Settling { .. })));
    }

    #[test]
    fn arrival_snaps_blend_output_to_zero() {
        let mut patrol = controller(quick_config(), vec![a(), b()]);
        patrol.start();
        run_until(&mut patrol, 400, |p| {
            matches!(p.phase(), Some(PatrolPhase::ArrivalHold { .. }))
        });

        let history = patrol.animator().history();
        let (name, last) = history.last().expect("blend written");
        assert_eq!(name, "locomotion");
        assert_eq!(*last, 0.0);
        let (_, before) = &history[history.len() - 2];
        assert!(*before > 0.0, "smoothed value was still non-zero before the snap");
    }

    #[test]
    fn blend_tracks_travel_and_stays_in_unit_range() {
        let mut patrol = controller(quick_config(), vec![a(), b()]);
        patrol.start();
        run(&mut patrol, 20);
        assert!(patrol.blend_value() > 0.5, "blend rises while walking");

        run(&mut patrol, 400);
        assert!(
            patrol
                .animator()
                .history()
                .iter()
                .all(|(_, v)| (0.0..=1.0).contains(v))
        );
    }

    #[test]
    fn blend_runs_while_stopped() {
        let mut patrol = controller(quick_config(), vec![]);
        run(&mut patrol, 3);
        assert_eq!(patrol.lifecycle(), ControllerLifecycle::NotStarted);
        assert_eq!(patrol.animator().history().len(), 3);
        assert_eq!(patrol.animator().parameter("locomotion"), Some(0.0));
    }

    #[test]
    fn pause_halts_and_blocks_new_destinations_until_resume() {
        let far = Waypoint::labelled("far", Vec3::new(10.0, 0.0, 0.0));
        let mut patrol = controller(quick_config(), vec![far.clone(), b()]);
        patrol.start();
        run(&mut patrol, 10);

        patrol.pause();
        assert_eq!(patrol.lifecycle(), ControllerLifecycle::Paused);
        assert!(patrol.navigator().is_halted());
        assert!(
            patrol
                .navigator()
                .commands()
                .contains(&NavCommand::SetMotionHalted(true))
        );

        let frozen_at = patrol.navigator().position();
        run(&mut patrol, 100);
        assert_eq!(patrol.navigator().destinations(), vec![far.position]);
        assert_eq!(patrol.navigator().position(), frozen_at);

        patrol.resume();
        assert_eq!(patrol.lifecycle(), ControllerLifecycle::Running);
        assert!(!patrol.navigator().is_halted());
        // "far" was already consumed, so the patrol carries on with B.
        assert_eq!(patrol.navigator().destinations(), vec![far.position, b().position]);
    }

    #[test]
    fn restart_rewinds_to_first_waypoint() {
        let mut patrol = controller(quick_config(), vec![a(), b(), c()]);
        patrol.start();
        run_until(&mut patrol, 400, |p| p.navigator().destinations().len() == 2);
        assert_eq!(patrol.sequencer().cursor(), 2);

        patrol.restart();
        assert_eq!(patrol.navigator().destinations().last(), Some(&a().position));
        assert_eq!(patrol.sequencer().cursor(), 1, "cursor reset then A consumed");
        assert_eq!(patrol.lifecycle(), ControllerLifecycle::Running);
    }

    #[test]
    fn restart_after_exhaustion_starts_a_new_pass() {
        let config = PatrolConfig {
            loop_targets: false,
            ..quick_config()
        };
        let mut patrol = controller(config, vec![a()]);
        patrol.start();
        run(&mut patrol, 400);
        assert_eq!(patrol.lifecycle(), ControllerLifecycle::Stopped);

        patrol.restart();
        assert_eq!(patrol.lifecycle(), ControllerLifecycle::Running);
        assert_eq!(patrol.navigator().destinations().len(), 2);
    }

    #[test]
    fn start_while_running_replaces_the_cycle() {
        let mut patrol = controller(quick_config(), vec![a(), b()]);
        patrol.start();
        run(&mut patrol, 5);
        patrol.start();

        assert_eq!(
            count_events(&patrol, |e| *e == PatrolEvent::CycleEnded {
                reason: CycleEndReason::Cancelled
            }),
            1
        );
        assert_eq!(count_events(&patrol, |e| *e == PatrolEvent::CycleStarted), 2);
        assert!(matches!(patrol.phase(), Some(PatrolPhase::Traveling { .. })));
    }

    #[test]
    fn clear_waypoints_stops_and_halts() {
        let mut patrol = controller(quick_config(), vec![a(), b()]);
        patrol.start();
        run(&mut patrol, 5);

        patrol.clear_waypoints();
        assert_eq!(patrol.lifecycle(), ControllerLifecycle::Stopped);
        assert!(patrol.phase().is_none());
        assert!(patrol.navigator().is_halted());
        assert!(patrol.sequencer().is_empty());

        run(&mut patrol, 50);
        assert_eq!(patrol.navigator().destinations().len(), 1);
    }

    #[test]
    fn cancel_handle_stops_cycle_on_next_tick() {
        let mut patrol = controller(quick_config(), vec![a(), b()]);
        patrol.start();
        run(&mut patrol, 3);

        let handle = patrol.cancel_handle();
        std::thread::spawn(move || handle.cancel())
            .join()
            .expect("cancel thread");
        assert_eq!(patrol.lifecycle(), ControllerLifecycle::Running, "not pre-emptive");

        run(&mut patrol, 1);
        assert_eq!(patrol.lifecycle(), ControllerLifecycle::Stopped);
        assert!(patrol.navigator().is_halted());
        assert!(patrol.events().contains(&PatrolEvent::CycleEnded {
            reason: CycleEndReason::Cancelled
        }));

        patrol.resume();
        assert_eq!(patrol.lifecycle(), ControllerLifecycle::Running);
    }

    #[test]
    fn rejected_destination_ends_cycle() {
        let bad = Waypoint::new(Vec3::new(f32::NAN, 0.0, 0.0));
        let mut patrol = controller(quick_config(), vec![bad]);
        patrol.start();

        assert_eq!(patrol.lifecycle(), ControllerLifecycle::Stopped);
        assert!(patrol.navigator().is_halted());
        assert!(patrol.events().contains(&PatrolEvent::CycleEnded {
            reason: CycleEndReason::NavigationFailed
        }));
    }

    #[test]
    fn unreachable_target_waits_indefinitely() {
        let mut patrol = PatrolController::with_waypoints(
            quick_config(),
            StuckNavigator::default(),
            SimAnimator::new(),
            vec![a(), b()],
        );
        patrol.start();
        for _ in 0..1_000 {
            patrol.tick(DT);
        }
        assert!(matches!(patrol.phase(), Some(PatrolPhase::Traveling { .. })));
        assert_eq!(patrol.navigator().destinations.len(), 1);

        patrol.pause();
        assert!(patrol.navigator().halted);
    }

    #[test]
    fn dwell_duration_is_respected() {
        let config = PatrolConfig {
            min_idle: 1.0,
            max_idle: 1.0,
            ..quick_config()
        };
        let mut patrol = controller(config, vec![a(), b()]);
        patrol.start();
        run_until(&mut patrol, 400, |p| {
            matches!(p.phase(), Some(PatrolPhase::Idling { .. }))
        });
        assert!(patrol.events().contains(&PatrolEvent::IdleStarted { duration_secs: 1.0 }));

        let idle_ticks = run_until(&mut patrol, 400, |p| p.navigator().destinations().len() == 2);
        // 1.0 s at 0.05 s per tick, give or take the completing tick.
        assert!((19..=21).contains(&idle_ticks), "idled for {idle_ticks} ticks");
    }

    #[test]
    fn set_idle_duration_clamps_inverted_bounds() {
        let mut patrol = controller(quick_config(), vec![a()]);
        patrol.set_idle_duration(3.0, 1.0);
        assert_eq!(patrol.config().min_idle, 3.0);
        assert_eq!(patrol.config().max_idle, 3.0);
    }

    #[test]
    fn set_move_speed_applies_immediately() {
        let mut patrol = controller(quick_config(), vec![a()]);
        patrol.set_move_speed(2.5);
        assert_eq!(
            patrol.navigator().commands().last(),
            Some(&NavCommand::SetSpeed(2.5))
        );
        assert_eq!(patrol.config().move_speed, 2.5);
    }

    #[test]
    fn start_applies_navigation_settings() {
        let mut patrol = controller(quick_config(), vec![a()]);
        patrol.start();
        let cmds = patrol.navigator().commands();
        assert!(cmds.contains(&NavCommand::SetSpeed(1.0)));
        assert!(cmds.contains(&NavCommand::SetStoppingDistance(0.5)));
        assert!(cmds.contains(&NavCommand::SetAcceleration(8.0)));
        assert!(cmds.contains(&NavCommand::SetAngularSpeed(120.0)));
        assert!(cmds.contains(&NavCommand::SetAutoBraking(true)));
    }

    #[test]
    fn invalid_move_speed_is_rejected_and_blend_stays_in_range() {
        let mut patrol = controller(quick_config(), vec![a(), b()]);
        patrol.start();
        run(&mut patrol, 5);

        let commands_before = patrol.navigator().commands().len();
        patrol.set_move_speed(f32::NAN);
        patrol.set_move_speed(-1.0);
        patrol.set_move_speed(f32::INFINITY);
        assert_eq!(patrol.config().move_speed, 1.0);
        assert_eq!(patrol.navigator().commands().len(), commands_before);

        run(&mut patrol, 5);
        assert!(
            patrol
                .animator()
                .history()
                .iter()
                .all(|(_, v)| (0.0..=1.0).contains(v)),
            "blend escaped [0,1]: {:?}",
            patrol.animator().history()
        );
    }

    #[test]
    fn pause_before_start_only_halts() {
        let mut patrol = controller(quick_config(), vec![a()]);
        patrol.pause();
        assert_eq!(patrol.lifecycle(), ControllerLifecycle::NotStarted);
        assert!(patrol.navigator().is_halted());
        assert!(!patrol.events().contains(&PatrolEvent::Paused));

        patrol.clear_waypoints();
        patrol.pause();
        assert_eq!(patrol.lifecycle(), ControllerLifecycle::Stopped);
        assert!(!patrol.events().contains(&PatrolEvent::Paused));
    }

    #[test]
    fn restart_before_start_applies_navigation_settings() {
        let mut patrol = controller(quick_config(), vec![a()]);
        patrol.restart();
        let cmds = patrol.navigator().commands();
        assert!(cmds.contains(&NavCommand::SetSpeed(1.0)));
        assert!(cmds.contains(&NavCommand::SetStoppingDistance(0.5)));
        assert!(cmds.contains(&NavCommand::SetAutoBraking(true)));
        assert_eq!(patrol.lifecycle(), ControllerLifecycle::Running);

        // Only once: a later resume does not push them again.
        let speed_writes = |p: &PatrolController<SimNavigator, SimAnimator>| {
            p.navigator()
                .commands()
                .iter()
                .filter(|c| matches!(c, NavCommand::SetSpeed(_)))
                .count()
        };
        let before = speed_writes(&patrol);
        patrol.pause();
        patrol.resume();
        assert_eq!(speed_writes(&patrol), before);
    }

    #[test]
    fn random_mode_with_single_waypoint_repeats_it() {
        let config = PatrolConfig {
            sequencing: SequencingMode::Random,
            ..quick_config()
        };
        let mut patrol = controller(config, vec![a()]);
        patrol.start();
        run(&mut patrol, 400);

        let dests = patrol.navigator().destinations();
        assert!(dests.len() >= 2);
        assert!(dests.iter().all(|d| *d == a().position));
    }

    #[test]
    fn waypoint_added_at_runtime_is_visited() {
        let config = PatrolConfig {
            loop_targets: false,
            ..quick_config()
        };
        let mut patrol = controller(config, vec![a()]);
        patrol.start();
        patrol.add_waypoint(b());
        run(&mut patrol, 400);
        assert_eq!(
            patrol.navigator().destinations(),
            vec![a().position, b().position]
        );
    }

    #[test]
    fn config_round_trips_through_toml_with_defaults() {
        let raw = r#"
            move_speed = 2.0
            sequencing = "random"
            min_idle = 0.5
        "#;
        let config: PatrolConfig = toml::from_str(raw).expect("parse");
        assert_eq!(config.move_speed, 2.0);
        assert_eq!(config.sequencing, SequencingMode::Random);
        assert_eq!(config.min_idle, 0.5);
        assert_eq!(config.max_idle, 5.0);
        assert_eq!(config.blend_parameter, "locomotion");
        assert_eq!(config.seed, None);
    }
}
