//! `patrol-runtime` – waypoint patrol behaviour for a simulated agent.
//!
//! # Modules
//!
//! - [`patrol`] – [`PatrolController`][patrol::PatrolController]: the
//!   travel → settle → idle state machine with start / restart / pause /
//!   resume / clear lifecycle control, advanced once per frame.
//! - [`sequencer`] – [`TargetSequencer`][sequencer::TargetSequencer]:
//!   sequential (looping or single-pass) and uniform-random waypoint
//!   selection.
//! - [`idle_timer`] – [`IdleTimer`][idle_timer::IdleTimer] dwell sampling and
//!   the [`Countdown`][idle_timer::Countdown] wait primitive.
//! - [`locomotion`] – [`LocomotionBlender`][locomotion::LocomotionBlender]:
//!   critically damped speed → animation blend smoothing.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: global
//!   `tracing` subscriber with optional OTLP export.

pub mod idle_timer;
pub mod locomotion;
pub mod patrol;
pub mod sequencer;
pub mod telemetry;

pub use idle_timer::{Countdown, IdleTimer};
pub use locomotion::LocomotionBlender;
pub use patrol::{CancelHandle, PatrolConfig, PatrolController, PatrolPhase};
pub use sequencer::TargetSequencer;
pub use telemetry::{TracerProviderGuard, init_tracing};
