//! `patrol-hal` – collaborator seams for the patrol runtime.
//!
//! # Modules
//!
//! - [`navigation`] – [`NavigationPort`][navigation::NavigationPort]: the
//!   "move to point / arrived" contract plus [`NavigationSettings`] tuning
//!   and the [`has_arrived`][navigation::has_arrived] predicate.
//! - [`animation`] – [`AnimationSink`][animation::AnimationSink]: a single
//!   named float parameter per frame.
//! - [`sim`] – [`SimNavigator`][sim::SimNavigator] and
//!   [`SimAnimator`][sim::SimAnimator]: in-process drivers that record every
//!   command, for headless runs and tests.

pub mod animation;
pub mod navigation;
pub mod sim;

pub use animation::AnimationSink;
pub use navigation::{NavigationPort, NavigationSettings, has_arrived};
pub use sim::{NavCommand, SimAnimator, SimNavigator};
