//! [`TargetSequencer`] – waypoint selection policy.
//!
//! Owns the waypoint list and the traversal cursor.  Absence of a target is
//! a value (`None`), never an error: an empty set and a finished
//! non-looping pass both simply yield `None`.
//!
//! # Sequential exhaustion
//!
//! Exhaustion is detected one step ahead.  The call that returns the last
//! waypoint of a non-looping pass still succeeds; the call *after* it
//! returns `None`.
//!
//! # Example
//!
//! ```rust
//! use patrol_runtime::sequencer::TargetSequencer;
//! use patrol_types::{SequencingMode, Vec3, Waypoint};
//!
//! let mut seq = TargetSequencer::new(SequencingMode::Sequential, false, 7);
//! seq.add_waypoint(Waypoint::new(Vec3::new(1.0, 0.0, 0.0)));
//! seq.add_waypoint(Waypoint::new(Vec3::new(2.0, 0.0, 0.0)));
//!
//! assert!(seq.select_next().is_some());
//! assert!(seq.select_next().is_some()); // last waypoint is still returned
//! assert!(seq.select_next().is_none()); // then the pass is over
//! ```

use patrol_types::{SequencingMode, Waypoint};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Chooses the next patrol target.
pub struct TargetSequencer {
    waypoints: Vec<Waypoint>,
    mode: SequencingMode,
    loop_targets: bool,
    /// Index of the next waypoint in sequential mode.  Always within the
    /// list while it is non-empty.
    cursor: usize,
    /// A non-looping pass has handed out its last target.
    exhausted: bool,
    rng: StdRng,
}

impl TargetSequencer {
    /// Create an empty sequencer.  `seed` drives random-mode picks.
    pub fn new(mode: SequencingMode, loop_targets: bool, seed: u64) -> Self {
        Self::with_rng(mode, loop_targets, StdRng::seed_from_u64(seed))
    }

    /// Create an empty sequencer drawing random picks from `rng`.
    pub fn with_rng(mode: SequencingMode, loop_targets: bool, rng: StdRng) -> Self {
        Self {
            waypoints: Vec::new(),
            mode,
            loop_targets,
            cursor: 0,
            exhausted: false,
            rng,
        }
    }

    /// Return the next target, or `None` when there is nothing left to visit.
    pub fn select_next(&mut self) -> Option<Waypoint> {
        if self.waypoints.is_empty() {
            return None;
        }

        match self.mode {
            SequencingMode::Sequential => {
                if self.exhausted {
                    if !self.loop_targets {
                        return None;
                    }
                    self.exhausted = false;
                    self.cursor = 0;
                }
                let target = self.waypoints[self.cursor].clone();
                if self.cursor + 1 < self.waypoints.len() {
                    self.cursor += 1;
                } else if self.loop_targets {
                    self.cursor = 0;
                } else {
                    self.exhausted = true;
                }
                Some(target)
            }
            SequencingMode::Random => {
                let index = self.rng.gen_range(0..self.waypoints.len());
                Some(self.waypoints[index].clone())
            }
        }
    }

    /// Append a waypoint.  The cursor stays valid because the list only grows;
    /// an exhausted non-looping pass picks the new waypoint up next.
    pub fn add_waypoint(&mut self, waypoint: Waypoint) {
        if self.exhausted {
            self.exhausted = false;
            self.cursor = self.waypoints.len();
        }
        self.waypoints.push(waypoint);
    }

    /// Remove every waypoint.  Subsequent selections return `None`.
    pub fn clear(&mut self) {
        self.waypoints.clear();
        self.cursor = 0;
        self.exhausted = false;
    }

    /// Rewind the cursor to the first waypoint and clear exhaustion.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.exhausted = false;
    }

    pub fn set_mode(&mut self, mode: SequencingMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> SequencingMode {
        self.mode
    }

    pub fn set_loop(&mut self, loop_targets: bool) {
        self.loop_targets = loop_targets;
    }

    pub fn loops(&self) -> bool {
        self.loop_targets
    }

    /// Index of the waypoint the next sequential selection will return.
    /// Once a non-looping pass is exhausted it rests on the last waypoint.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// `true` once a non-looping sequential pass has nothing left to hand out.
    pub fn is_exhausted(&self) -> bool {
        self.mode == SequencingMode::Sequential && !self.loop_targets && self.exhausted
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patrol_types::Vec3;

    fn wp(x: f32) -> Waypoint {
        Waypoint::new(Vec3::new(x, 0.0, 0.0))
    }

    fn sequencer(mode: SequencingMode, loop_targets: bool, xs: &[f32]) -> TargetSequencer {
        let mut seq = TargetSequencer::new(mode, loop_targets, 42);
        for &x in xs {
            seq.add_waypoint(wp(x));
        }
        seq
    }

    #[test]
    fn empty_set_yields_none() {
        let mut seq = TargetSequencer::new(SequencingMode::Sequential, true, 0);
        assert_eq!(seq.select_next(), None);
        seq.set_mode(SequencingMode::Random);
        assert_eq!(seq.select_next(), None);
    }

    #[test]
    fn looping_pass_visits_each_once_then_wraps() {
        let mut seq = sequencer(SequencingMode::Sequential, true, &[1.0, 2.0, 3.0]);
        let pass: Vec<_> = (0..3).map(|_| seq.select_next().unwrap()).collect();
        assert_eq!(pass, vec![wp(1.0), wp(2.0), wp(3.0)]);
        assert_eq!(seq.select_next(), Some(wp(1.0)), "N+1-th call wraps");
        assert_eq!(seq.cursor(), 1);
    }

    #[test]
    fn non_looping_pass_ends_one_call_after_last() {
        let mut seq = sequencer(SequencingMode::Sequential, false, &[1.0, 2.0]);
        assert_eq!(seq.select_next(), Some(wp(1.0)));
        assert_eq!(seq.select_next(), Some(wp(2.0)));
        assert!(seq.is_exhausted());
        assert_eq!(seq.select_next(), None);
        assert_eq!(seq.select_next(), None, "exhaustion is sticky");
    }

    #[test]
    fn reset_rewinds_cursor_and_clears_exhaustion() {
        let mut seq = sequencer(SequencingMode::Sequential, false, &[1.0, 2.0]);
        seq.select_next();
        seq.select_next();
        assert_eq!(seq.select_next(), None);
        seq.reset();
        assert_eq!(seq.cursor(), 0);
        assert_eq!(seq.select_next(), Some(wp(1.0)));
    }

    #[test]
    fn append_during_traversal_extends_the_pass() {
        let mut seq = sequencer(SequencingMode::Sequential, false, &[1.0, 2.0]);
        assert_eq!(seq.select_next(), Some(wp(1.0)));
        seq.add_waypoint(wp(3.0));
        assert_eq!(seq.select_next(), Some(wp(2.0)));
        assert_eq!(seq.select_next(), Some(wp(3.0)));
        assert_eq!(seq.select_next(), None);
    }

    #[test]
    fn cursor_stays_within_the_list_on_a_single_pass() {
        let mut seq = sequencer(SequencingMode::Sequential, false, &[1.0, 2.0, 3.0]);
        while seq.select_next().is_some() {
            assert!(seq.cursor() < seq.len(), "cursor {} out of range", seq.cursor());
        }
        assert!(seq.cursor() < seq.len());

        let mut single = sequencer(SequencingMode::Sequential, false, &[1.0]);
        assert_eq!(single.select_next(), Some(wp(1.0)));
        assert_eq!(single.cursor(), 0);
        assert!(single.is_exhausted());
    }

    #[test]
    fn enabling_loop_after_exhaustion_wraps() {
        let mut seq = sequencer(SequencingMode::Sequential, false, &[1.0, 2.0]);
        seq.select_next();
        seq.select_next();
        assert_eq!(seq.select_next(), None);
        seq.set_loop(true);
        assert_eq!(seq.select_next(), Some(wp(1.0)));
    }

    #[test]
    fn append_after_exhaustion_continues_the_pass() {
        let mut seq = sequencer(SequencingMode::Sequential, false, &[1.0]);
        assert_eq!(seq.select_next(), Some(wp(1.0)));
        assert!(seq.is_exhausted());
        seq.add_waypoint(wp(2.0));
        assert!(!seq.is_exhausted());
        assert_eq!(seq.select_next(), Some(wp(2.0)));
        assert_eq!(seq.select_next(), None);
    }

    #[test]
    fn clear_empties_until_repopulated() {
        let mut seq = sequencer(SequencingMode::Sequential, true, &[1.0, 2.0, 3.0]);
        seq.select_next();
        seq.select_next();
        seq.clear();
        assert!(seq.is_empty());
        assert_eq!(seq.select_next(), None);
        seq.add_waypoint(wp(9.0));
        assert_eq!(seq.select_next(), Some(wp(9.0)));
    }

    #[test]
    fn random_single_waypoint_always_returned() {
        let mut seq = sequencer(SequencingMode::Random, false, &[5.0]);
        for _ in 0..50 {
            assert_eq!(seq.select_next(), Some(wp(5.0)));
        }
    }

    #[test]
    fn random_mode_ignores_loop_flag_and_cursor() {
        let mut seq = sequencer(SequencingMode::Random, false, &[1.0, 2.0, 3.0]);
        for _ in 0..100 {
            assert!(seq.select_next().is_some());
        }
        assert_eq!(seq.cursor(), 0);
    }

    #[test]
    fn random_mode_eventually_covers_the_set() {
        let mut seq = sequencer(SequencingMode::Random, true, &[1.0, 2.0, 3.0]);
        let mut seen = [false; 3];
        for _ in 0..200 {
            let x = seq.select_next().unwrap().position.x;
            seen[x as usize - 1] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn same_seed_gives_same_random_sequence() {
        let mut a = sequencer(SequencingMode::Random, true, &[1.0, 2.0, 3.0, 4.0]);
        let mut b = sequencer(SequencingMode::Random, true, &[1.0, 2.0, 3.0, 4.0]);
        for _ in 0..20 {
            assert_eq!(a.select_next(), b.select_next());
        }
    }
}
