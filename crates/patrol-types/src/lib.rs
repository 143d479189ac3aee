use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A 3-D position or velocity in scene units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    /// Create a new vector.
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    pub fn scale(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    /// Euclidean magnitude.
    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Euclidean distance between two points.
    pub fn distance(self, other: Self) -> f32 {
        self.sub(other).length()
    }
}

/// A patrol target the agent travels to.
///
/// Waypoints are immutable once created; the controller only ever reads
/// their position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: Vec3,
    /// Optional human-readable label used in logs and events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Waypoint {
    /// An unlabelled waypoint at `position`.
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            label: None,
        }
    }

    /// A labelled waypoint at `position`.
    pub fn labelled(label: impl Into<String>, position: Vec3) -> Self {
        Self {
            position,
            label: Some(label.into()),
        }
    }
}

impl std::fmt::Display for Waypoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let p = self.position;
        match &self.label {
            Some(label) => write!(f, "{label} ({:.2}, {:.2}, {:.2})", p.x, p.y, p.z),
            None => write!(f, "({:.2}, {:.2}, {:.2})", p.x, p.y, p.z),
        }
    }
}

/// How the next waypoint is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequencingMode {
    /// Visit waypoints in insertion order.
    #[default]
    Sequential,
    /// Pick uniformly from the whole set each time; repeats are allowed.
    Random,
}

impl std::fmt::Display for SequencingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequencingMode::Sequential => write!(f, "sequential"),
            SequencingMode::Random => write!(f, "random"),
        }
    }
}

/// Closed range `[min_secs, max_secs]` a dwell duration is sampled from.
///
/// Construction never fails: negative or non-finite bounds become `0.0` and
/// a `min` above `max` lifts `max` up to `min`.  Use [`DwellRange::was_clamped`]
/// to find out whether the inputs were adjusted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DwellRange {
    min_secs: f32,
    max_secs: f32,
}

impl DwellRange {
    pub fn new(min_secs: f32, max_secs: f32) -> Self {
        let min_secs = sanitize_secs(min_secs);
        let max_secs = sanitize_secs(max_secs).max(min_secs);
        Self { min_secs, max_secs }
    }

    /// A fixed dwell of exactly `secs`.
    pub fn fixed(secs: f32) -> Self {
        Self::new(secs, secs)
    }

    pub fn min_secs(&self) -> f32 {
        self.min_secs
    }

    pub fn max_secs(&self) -> f32 {
        self.max_secs
    }

    /// `true` when building a range from `(min_secs, max_secs)` would adjust
    /// either bound.
    pub fn was_clamped(min_secs: f32, max_secs: f32) -> bool {
        let r = Self::new(min_secs, max_secs);
        r.min_secs != min_secs || r.max_secs != max_secs
    }
}

impl Default for DwellRange {
    fn default() -> Self {
        Self::new(2.0, 5.0)
    }
}

fn sanitize_secs(secs: f32) -> f32 {
    if secs.is_finite() { secs.max(0.0) } else { 0.0 }
}

/// Externally visible status of a patrol controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerLifecycle {
    /// `start` has never been called.
    NotStarted,
    /// A traversal cycle is active.
    Running,
    /// Motion was halted by `pause`; `resume` continues from the cursor.
    Paused,
    /// No cycle is active (exhausted, cleared, cancelled, or misconfigured).
    Stopped,
}

impl std::fmt::Display for ControllerLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerLifecycle::NotStarted => write!(f, "not-started"),
            ControllerLifecycle::Running => write!(f, "running"),
            ControllerLifecycle::Paused => write!(f, "paused"),
            ControllerLifecycle::Stopped => write!(f, "stopped"),
        }
    }
}

/// Why a traversal cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleEndReason {
    /// The sequencer returned no waypoint (empty set or non-looping pass done).
    Exhausted,
    /// A lifecycle operation or an external cancel invalidated it.
    Cancelled,
    /// The navigation port rejected a destination.
    NavigationFailed,
}

/// Decisions taken by the controller, in the order they happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum PatrolEvent {
    CycleStarted,
    Departed { target: Waypoint },
    Arrived { target: Waypoint },
    IdleStarted { duration_secs: f32 },
    CycleEnded { reason: CycleEndReason },
    /// `start` was called with an empty waypoint set.
    NoWaypoints,
    Paused,
    Resumed,
}

/// Global error type for the patrol stack.
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum PatrolError {
    #[error("Navigation Fault on {component}: {details}")]
    Navigation { component: String, details: String },

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("I/O Error: {0}")]
    Io(String),
}
