//! Scenario files – reads/writes the TOML that describes one patrol run.
//!
//! ```toml
//! [patrol]
//! move_speed = 1.5
//! min_idle = 1.0
//! max_idle = 3.0
//!
//! [[waypoints]]
//! label = "gate"
//! position = { x = 4.0, y = 0.0, z = 0.0 }
//!
//! [sim]
//! tick_hz = 30
//! duration_secs = 60.0
//! ```

use patrol_runtime::PatrolConfig;
use patrol_types::{Vec3, Waypoint};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for the simulated world the controller runs in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimSettings {
    /// Frame rate of the tick loop.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,

    /// Stop after this many seconds of simulated time.  `None` runs until
    /// `/quit` or Ctrl-C.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f32>,

    /// Where the agent spawns.
    #[serde(default)]
    pub start_position: Vec3,

    /// Ticks the simulated navigator spends planning each new path.
    #[serde(default)]
    pub path_latency_ticks: u32,
}

fn default_tick_hz() -> u32 {
    30
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            duration_secs: None,
            start_position: Vec3::zero(),
            path_latency_ticks: 0,
        }
    }
}

impl SimSettings {
    /// Seconds per frame.  A zero rate is treated as 1 Hz.
    pub fn frame_dt(&self) -> f32 {
        1.0 / self.tick_hz.max(1) as f32
    }
}

/// A complete patrol scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub patrol: PatrolConfig,

    #[serde(default)]
    pub waypoints: Vec<Waypoint>,

    #[serde(default)]
    pub sim: SimSettings,
}

/// Resolve the scenario path: first CLI argument, then `PATROL_CONFIG`.
pub fn scenario_path(arg: Option<String>) -> Option<PathBuf> {
    arg.or_else(|| std::env::var("PATROL_CONFIG").ok())
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
}

/// Load the scenario from `path`, or the built-in defaults when `path` is
/// `None`.  Environment overrides are applied either way.
pub fn load(path: Option<&Path>) -> Result<ScenarioConfig, String> {
    let mut cfg = match path {
        Some(p) => load_from(p)?,
        None => ScenarioConfig::default(),
    };
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Parse the scenario at `path` without applying overrides.
pub(crate) fn load_from(path: &Path) -> Result<ScenarioConfig, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read scenario at {}: {}", path.display(), e))?;
    toml::from_str(&raw).map_err(|e| format!("Failed to parse scenario: {}", e))
}

/// Apply `PATROL_*` environment variable overrides to `cfg`.
///
/// Values that do not parse are ignored.
///
/// | Variable | Scenario field |
/// |---|---|
/// | `PATROL_MOVE_SPEED` | `patrol.move_speed` |
/// | `PATROL_SEED` | `patrol.seed` |
/// | `PATROL_TICK_HZ` | `sim.tick_hz` |
pub fn apply_env_overrides(cfg: &mut ScenarioConfig) {
    if let Ok(v) = std::env::var("PATROL_MOVE_SPEED")
        && let Ok(speed) = v.parse::<f32>()
    {
        cfg.patrol.move_speed = speed;
    }
    if let Ok(v) = std::env::var("PATROL_SEED")
        && let Ok(seed) = v.parse::<u64>()
    {
        cfg.patrol.seed = Some(seed);
    }
    if let Ok(v) = std::env::var("PATROL_TICK_HZ")
        && let Ok(hz) = v.parse::<u32>()
        && hz > 0
    {
        cfg.sim.tick_hz = hz;
    }
}

/// Write `cfg` to `path`, creating parent directories as needed.
pub fn save_to(cfg: &ScenarioConfig, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create scenario directory: {}", e))?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| format!("Failed to serialize scenario: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write scenario at {}: {}", path.display(), e))
}
