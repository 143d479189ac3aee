//! `patrol-cli` – runs a simulated waypoint patrol from a TOML scenario.
//!
//! The binary:
//!
//! 1. Loads the scenario named by the first argument or `PATROL_CONFIG`
//!    (defaults when neither is given), applying `PATROL_*` overrides.
//! 2. Builds a [`PatrolController`] around a [`SimNavigator`] and starts it.
//! 3. Drives a fixed-rate frame loop on a current-thread Tokio runtime,
//!    printing each controller decision as it happens.
//! 4. Accepts operator slash-commands on stdin (`/help` lists them),
//!    including `/save` to write the live scenario back out as TOML.
//! 5. Intercepts **Ctrl-C** to cancel the active cycle and exit cleanly.

mod config;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use patrol_hal::{NavigationPort, SimAnimator, SimNavigator};
use patrol_runtime::{PatrolController, PatrolPhase, init_tracing};
use patrol_types::{ControllerLifecycle, CycleEndReason, PatrolEvent};

use config::ScenarioConfig;
use repl::OperatorCommand;

type SimPatrol = PatrolController<SimNavigator, SimAnimator>;

fn main() {
    // RUST_LOG filters (default "info"); PATROL_LOG_FORMAT=json switches to
    // JSON lines; OTEL_EXPORTER_OTLP_ENDPOINT enables span export.
    let _tracing = init_tracing("patrol-cli");

    print_banner();

    let scenario = load_scenario();

    let mut patrol = build_patrol(&scenario);

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    let cancel = patrol.cancel_handle();

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – halting patrol …".yellow().bold());
        cancel.cancel();
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            println!("{}: {}", "Failed to start runtime".red(), e);
            return;
        }
    };

    println!(
        "  Type {} for a list of commands.\n",
        "/help".bold().cyan()
    );

    patrol.start();
    runtime.block_on(run_frames(&mut patrol, &scenario, shutdown));

    println!(
        "  {} Patrol finished ({}).",
        "✓".green().bold(),
        patrol.lifecycle()
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Setup
// ─────────────────────────────────────────────────────────────────────────────

fn load_scenario() -> ScenarioConfig {
    let path = config::scenario_path(std::env::args().nth(1));
    match config::load(path.as_deref()) {
        Ok(cfg) => {
            match &path {
                Some(p) => println!("  Scenario loaded from {}", p.display().to_string().bold()),
                None => println!("  No scenario given; using defaults."),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Scenario error".red(), e);
            println!("  Using default scenario.");
            let mut cfg = ScenarioConfig::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    }
}

fn build_patrol(scenario: &ScenarioConfig) -> SimPatrol {
    let navigator = SimNavigator::new("agent", scenario.sim.start_position)
        .with_path_latency(scenario.sim.path_latency_ticks);
    println!(
        "  {} waypoint(s), {} mode, loop {}, {} Hz",
        scenario.waypoints.len().to_string().bold(),
        scenario.patrol.sequencing,
        if scenario.patrol.loop_targets { "on" } else { "off" },
        scenario.sim.tick_hz
    );
    PatrolController::with_waypoints(
        scenario.patrol.clone(),
        navigator,
        SimAnimator::new(),
        scenario.waypoints.iter().cloned(),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Frame loop
// ─────────────────────────────────────────────────────────────────────────────

/// Tick the simulation until the scenario duration elapses, the operator
/// quits, or Ctrl-C is pressed.
async fn run_frames(patrol: &mut SimPatrol, scenario: &ScenarioConfig, shutdown: Arc<AtomicBool>) {
    let dt = scenario.sim.frame_dt();
    let mut interval = tokio::time::interval(Duration::from_secs_f32(dt));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut commands = repl::spawn_reader();
    let mut console_open = true;
    let mut elapsed = 0.0_f32;

    info!(tick_hz = scenario.sim.tick_hz, "frame loop started");

    loop {
        interval.tick().await;

        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        // Operator input is applied between frames.
        while console_open {
            match commands.try_recv() {
                Ok(OperatorCommand::Quit) => {
                    println!("{}", "Goodbye.".green());
                    shutdown.store(true, Ordering::SeqCst);
                    break;
                }
                Ok(cmd) => apply_command(patrol, scenario, cmd),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => console_open = false,
            }
        }
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        patrol.navigator_mut().step(dt);
        patrol.tick(dt);
        for event in patrol.drain_events() {
            print_event(&event);
        }

        elapsed += dt;
        if scenario.sim.duration_secs.is_some_and(|limit| elapsed >= limit) {
            info!(elapsed_secs = elapsed, "scenario duration reached");
            break;
        }
    }

    // Leave the agent standing still whatever the exit path.
    if patrol.lifecycle() == ControllerLifecycle::Running {
        patrol.pause();
        patrol.drain_events();
    }
}

fn apply_command(patrol: &mut SimPatrol, scenario: &ScenarioConfig, cmd: OperatorCommand) {
    match cmd {
        OperatorCommand::SetSpeed(v) => {
            patrol.set_move_speed(v);
            println!("  move speed → {}", v.to_string().yellow());
        }
        OperatorCommand::SetIdle { min_secs, max_secs } => {
            patrol.set_idle_duration(min_secs, max_secs);
            let cfg = patrol.config();
            println!("  idle → {:.2}s..{:.2}s", cfg.min_idle, cfg.max_idle);
        }
        OperatorCommand::AddWaypoint(wp) => {
            println!("  added {}", wp.to_string().yellow());
            patrol.add_waypoint(wp);
        }
        OperatorCommand::Clear => patrol.clear_waypoints(),
        OperatorCommand::Restart => patrol.restart(),
        OperatorCommand::Pause => patrol.pause(),
        OperatorCommand::Resume => patrol.resume(),
        OperatorCommand::Status => print_status(patrol),
        OperatorCommand::Save(path) => {
            match config::save_to(&snapshot(patrol, scenario), &path) {
                Ok(()) => println!(
                    "  {} Scenario saved to {}",
                    "✓".green().bold(),
                    path.display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving scenario".red(), e),
            }
        }
        OperatorCommand::Help => repl::print_help(),
        // Handled by the frame loop.
        OperatorCommand::Quit => {}
    }
    for event in patrol.drain_events() {
        print_event(&event);
    }
}

/// The live scenario: current patrol settings and waypoints, original sim
/// settings.
fn snapshot(patrol: &SimPatrol, scenario: &ScenarioConfig) -> ScenarioConfig {
    ScenarioConfig {
        patrol: patrol.config().clone(),
        waypoints: patrol.sequencer().waypoints().to_vec(),
        sim: scenario.sim.clone(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_event(event: &PatrolEvent) {
    let line = match event {
        PatrolEvent::CycleStarted => "cycle started".cyan().to_string(),
        PatrolEvent::Departed { target } => format!("→ heading to {}", target.to_string().bold()),
        PatrolEvent::Arrived { target } => format!("✓ arrived at {}", target).green().to_string(),
        PatrolEvent::IdleStarted { duration_secs } => {
            format!("  idling for {duration_secs:.2}s").dimmed().to_string()
        }
        PatrolEvent::CycleEnded { reason } => match reason {
            CycleEndReason::Exhausted => "cycle complete: no waypoints left".yellow().to_string(),
            CycleEndReason::Cancelled => "cycle cancelled".yellow().to_string(),
            CycleEndReason::NavigationFailed => "cycle aborted: destination rejected".red().to_string(),
        },
        PatrolEvent::NoWaypoints => {
            format!("no waypoints assigned – use {} to add some", "/add".bold())
                .yellow()
                .to_string()
        }
        PatrolEvent::Paused => "paused".yellow().to_string(),
        PatrolEvent::Resumed => "resumed".green().to_string(),
    };
    println!("  {line}");
}

fn print_status(patrol: &SimPatrol) {
    let nav = patrol.navigator();
    let phase = match patrol.phase() {
        None => "idle".to_string(),
        Some(PatrolPhase::Traveling { target }) => format!("traveling to {target}"),
        Some(PatrolPhase::ArrivalHold { target }) => format!("arrived at {target}"),
        Some(PatrolPhase::Settling { .. }) => "settling".to_string(),
        Some(PatrolPhase::Idling { wait }) => format!("idling ({:.2}s left)", wait.remaining()),
    };
    let pos = nav.position();
    println!();
    println!("{}", "Patrol Status".bold().underline());
    println!("  lifecycle : {}", patrol.lifecycle().to_string().bold());
    println!("  phase     : {phase}");
    println!(
        "  waypoints : {} (next index {}, {} mode)",
        patrol.sequencer().len(),
        patrol.sequencer().cursor(),
        patrol.sequencer().mode()
    );
    println!("  position  : ({:.2}, {:.2}, {:.2})", pos.x, pos.y, pos.z);
    println!("  speed     : {:.2}", nav.velocity().length());
    println!("  blend     : {:.3}", patrol.blend_value());
    println!();
}

fn print_banner() {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║            Patrol Simulator          ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
}
