//! Operator console – slash-commands typed while the patrol runs.
//!
//! Supported slash-commands:
//!   /speed <v>            – set the travel speed
//!   /idle <min> <max>     – set the dwell bounds in seconds
//!   /add <x> <y> <z> [l]  – append a waypoint, optionally labelled
//!   /clear                – drop every waypoint and stop
//!   /restart              – rewind to the first waypoint
//!   /pause | /resume      – halt and continue
//!   /status               – print controller state
//!   /save <path>          – write the current scenario as TOML
//!   /help                 – show this list
//!   /quit | /exit         – stop the simulation
//!
//! Lines are read on a dedicated blocking thread and forwarded over a Tokio
//! channel; the frame loop applies them between ticks.

use colored::Colorize;
use patrol_types::{Vec3, Waypoint};
use std::io::{self, BufRead};
use std::path::PathBuf;
use tokio::sync::mpsc;

/// A parsed operator instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorCommand {
    SetSpeed(f32),
    SetIdle { min_secs: f32, max_secs: f32 },
    AddWaypoint(Waypoint),
    Clear,
    Restart,
    Pause,
    Resume,
    Status,
    Save(PathBuf),
    Help,
    Quit,
}

/// Parse one console line.  Returns `Ok(None)` for blank input.
pub fn parse_command(line: &str) -> Result<Option<OperatorCommand>, String> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = parts.collect();

    let cmd = match head {
        "/speed" => {
            let [v] = args[..] else {
                return Err("usage: /speed <v>".to_string());
            };
            OperatorCommand::SetSpeed(parse_number(v)?)
        }
        "/idle" => {
            let [min, max] = args[..] else {
                return Err("usage: /idle <min> <max>".to_string());
            };
            OperatorCommand::SetIdle {
                min_secs: parse_number(min)?,
                max_secs: parse_number(max)?,
            }
        }
        "/add" => {
            if args.len() < 3 {
                return Err("usage: /add <x> <y> <z> [label]".to_string());
            }
            let position = Vec3::new(
                parse_number(args[0])?,
                parse_number(args[1])?,
                parse_number(args[2])?,
            );
            let waypoint = if args.len() > 3 {
                Waypoint::labelled(args[3..].join(" "), position)
            } else {
                Waypoint::new(position)
            };
            OperatorCommand::AddWaypoint(waypoint)
        }
        "/clear" => OperatorCommand::Clear,
        "/restart" => OperatorCommand::Restart,
        "/pause" => OperatorCommand::Pause,
        "/resume" => OperatorCommand::Resume,
        "/status" => OperatorCommand::Status,
        "/save" => {
            if args.is_empty() {
                return Err("usage: /save <path>".to_string());
            }
            OperatorCommand::Save(PathBuf::from(args.join(" ")))
        }
        "/help" => OperatorCommand::Help,
        "/quit" | "/exit" => OperatorCommand::Quit,
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(Some(cmd))
}

fn parse_number(raw: &str) -> Result<f32, String> {
    match raw.parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("'{raw}' is not a number")),
    }
}

/// Spawn the blocking stdin reader.  The returned receiver yields parsed
/// commands; it closes on EOF or after `/quit`.
pub fn spawn_reader() -> mpsc::UnboundedReceiver<OperatorCommand> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Ok(Some(cmd)) => {
                    let quit = cmd == OperatorCommand::Quit;
                    if tx.send(cmd).is_err() || quit {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => println!(
                    "{} {}. Type {} for available commands.",
                    "Error:".red(),
                    e,
                    "/help".bold()
                ),
            }
        }
    });
    rx
}

pub fn print_help() {
    println!();
    println!("{}", "Patrol Commands".bold().underline());
    println!("  {}        – set the travel speed", "/speed v".bold().cyan());
    println!("  {}  – set the dwell bounds (seconds)", "/idle min max".bold().cyan());
    println!("  {} – append a waypoint", "/add x y z [label]".bold().cyan());
    println!("  {}          – remove every waypoint and stop", "/clear".bold().cyan());
    println!("  {}        – rewind to the first waypoint", "/restart".bold().cyan());
    println!("  {} – halt / continue", "/pause  /resume".bold().cyan());
    println!("  {}         – show controller state", "/status".bold().cyan());
    println!("  {}    – write the current scenario as TOML", "/save path".bold().cyan());
    println!("  {}   – stop the simulation", "/quit  /exit".bold().cyan());
    println!();
}
