//! Replays a recorded input script through a drawing session.
//!
//! ```text
//! draftcad-replay <script.json> [--config <config.json>]
//! ```
//!
//! The script is a JSON array of steps:
//! ```json
//! [
//!   { "op": "move", "at": [1.3, 1.7, 0.0] },
//!   { "op": "down", "at": [1.0, 2.0, 0.0] },
//!   { "op": "key", "at": [4.0, 2.0, 0.0] },
//!   { "op": "mode", "mode": "polyline" },
//!   { "op": "finish" }
//! ]
//! ```
//!
//! Every tool event is printed to stdout as one JSON line. Failed steps are
//! printed as `{"step": n, "error": "..."}` and replay continues.

use draftcad_core::{DrawMode, DrawingSession, EditorConfig, LockMode, ToolEvent};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
enum ReplayError {
    #[error("usage: draftcad-replay <script.json> [--config <config.json>]")]
    Usage,

    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Invalid script: {0}")]
    Script(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Config(#[from] draftcad_core::ConfigError),

    #[error("Output error: {0}")]
    Output(#[from] io::Error),
}

/// One recorded input step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Step {
    /// Pointer moved.
    Move { at: DVec3 },
    /// Pointer clicked.
    Down { at: DVec3 },
    /// Typed coordinates.
    Key { at: DVec3 },
    Finish,
    Cancel,
    Undo,
    Redo,
    Suspend,
    Resume,
    Activate,
    Mode { mode: DrawMode },
    Lock { lock: LockMode },
}

struct Args {
    script: PathBuf,
    config: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, ReplayError> {
    let mut script = None;
    let mut config = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config = Some(PathBuf::from(args.next().ok_or(ReplayError::Usage)?)),
            _ if script.is_none() => script = Some(PathBuf::from(arg)),
            _ => return Err(ReplayError::Usage),
        }
    }
    Ok(Args {
        script: script.ok_or(ReplayError::Usage)?,
        config,
    })
}

fn read(path: &Path) -> Result<String, ReplayError> {
    fs::read_to_string(path).map_err(|source| ReplayError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Apply one step. Errors are reported as text; they never stop the replay.
fn apply(session: &mut DrawingSession, step: &Step) -> Result<(), String> {
    match step {
        Step::Move { at } => {
            session.pointer_move(*at);
        }
        Step::Down { at } => {
            session.pointer_down(*at).map_err(|e| e.to_string())?;
        }
        Step::Key { at } => {
            session.enter_point(*at).map_err(|e| e.to_string())?;
        }
        Step::Finish => {
            session.finish().map_err(|e| e.to_string())?;
        }
        Step::Cancel => {
            session.cancel();
        }
        Step::Undo => {
            session.undo().map_err(|e| e.to_string())?;
        }
        Step::Redo => {
            session.redo().map_err(|e| e.to_string())?;
        }
        Step::Suspend => {
            session.suspend();
        }
        Step::Resume => {
            session.resume();
        }
        Step::Activate => session.activate(),
        Step::Mode { mode } => session.set_mode(*mode),
        Step::Lock { lock } => session.set_lock(*lock),
    }
    Ok(())
}

fn write_events(out: &mut impl Write, events: &[ToolEvent]) -> Result<(), ReplayError> {
    for event in events {
        writeln!(out, "{}", serde_json::to_string(event)?)?;
    }
    Ok(())
}

fn run() -> Result<(), ReplayError> {
    let args = parse_args(std::env::args().skip(1))?;
    let config = match &args.config {
        Some(path) => EditorConfig::from_json(&read(path)?)?,
        None => EditorConfig::default(),
    };
    let steps: Vec<Step> = serde_json::from_str(&read(&args.script)?)?;
    log::info!("Replaying {} steps from {}", steps.len(), args.script.display());

    let mut session = DrawingSession::new(config);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_events(&mut out, &session.take_events())?;

    for (index, step) in steps.iter().enumerate() {
        if let Err(error) = apply(&mut session, step) {
            log::warn!("Step {} ({:?}) failed: {}", index, step, error);
            let line = serde_json::json!({ "step": index, "error": error });
            writeln!(out, "{line}")?;
        }
        write_events(&mut out, &session.take_events())?;
    }

    log::info!(
        "Replay finished: {} objects, tool {}",
        session.document().scene().len(),
        session.state()
    );
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        log::error!("{e}");
        eprintln!("{e}");
        std::process::exit(1);
    }
}
