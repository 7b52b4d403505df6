//! Meteor Flash headless demo
//!
//! Runs the game against the recording backend with placeholder assets and a
//! manually stepped clock, sweeping the player across the screen.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use meteor_flash::renderer::{HeadlessBackend, MemoryAssets};
use meteor_flash::{GameController, ManualClock, RenderError, Tuning, TuningError};

const FRAME: Duration = Duration::from_millis(16);
const SEED: u64 = 0x5eed;

#[derive(Parser, Debug)]
#[command(name = "meteor-flash")]
#[command(about = "Run a headless Meteor Flash session and log what happens")]
struct Args {
    /// JSON tuning file (defaults are used when omitted)
    #[arg(long)]
    tuning: Option<PathBuf>,

    /// Number of 16ms frames to simulate
    #[arg(long, default_value_t = 600)]
    frames: u32,
}

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("could not read tuning file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Tuning(#[from] TuningError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    log::info!("Meteor Flash (headless) starting...");

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn load_tuning(path: Option<&Path>) -> Result<Tuning, DemoError> {
    let Some(path) = path else {
        return Ok(Tuning::default());
    };
    let json = std::fs::read_to_string(path).map_err(|source| DemoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Tuning::from_json(&json)?)
}

fn run(args: &Args) -> Result<(), DemoError> {
    let tuning = load_tuning(args.tuning.as_deref())?;

    let clock = ManualClock::new();
    let mut game = GameController::with_seed(HeadlessBackend::new(), clock.clone(), tuning, SEED);
    game.on_surface_created(Box::new(MemoryAssets::placeholders()))?;
    game.on_surface_changed(1080, 2160);

    let start = game.player_position();
    let input = game.player_input();
    for frame in 0..args.frames {
        // Sweep left and right once every four seconds
        let phase = frame as f32 * FRAME.as_secs_f32() / 4.0 * std::f32::consts::TAU;
        input.set(0.5 + 0.35 * phase.sin(), start.y);

        let report = game.on_draw_frame()?;
        if report.collisions.asteroids_hit > 0 {
            log::info!("Frame {frame}: hit, score {}", game.score());
        }
        if report.collisions.pickups_collected > 0 {
            log::info!(
                "Frame {frame}: pickup collected ({:?})",
                game.state().flags.active_effect.map(|e| e.kind)
            );
        }
        clock.advance(FRAME);
    }

    let backend = game.pipeline().backend();
    log::info!(
        "Finished {} frames: score {}, {} offscreen passes, {} quads drawn",
        args.frames,
        game.score(),
        backend.frames(),
        backend.draws()
    );
    game.release();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_frames_without_tuning_file() {
        let args = Args::try_parse_from(["meteor-flash", "--frames", "120"]).unwrap();
        assert_eq!(args.frames, 120);
        assert!(args.tuning.is_none());
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["meteor-flash"]).unwrap();
        assert_eq!(args.frames, 600);
        assert!(args.tuning.is_none());
    }

    #[test]
    fn test_help_is_not_a_tuning_path() {
        let err = Args::try_parse_from(["meteor-flash", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_short_run_completes() {
        let args = Args::try_parse_from(["meteor-flash", "--frames", "30"]).unwrap();
        assert!(run(&args).is_ok());
    }

    #[test]
    fn test_missing_tuning_file_is_an_error() {
        let args =
            Args::try_parse_from(["meteor-flash", "--tuning", "/nonexistent/tuning.json"]).unwrap();
        assert!(matches!(run(&args), Err(DemoError::Io { .. })));
    }
}
