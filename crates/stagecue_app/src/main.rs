// SPDX-License-Identifier: MIT OR Apache-2.0
//! `StageCue` - headless show runner
//!
//! Plays keyframe timelines and beat-synchronised scene changes into a DMX
//! universe:
//! - RON configuration (output, playback, auto-scene)
//! - JSON show files with sequences and scenes
//! - Fixed-rate playback from a simulated or real-time clock
//! - Per-second summaries of the universe in the log
//!
//! ## Architecture
//!
//! The runner owns a timeline transport and an auto-scene selector from the
//! `stagecue_timeline` and `stagecue_autoscene` crates. Both write into one
//! shared universe through their sinks.

mod config;
mod error;
mod runner;
mod show;
mod store;
mod universe;

use clap::Parser;
use config::AppConfig;
use error::AppError;
use runner::Runner;
use show::Show;
use stagecue_timeline::{Direction, SequenceId};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use store::ShowStore;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use universe::Universe;

/// Longest run accepted on the command line (one day)
const MAX_RUN_SECONDS: f64 = 86_400.0;

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "stagecue", version, about = "Headless DMX timeline and auto-scene runner")]
struct Cli {
    /// Configuration file (RON); `stagecue.ron` in the working directory is used if present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Show file (JSON); the built-in example show is used otherwise
    #[arg(short, long)]
    show: Option<PathBuf>,

    /// Sequence to play; defaults to the configured or first sequence
    #[arg(long)]
    sequence: Option<String>,

    /// How long to run, in seconds
    #[arg(long, default_value_t = 10.0)]
    seconds: f64,

    /// Frame rate override
    #[arg(long)]
    fps: Option<f64>,

    /// Pace frames by the wall clock instead of computing them back to back
    #[arg(long)]
    realtime: bool,

    /// Playback speed override
    #[arg(long)]
    speed: Option<f64>,

    /// Loop the sequence
    #[arg(long = "loop")]
    looping: bool,

    /// Bounce between the ends (with --loop)
    #[arg(long)]
    ping_pong: bool,

    /// Play backwards
    #[arg(long)]
    reverse: bool,

    /// Enable automatic scene changes
    #[arg(long)]
    auto_scene: bool,

    /// Write the default configuration to this path and exit
    #[arg(long, value_name = "PATH")]
    write_default_config: Option<PathBuf>,

    /// Add an exported sequence to the show before running
    #[arg(long, value_name = "FILE")]
    import: Vec<PathBuf>,

    /// Remove a sequence from the show before running
    #[arg(long, value_name = "SEQUENCE")]
    delete: Vec<String>,

    /// Rename a sequence before running
    #[arg(long, value_name = "SEQUENCE=NAME", value_parser = parse_rename)]
    rename: Vec<(SequenceId, String)>,

    /// Save the show (after imports and edits) to this path
    #[arg(long, value_name = "PATH")]
    save_show: Option<PathBuf>,

    /// Print a sequence as an export envelope and exit
    #[arg(long, value_name = "SEQUENCE")]
    export: Option<String>,
}

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,stagecue_app=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    tracing::info!("Starting StageCue v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli) {
        tracing::error!("StageCue failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    if let Some(path) = &cli.write_default_config {
        return AppConfig::default().save(path);
    }

    let default_path = AppConfig::config_file_path(Path::new("."));
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None if default_path.exists() => AppConfig::load(&default_path)?,
        None => AppConfig::default(),
    };
    let length = run_length(cli.seconds)?;
    apply_overrides(&mut config, &cli)?;

    let show_path = cli.show.clone().or_else(|| config.show.clone());
    let show = match &show_path {
        Some(path) => Show::load(path)?,
        None => {
            tracing::info!("No show file given, using the built-in example show");
            Show::example()
        }
    };
    let mut store = ShowStore::from_show(show)?;
    for path in &cli.import {
        let sequence = show::import_sequence(&std::fs::read_to_string(path)?)?;
        let id = store.import_sequence(sequence)?;
        tracing::info!("Imported sequence '{}' from {:?}", id, path);
    }
    edit_store(&mut store, &cli)?;
    if let Some(path) = &cli.save_show {
        store.to_show().save(path)?;
    }
    tracing::info!(
        "Show ready: {} sequences, {} scenes",
        store.sequences().count(),
        store.scene_count()
    );
    let store = Arc::new(store);

    if let Some(id) = &cli.export {
        let id = SequenceId::new(id.as_str());
        let sequence = store.sequence(&id).ok_or(AppError::SequenceNotFound(id))?;
        println!("{}", show::export_sequence(sequence)?);
        return Ok(());
    }

    let sequence_id = cli
        .sequence
        .as_deref()
        .map(SequenceId::new)
        .or_else(|| config.playback.sequence.clone())
        .or_else(|| store.first_sequence_id().cloned());

    let universe = Universe::shared(config.output.universe_size);
    let mut runner = Runner::new(&config, store, universe)?;
    if let Some(fps) = cli.fps {
        runner.set_frame_rate(fps)?;
    }

    let start = Instant::now();
    match &sequence_id {
        Some(id) => runner.play(id, config.playback.options, start)?,
        None => tracing::warn!("Show has no sequences, running auto-scenes only"),
    }

    let summary = runner.run_for(start, length, cli.realtime);
    let last_scene = runner
        .auto_scene_state()
        .and_then(|state| state.current_index.map(|i| state.scene_list[i].to_string()));
    tracing::info!(
        "Done: {} frames ({} written), {} scene changes (last {}), final position {:.1} ms",
        summary.frames,
        runner.universe().read().frame_count(),
        summary.scene_changes,
        last_scene.as_deref().unwrap_or("none"),
        summary.playback.position
    );
    Ok(())
}

fn parse_rename(arg: &str) -> Result<(SequenceId, String), String> {
    match arg.split_once('=') {
        Some((id, name)) if !id.is_empty() && !name.is_empty() => Ok((SequenceId::new(id), name.to_string())),
        _ => Err(format!("expected SEQUENCE=NAME, got '{arg}'")),
    }
}

fn run_length(seconds: f64) -> Result<Duration, AppError> {
    if !(0.0..=MAX_RUN_SECONDS).contains(&seconds) {
        return Err(AppError::Config(format!(
            "Run length must be between 0 and {} seconds, got {}",
            MAX_RUN_SECONDS, seconds
        )));
    }
    Duration::try_from_secs_f64(seconds).map_err(|e| AppError::Config(format!("Invalid run length {}: {}", seconds, e)))
}

fn edit_store(store: &mut ShowStore, cli: &Cli) -> Result<(), AppError> {
    for id in &cli.delete {
        let id = SequenceId::new(id.as_str());
        if store.delete_sequence(&id).is_none() {
            return Err(AppError::SequenceNotFound(id));
        }
        tracing::info!("Deleted sequence '{}'", id);
    }
    for (id, name) in &cli.rename {
        let sequence = store.update_sequence(id, |seq| seq.name = name.clone())?;
        tracing::info!("Renamed sequence '{}' to '{}'", id, sequence.name);
    }
    Ok(())
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) -> Result<(), AppError> {
    let options = &mut config.playback.options;
    if let Some(speed) = cli.speed {
        options.speed = speed;
    }
    options.looping |= cli.looping;
    options.ping_pong |= cli.ping_pong;
    if cli.reverse {
        options.direction = Direction::Reverse;
    }
    config.auto_scene.enabled |= cli.auto_scene;

    config.validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "stagecue",
            "--loop",
            "--ping-pong",
            "--reverse",
            "--speed",
            "2",
            "--fps",
            "30",
            "--auto-scene",
        ]);
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &cli).unwrap();

        let options = config.playback.options;
        assert!(options.looping && options.ping_pong);
        assert_eq!(options.direction, Direction::Reverse);
        assert_eq!(options.speed, 2.0);
        assert_eq!(cli.fps, Some(30.0));
        assert!(config.auto_scene.enabled);
    }

    #[test]
    fn test_cli_rejects_bad_overrides() {
        let mut config = AppConfig::default();
        let cli = Cli::parse_from(["stagecue", "--speed", "0"]);
        assert!(apply_overrides(&mut config, &cli).is_err());

        let cli = Cli::parse_from(["stagecue", "--seconds=-1"]);
        assert!(matches!(run_length(cli.seconds), Err(AppError::Config(_))));
    }

    #[test]
    fn test_run_length_bounds() {
        let cli = Cli::parse_from(["stagecue", "--seconds", "1e300"]);
        assert!(matches!(run_length(cli.seconds), Err(AppError::Config(_))));
        assert!(run_length(MAX_RUN_SECONDS + 1.0).is_err());
        assert!(run_length(f64::NAN).is_err());
        assert!(run_length(f64::INFINITY).is_err());

        assert_eq!(run_length(0.0).unwrap(), Duration::ZERO);
        assert_eq!(run_length(2.5).unwrap(), Duration::from_millis(2500));
        assert_eq!(run_length(MAX_RUN_SECONDS).unwrap(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_edit_store() {
        let mut store = ShowStore::from_show(Show::example()).unwrap();
        let cli = Cli::parse_from([
            "stagecue",
            "--delete",
            "blank-timeline",
            "--rename",
            "moving-head-example=Figure Eight",
        ]);
        edit_store(&mut store, &cli).unwrap();

        assert_eq!(store.sequences().count(), 1);
        let sequence = store.sequence(&SequenceId::new("moving-head-example")).unwrap();
        assert_eq!(sequence.name, "Figure Eight");

        let cli = Cli::parse_from(["stagecue", "--delete", "blank-timeline"]);
        assert!(matches!(edit_store(&mut store, &cli), Err(AppError::SequenceNotFound(_))));
        assert!(Cli::try_parse_from(["stagecue", "--rename", "no-name"]).is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["stagecue"]);
        assert_eq!(cli.seconds, 10.0);
        assert!(cli.config.is_none() && cli.show.is_none() && cli.export.is_none());
        assert!(cli.import.is_empty());
    }
}
