//! Cogtui: shift rows and columns to line up colours; linked gears spin and boost the score.

mod app;
mod input;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use cogtui::{EngineConfig, PieceColor};
use env_logger::{Env, Target};
use std::fs::File;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        init_logging(path)?;
    }
    let theme = theme::Theme::load(args.theme.as_deref()).unwrap_or_default();
    let config = build_config(&args)?;
    let seed = args.seed.unwrap_or_else(rand::random);
    log::info!("starting cogtui: grid {}x{}, seed {seed}", config.grid_size, config.grid_size);
    let mut app = App::new(&args, config, theme, seed)?;
    app.run()?;
    Ok(())
}

/// The terminal is in raw mode while playing, so logs only go to a file.
fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Config file first, then CLI flags on top, then validation.
fn build_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(size) = args.grid_size {
        config.grid_size = size;
    }
    if let Some(pct) = args.gears {
        config.gear_percentage = pct;
    }
    if let Some(len) = args.match_length {
        config.match_length = len;
    }
    if let Some(n) = args.colors {
        config.colors = PieceColor::ALL.iter().copied().take(n).collect();
    }
    if let Some(score) = args.base_score {
        config.base_score = score;
    }
    if args.no_animation {
        config.snap_ms = 0;
        config.phase_delay_ms = 0;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Gear-chaining match-3 puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "cogtui",
    version,
    about = "Gear-chaining match-3 puzzle in the terminal. Shift rows and columns; matched gears spin their whole chain.",
    long_about = "Cogtui is a match-3 puzzle on a square board.\n\n\
        Shift a row or column (it wraps around) to line up three or more pieces of one colour. \
        Matches clear, pieces fall, new ones drop in from the top. Gears that touch form a chain; \
        matching any gear spins the whole chain and raises the score multiplier.\n\n\
        CONTROLS:\n  Arrows / hjkl       Move cursor\n  Shift+Arrows / HJKL Shift cursor row or column\n  \
        + / -               More / fewer gears\n  R                   New board    P  Pause    Q / Esc  Quit\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// TOML file with engine settings; CLI flags override it.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Board size (cells per side).
    #[arg(short, long, value_name = "N")]
    pub grid_size: Option<usize>,

    /// Percentage of new pieces that are gears (0-100).
    #[arg(long, value_name = "PCT", value_parser = clap::value_parser!(u8).range(0..=100))]
    pub gears: Option<u8>,

    /// Minimum run length that counts as a match.
    #[arg(long, value_name = "N")]
    pub match_length: Option<usize>,

    /// Number of piece colours in play (first N of red, blue, green, yellow, purple, orange).
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u8).range(1..=6).map(usize::from))]
    pub colors: Option<usize>,

    /// Points per matched cell before the multiplier.
    #[arg(long, value_name = "POINTS")]
    pub base_score: Option<f64>,

    /// Seed for piece generation (random if not set).
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Write logs to this file (level from RUST_LOG, default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Skip main menu and start game immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Resolve cascades instantly instead of pacing each phase.
    #[arg(long)]
    pub no_animation: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_flags() {
        let args = Args::try_parse_from(["cogtui"]).unwrap();
        assert_eq!(build_config(&args).unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::try_parse_from([
            "cogtui", "--grid-size", "6", "--gears", "40", "--colors", "4", "--no-animation",
        ])
        .unwrap();
        let config = build_config(&args).unwrap();
        assert_eq!(config.grid_size, 6);
        assert_eq!(config.gear_percentage, 40);
        assert_eq!(config.colors.len(), 4);
        assert_eq!(config.phase_delay_ms, 0);
    }

    #[test]
    fn test_invalid_flags_rejected() {
        let args = Args::try_parse_from(["cogtui", "--grid-size", "3", "--match-length", "3"]).unwrap();
        assert!(build_config(&args).is_err());
        assert!(Args::try_parse_from(["cogtui", "--gears", "101"]).is_err());
    }
}
