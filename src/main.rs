//! Nodeblast: match-3 puzzle with multi-tile nodes, in the terminal.

mod app;
mod headless;
mod input;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use nodeblast::{Level, Timings};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

/// Options derived from CLI that affect game behaviour.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub seed: u64,
    pub timings: Timings,
    /// Board frames per second.
    pub tick_rate: f64,
    pub no_animation: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let level = match &args.level {
        Some(path) => Level::load(path)
            .with_context(|| format!("failed to load level {}", path.display()))?,
        None => Level::builtin()?,
    };
    let seed = args.seed.unwrap_or_else(clock_seed);
    let config = GameConfig {
        seed,
        timings: if args.no_animation || args.headless {
            Timings::instant()
        } else {
            Timings::default()
        },
        tick_rate: args.tick_rate.max(1.0),
        no_animation: args.no_animation,
    };
    tracing::info!(seed, "starting");

    if args.headless {
        let summary = headless::run(&level, &config, args.max_moves)?;
        println!("{summary}");
        return Ok(());
    }

    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let mut app = App::new(level, config, theme)?;
    app.run()
}

/// Log to `path` when given; the terminal belongs to the UI.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Match-3 puzzle with multi-tile nodes in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "nodeblast",
    version,
    about = "Match-3 puzzle in the terminal. Every piece is a 2x2 node of coloured tiles; swap nodes in from your deck to connect three or more tiles of a colour.",
    long_about = "Nodeblast is a terminal match-3 puzzle.\n\n\
        Each cell holds a node made of four coloured sub-tiles. Tiles of one colour that touch \
        across node edges form a region; three or more tiles blast. Nodes regrow into the gaps, \
        the board falls and refills, and cascades run until nothing matches.\n\n\
        CONTROLS (normal):\n  Arrows      Move cursor   Enter/Space  Swap deck node in   X  Mark / board swap\n  Tab         Next node     P            Pause               Q / Esc    Quit\n\n\
        CONTROLS (vim):\n  h/j/k/l     Move cursor   n            Next node           m  Mark / board swap\n\n\
        Use --level to load a level file and --theme to load a btop-style theme."
)]
pub struct Args {
    /// Level file. Uses the built-in level if not set.
    #[arg(short, long, value_name = "FILE")]
    pub level: Option<PathBuf>,

    /// Seed for the spawn pool. Same seed and inputs give the same game.
    #[arg(short, long, value_name = "N")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Board frames per second (animations, falls).
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub tick_rate: f64,

    /// Disable animations: swaps, blasts and falls resolve on the next frame.
    #[arg(long)]
    pub no_animation: bool,

    /// Play automatically without a terminal UI and print a summary.
    #[arg(long)]
    pub headless: bool,

    /// In headless mode: stop after this many turns.
    #[arg(long, default_value = "200", value_name = "N")]
    pub max_moves: u32,

    /// Write logs to this file (RUST_LOG filters, default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
