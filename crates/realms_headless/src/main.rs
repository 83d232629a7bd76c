//! Headless Eldrith Realms runner.
//!
//! This binary runs the game without a UI, controlled via JSON on stdin/stdout.
//! Designed for bots, CI testing, and balance runs.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p realms_headless
//!
//! # Resume a save and print state after every tick
//! cargo run -p realms_headless -- run --load saves/slot1.json --auto-state
//!
//! # Play a strategy for a day of game time
//! cargo run -p realms_headless -- simulate --strategy builder --duration 86400 --step 10
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use realms_core::simulation::DEFAULT_SEED;
use realms_headless::{
    data_loader::load_config,
    runner::{HeadlessConfig, HeadlessRunner},
    simulate::{run_simulation, SimulateConfig},
    strategies::Strategy,
};

#[derive(Parser)]
#[command(name = "realms_headless")]
#[command(about = "Headless Eldrith Realms runner for bots and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Game config file or data directory (default: REALMS_DATA_DIR, then built-in)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single interactive game
    Run {
        /// Save file to load on startup
        #[arg(short, long)]
        load: Option<PathBuf>,

        /// Output state after every tick
        #[arg(long)]
        auto_state: bool,

        /// Random seed
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Clock reading at startup (default: system time)
        #[arg(long)]
        start_time: Option<f64>,
    },

    /// Play a scripted strategy and print a JSON summary
    Simulate {
        /// Preset name (greedy, builder, prestige_loop) or RON strategy file
        #[arg(short, long, default_value = "greedy")]
        strategy: String,

        /// Game seconds to play
        #[arg(short, long, default_value_t = 3600.0)]
        duration: f64,

        /// Seconds between decisions
        #[arg(long, default_value_t = 1.0)]
        step: f64,

        /// Random seed
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Some(Commands::Run {
            load,
            auto_state,
            seed,
            start_time,
        }) => cmd_run(
            cli.data,
            HeadlessConfig {
                auto_state_output: auto_state,
                seed,
                start_time,
                load_path: load,
            },
        ),
        Some(Commands::Simulate {
            strategy,
            duration,
            step,
            seed,
        }) => cmd_simulate(cli.data, &strategy, duration, step, seed),
        None => cmd_run(cli.data, HeadlessConfig::default()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            tracing::error!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_run(data: Option<PathBuf>, config: HeadlessConfig) -> Result<(), String> {
    let game = load_config(data.as_deref()).map_err(|e| e.to_string())?;
    tracing::info!(seed = config.seed, "Starting headless session");
    HeadlessRunner::with_config(game, config)
        .run()
        .map_err(|e| format!("I/O error: {e}"))
}

fn cmd_simulate(
    data: Option<PathBuf>,
    strategy: &str,
    duration: f64,
    step: f64,
    seed: u64,
) -> Result<(), String> {
    let game = load_config(data.as_deref()).map_err(|e| e.to_string())?;
    let strategy = match Strategy::preset(strategy) {
        Some(preset) => preset,
        None => Strategy::load(strategy).map_err(|e| e.to_string())?,
    };
    tracing::info!(strategy = %strategy.name, duration, step, "Simulating");

    let options = SimulateConfig {
        duration,
        step,
        seed,
        ..SimulateConfig::default()
    };
    let summary = run_simulation(game, strategy, &options);
    let json = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}
