//! Eldrith Realms - Development Tools

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use realms_core::cost::CostAction;
use realms_core::data::GameConfig;
use realms_core::state::EntityKind;
use realms_tools::costs::{cost_table, render_table};

#[derive(Parser)]
#[command(name = "realms-tools")]
#[command(about = "Development tools for Eldrith Realms")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Path to a data directory or a single config file
        #[arg(default_value = "assets/data")]
        path: PathBuf,
    },

    /// Print the first N single-step prices of an entity
    Costs {
        /// Entity kind
        #[arg(value_enum)]
        kind: KindArg,

        /// Entity id
        id: String,

        /// Number of steps to print
        #[arg(short, long, default_value_t = 10)]
        levels: u32,

        /// Price upgrades instead of purchases
        #[arg(long)]
        upgrade: bool,

        /// Config file (default: built-in table)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Race,
    Building,
    Research,
    PrestigeUpgrade,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Race => Self::Race,
            KindArg::Building => Self::Building,
            KindArg::Research => Self::Research,
            KindArg::PrestigeUpgrade => Self::PrestigeUpgrade,
        }
    }
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => {
            tracing::info!("Validating data files in: {}", path.display());
            match realms_tools::validate::validate_data_directory(&path) {
                Ok(()) => {
                    tracing::info!("Validation passed");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Costs {
            kind,
            id,
            levels,
            upgrade,
            config,
        } => {
            let action = if upgrade {
                CostAction::Upgrade
            } else {
                CostAction::Purchase
            };
            match print_costs(config.as_deref(), kind.into(), action, &id, levels) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    tracing::error!("{e}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn print_costs(
    config: Option<&Path>,
    kind: EntityKind,
    action: CostAction,
    id: &str,
    levels: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            GameConfig::from_ron_str(&text, &path.display().to_string())?.validated()?
        }
        None => GameConfig::builtin()?,
    };
    let rows = cost_table(&config, kind, action, id, levels)?;
    print!("{}", render_table(&rows));
    Ok(())
}
