mod listings;
mod offline;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::listings::ListingsCommands;

#[derive(Debug, Parser)]
#[command(name = "agrilink")]
#[command(about = "Agrilink listings API command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate a listing payload from a JSON file without sending it
    Validate {
        /// Path to the JSON payload
        file: PathBuf,
        /// Treat the payload as raw, string-typed form input
        #[arg(long)]
        form: bool,
        /// Rule table to validate against
        #[arg(long, value_enum, default_value_t = ProfileArg::Standard)]
        profile: ProfileArg,
    },
    /// Normalize a captured API response body from a JSON file
    Normalize {
        /// Path to the captured response body
        file: PathBuf,
        /// Shape of the response
        #[arg(long, value_enum, default_value_t = NormalizeMode::Listing)]
        mode: NormalizeMode,
    },
    /// Call the live listings API (requires `AGRILINK_API_BASE_URL`)
    Listings {
        /// Write the API log as JSON to this path when the command finishes
        #[arg(long)]
        dump_log: Option<PathBuf>,
        #[command(subcommand)]
        command: ListingsCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProfileArg {
    Standard,
    Strict,
}

impl From<ProfileArg> for agrilink_core::ValidationProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Standard => agrilink_core::ValidationProfile::Standard,
            ProfileArg::Strict => agrilink_core::ValidationProfile::Strict,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum NormalizeMode {
    /// A single-listing response
    Listing,
    /// A listings collection, with pagination if present
    Collection,
    /// An error response body
    Error,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate {
            file,
            form,
            profile,
        } => {
            init_tracing(&default_log_level())?;
            offline::run_validate(&file, form, profile.into())
        }
        Commands::Normalize { file, mode } => {
            init_tracing(&default_log_level())?;
            offline::run_normalize(&file, mode)
        }
        Commands::Listings { dump_log, command } => {
            let config = agrilink_core::load_app_config()?;
            init_tracing(&config.log_level)?;
            listings::run_listings(&config, command, dump_log.as_deref()).await
        }
    }
}

/// Offline commands need no configuration, so the level is read directly.
fn default_log_level() -> String {
    std::env::var("AGRILINK_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string())
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[cfg(test)]
mod tests;
