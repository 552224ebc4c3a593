// storsync CLI - registry export → plausibility pipeline → destination sync.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use storsync_cli::check::{cmd_check, CheckArgs};
use storsync_cli::exit_codes::EXIT_SUCCESS;
use storsync_cli::sync::{cmd_sync, SyncArgs};
use storsync_cli::CliError;

#[derive(Parser)]
#[command(name = "storsync")]
#[command(about = "Sync the national storage-unit registry export to the dashboard database")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the plausibility pipeline and reconcile against the destination
    #[command(after_help = "\
Examples:
  storsync sync -i export.csv                  # incremental, last 10 days
  storsync sync -i export.csv --full           # full reload + stale deletion
  storsync sync -i export.csv --full --json    # machine-readable summary")]
    Sync {
        /// Registry export CSV (one row per storage unit)
        #[arg(long, short = 'i')]
        input: PathBuf,

        /// Full reload: snapshot the destination once, upload
        /// concurrently, delete entries retracted from the registry
        #[arg(long)]
        full: bool,

        /// Destination API base URL
        #[arg(long, env = "DIRECTUS_API_URL")]
        dest_url: String,

        /// Destination API token
        #[arg(long, env = "DIRECTUS_API_TOKEN", hide_env_values = true)]
        token: String,

        /// Destination collection name
        #[arg(long, env = "STORSYNC_COLLECTION", default_value = "energy_storage_units")]
        collection: String,

        /// Records per destination API call
        #[arg(long, env = "DIRECTUS_BATCH_SIZE", default_value_t = 1000)]
        batch_size: usize,

        /// Concurrent upload workers in full mode
        #[arg(long, env = "SYNC_WORKERS", default_value_t = 4)]
        workers: usize,

        /// Incremental look-back window in days
        #[arg(long, env = "UPDATE_DAYS_BACK", default_value_t = 10)]
        days_back: u32,

        /// Suppress progress output on stderr
        #[arg(long, short = 'q')]
        quiet: bool,

        /// Machine-readable summary on stdout
        #[arg(long)]
        json: bool,
    },

    /// Run the plausibility pipeline only and report the outcome
    #[command(after_help = "\
Examples:
  storsync check -i export.csv
  storsync check -i export.csv -o categorized.csv --json")]
    Check {
        /// Registry export CSV (one row per storage unit)
        #[arg(long, short = 'i')]
        input: PathBuf,

        /// Write the categorized records as CSV
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Suppress progress output on stderr
        #[arg(long, short = 'q')]
        quiet: bool,

        /// Machine-readable summary on stdout
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sync {
            input,
            full,
            dest_url,
            token,
            collection,
            batch_size,
            workers,
            days_back,
            quiet,
            json,
        } => cmd_sync(SyncArgs {
            input,
            full,
            dest_url,
            token,
            collection,
            batch_size,
            workers,
            days_back,
            quiet,
            json,
        }),
        Commands::Check {
            input,
            out,
            quiet,
            json,
        } => cmd_check(CheckArgs {
            input,
            out,
            quiet,
            json,
        }),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError {
            code,
            message,
            hint,
        }) => {
            if !message.is_empty() {
                eprintln!("error: {message}");
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {hint}");
            }
            ExitCode::from(code)
        }
    }
}
