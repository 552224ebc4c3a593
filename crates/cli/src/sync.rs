//! `storsync sync` — ingest, plausibility pipeline, reconciliation.

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use storsync_directus::{DirectusClient, DirectusConfig};
use storsync_pipeline::PipelineSummary;
use storsync_recon::{sync as reconcile, SyncError, SyncMode, SyncOptions, SyncReport};

use crate::exit_codes;
use crate::ingest;
use crate::CliError;

pub struct SyncArgs {
    pub input: PathBuf,
    pub full: bool,
    pub dest_url: String,
    pub token: String,
    pub collection: String,
    pub batch_size: usize,
    pub workers: usize,
    pub days_back: u32,
    pub quiet: bool,
    pub json: bool,
}

/// End-of-run summary, printed once on stdout.
#[derive(Debug, Serialize)]
struct RunSummary {
    mode: String,
    duration_secs: u64,
    loaded: usize,
    synced: usize,
    pipeline: PipelineSummary,
    sync: SyncReport,
}

pub fn cmd_sync(args: SyncArgs) -> Result<(), CliError> {
    let start = Instant::now();
    let mode = if args.full {
        SyncMode::Full
    } else {
        SyncMode::Incremental
    };

    // 1. Ingest the registry export.
    let mut units = ingest::load_csv_path(&args.input)?;
    let loaded = units.len();
    if !args.quiet {
        eprintln!("Loaded {loaded} units from {}", args.input.display());
    }

    if mode == SyncMode::Incremental {
        let threshold = chrono::Local::now().naive_local()
            - chrono::Duration::days(i64::from(args.days_back));
        units = ingest::filter_recent(units, threshold);
        if !args.quiet {
            eprintln!(
                "Incremental window: {} of {loaded} units updated since {}",
                units.len(),
                threshold.format("%Y-%m-%d"),
            );
        }
    }

    if units.is_empty() {
        if mode == SyncMode::Full {
            return Err(CliError {
                code: exit_codes::EXIT_SOURCE_EMPTY,
                message: format!("no usable rows in {}", args.input.display()),
                hint: None,
            });
        }
        // An empty incremental window is a quiet day, not a failure.
        println!("No entries to sync.");
        return Ok(());
    }

    // 2. Plausibility pipeline.
    let output = storsync_pipeline::run(units);
    let s = &output.summary;
    if !args.quiet {
        eprintln!(
            "Consistency filter: {} passed, {} filtered of {} batteries",
            s.accepted + s.demoted,
            s.filtered,
            s.batteries,
        );
        eprintln!(
            "Categorisation: {} accepted, {} demoted",
            s.accepted, s.demoted,
        );
        eprintln!(
            "Correction: {} re-added ({} residential, {} commercial)",
            s.corrected.residential + s.corrected.commercial,
            s.corrected.residential,
            s.corrected.commercial,
        );
    }
    if s.corrected.unresolved > 0 {
        eprintln!(
            "warning: {} corrected entries kept their original dimensions (no reference data)",
            s.corrected.unresolved,
        );
    }

    // 3. Reconcile against the destination.
    if !args.quiet {
        eprintln!(
            "Syncing {} records to {} ({mode} mode)...",
            output.records.len(),
            args.collection,
        );
    }
    let client = DirectusClient::new(DirectusConfig::new(
        &args.dest_url,
        &args.token,
        &args.collection,
    ));
    let opts = SyncOptions {
        batch_size: args.batch_size,
        workers: args.workers,
    };
    let report = reconcile(&client, &output.records, mode, &opts).map_err(|e| match e {
        SyncError::Auth(_) => CliError {
            code: exit_codes::EXIT_SYNC_AUTH,
            message: e.to_string(),
            hint: Some("check DIRECTUS_API_TOKEN".into()),
        },
        SyncError::Snapshot(_) => CliError {
            code: exit_codes::EXIT_SYNC_SNAPSHOT,
            message: e.to_string(),
            hint: None,
        },
    })?;

    for err in &report.errors {
        eprintln!("warning: {err}");
    }

    // 4. Single end-of-run summary.
    let failed_batches = report.failed_batches;
    let summary = RunSummary {
        mode: mode.to_string(),
        duration_secs: start.elapsed().as_secs(),
        loaded,
        synced: output.records.len(),
        pipeline: output.summary,
        sync: report,
    };
    print_summary(&summary, args.full, args.json)?;

    if failed_batches > 0 {
        return Err(CliError {
            code: exit_codes::EXIT_SYNC_PARTIAL,
            message: format!(
                "{failed_batches} batches failed; the next full run heals the gap"
            ),
            hint: None,
        });
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, full: bool, json: bool) -> Result<(), CliError> {
    if json {
        let rendered = serde_json::to_string_pretty(summary)
            .map_err(|e| CliError::other(format!("summary serialization error: {e}")))?;
        println!("{rendered}");
        return Ok(());
    }

    println!(
        "Sync completed in {}s ({} mode)",
        summary.duration_secs, summary.mode,
    );
    println!("  loaded:    {}", summary.loaded);
    println!("  synced:    {}", summary.synced);
    println!("  inserted:  {}", summary.sync.inserted);
    println!("  updated:   {}", summary.sync.updated);
    println!("  unchanged: {}", summary.sync.unchanged);
    if full {
        println!("  deleted:   {}", summary.sync.deleted);
    }
    if summary.sync.failed_batches > 0 {
        println!("  failed batches: {}", summary.sync.failed_batches);
    }
    Ok(())
}
