//! `storsync check` — run the plausibility pipeline without touching the
//! destination, for inspecting an export before a real sync.

use std::path::{Path, PathBuf};

use storsync_model::StorageRecord;

use crate::exit_codes;
use crate::ingest;
use crate::CliError;

pub struct CheckArgs {
    pub input: PathBuf,
    pub out: Option<PathBuf>,
    pub quiet: bool,
    pub json: bool,
}

pub fn cmd_check(args: CheckArgs) -> Result<(), CliError> {
    let units = ingest::load_csv_path(&args.input)?;
    if units.is_empty() {
        return Err(CliError {
            code: exit_codes::EXIT_SOURCE_EMPTY,
            message: format!("no usable rows in {}", args.input.display()),
            hint: None,
        });
    }

    let output = storsync_pipeline::run(units);

    if let Some(path) = &args.out {
        write_records_csv(&output.records, path)?;
        if !args.quiet {
            eprintln!(
                "Wrote {} categorized records to {}",
                output.records.len(),
                path.display(),
            );
        }
    }

    let s = &output.summary;
    if args.json {
        let rendered = serde_json::to_string_pretty(s)
            .map_err(|e| CliError::other(format!("summary serialization error: {e}")))?;
        println!("{rendered}");
        return Ok(());
    }

    println!("Checked {} units ({} batteries)", s.total, s.batteries);
    println!(
        "  filter:     {} passed, {} filtered",
        s.accepted + s.demoted,
        s.filtered,
    );
    println!("  demoted:    {}", s.demoted);
    println!(
        "  corrected:  {} ({} residential, {} commercial, {} unresolved)",
        s.corrected.residential + s.corrected.commercial,
        s.corrected.residential,
        s.corrected.commercial,
        s.corrected.unresolved,
    );

    let mut counts: Vec<(&String, &usize)> = s.category_counts.iter().collect();
    counts.sort_unstable();
    println!("  categories:");
    for (category, count) in counts {
        println!("    {category}: {count}");
    }
    Ok(())
}

fn write_records_csv(records: &[StorageRecord], path: &Path) -> Result<(), CliError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| CliError::io(format!("cannot create {}: {e}", path.display())))?;
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| CliError::io(format!("CSV write error: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| CliError::io(format!("CSV flush error: {e}")))
}
