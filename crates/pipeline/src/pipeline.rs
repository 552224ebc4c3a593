//! Pipeline orchestration: partition by technology, filter, classify,
//! correct, merge.

use std::collections::HashMap;

use serde::Serialize;
use storsync_model::{SourceRecord, StorageRecord, Technology};

use crate::correct::{correct, CorrectionCounts};
use crate::stats::RunStatistics;
use crate::{classify, filter};

/// Per-stage counters, reported at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub total: usize,
    pub non_battery: usize,
    pub batteries: usize,
    /// Batteries that passed the consistency filter and kept a category.
    pub accepted: usize,
    /// Batteries rejected by the consistency filter.
    pub filtered: usize,
    /// Batteries demoted by a utility-scale safeguard.
    pub demoted: usize,
    /// Filtered + demoted entries re-added by the correction step.
    pub corrected: CorrectionCounts,
    /// Final category distribution over the merged output.
    pub category_counts: HashMap<String, usize>,
}

/// Orchestrator output: every input record, categorized, plus the summary.
#[derive(Debug)]
pub struct PipelineOutput {
    pub records: Vec<StorageRecord>,
    pub summary: PipelineSummary,
}

/// Run the full plausibility pipeline.
///
/// Non-battery technologies carry their technology as category and skip
/// all filtering. Batteries pass filter → classifier → correction. Every
/// input record appears in the output exactly once with a category set;
/// the result is fully deterministic for a given input.
pub fn run(units: Vec<SourceRecord>) -> PipelineOutput {
    let total = units.len();

    let (batteries, mut non_batteries): (Vec<_>, Vec<_>) = units
        .into_iter()
        .partition(|u| u.record.technology == Technology::Battery);
    let battery_count = batteries.len();

    for unit in &mut non_batteries {
        unit.record.category = unit.record.technology.as_category();
    }

    // Step 1: consistency filter.
    let (survivors, mut rejected): (Vec<_>, Vec<_>) = batteries
        .into_iter()
        .partition(|u| filter::is_consistent(&u.record));
    let filtered = rejected.len();

    // Step 2: categorisation. Safeguard failures join the rejected set.
    let mut demoted = 0usize;
    let mut accepted = Vec::with_capacity(survivors.len());
    for mut unit in survivors {
        match classify::classify(&unit.record, &unit.ctx) {
            Some(category) => {
                unit.record.category = Some(category);
                accepted.push(unit);
            }
            None => {
                demoted += 1;
                rejected.push(unit);
            }
        }
    }

    // Step 3: correction, against the accepted population only.
    let stats = RunStatistics::from_accepted(&accepted);
    let (corrected, correction_counts) = correct(rejected, &stats);

    let accepted_count = accepted.len();
    let mut records: Vec<StorageRecord> = Vec::with_capacity(total);
    records.extend(non_batteries.into_iter().map(|u| u.record));
    records.extend(accepted.into_iter().map(|u| u.record));
    records.extend(corrected.into_iter().map(|u| u.record));

    let mut category_counts: HashMap<String, usize> = HashMap::new();
    for record in &records {
        if let Some(category) = record.category {
            *category_counts.entry(category.to_string()).or_insert(0) += 1;
        }
    }

    PipelineOutput {
        summary: PipelineSummary {
            total,
            non_battery: total - battery_count,
            batteries: battery_count,
            accepted: accepted_count,
            filtered,
            demoted,
            corrected: correction_counts,
            category_counts,
        },
        records,
    }
}
