//! `storsync-pipeline` — plausibility pipeline for registry storage records.
//!
//! Pure engine crate: receives pre-loaded records, returns categorized
//! results. No CLI or IO dependencies.
//!
//! Registry data is entered manually by thousands of independent operators
//! and frequently contains unit mix-ups (kW vs. W, kWh vs. Wh) and missing
//! fields. Battery entries therefore pass through a three-step procedure
//! based on the Battery-Charts.de / OET methodology:
//!
//! 1. [`filter`] — consistency gates on capacity, power, sub-technology,
//!    commissioning date and the E/P ratio.
//! 2. [`classify`] — market segment categorisation with two utility-scale
//!    safeguards; guard failures are demoted into the correction path.
//! 3. [`correct`] — rejected and demoted entries are re-added with an
//!    imputed category and dimensions averaged from the accepted
//!    population, so no registered unit is lost from the statistics.
//!
//! Non-battery technologies bypass the pipeline and carry their technology
//! as category.

pub mod classify;
pub mod correct;
pub mod filter;
pub mod pipeline;
pub mod stats;

pub use correct::CorrectionCounts;
pub use pipeline::{run, PipelineOutput, PipelineSummary};
pub use stats::RunStatistics;
