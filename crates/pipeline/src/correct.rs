//! Correction of filtered and demoted entries — step 3 of the
//! plausibility pipeline.
//!
//! Every entry rejected by the consistency filter or demoted by a
//! categorisation safeguard is re-added so that no registered unit
//! disappears from the aggregate statistics. Its unreliable dimensions are
//! replaced with a statistically representative estimate from the accepted
//! population.

use storsync_model::{Category, SourceRecord};

use crate::stats::RunStatistics;

/// Outcome counters of one correction pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CorrectionCounts {
    pub residential: usize,
    pub commercial: usize,
    /// Entries whose assigned category had no reference data at all; their
    /// original (possibly implausible) dimensions were left in place.
    pub unresolved: usize,
}

/// Re-admit rejected entries with an imputed category and averaged
/// dimensions.
///
/// Category assignment: residential for natural-person operators,
/// commercial otherwise. Utility-scale is never assigned here —
/// professional operators are assumed to register utility-scale
/// installations correctly, so only the classifier can reach that
/// category. For entries demoted by the low-voltage guard the
/// operator-type check still dominates.
///
/// Dimension replacement, first available wins:
/// 1. monthly mean of the assigned category for the entry's
///    commissioning month
/// 2. category-wide mean
/// 3. original values, unchanged (last resort)
///
/// Replacement values are rounded to two decimals.
pub fn correct(
    mut rejected: Vec<SourceRecord>,
    stats: &RunStatistics,
) -> (Vec<SourceRecord>, CorrectionCounts) {
    let mut counts = CorrectionCounts::default();

    for entry in &mut rejected {
        let category = if entry.ctx.is_natural_person {
            counts.residential += 1;
            Category::Residential
        } else {
            counts.commercial += 1;
            Category::Commercial
        };
        entry.record.category = Some(category);

        let month = entry.record.commissioning_month();
        let means = month
            .as_deref()
            .and_then(|m| stats.monthly(category, m))
            .or_else(|| stats.overall(category));

        match means {
            Some(m) => {
                entry.record.usable_capacity_kwh = Some(round2(m.capacity_kwh));
                entry.record.power_kw = Some(round2(m.power_kw));
            }
            None => counts.unresolved += 1,
        }
    }

    (rejected, counts)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use storsync_model::{ClassificationContext, StorageRecord, Technology};

    fn accepted(category: Category, capacity: f64, power: f64, date: &str) -> SourceRecord {
        let mut r = StorageRecord::new("peer", Technology::Battery);
        r.category = Some(category);
        r.usable_capacity_kwh = Some(capacity);
        r.power_kw = Some(power);
        r.commissioning_date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok();
        SourceRecord::new(r)
    }

    fn rejected(id: &str, natural_person: bool, date: Option<&str>) -> SourceRecord {
        let mut r = StorageRecord::new(id, Technology::Battery);
        r.usable_capacity_kwh = Some(999_999.0);
        r.power_kw = Some(10.0);
        r.commissioning_date =
            date.and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
        SourceRecord {
            record: r,
            ctx: ClassificationContext {
                is_natural_person: natural_person,
                voltage_level: None,
            },
        }
    }

    #[test]
    fn natural_person_becomes_residential() {
        let stats = RunStatistics::from_accepted(&[accepted(
            Category::Residential,
            12.0,
            6.0,
            "2024-03-01",
        )]);
        let (out, counts) = correct(vec![rejected("a", true, Some("2024-03-15"))], &stats);

        assert_eq!(out[0].record.category, Some(Category::Residential));
        assert_eq!(out[0].record.usable_capacity_kwh, Some(12.0));
        assert_eq!(out[0].record.power_kw, Some(6.0));
        assert_eq!(counts.residential, 1);
        assert_eq!(counts.unresolved, 0);
    }

    #[test]
    fn organisation_becomes_commercial_never_utility() {
        let stats = RunStatistics::from_accepted(&[accepted(
            Category::Commercial,
            80.0,
            40.0,
            "2024-03-01",
        )]);
        let (out, counts) = correct(vec![rejected("a", false, Some("2024-03-02"))], &stats);

        assert_eq!(out[0].record.category, Some(Category::Commercial));
        assert_eq!(counts.commercial, 1);
    }

    #[test]
    fn falls_back_to_category_mean_when_month_bucket_empty() {
        // Peers exist for the category but not for the rejected entry's
        // commissioning month.
        let stats = RunStatistics::from_accepted(&[
            accepted(Category::Residential, 10.0, 5.0, "2024-01-01"),
            accepted(Category::Residential, 20.0, 15.0, "2024-02-01"),
        ]);
        let (out, _) = correct(vec![rejected("a", true, Some("2024-07-10"))], &stats);

        assert_eq!(out[0].record.usable_capacity_kwh, Some(15.0));
        assert_eq!(out[0].record.power_kw, Some(10.0));
    }

    #[test]
    fn keeps_original_values_without_any_reference() {
        let stats = RunStatistics::from_accepted(&[]);
        let (out, counts) = correct(vec![rejected("a", true, Some("2024-07-10"))], &stats);

        assert_eq!(out[0].record.usable_capacity_kwh, Some(999_999.0));
        assert_eq!(out[0].record.power_kw, Some(10.0));
        assert_eq!(counts.unresolved, 1);
    }

    #[test]
    fn undated_entry_uses_category_mean() {
        let stats = RunStatistics::from_accepted(&[accepted(
            Category::Residential,
            9.0,
            4.5,
            "2024-01-01",
        )]);
        let (out, _) = correct(vec![rejected("a", true, None)], &stats);

        assert_eq!(out[0].record.usable_capacity_kwh, Some(9.0));
        assert_eq!(out[0].record.power_kw, Some(4.5));
    }

    #[test]
    fn replacement_values_are_rounded() {
        let stats = RunStatistics::from_accepted(&[
            accepted(Category::Residential, 10.0, 5.0, "2024-03-01"),
            accepted(Category::Residential, 10.5, 5.2, "2024-03-05"),
            accepted(Category::Residential, 10.0, 5.0, "2024-03-09"),
        ]);
        let (out, _) = correct(vec![rejected("a", true, Some("2024-03-15"))], &stats);

        // 30.5 / 3 = 10.1666… → 10.17, 15.2 / 3 = 5.0666… → 5.07
        assert_eq!(out[0].record.usable_capacity_kwh, Some(10.17));
        assert_eq!(out[0].record.power_kw, Some(5.07));
    }

    #[test]
    fn identity_is_preserved() {
        let stats = RunStatistics::from_accepted(&[]);
        let (out, _) = correct(vec![rejected("SEE42", true, None)], &stats);
        assert_eq!(out[0].record.id, "SEE42");
    }
}
