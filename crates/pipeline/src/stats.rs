//! Reference statistics for the correction step.
//!
//! Built once from the accepted set before any correction happens. The
//! aggregation therefore cannot depend on correction order, and corrected
//! entries can never feed back into the averages within a run.

use std::collections::HashMap;

use storsync_model::{Category, SourceRecord};

/// Mean capacity and power of one reference bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimensionMeans {
    pub capacity_kwh: f64,
    pub power_kw: f64,
}

#[derive(Debug, Default)]
struct Sums {
    capacity: f64,
    power: f64,
    n: usize,
}

/// Per-run reference averages over accepted battery records, keyed by
/// (category, commissioning month `YYYY-MM`) and by category alone.
#[derive(Debug, Default)]
pub struct RunStatistics {
    monthly: HashMap<(Category, String), DimensionMeans>,
    by_category: HashMap<Category, DimensionMeans>,
}

impl RunStatistics {
    /// Aggregate the accepted set.
    ///
    /// Entries without a category or with a missing dimension are skipped;
    /// entries without a commissioning date still count toward the
    /// category-wide means.
    pub fn from_accepted(accepted: &[SourceRecord]) -> Self {
        let mut monthly_sums: HashMap<(Category, String), Sums> = HashMap::new();
        let mut category_sums: HashMap<Category, Sums> = HashMap::new();

        for entry in accepted {
            let record = &entry.record;
            let (category, capacity, power) = match (
                record.category,
                record.usable_capacity_kwh,
                record.power_kw,
            ) {
                (Some(cat), Some(c), Some(p)) => (cat, c, p),
                _ => continue,
            };

            if let Some(month) = record.commissioning_month() {
                let sums = monthly_sums.entry((category, month)).or_default();
                sums.capacity += capacity;
                sums.power += power;
                sums.n += 1;
            }

            let sums = category_sums.entry(category).or_default();
            sums.capacity += capacity;
            sums.power += power;
            sums.n += 1;
        }

        Self {
            monthly: finalize(monthly_sums),
            by_category: finalize(category_sums),
        }
    }

    /// Mean of the (category, month) bucket, if any accepted record landed
    /// in it.
    pub fn monthly(&self, category: Category, month: &str) -> Option<DimensionMeans> {
        self.monthly.get(&(category, month.to_string())).copied()
    }

    /// Category-wide mean across all months.
    pub fn overall(&self, category: Category) -> Option<DimensionMeans> {
        self.by_category.get(&category).copied()
    }
}

fn finalize<K: std::hash::Hash + Eq>(sums: HashMap<K, Sums>) -> HashMap<K, DimensionMeans> {
    sums.into_iter()
        .filter(|(_, s)| s.n > 0)
        .map(|(k, s)| {
            (
                k,
                DimensionMeans {
                    capacity_kwh: s.capacity / s.n as f64,
                    power_kw: s.power / s.n as f64,
                },
            )
        })
        .collect()
}
