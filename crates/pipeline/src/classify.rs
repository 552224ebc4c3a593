//! Market segment categorisation — step 2 of the plausibility pipeline.

use storsync_model::{Category, ClassificationContext, StorageRecord};

/// Upper bound (exclusive) of the residential segment, applied to both
/// capacity (kWh) and power (kW).
pub const RESIDENTIAL_MAX: f64 = 30.0;

/// Lower bound (inclusive) of the utility-scale segment, applied to both
/// capacity (kWh) and power (kW).
pub const UTILITY_MIN: f64 = 1000.0;

/// Classify a consistency-filtered battery record into a market segment.
///
/// Decision order, first match wins:
///
/// 1. capacity < 30 AND power < 30 → residential
/// 2. capacity ≥ 1000 AND power ≥ 1000 → utility-scale, subject to two
///    safeguards that demote the entry (return `None`) instead:
///    a. the operator must not be a natural person — private individuals
///       frequently confuse kW with W, making a 10 kW system look like a
///       10 000 kW one;
///    b. on a low-voltage grid connection the entry is only accepted once
///       the grid operator has reviewed it.
/// 3. everything else → commercial. This is the authoritative definition
///    by exclusion: it covers both the one-dimension-under-30 cases and
///    the mid-range where both dimensions are ≥ 30 but not utility-scale.
///
/// Demoted entries are routed to the correction step, never dropped.
pub fn classify(record: &StorageRecord, ctx: &ClassificationContext) -> Option<Category> {
    let capacity = record.usable_capacity_kwh?;
    let power = record.power_kw?;

    if capacity < RESIDENTIAL_MAX && power < RESIDENTIAL_MAX {
        return Some(Category::Residential);
    }

    if capacity >= UTILITY_MIN && power >= UTILITY_MIN {
        if ctx.is_natural_person {
            return None; // demote for correction
        }

        if is_low_voltage(ctx.voltage_level.as_deref())
            && !is_reviewed(record.grid_review_status.as_deref())
        {
            return None; // demote for correction
        }

        return Some(Category::UtilityScale);
    }

    Some(Category::Commercial)
}

fn is_low_voltage(voltage: Option<&str>) -> bool {
    let v = match voltage {
        Some(v) => v.to_lowercase(),
        None => return false,
    };
    v.contains("niederspannung") || v.contains("low voltage") || v.contains("low_voltage")
}

fn is_reviewed(status: Option<&str>) -> bool {
    let s = match status {
        Some(s) => s.to_lowercase(),
        None => return false,
    };
    s.contains("geprueft") || s.contains("geprüft") || s.contains("approved")
}
