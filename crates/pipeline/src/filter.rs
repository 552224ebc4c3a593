//! Consistency filter — step 1 of the plausibility pipeline.

use storsync_model::StorageRecord;

/// Minimum usable capacity in kWh. Values at or below this are
/// placeholders or entry errors.
pub const MIN_CAPACITY_KWH: f64 = 0.3;

/// Minimum gross power in kW.
pub const MIN_POWER_KW: f64 = 0.3;

/// E/P ratio bounds in hours of full-load duration: 6 minutes to 12 hours.
/// Below 6 minutes is physically implausible for a battery; above 12 hours
/// the capacity was most likely entered in Wh instead of kWh.
pub const EP_RATIO_MIN: f64 = 0.1;
pub const EP_RATIO_MAX: f64 = 12.0;

/// Whether a battery record passes every consistency gate:
///
/// 1. usable capacity present and > 0.3 kWh
/// 2. gross power present and > 0.3 kW
/// 3. battery sub-technology label present (an explicit "unspecified"
///    label still counts — only absence fails)
/// 4. commissioning date present
/// 5. E/P ratio within [0.1, 12.0] hours, both bounds inclusive
///
/// A missing operand is a rejection, not an error. Rejected entries are
/// re-added by the correction step. Non-battery technologies never reach
/// this filter.
pub fn is_consistent(record: &StorageRecord) -> bool {
    match record.usable_capacity_kwh {
        Some(c) if c > MIN_CAPACITY_KWH => {}
        _ => return false,
    }

    match record.power_kw {
        Some(p) if p > MIN_POWER_KW => {}
        _ => return false,
    }

    match record.battery_technology.as_deref() {
        Some(t) if !t.trim().is_empty() => {}
        _ => return false,
    }

    if record.commissioning_date.is_none() {
        return false;
    }

    match record.ep_ratio() {
        Some(r) => (EP_RATIO_MIN..=EP_RATIO_MAX).contains(&r),
        None => false,
    }
}
