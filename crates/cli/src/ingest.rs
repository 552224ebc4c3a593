//! CSV ingest at the registry-export interface.
//!
//! One row per storage unit with canonical column names. A missing column
//! leaves the corresponding fields absent on every record — absence is a
//! data-quality signal for the plausibility pipeline, never an ingest
//! error. Only the `id` column is mandatory.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use storsync_model::{ClassificationContext, SourceRecord, StorageRecord, Technology};

use crate::exit_codes;
use crate::CliError;

/// Load the registry export from a file.
pub fn load_csv_path(path: &Path) -> Result<Vec<SourceRecord>, CliError> {
    let data = std::fs::read_to_string(path).map_err(|e| CliError {
        code: exit_codes::EXIT_SOURCE_IO,
        message: format!("cannot read {}: {e}", path.display()),
        hint: None,
    })?;
    load_csv(&data)
}

/// Parse the registry export. Rows without an id are dropped.
pub fn load_csv(data: &str) -> Result<Vec<SourceRecord>, CliError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CliError::io(format!("cannot read CSV header: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let idx = |name: &str| headers.iter().position(|h| h == name);

    let id_idx = idx("id").ok_or_else(|| {
        CliError {
            code: exit_codes::EXIT_SOURCE_EMPTY,
            message: "source export has no id column".into(),
            hint: Some("expected canonical column names; at minimum: id".into()),
        }
    })?;

    let technology_idx = idx("technology");
    let name_idx = idx("name");
    let status_idx = idx("status");
    let battery_technology_idx = idx("battery_technology");
    let capacity_idx = idx("usable_capacity_kwh");
    let power_idx = idx("power_kw");
    let commissioning_idx = idx("commissioning_date");
    let shutdown_idx = idx("shutdown_date");
    let last_update_idx = idx("last_update");
    let review_idx = idx("grid_review_status");
    let operator_type_idx = idx("operator_type");
    let voltage_idx = idx("voltage_level");
    let country_idx = idx("country");
    let federal_state_idx = idx("federal_state");
    let district_idx = idx("district");
    let municipality_idx = idx("municipality");
    let region_idx = idx("region");
    let postcode_idx = idx("postcode");
    let lat_idx = idx("lat");
    let lon_idx = idx("lon");

    let mut units = Vec::new();

    for row in reader.records() {
        let row = row.map_err(|e| CliError::io(format!("CSV parse error: {e}")))?;
        let field = |i: Option<usize>| -> Option<&str> {
            i.and_then(|i| row.get(i)).map(str::trim).filter(|s| !s.is_empty())
        };

        let id = match field(Some(id_idx)) {
            Some(id) => id.to_string(),
            None => continue, // unidentifiable rows cannot be synced
        };

        let technology = field(technology_idx)
            .map(Technology::from_label)
            .unwrap_or(Technology::Other);

        let mut record = StorageRecord::new(id, technology);
        record.name = field(name_idx).map(String::from);
        record.status = field(status_idx).map(String::from);
        record.battery_technology = field(battery_technology_idx).map(String::from);
        record.usable_capacity_kwh = field(capacity_idx).and_then(parse_decimal);
        record.power_kw = field(power_idx).and_then(parse_decimal);
        record.commissioning_date = field(commissioning_idx).and_then(parse_date);
        record.shutdown_date = field(shutdown_idx).and_then(parse_date);
        record.last_update = field(last_update_idx).and_then(parse_datetime);
        record.grid_review_status = field(review_idx).map(String::from);
        record.country = field(country_idx).map(String::from);
        record.federal_state = field(federal_state_idx).map(String::from);
        record.district = field(district_idx).map(String::from);
        record.municipality = field(municipality_idx).map(String::from);
        record.region = field(region_idx).map(String::from);
        record.postcode = field(postcode_idx).map(String::from);
        record.lat = field(lat_idx).and_then(parse_decimal);
        record.lon = field(lon_idx).and_then(parse_decimal);

        let ctx = ClassificationContext {
            is_natural_person: field(operator_type_idx)
                .map(is_natural_person_label)
                .unwrap_or(false),
            voltage_level: field(voltage_idx).map(String::from),
        };

        units.push(SourceRecord { record, ctx });
    }

    Ok(units)
}

/// Keep only rows whose `last_update` falls within the look-back window.
///
/// Rows without a timestamp are excluded, matching a threshold query on
/// the source side.
pub fn filter_recent(units: Vec<SourceRecord>, threshold: NaiveDateTime) -> Vec<SourceRecord> {
    units
        .into_iter()
        .filter(|u| u.record.last_update.is_some_and(|t| t >= threshold))
        .collect()
}

/// Parse a numeric field, tolerating European decimal commas ("1,5").
fn parse_decimal(s: &str) -> Option<f64> {
    s.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().or_else(|| {
        // Timestamp in a date column: keep the calendar day.
        s.get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
    })
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok())
        .or_else(|| parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

/// Operator-type labels marking a private individual.
fn is_natural_person_label(label: &str) -> bool {
    let l = label.to_lowercase();
    l.contains("natuerlich") || l.contains("natürlich") || l == "natural_person"
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_HEADER: &str = "id,name,technology,battery_technology,usable_capacity_kwh,power_kw,commissioning_date,shutdown_date,last_update,operator_type,voltage_level,grid_review_status,federal_state,municipality,postcode,lat,lon";

    #[test]
    fn parses_a_full_row() {
        let csv = format!(
            "{FULL_HEADER}\n\
             SEE900001,Home battery,Batterie,Lithium-Ionen-Batterie,\"10,5\",5.0,2023-04-12,,2026-08-01T06:30:00,Natuerliche Person,Niederspannung,Geprueft,Bayern,Augsburg,86150,48.37,10.89\n"
        );
        let units = load_csv(&csv).unwrap();
        assert_eq!(units.len(), 1);

        let u = &units[0];
        assert_eq!(u.record.id, "SEE900001");
        assert_eq!(u.record.technology, Technology::Battery);
        assert_eq!(u.record.usable_capacity_kwh, Some(10.5));
        assert_eq!(u.record.power_kw, Some(5.0));
        assert_eq!(
            u.record.commissioning_date,
            NaiveDate::from_ymd_opt(2023, 4, 12)
        );
        assert_eq!(u.record.shutdown_date, None);
        assert!(u.record.last_update.is_some());
        assert_eq!(u.record.grid_review_status.as_deref(), Some("Geprueft"));
        assert!(u.ctx.is_natural_person);
        assert_eq!(u.ctx.voltage_level.as_deref(), Some("Niederspannung"));
    }

    #[test]
    fn missing_columns_leave_fields_absent() {
        let csv = "id,technology\nSEE1,Batterie\nSEE2,Pumpspeicher\n";
        let units = load_csv(csv).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].record.usable_capacity_kwh, None);
        assert_eq!(units[0].record.commissioning_date, None);
        assert!(!units[0].ctx.is_natural_person);
        assert_eq!(units[1].record.technology, Technology::PumpedHydro);
    }

    #[test]
    fn rows_without_id_are_dropped() {
        let csv = "id,technology\n,Batterie\n   ,Batterie\nSEE1,Batterie\n";
        let units = load_csv(csv).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].record.id, "SEE1");
    }

    #[test]
    fn missing_id_column_is_an_error() {
        let err = load_csv("technology\nBatterie\n").unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_SOURCE_EMPTY);
    }

    #[test]
    fn operator_type_variants() {
        assert!(is_natural_person_label("natuerlichePerson"));
        assert!(is_natural_person_label("Natürliche Person"));
        assert!(is_natural_person_label("natural_person"));
        assert!(!is_natural_person_label("juristischePerson"));
        assert!(!is_natural_person_label("organisation"));
    }

    #[test]
    fn decimal_parsing_tolerates_commas() {
        assert_eq!(parse_decimal("1,5"), Some(1.5));
        assert_eq!(parse_decimal("1080.47"), Some(1080.47));
        assert_eq!(parse_decimal("NaN"), None);
        assert_eq!(parse_decimal("kaputt"), None);
    }

    #[test]
    fn datetime_formats() {
        assert!(parse_datetime("2026-08-01T06:30:00").is_some());
        assert!(parse_datetime("2026-08-01 06:30:00").is_some());
        assert_eq!(
            parse_datetime("2026-08-01").unwrap(),
            NaiveDate::from_ymd_opt(2026, 8, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert!(parse_datetime("gestern").is_none());
    }

    #[test]
    fn filter_recent_excludes_stale_and_undated_rows() {
        let csv = "id,last_update\n\
                   fresh,2026-08-05T10:00:00\n\
                   stale,2026-01-01T10:00:00\n\
                   undated,\n";
        let units = load_csv(csv).unwrap();
        assert_eq!(units.len(), 3);

        let threshold = NaiveDate::from_ymd_opt(2026, 7, 28)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let recent = filter_recent(units, threshold);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].record.id, "fresh");
    }
}
