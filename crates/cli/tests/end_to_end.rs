// End-to-end tests: CSV export → plausibility pipeline → mock destination.

use httpmock::prelude::*;
use serde_json::json;
use tempfile::tempdir;

use storsync_cli::check::{cmd_check, CheckArgs};
use storsync_cli::exit_codes;
use storsync_cli::sync::{cmd_sync, SyncArgs};

const COLLECTION: &str = "energy_storage_units";

fn export_csv() -> String {
    "id,technology,battery_technology,usable_capacity_kwh,power_kw,commissioning_date,operator_type,voltage_level,grid_review_status\n\
     ok1,Batterie,Lithium-Ionen-Batterie,10.0,5.0,2024-03-10,Natuerliche Person,Niederspannung,Geprueft\n\
     broken1,Batterie,Lithium-Ionen-Batterie,,5.0,2024-03-10,juristischePerson,,\n\
     mixup1,Batterie,Lithium-Ionen-Batterie,2000.0,2000.0,2024-03-12,natuerlichePerson,,\n\
     hydro1,Wasserstoffspeicher,,,,,,,\n"
        .to_string()
}

fn sync_args(input: std::path::PathBuf, server: &MockServer, full: bool) -> SyncArgs {
    SyncArgs {
        input,
        full,
        dest_url: server.base_url(),
        token: "test-token".into(),
        collection: COLLECTION.into(),
        batch_size: 1000,
        workers: 2,
        days_back: 10,
        quiet: true,
        json: false,
    }
}

#[test]
fn full_sync_inserts_and_deletes_stale() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("export.csv");
    std::fs::write(&input, export_csv()).unwrap();

    let server = MockServer::start();
    let scan = server.mock(|when, then| {
        when.method(GET)
            .path(format!("/items/{COLLECTION}"))
            .query_param("fields", "id,checksum");
        then.status(200)
            .json_body(json!({ "data": [{ "id": "retracted", "checksum": "blake3:old" }] }));
    });
    let create = server.mock(|when, then| {
        when.method(POST).path(format!("/items/{COLLECTION}"));
        then.status(200).json_body(json!({ "data": [] }));
    });
    let delete = server.mock(|when, then| {
        when.method(DELETE)
            .path(format!("/items/{COLLECTION}"))
            .json_body(json!(["retracted"]));
        then.status(204);
    });

    cmd_sync(sync_args(input, &server, true)).unwrap();

    scan.assert();
    create.assert();
    delete.assert();
}

#[test]
fn incremental_sync_checks_existence_and_never_deletes() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("export.csv");

    let recent = (chrono::Local::now().naive_local() - chrono::Duration::days(1))
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string();
    let csv = format!(
        "id,technology,battery_technology,usable_capacity_kwh,power_kw,commissioning_date,last_update\n\
         fresh1,Batterie,Sonstige,10.0,5.0,2024-03-10,{recent}\n\
         old1,Batterie,Sonstige,10.0,5.0,2024-03-10,2020-01-01T00:00:00\n"
    );
    std::fs::write(&input, csv).unwrap();

    let server = MockServer::start();
    let probe = server.mock(|when, then| {
        when.method(GET)
            .path(format!("/items/{COLLECTION}"))
            .query_param("filter[id][_in]", "fresh1");
        then.status(200).json_body(json!({ "data": [] }));
    });
    let create = server.mock(|when, then| {
        when.method(POST).path(format!("/items/{COLLECTION}"));
        then.status(200).json_body(json!({ "data": [] }));
    });
    let delete = server.mock(|when, then| {
        when.method(DELETE).path(format!("/items/{COLLECTION}"));
        then.status(204);
    });

    cmd_sync(sync_args(input, &server, false)).unwrap();

    // Only the row inside the look-back window reaches the destination,
    // and incremental mode never deletes.
    probe.assert();
    create.assert();
    delete.assert_calls(0);
}

#[test]
fn rejected_credentials_exit_with_the_auth_code() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("export.csv");
    std::fs::write(&input, export_csv()).unwrap();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("/items/{COLLECTION}"));
        then.status(401).json_body(json!({ "errors": [] }));
    });

    let err = cmd_sync(sync_args(input, &server, true)).unwrap_err();
    assert_eq!(err.code, exit_codes::EXIT_SYNC_AUTH);
}

#[test]
fn failed_batches_exit_with_the_partial_code() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("export.csv");
    std::fs::write(&input, export_csv()).unwrap();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("/items/{COLLECTION}"));
        then.status(200).json_body(json!({ "data": [] }));
    });
    server.mock(|when, then| {
        when.method(POST).path(format!("/items/{COLLECTION}"));
        then.status(422).json_body(json!({ "errors": [{ "message": "bad payload" }] }));
    });

    let err = cmd_sync(sync_args(input, &server, true)).unwrap_err();
    assert_eq!(err.code, exit_codes::EXIT_SYNC_PARTIAL);
}

#[test]
fn empty_export_is_fatal_in_full_mode() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("export.csv");
    std::fs::write(&input, "id,technology\n").unwrap();

    let server = MockServer::start();
    let err = cmd_sync(sync_args(input, &server, true)).unwrap_err();
    assert_eq!(err.code, exit_codes::EXIT_SOURCE_EMPTY);
}

#[test]
fn check_writes_categorized_records() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("export.csv");
    let out = dir.path().join("categorized.csv");
    std::fs::write(&input, export_csv()).unwrap();

    cmd_check(CheckArgs {
        input,
        out: Some(out.clone()),
        quiet: true,
        json: true,
    })
    .unwrap();

    let written = std::fs::read_to_string(&out).unwrap();
    let mut reader = csv::Reader::from_reader(written.as_bytes());
    let headers = reader.headers().unwrap().clone();
    let category_idx = headers.iter().position(|h| h == "category").unwrap();

    let mut categories = Vec::new();
    for row in reader.records() {
        categories.push(row.unwrap().get(category_idx).unwrap().to_string());
    }
    categories.sort_unstable();
    // ok1 residential, mixup1 demoted → residential, broken1 corrected →
    // commercial, hydro1 passes through.
    assert_eq!(
        categories,
        vec!["commercial", "hydrogen", "residential", "residential"]
    );
}
