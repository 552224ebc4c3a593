//! Prepared write items with content checksums.

use storsync_model::StorageRecord;

/// One record prepared for the destination store: canonical JSON payload
/// plus a blake3 checksum over it.
///
/// The checksum is embedded in the payload, so the destination stores it
/// alongside the record. On a later run a matching stored checksum marks
/// the record as unchanged and suppresses a spurious update.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncItem {
    pub id: String,
    pub payload: serde_json::Value,
    pub checksum: String,
}

/// Serialize records into sync items.
///
/// The checksum covers the compact JSON of the record itself (serde_json
/// object keys are ordered, so the encoding is canonical); the `checksum`
/// field is added to the payload afterwards.
pub fn prepare(records: &[StorageRecord]) -> Vec<SyncItem> {
    records.iter().map(prepare_one).collect()
}

fn prepare_one(record: &StorageRecord) -> SyncItem {
    let mut payload = serde_json::to_value(record).expect("record serializes to JSON");
    let checksum = hash_value(&payload);

    if let serde_json::Value::Object(map) = &mut payload {
        map.insert(
            "checksum".into(),
            serde_json::Value::String(checksum.clone()),
        );
    }

    SyncItem {
        id: record.id.clone(),
        payload,
        checksum,
    }
}

fn hash_value(value: &serde_json::Value) -> String {
    format!("blake3:{}", blake3::hash(value.to_string().as_bytes()).to_hex())
}
