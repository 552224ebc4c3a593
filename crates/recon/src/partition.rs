//! Identifier diff between the incoming item set and the destination.

use std::collections::HashMap;

use crate::item::SyncItem;

/// Three-way split of the incoming items against the destination's known
/// identifiers. The sets are disjoint and together cover the input.
#[derive(Debug, Default)]
pub struct Partition {
    pub insert: Vec<SyncItem>,
    pub update: Vec<SyncItem>,
    pub unchanged: Vec<SyncItem>,
}

/// Partition items against the known id → checksum map.
///
/// Unknown identifiers are inserts; known identifiers with a matching
/// stored checksum are unchanged; the rest are updates. A missing stored
/// checksum counts as changed — updating is the safe direction. Input
/// order is preserved within each set, so repeated runs plan identical
/// batches.
pub fn partition(items: &[SyncItem], known: &HashMap<String, Option<String>>) -> Partition {
    let mut p = Partition::default();
    for item in items {
        match known.get(&item.id) {
            None => p.insert.push(item.clone()),
            Some(Some(stored)) if *stored == item.checksum => p.unchanged.push(item.clone()),
            Some(_) => p.update.push(item.clone()),
        }
    }
    p
}
