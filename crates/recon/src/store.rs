//! Abstract destination store driven by the reconciliation engine.

use std::collections::HashMap;
use std::fmt;

use crate::item::SyncItem;

/// Error surfaced by a store operation after the client's own
/// transient-failure retries are exhausted.
#[derive(Debug)]
pub enum StoreError {
    /// Authentication or authorization was rejected. Fatal to the run.
    Auth(String),
    /// Anything else. The affected batch is abandoned and the run
    /// continues.
    Failed(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth(msg) => write!(f, "destination auth failed: {msg}"),
            Self::Failed(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Batched item operations on one logical destination collection.
///
/// Implementations own the retry/backoff policy for transient failures;
/// by the time an error reaches the engine it is final.
pub trait ItemStore {
    /// Which of the given identifiers exist, mapped to their stored
    /// checksums (`None` when the destination holds no checksum for a
    /// record).
    fn existing_items(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, Option<String>>, StoreError>;

    /// Every identifier resident in the destination, mapped to stored
    /// checksums. Paginated internally.
    fn known_items(&self) -> Result<HashMap<String, Option<String>>, StoreError>;

    /// Create a batch of new items. Returns the number written.
    fn create_batch(&self, items: &[SyncItem]) -> Result<usize, StoreError>;

    /// Update a batch of existing items, matched by embedded identifier.
    /// Returns the number written.
    fn update_batch(&self, items: &[SyncItem]) -> Result<usize, StoreError>;

    /// Delete a batch of identifiers. Returns the number deleted.
    fn delete_batch(&self, ids: &[String]) -> Result<usize, StoreError>;
}
