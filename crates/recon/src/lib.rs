//! `storsync-recon` — reconciliation engine between the categorized record
//! set and the destination store.
//!
//! One diff-then-dispatch algorithm serves both operating modes: the
//! known-identifier set is resolved (per batch in incremental mode, once
//! upfront in full mode), the input is partitioned into insert / update /
//! unchanged against stored content checksums, and the resulting batches
//! go through a worker pool whose degree is 1 for incremental parity and
//! N for full runs. Full runs end by deleting identifiers that vanished
//! from the source registry.

pub mod engine;
pub mod item;
pub mod partition;
pub mod store;

pub use engine::{sync, SyncError, SyncMode, SyncOptions, SyncReport};
pub use item::{prepare, SyncItem};
pub use partition::{partition, Partition};
pub use store::{ItemStore, StoreError};
