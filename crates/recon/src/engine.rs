//! Diff-then-dispatch sync engine.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Mutex;

use serde::Serialize;
use storsync_model::StorageRecord;

use crate::item::{prepare, SyncItem};
use crate::partition::partition;
use crate::store::{ItemStore, StoreError};

/// Operating mode of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Per-batch existence checks, sequential submission, no deletion.
    Incremental,
    /// One upfront scan of the destination, concurrent submission, and
    /// stale-identifier deletion at the end.
    Full,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incremental => write!(f, "incremental"),
            Self::Full => write!(f, "full"),
        }
    }
}

/// Tuning knobs for a run.
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Records per destination API call.
    pub batch_size: usize,
    /// Worker threads for full-mode dispatch. Incremental runs always
    /// dispatch with a single worker.
    pub workers: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            workers: 4,
        }
    }
}

/// Aggregated outcome of a run. Batch failures are contained: the
/// counters sum only what the destination acknowledged.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SyncReport {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub failed_batches: usize,
    pub errors: Vec<String>,
}

/// Fatal run-level failure. Everything else is contained in the report.
#[derive(Debug)]
pub enum SyncError {
    /// The destination rejected our credentials.
    Auth(String),
    /// Full mode could not take its upfront snapshot of the destination.
    /// Without it the diff — and the deletion step in particular — would
    /// run against a partial view.
    Snapshot(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth(msg) => write!(f, "destination auth failed: {msg}"),
            Self::Snapshot(msg) => write!(f, "destination snapshot failed: {msg}"),
        }
    }
}

impl std::error::Error for SyncError {}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum OpKind {
    Insert,
    Update,
}

impl OpKind {
    fn label(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
        }
    }
}

struct BatchOp<'a> {
    kind: OpKind,
    items: &'a [SyncItem],
}

/// Reconcile records against the destination store.
///
/// Both modes run the same diff-then-dispatch algorithm; they differ only
/// in where the known-identifier set comes from and in the dispatch
/// concurrency. Batches never address overlapping identifier sets — the
/// partition is computed before any worker starts — so no locking beyond
/// the work queue is needed.
pub fn sync<S: ItemStore + Sync>(
    store: &S,
    records: &[StorageRecord],
    mode: SyncMode,
    opts: &SyncOptions,
) -> Result<SyncReport, SyncError> {
    let items = prepare(records);
    let batch_size = opts.batch_size.max(1);

    match mode {
        SyncMode::Incremental => sync_incremental(store, &items, batch_size),
        SyncMode::Full => sync_full(store, &items, batch_size, opts.workers.max(1)),
    }
}

fn sync_incremental<S: ItemStore + Sync>(
    store: &S,
    items: &[SyncItem],
    batch_size: usize,
) -> Result<SyncReport, SyncError> {
    let mut report = SyncReport::default();

    for batch in items.chunks(batch_size) {
        let ids: Vec<String> = batch.iter().map(|i| i.id.clone()).collect();
        let known = match store.existing_items(&ids) {
            Ok(known) => known,
            Err(StoreError::Auth(msg)) => return Err(SyncError::Auth(msg)),
            Err(StoreError::Failed(msg)) => {
                report.failed_batches += 1;
                report.errors.push(format!("existence query failed: {msg}"));
                continue;
            }
        };

        let p = partition(batch, &known);
        report.unchanged += p.unchanged.len();

        let mut ops = Vec::new();
        if !p.insert.is_empty() {
            ops.push(BatchOp {
                kind: OpKind::Insert,
                items: &p.insert,
            });
        }
        if !p.update.is_empty() {
            ops.push(BatchOp {
                kind: OpKind::Update,
                items: &p.update,
            });
        }
        dispatch(store, ops, 1, &mut report)?;
    }

    Ok(report)
}

fn sync_full<S: ItemStore + Sync>(
    store: &S,
    items: &[SyncItem],
    batch_size: usize,
    workers: usize,
) -> Result<SyncReport, SyncError> {
    let known = match store.known_items() {
        Ok(known) => known,
        Err(StoreError::Auth(msg)) => return Err(SyncError::Auth(msg)),
        Err(StoreError::Failed(msg)) => return Err(SyncError::Snapshot(msg)),
    };

    let mut report = SyncReport::default();
    let p = partition(items, &known);
    report.unchanged = p.unchanged.len();

    let mut ops = Vec::new();
    for chunk in p.insert.chunks(batch_size) {
        ops.push(BatchOp {
            kind: OpKind::Insert,
            items: chunk,
        });
    }
    for chunk in p.update.chunks(batch_size) {
        ops.push(BatchOp {
            kind: OpKind::Update,
            items: chunk,
        });
    }
    dispatch(store, ops, workers, &mut report)?;

    // Stale identifiers: resident in the destination before the run but
    // gone from the source registry. Newly inserted ids are a subset of
    // the incoming set, so subtracting from the pre-run snapshot is exact.
    let incoming: HashSet<&str> = items.iter().map(|i| i.id.as_str()).collect();
    let mut stale: Vec<String> = known
        .keys()
        .filter(|id| !incoming.contains(id.as_str()))
        .cloned()
        .collect();
    stale.sort_unstable();

    for chunk in stale.chunks(batch_size) {
        match store.delete_batch(chunk) {
            Ok(n) => report.deleted += n,
            Err(StoreError::Auth(msg)) => return Err(SyncError::Auth(msg)),
            Err(StoreError::Failed(msg)) => {
                report.failed_batches += 1;
                report.errors.push(format!("delete batch failed: {msg}"));
            }
        }
    }

    Ok(report)
}

#[derive(Default)]
struct Accum {
    inserted: usize,
    updated: usize,
    failed: usize,
    errors: Vec<String>,
}

/// Submit insert/update batches through a pool of `workers` threads.
///
/// Each worker owns its batch exclusively; the only shared state is the
/// work queue and the accumulator. An auth rejection drains the pool and
/// aborts the run; any other batch failure is recorded while its siblings
/// continue.
fn dispatch<S: ItemStore + Sync>(
    store: &S,
    ops: Vec<BatchOp<'_>>,
    workers: usize,
    report: &mut SyncReport,
) -> Result<(), SyncError> {
    if ops.is_empty() {
        return Ok(());
    }

    let worker_count = workers.max(1).min(ops.len());
    let queue = Mutex::new(VecDeque::from(ops));
    let accum = Mutex::new(Accum::default());
    let fatal: Mutex<Option<String>> = Mutex::new(None);

    std::thread::scope(|scope| {
        for _ in 0..worker_count {
            scope.spawn(|| loop {
                if fatal.lock().unwrap().is_some() {
                    break;
                }
                let op = match queue.lock().unwrap().pop_front() {
                    Some(op) => op,
                    None => break,
                };

                let outcome = match op.kind {
                    OpKind::Insert => store.create_batch(op.items),
                    OpKind::Update => store.update_batch(op.items),
                };

                match outcome {
                    Ok(n) => {
                        let mut acc = accum.lock().unwrap();
                        match op.kind {
                            OpKind::Insert => acc.inserted += n,
                            OpKind::Update => acc.updated += n,
                        }
                    }
                    Err(StoreError::Auth(msg)) => {
                        *fatal.lock().unwrap() = Some(msg);
                        break;
                    }
                    Err(StoreError::Failed(msg)) => {
                        let mut acc = accum.lock().unwrap();
                        acc.failed += 1;
                        acc.errors
                            .push(format!("{} batch failed: {msg}", op.kind.label()));
                    }
                }
            });
        }
    });

    let acc = accum.into_inner().unwrap();
    report.inserted += acc.inserted;
    report.updated += acc.updated;
    report.failed_batches += acc.failed;
    report.errors.extend(acc.errors);

    match fatal.into_inner().unwrap() {
        Some(msg) => Err(SyncError::Auth(msg)),
        None => Ok(()),
    }
}
