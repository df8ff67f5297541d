//! Fixed-capacity snapshot store shared between the tick thread and readers.
//!
//! [`SnapshotStore`] keeps the most recent `capacity` snapshots in a ring of
//! `Mutex`-guarded `Arc<Snapshot>` slots. Publication is single-producer:
//! only the thread that currently owns the tick engine publishes. Any number
//! of reader threads may call [`latest`](SnapshotStore::latest) or
//! [`history`](SnapshotStore::history) concurrently. A slot lock is held
//! only long enough to clone an `Arc`, so readers never block the producer
//! for longer than a pointer copy and can never observe a half-written
//! snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use flotilla_core::{ConfigError, Snapshot};

/// Default number of snapshots kept for charting.
pub const DEFAULT_HISTORY: usize = 256;

/// A tagged slot: the `u64` is the sequence number of the snapshot stored
/// in it, so readers can detect that the producer lapped them.
type Slot = Option<(u64, Arc<Snapshot>)>;

/// Bounded, totally ordered store of published snapshots.
///
/// Every published snapshot is stamped with a sequence number equal to the
/// number of snapshots published before it. Sequence numbers never repeat,
/// across runs included. [`begin_run`](Self::begin_run) hides everything
/// published so far without disturbing the sequence.
pub struct SnapshotStore {
    slots: Vec<Mutex<Slot>>,
    /// Number of snapshots ever published; the next sequence number.
    write_pos: AtomicU64,
    /// Sequence number of the first snapshot of the current run.
    run_start: AtomicU64,
    capacity: usize,
}

// Compile-time assertion: SnapshotStore is shared across threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<SnapshotStore>();
};

impl SnapshotStore {
    /// Create an empty store retaining at most `capacity` snapshots.
    ///
    /// # Errors
    ///
    /// [`ConfigError::HistoryTooSmall`] if `capacity < 2`: one slot may be
    /// under replacement while the other stays readable.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity < 2 {
            return Err(ConfigError::HistoryTooSmall {
                configured: capacity,
            });
        }
        Ok(Self::with_slots(capacity))
    }

    fn with_slots(capacity: usize) -> Self {
        let slots = (0..capacity).map(|_| Mutex::new(None)).collect();
        Self {
            slots,
            write_pos: AtomicU64::new(0),
            run_start: AtomicU64::new(0),
            capacity,
        }
    }

    fn slot(&self, sequence: u64) -> MutexGuard<'_, Slot> {
        let idx = (sequence % self.capacity as u64) as usize;
        // A reader panicking while holding a slot cannot leave it torn:
        // the only mutation is a single assignment.
        self.slots[idx].lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish a snapshot. Producer side only.
    ///
    /// Overwrites `snapshot.sequence` with the store's next sequence number,
    /// evicts the oldest entry once full, and returns the shared handle.
    pub fn publish(&self, mut snapshot: Snapshot) -> Arc<Snapshot> {
        let seq = self.write_pos.load(Ordering::Relaxed);
        snapshot.sequence = seq;
        let arc = Arc::new(snapshot);
        {
            let mut slot = self.slot(seq);
            *slot = Some((seq, Arc::clone(&arc)));
        }
        // Release: the slot contents are visible before readers see the new position.
        self.write_pos.store(seq + 1, Ordering::Release);
        arc
    }

    /// Start a new run. Producer side only.
    ///
    /// Snapshots published before this call are no longer returned by
    /// [`latest`](Self::latest), [`get`](Self::get) or
    /// [`history`](Self::history).
    pub fn begin_run(&self) {
        let pos = self.write_pos.load(Ordering::Acquire);
        self.run_start.store(pos, Ordering::Release);
    }

    /// The most recently published snapshot of the current run, or `None`
    /// if the current run has not completed a step yet.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        loop {
            let pos = self.write_pos.load(Ordering::Acquire);
            let start = self.run_start.load(Ordering::Acquire);
            if pos <= start {
                return None;
            }
            let target = pos - 1;
            let slot = self.slot(target);
            match slot.as_ref() {
                Some((tag, arc)) if *tag == target => return Some(Arc::clone(arc)),
                // Lapped between the position read and the lock; a newer
                // snapshot exists, so look again.
                _ => continue,
            }
        }
    }

    /// The snapshot with the given sequence number, if it belongs to the
    /// current run and has not been evicted.
    pub fn get(&self, sequence: u64) -> Option<Arc<Snapshot>> {
        let pos = self.write_pos.load(Ordering::Acquire);
        let start = self.run_start.load(Ordering::Acquire);
        if sequence >= pos || sequence < start || pos - sequence > self.capacity as u64 {
            return None;
        }
        let slot = self.slot(sequence);
        match slot.as_ref() {
            Some((tag, arc)) if *tag == sequence => Some(Arc::clone(arc)),
            _ => None,
        }
    }

    /// Retained snapshots of the current run, oldest first.
    ///
    /// Entries evicted by a concurrent publish while collecting are skipped,
    /// so the result is always in publication order but may be shorter
    /// than [`len`](Self::len).
    pub fn history(&self) -> Vec<Arc<Snapshot>> {
        let pos = self.write_pos.load(Ordering::Acquire);
        let start = self
            .run_start
            .load(Ordering::Acquire)
            .max(pos.saturating_sub(self.capacity as u64));
        (start..pos).filter_map(|seq| self.get(seq)).collect()
    }

    /// Number of retained snapshots of the current run.
    pub fn len(&self) -> usize {
        let pos = self.write_pos.load(Ordering::Acquire);
        let start = self.run_start.load(Ordering::Acquire);
        (pos.saturating_sub(start) as usize).min(self.capacity)
    }

    /// Whether the current run has no snapshots.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of retained snapshots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total snapshots ever published, across all runs.
    pub fn published(&self) -> u64 {
        self.write_pos.load(Ordering::Acquire)
    }
}

impl Default for SnapshotStore {
    /// A store retaining [`DEFAULT_HISTORY`] snapshots.
    fn default() -> Self {
        Self::with_slots(DEFAULT_HISTORY)
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("capacity", &self.capacity)
            .field("published", &self.published())
            .field("len", &self.len())
            .finish()
    }
}
