use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::WorkerId;

/// Lifecycle state of one worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
	/// Blocked on, or handling events from, its queue.
	Running,
	/// Left its loop after the queue reported closure.
	Exited,
}

/// Snapshot for one registered worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerRecord {
	pub id: WorkerId,
	pub name: String,
	pub state: WorkerState,
	pub events: u64,
}

/// In-memory worker registry for status snapshots.
///
/// Workers report at state changes only, never per event.
#[derive(Debug, Default, Clone)]
pub struct WorkerRegistry {
	inner: Arc<RwLock<HashMap<WorkerId, WorkerRecord>>>,
}

impl WorkerRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Upserts one record.
	pub fn upsert(&self, record: WorkerRecord) {
		self.inner.write().insert(record.id, record);
	}

	/// Returns the record for one worker.
	pub fn get(&self, id: WorkerId) -> Option<WorkerRecord> {
		self.inner.read().get(&id).cloned()
	}

	/// Returns snapshots sorted by worker index.
	pub fn snapshots(&self) -> Vec<WorkerRecord> {
		let mut records: Vec<_> = self.inner.read().values().cloned().collect();
		records.sort_by_key(|r| r.id);
		records
	}
}
