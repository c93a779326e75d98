use std::sync::atomic::{AtomicU64, Ordering};

/// Engine-wide event counters, bumped by every dispatch worker.
#[derive(Debug, Default)]
pub(crate) struct EngineStats {
	events: AtomicU64,
	calls_completed: AtomicU64,
	recycled: AtomicU64,
	dropped: AtomicU64,
	unknown_tags: AtomicU64,
}

impl EngineStats {
	pub fn record_event(&self) {
		self.events.fetch_add(1, Ordering::Relaxed);
	}

	pub fn record_recycled(&self) {
		self.calls_completed.fetch_add(1, Ordering::Relaxed);
		self.recycled.fetch_add(1, Ordering::Relaxed);
	}

	pub fn record_dropped(&self) {
		self.calls_completed.fetch_add(1, Ordering::Relaxed);
		self.dropped.fetch_add(1, Ordering::Relaxed);
	}

	pub fn record_unknown_tag(&self) {
		self.unknown_tags.fetch_add(1, Ordering::Relaxed);
	}

	pub fn snapshot(&self) -> StatsSnapshot {
		StatsSnapshot {
			events: self.events.load(Ordering::Relaxed),
			calls_completed: self.calls_completed.load(Ordering::Relaxed),
			recycled: self.recycled.load(Ordering::Relaxed),
			dropped: self.dropped.load(Ordering::Relaxed),
			unknown_tags: self.unknown_tags.load(Ordering::Relaxed),
		}
	}
}

/// Point-in-time copy of the engine counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
	/// Completions pulled off the queue.
	pub events: u64,
	/// Slots that reached their terminal state.
	pub calls_completed: u64,
	/// Terminal slots reset to serve another call.
	pub recycled: u64,
	/// Terminal slots left alone because shutdown had begun.
	pub dropped: u64,
	/// Completions whose tag matched no slot.
	pub unknown_tags: u64,
}
