//! The per-worker dispatch loop.

use std::sync::Arc;

use relay_worker::{WorkerId, WorkerRecord, WorkerRegistry, WorkerState};

use crate::call::Advance;
use crate::pool::CallPool;
use crate::shutdown::ShutdownGate;
use crate::stats::{EngineStats, StatsSnapshot};
use crate::transport::Transport;
use crate::{Completion, CompletionQueue};

/// What one completion did to its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
	/// The call armed its next operation.
	Continued,
	/// The call finished and its slot was re-armed.
	Recycled,
	/// The call finished after shutdown began; the slot stays terminal.
	Dropped,
	/// The tag matched no slot.
	UnknownTag,
}

/// State shared by every dispatch worker of one engine.
pub(crate) struct Dispatcher<Q, T: Transport> {
	queue: Arc<Q>,
	transport: Arc<T>,
	pool: CallPool<T::Request, T::Response>,
	gate: ShutdownGate,
	stats: EngineStats,
}

impl<Q, T> Dispatcher<Q, T>
where
	Q: CompletionQueue,
	T: Transport,
{
	pub fn new(queue: Arc<Q>, transport: Arc<T>, pool: CallPool<T::Request, T::Response>) -> Self {
		Self {
			queue,
			transport,
			pool,
			gate: ShutdownGate::new(),
			stats: EngineStats::default(),
		}
	}

	pub fn pool(&self) -> &CallPool<T::Request, T::Response> {
		&self.pool
	}

	pub fn stats(&self) -> StatsSnapshot {
		self.stats.snapshot()
	}

	/// Issues every slot's initial registration.
	pub fn arm_all(&self) {
		for tag in self.pool.tags() {
			if let Some(slot) = self.pool.get(tag) {
				slot.lock().start(tag, &*self.transport);
			}
		}
	}

	/// Advances the slot behind one completion.
	pub fn dispatch(&self, completion: Completion) -> Outcome {
		let Completion { tag, ok } = completion;
		self.stats.record_event();

		let Some(slot) = self.pool.get(tag) else {
			tracing::warn!(%tag, ok, "rpc.dispatch.unknown_tag");
			self.stats.record_unknown_tag();
			return Outcome::UnknownTag;
		};

		let mut call = slot.lock();
		match call.advance(tag, ok, &*self.transport) {
			Advance::Continue => Outcome::Continued,
			Advance::Done => {
				if self.gate.recycle_if_open(|| call.reset(tag, &*self.transport)) {
					self.stats.record_recycled();
					Outcome::Recycled
				} else {
					tracing::trace!(%tag, kind = call.kind().as_str(), "rpc.dispatch.slot_dropped");
					self.stats.record_dropped();
					Outcome::Dropped
				}
			}
		}
	}

	/// Worker body: drains the queue until it reports closure.
	///
	/// Returns the number of completions this worker handled.
	pub fn run(&self, id: WorkerId, name: &str, registry: &WorkerRegistry) -> u64 {
		let record = |state, events| WorkerRecord {
			id,
			name: name.to_owned(),
			state,
			events,
		};
		registry.upsert(record(WorkerState::Running, 0));
		tracing::debug!(worker = name, "rpc.worker.start");

		let mut handled = 0u64;
		while let Some(completion) = self.queue.next() {
			self.dispatch(completion);
			handled += 1;
		}

		registry.upsert(record(WorkerState::Exited, handled));
		tracing::debug!(worker = name, handled, "rpc.worker.exit");
		handled
	}

	/// Stops the transport, then closes the gate and the queue together.
	///
	/// Returns `false` if shutdown had already begun.
	pub fn begin_shutdown(&self) -> bool {
		if self.gate.is_closed() {
			return false;
		}
		self.transport.shutdown();
		self.gate.close(|| self.queue.shutdown())
	}
}

#[cfg(test)]
mod tests;
