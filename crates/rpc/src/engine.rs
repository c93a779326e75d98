//! Engine lifecycle: bring-up, observation and ordered teardown.

use std::sync::Arc;

use relay_worker::{SpawnError, WorkerPanic, WorkerPool, WorkerRecord, WorkerRegistry};

use crate::dispatch::Dispatcher;
use crate::pool::CallPool;
use crate::stats::StatsSnapshot;
use crate::transport::{Handler, SharedHandler, Transport};
use crate::{CompletionQueue, EngineConfig, Error, Result};

/// Summary of an engine teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
	/// Worker threads that returned normally.
	pub workers_joined: usize,
	/// Worker threads that panicked.
	pub worker_panics: Vec<WorkerPanic>,
	/// Counters at the moment every worker had exited.
	pub stats: StatsSnapshot,
	/// Slots left terminal and destroyed with the pool.
	pub terminal_slots: usize,
	/// Total slots destroyed with the pool.
	pub pool_size: usize,
}

/// A running dispatch engine.
///
/// Owns the call pool and the worker threads draining `Q`. Dropping the
/// engine shuts it down like [`Engine::shutdown`] does.
pub struct Engine<Q, T>
where
	Q: CompletionQueue,
	T: Transport,
{
	dispatcher: Arc<Dispatcher<Q, T>>,
	workers: Option<WorkerPool>,
	registry: WorkerRegistry,
}

impl<Q, T> Engine<Q, T>
where
	Q: CompletionQueue,
	T: Transport,
{
	/// Builds the call pool, arms every slot and starts the workers.
	///
	/// # Errors
	///
	/// - [`Error::InvalidConfig`] when `config` fails validation.
	/// - [`Error::PoolAllocation`] / [`Error::TagSpaceExhausted`] when the pool
	///   cannot be built.
	/// - [`Error::SpawnWorker`] when a worker thread fails to start. Workers
	///   already running are shut down and joined first.
	pub fn start<H>(config: &EngineConfig, queue: Arc<Q>, transport: Arc<T>, handler: H) -> Result<Self>
	where
		H: Handler<T::Request, T::Response> + 'static,
	{
		config.validate()?;
		let handler: SharedHandler<T::Request, T::Response> = Arc::new(handler);
		let pool = CallPool::new(config.unary_slots, config.streaming_slots, handler)?;
		let dispatcher = Arc::new(Dispatcher::new(queue, transport, pool));
		dispatcher.arm_all();

		let registry = WorkerRegistry::new();
		let body = {
			let dispatcher = Arc::clone(&dispatcher);
			let registry = registry.clone();
			let prefix = config.thread_name.clone();
			move |id| {
				dispatcher.run(id, &format!("{prefix}-{id}"), &registry);
			}
		};

		let workers = match WorkerPool::spawn(config.worker_threads, &config.thread_name, body) {
			Ok(workers) => workers,
			Err(err) => return Err(abort_start(&dispatcher, err)),
		};

		tracing::info!(
			workers = config.worker_threads,
			unary_slots = config.unary_slots,
			streaming_slots = config.streaming_slots,
			"rpc.engine.started"
		);
		Ok(Self {
			dispatcher,
			workers: Some(workers),
			registry,
		})
	}

	/// Current engine counters.
	pub fn stats(&self) -> StatsSnapshot {
		self.dispatcher.stats()
	}

	/// Status snapshot of every worker thread.
	pub fn workers(&self) -> Vec<WorkerRecord> {
		self.registry.snapshots()
	}

	/// Number of call slots in the pool.
	pub fn pool_size(&self) -> usize {
		self.dispatcher.pool().len()
	}

	/// Shuts the engine down and waits for every worker.
	///
	/// In order: the transport stops accepting calls; the shutdown flag is set
	/// and the completion queue closed under one lock; the workers drain the
	/// queue and are joined; the pool is destroyed when `self` goes away.
	pub fn shutdown(mut self) -> ShutdownReport {
		self.shutdown_inner()
	}

	fn shutdown_inner(&mut self) -> ShutdownReport {
		let pool_size = self.dispatcher.pool().len();
		let Some(workers) = self.workers.take() else {
			return ShutdownReport {
				workers_joined: 0,
				worker_panics: Vec::new(),
				stats: self.stats(),
				terminal_slots: self.dispatcher.pool().terminal_count(),
				pool_size,
			};
		};

		tracing::info!(workers = workers.len(), "rpc.engine.shutdown");
		self.dispatcher.begin_shutdown();
		let joined = workers.join();

		let report = ShutdownReport {
			workers_joined: joined.joined,
			worker_panics: joined.panicked,
			stats: self.stats(),
			terminal_slots: self.dispatcher.pool().terminal_count(),
			pool_size,
		};
		tracing::info!(
			joined = report.workers_joined,
			panicked = report.worker_panics.len(),
			events = report.stats.events,
			dropped = report.stats.dropped,
			"rpc.engine.stopped"
		);
		report
	}
}

impl<Q, T> Drop for Engine<Q, T>
where
	Q: CompletionQueue,
	T: Transport,
{
	fn drop(&mut self) {
		if self.workers.is_some() {
			self.shutdown_inner();
		}
	}
}

/// Tears down a half-started engine after a worker failed to spawn.
///
/// Workers already running see the queue close and exit; they are joined
/// before the error is returned.
fn abort_start<Q, T>(dispatcher: &Dispatcher<Q, T>, err: SpawnError) -> Error
where
	Q: CompletionQueue,
	T: Transport,
{
	dispatcher.begin_shutdown();
	let joined = err.partial.join();
	tracing::error!(
		worker = %err.name,
		error = %err.source,
		joined = joined.joined,
		panicked = joined.panicked.len(),
		"rpc.engine.spawn_failed"
	);
	Error::SpawnWorker {
		name: err.name,
		source: err.source,
		worker_panics: joined.panicked,
	}
}
