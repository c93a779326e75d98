use std::sync::Arc;
use std::thread::JoinHandle;

use thiserror::Error;

use crate::{panic_message, spawn_named_thread};

/// Zero-based index of one worker thread within its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub usize);

impl std::fmt::Display for WorkerId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[derive(Debug)]
struct Worker {
	name: String,
	handle: JoinHandle<()>,
}

/// Fixed-size set of named OS threads running the same body.
///
/// The pool never grows or shrinks. Threads are expected to exit on their own
/// (for example once the queue they block on reports closure); [`Self::join`]
/// only waits for them.
#[derive(Debug, Default)]
pub struct WorkerPool {
	workers: Vec<Worker>,
}

/// Failure to bring up every thread of a [`WorkerPool`].
///
/// Threads spawned before the failure keep running and are handed back in
/// `partial` so the caller can stop them and join.
#[derive(Debug, Error)]
#[error("failed to spawn worker thread {name}: {source}")]
pub struct SpawnError {
	pub name: String,
	#[source]
	pub source: std::io::Error,
	pub partial: WorkerPool,
}

/// Panic captured from one worker thread at join time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPanic {
	pub name: String,
	pub message: String,
}

/// Outcome of joining a [`WorkerPool`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinReport {
	pub joined: usize,
	pub panicked: Vec<WorkerPanic>,
}

impl JoinReport {
	/// Returns true when every worker returned normally.
	pub fn is_clean(&self) -> bool {
		self.panicked.is_empty()
	}
}

impl WorkerPool {
	/// Spawns `count` threads named `<prefix>-<index>`, each running `body`.
	pub fn spawn<F>(count: usize, prefix: &str, body: F) -> Result<Self, SpawnError>
	where
		F: Fn(WorkerId) + Send + Sync + 'static,
	{
		let body = Arc::new(body);
		let mut workers = Vec::with_capacity(count);
		for index in 0..count {
			let id = WorkerId(index);
			let name = format!("{prefix}-{index}");
			let body = Arc::clone(&body);
			match spawn_named_thread(name.clone(), move || body(id)) {
				Ok(handle) => workers.push(Worker { name, handle }),
				Err(source) => {
					return Err(SpawnError {
						name,
						source,
						partial: Self { workers },
					});
				}
			}
		}
		tracing::debug!(count, prefix, "worker.pool.spawned");
		Ok(Self { workers })
	}

	/// Returns the number of threads in the pool.
	pub fn len(&self) -> usize {
		self.workers.len()
	}

	/// Returns `true` if the pool holds no threads.
	pub fn is_empty(&self) -> bool {
		self.workers.is_empty()
	}

	/// Returns thread names in spawn order.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.workers.iter().map(|w| w.name.as_str())
	}

	/// Blocks until every thread has exited.
	pub fn join(self) -> JoinReport {
		let mut report = JoinReport::default();
		for worker in self.workers {
			match worker.handle.join() {
				Ok(()) => report.joined += 1,
				Err(payload) => {
					let message = panic_message(payload.as_ref()).unwrap_or_else(|| "non-string panic payload".to_owned());
					tracing::error!(worker = %worker.name, panic = %message, "worker.panicked");
					report.panicked.push(WorkerPanic { name: worker.name, message });
				}
			}
		}
		report
	}
}
