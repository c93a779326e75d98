//! Engine-level errors.
//!
//! Everything that can go wrong while calls are flowing is carried as an RPC
//! [`Status`](crate::Status) or degraded and logged by the dispatch loop. The
//! variants here only arise while bringing an engine up.

use relay_worker::WorkerPanic;
use thiserror::Error;

/// Errors that abort engine startup.
#[derive(Debug, Error)]
pub enum Error {
	/// The engine configuration failed validation.
	#[error("invalid engine configuration: {0}")]
	InvalidConfig(String),

	/// The fixed-size call pool could not be allocated.
	#[error("failed to allocate call pool of {slots} slots")]
	PoolAllocation {
		/// Requested number of slots.
		slots: usize,
	},

	/// The call pool is larger than the tag space can address.
	#[error("call pool of {slots} slots exceeds the tag space")]
	TagSpaceExhausted {
		/// Requested number of slots.
		slots: usize,
	},

	/// A dispatch worker thread could not be spawned.
	#[error("failed to spawn worker thread {name}: {source}")]
	SpawnWorker {
		/// Name of the thread that failed to start.
		name: String,
		/// The underlying OS error.
		#[source]
		source: std::io::Error,
		/// Panics joined from the workers that had already started.
		worker_panics: Vec<WorkerPanic>,
	},
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
