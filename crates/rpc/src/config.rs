//! Engine sizing configuration.

use serde::Deserialize;

use crate::{Error, Result};

/// Slots armed per call shape when nothing else is configured.
pub const DEFAULT_SLOTS_PER_SHAPE: usize = 100;

/// Sizing for one [`Engine`](crate::Engine).
///
/// Deserializable so embedding binaries can read it straight from their own
/// config files; missing fields fall back to [`EngineConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
	/// Number of dispatch worker threads.
	pub worker_threads: usize,
	/// Number of unary call slots.
	pub unary_slots: usize,
	/// Number of streaming call slots.
	pub streaming_slots: usize,
	/// Worker thread name prefix; threads are named `<prefix>-<index>`.
	pub thread_name: String,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			worker_threads: std::thread::available_parallelism().map_or(1, |n| n.get()),
			unary_slots: DEFAULT_SLOTS_PER_SHAPE,
			streaming_slots: DEFAULT_SLOTS_PER_SHAPE,
			thread_name: "relay-dispatch".to_owned(),
		}
	}
}

impl EngineConfig {
	/// Sets the number of dispatch worker threads.
	#[must_use]
	pub fn worker_threads(mut self, count: usize) -> Self {
		self.worker_threads = count;
		self
	}

	/// Sets the number of slots per call shape.
	#[must_use]
	pub fn slots(mut self, unary: usize, streaming: usize) -> Self {
		self.unary_slots = unary;
		self.streaming_slots = streaming;
		self
	}

	/// Sets the worker thread name prefix.
	#[must_use]
	pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
		self.thread_name = prefix.into();
		self
	}

	/// Checks the configuration can bring up a working engine.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidConfig`] when there are no workers, no slots,
	/// or no thread name prefix.
	pub fn validate(&self) -> Result<()> {
		if self.worker_threads == 0 {
			return Err(Error::InvalidConfig("worker_threads must be > 0".to_owned()));
		}
		if self.unary_slots == 0 && self.streaming_slots == 0 {
			return Err(Error::InvalidConfig("at least one unary or streaming slot is required".to_owned()));
		}
		if self.thread_name.is_empty() {
			return Err(Error::InvalidConfig("thread_name must not be empty".to_owned()));
		}
		Ok(())
	}
}
