use parking_lot::Mutex;

/// Guards the switch from serving calls to draining them.
///
/// Recycling a slot and closing the gate both run under the same lock, so a
/// reset either completes before the completion queue is shut down or does
/// not happen at all. A slot re-armed after that point would never see its
/// registration complete.
#[derive(Debug, Default)]
pub(crate) struct ShutdownGate {
	closed: Mutex<bool>,
}

impl ShutdownGate {
	pub fn new() -> Self {
		Self::default()
	}

	/// Runs `recycle` under the lock unless the gate is closed.
	///
	/// Returns `true` if `recycle` ran.
	pub fn recycle_if_open(&self, recycle: impl FnOnce()) -> bool {
		let closed = self.closed.lock();
		if *closed {
			return false;
		}
		recycle();
		true
	}

	/// Closes the gate and runs `on_close` under the lock.
	///
	/// Returns `false`, without running `on_close`, if already closed.
	pub fn close(&self, on_close: impl FnOnce()) -> bool {
		let mut closed = self.closed.lock();
		if *closed {
			return false;
		}
		*closed = true;
		on_close();
		true
	}

	pub fn is_closed(&self) -> bool {
		*self.closed.lock()
	}
}
