use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::{MemTransport, StreamId};
use crate::Status;

/// Client handle for one bidirectional stream on a [`MemTransport`].
///
/// Dropping the handle half-closes the stream, so the server sees end of
/// stream on its next read.
pub struct MemStream<Req, Resp> {
	transport: Arc<MemTransport<Req, Resp>>,
	id: StreamId,
	responses: mpsc::UnboundedReceiver<Resp>,
	status: Option<oneshot::Receiver<Status>>,
}

impl<Req, Resp> MemStream<Req, Resp> {
	pub(super) fn new(
		transport: Arc<MemTransport<Req, Resp>>,
		id: StreamId,
		responses: mpsc::UnboundedReceiver<Resp>,
		status: oneshot::Receiver<Status>,
	) -> Self {
		Self {
			transport,
			id,
			responses,
			status: Some(status),
		}
	}

	/// Sends one request to the server.
	///
	/// # Errors
	///
	/// `FAILED_PRECONDITION` after [`Self::close_send`] or once the server has
	/// finished the stream.
	pub fn send(&self, request: Req) -> Result<(), Status> {
		self.transport.stream_send(self.id, request)
	}

	/// Signals that no more requests follow.
	pub fn close_send(&self) {
		self.transport.stream_close_send(self.id);
	}

	/// Waits for the next response; `None` once the server finished.
	pub async fn recv(&mut self) -> Option<Resp> {
		self.responses.recv().await
	}

	/// Blocking variant of [`Self::recv`] for non-async callers.
	pub fn blocking_recv(&mut self) -> Option<Resp> {
		self.responses.blocking_recv()
	}

	/// Half-closes the stream and waits for the server's final status.
	///
	/// Responses not yet received are discarded.
	pub async fn finish(mut self) -> Status {
		self.close_send();
		match self.status.take() {
			Some(status) => status.await.unwrap_or_else(|_| Status::cancelled("stream ended without a status")),
			None => Status::cancelled("status already taken"),
		}
	}
}

impl<Req, Resp> Drop for MemStream<Req, Resp> {
	fn drop(&mut self) {
		self.transport.stream_close_send(self.id);
	}
}
