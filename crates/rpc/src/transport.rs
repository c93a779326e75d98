//! Interfaces the engine consumes from the surrounding transport.
//!
//! The engine never touches sockets or framing. It only arms operations
//! through [`Transport`] and learns about their completion from a
//! [`CompletionQueue`]. Every operation is tagged with the issuing call's
//! [`Tag`] and completes exactly once.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{Completion, Status, Tag};

/// Shared event source all dispatch workers block on.
pub trait CompletionQueue: Send + Sync + 'static {
	/// Blocks until an operation completes.
	///
	/// Returns `None` once the queue has been shut down and every queued
	/// completion has been handed out. No event arrives after that.
	fn next(&self) -> Option<Completion>;

	/// Marks the queue closed.
	///
	/// Completions already queued, and those of operations still in flight,
	/// are delivered before [`Self::next`] reports closure.
	fn shutdown(&self);
}

/// Per-call operations armed by the call state machines.
///
/// None of these may block: each one registers work and returns. The outcome
/// arrives later as a [`Completion`] carrying the same tag.
pub trait Transport: Send + Sync + 'static {
	/// Inbound message type.
	type Request: Send + 'static;

	/// Outbound message type.
	type Response: Send + 'static;

	/// Arms `tag` to receive the next inbound unary call.
	///
	/// On success the call's request is deposited into `buf` before the
	/// completion is queued.
	fn request_unary(&self, tag: Tag, buf: RequestBuf<Self::Request>);

	/// Arms `tag` to receive the next inbound streaming call.
	fn request_streaming(&self, tag: Tag);

	/// Reads the next request of the stream bound to `tag` into `buf`.
	///
	/// Completes with `ok == false` when the peer has sent its last request.
	fn read(&self, tag: Tag, buf: RequestBuf<Self::Request>);

	/// Writes one response on the stream bound to `tag`.
	fn write(&self, tag: Tag, response: Self::Response);

	/// Completes the unary call bound to `tag`.
	fn finish_unary(&self, tag: Tag, response: Self::Response, status: Status);

	/// Completes the unary call bound to `tag` without a response.
	fn finish_unary_with_error(&self, tag: Tag, status: Status);

	/// Completes the stream bound to `tag`.
	fn finish_stream(&self, tag: Tag, status: Status);

	/// Stops accepting new calls.
	///
	/// Armed receive registrations and pending reads complete with
	/// `ok == false`.
	fn shutdown(&self);
}

/// Receive buffer shared between one call and the transport.
///
/// The transport fills it before completing a receive or read; the call takes
/// the request out when it handles that completion. Resetting a call replaces
/// its buffer, so a clone held by the transport from an earlier call can never
/// leak a request into the next one.
pub struct RequestBuf<Req> {
	slot: Arc<Mutex<Option<Req>>>,
}

impl<Req> RequestBuf<Req> {
	/// Creates an empty buffer.
	pub fn new() -> Self {
		Self {
			slot: Arc::new(Mutex::new(None)),
		}
	}

	/// Deposits a request, replacing any request not yet taken.
	pub fn fill(&self, request: Req) {
		*self.slot.lock() = Some(request);
	}

	/// Takes the deposited request, leaving the buffer empty.
	pub fn take(&self) -> Option<Req> {
		self.slot.lock().take()
	}

	/// Returns `true` when a request is waiting to be taken.
	pub fn is_filled(&self) -> bool {
		self.slot.lock().is_some()
	}

	/// Returns `true` if both handles refer to the same buffer.
	pub fn same_buffer(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.slot, &other.slot)
	}
}

impl<Req> Clone for RequestBuf<Req> {
	fn clone(&self) -> Self {
		Self {
			slot: Arc::clone(&self.slot),
		}
	}
}

impl<Req> Default for RequestBuf<Req> {
	fn default() -> Self {
		Self::new()
	}
}

impl<Req> std::fmt::Debug for RequestBuf<Req> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RequestBuf").field("filled", &self.is_filled()).finish()
	}
}

/// Application processing function run for every request.
///
/// Runs synchronously on the dispatch worker that dequeued the triggering
/// event, so it must be quick and must not block. A non-OK status is the
/// RPC's outcome, not an engine fault.
pub trait Handler<Req, Resp>: Send + Sync {
	/// Produces the response and status for one request.
	fn call(&self, request: &Req) -> (Resp, Status);
}

impl<Req, Resp, F> Handler<Req, Resp> for F
where
	F: Fn(&Req) -> (Resp, Status) + Send + Sync,
{
	fn call(&self, request: &Req) -> (Resp, Status) {
		self(request)
	}
}

/// Handler shared by every slot in a pool.
pub type SharedHandler<Req, Resp> = Arc<dyn Handler<Req, Resp>>;
