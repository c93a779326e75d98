//! Per-call state machines.
//!
//! Each call slot runs one of two fixed shapes, [`UnaryCall`] or
//! [`StreamingCall`]. A step consumes one completion and yields at most one
//! new [`Op`]; the caller issues that op against the transport after the state
//! has moved, so a slot never has more than one operation outstanding.

mod streaming;
mod unary;

pub use streaming::{StreamingCall, StreamingState};
pub use unary::{UnaryCall, UnaryState};

use crate::transport::{RequestBuf, SharedHandler, Transport};
use crate::{Status, Tag};

/// Result of feeding one completion to a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
	/// The call armed its next operation and is waiting for it.
	Continue,
	/// The call reached its terminal state. Nothing is outstanding for it.
	Done,
}

/// Call shape served by a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
	Unary,
	Streaming,
}

impl CallKind {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Unary => "unary",
			Self::Streaming => "streaming",
		}
	}
}

/// One transport operation a state transition asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op<Resp> {
	/// Arm the slot for the next unary call.
	RequestUnary,
	/// Arm the slot for the next streaming call.
	RequestStreaming,
	/// Read the next request of the bound stream.
	Read,
	/// Write one response on the bound stream.
	Write(Resp),
	/// Finish the bound unary call.
	FinishUnary(Resp, Status),
	/// Finish the bound unary call without a response.
	FinishUnaryWithError(Status),
	/// Finish the bound stream.
	FinishStream(Status),
}

impl<Resp> Op<Resp> {
	pub const fn name(&self) -> &'static str {
		match self {
			Self::RequestUnary => "request_unary",
			Self::RequestStreaming => "request_streaming",
			Self::Read => "read",
			Self::Write(_) => "write",
			Self::FinishUnary(..) => "finish_unary",
			Self::FinishUnaryWithError(_) => "finish_unary_with_error",
			Self::FinishStream(_) => "finish_stream",
		}
	}
}

/// Registers `op` with the transport under `tag`.
fn issue<T: Transport>(transport: &T, tag: Tag, buf: &RequestBuf<T::Request>, op: Op<T::Response>) {
	tracing::trace!(%tag, op = op.name(), "rpc.call.issue");
	match op {
		Op::RequestUnary => transport.request_unary(tag, buf.clone()),
		Op::RequestStreaming => transport.request_streaming(tag),
		Op::Read => transport.read(tag, buf.clone()),
		Op::Write(response) => transport.write(tag, response),
		Op::FinishUnary(response, status) => transport.finish_unary(tag, response, status),
		Op::FinishUnaryWithError(status) => transport.finish_unary_with_error(tag, status),
		Op::FinishStream(status) => transport.finish_stream(tag, status),
	}
}

/// State of one pooled call slot.
pub enum Call<Req, Resp> {
	Unary(UnaryCall<Req, Resp>),
	Streaming(StreamingCall<Req, Resp>),
}

impl<Req, Resp> Call<Req, Resp> {
	/// Creates a call of the given shape in its initial state.
	pub fn new(kind: CallKind, handler: SharedHandler<Req, Resp>) -> Self {
		match kind {
			CallKind::Unary => Self::Unary(UnaryCall::new(handler)),
			CallKind::Streaming => Self::Streaming(StreamingCall::new(handler)),
		}
	}

	pub fn kind(&self) -> CallKind {
		match self {
			Self::Unary(_) => CallKind::Unary,
			Self::Streaming(_) => CallKind::Streaming,
		}
	}

	/// Returns `true` once the call has reached its terminal state.
	pub fn is_terminal(&self) -> bool {
		match self {
			Self::Unary(call) => call.state() == UnaryState::Done,
			Self::Streaming(call) => call.state() == StreamingState::Done,
		}
	}

	/// Returns `true` while the call waits for its first event.
	pub fn is_awaiting_call(&self) -> bool {
		match self {
			Self::Unary(call) => call.state() == UnaryState::Invoking,
			Self::Streaming(call) => call.state() == StreamingState::AwaitingCall,
		}
	}

	fn buf(&self) -> &RequestBuf<Req> {
		match self {
			Self::Unary(call) => call.buf(),
			Self::Streaming(call) => call.buf(),
		}
	}

	fn initial_op(&self) -> Op<Resp> {
		match self {
			Self::Unary(_) => Op::RequestUnary,
			Self::Streaming(_) => Op::RequestStreaming,
		}
	}

	/// Issues the registration of the call's initial state.
	pub fn start<T>(&self, tag: Tag, transport: &T)
	where
		T: Transport<Request = Req, Response = Resp>,
	{
		issue(transport, tag, self.buf(), self.initial_op());
	}

	/// Feeds one completion to the call and issues the op it asks for.
	pub fn advance<T>(&mut self, tag: Tag, ok: bool, transport: &T) -> Advance
	where
		T: Transport<Request = Req, Response = Resp>,
	{
		let (advance, op) = match self {
			Self::Unary(call) => call.step(ok),
			Self::Streaming(call) => call.step(ok),
		};
		if let Some(op) = op {
			issue(transport, tag, self.buf(), op);
		}
		advance
	}

	/// Returns a terminal call to its initial state and re-arms it.
	pub fn reset<T>(&mut self, tag: Tag, transport: &T)
	where
		T: Transport<Request = Req, Response = Resp>,
	{
		match self {
			Self::Unary(call) => call.reset(),
			Self::Streaming(call) => call.reset(),
		}
		self.start(tag, transport);
	}
}

impl<Req, Resp> std::fmt::Debug for Call<Req, Resp> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Unary(call) => f.debug_tuple("Unary").field(&call.state()).finish(),
			Self::Streaming(call) => f.debug_tuple("Streaming").field(&call.state()).finish(),
		}
	}
}
