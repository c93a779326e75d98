use super::{Advance, Op};
use crate::Status;
use crate::transport::{Handler, RequestBuf, SharedHandler};

/// Lifecycle of a bidirectional streaming call slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamingState {
	/// Armed for the next inbound stream.
	AwaitingCall,
	/// Read issued, waiting for the next request or end of stream.
	ReadPending,
	/// Response write issued.
	WritePending,
	/// Finish issued, waiting for its acknowledgement.
	FinishPending,
	Done,
}

/// Read, process, write loop that lasts until the peer stops sending.
///
/// There is no separate cancellation branch: a cancelled or broken stream
/// shows up as a failed read or write and ends in an OK finish.
pub struct StreamingCall<Req, Resp> {
	state: StreamingState,
	buf: RequestBuf<Req>,
	handler: SharedHandler<Req, Resp>,
}

impl<Req, Resp> StreamingCall<Req, Resp> {
	pub fn new(handler: SharedHandler<Req, Resp>) -> Self {
		Self {
			state: StreamingState::AwaitingCall,
			buf: RequestBuf::new(),
			handler,
		}
	}

	pub fn state(&self) -> StreamingState {
		self.state
	}

	pub(crate) fn buf(&self) -> &RequestBuf<Req> {
		&self.buf
	}

	pub(super) fn step(&mut self, ok: bool) -> (Advance, Option<Op<Resp>>) {
		let (next, op) = transition(self.state, ok, &self.buf, &*self.handler);
		self.state = next;
		let advance = if next == StreamingState::Done { Advance::Done } else { Advance::Continue };
		(advance, op)
	}

	pub(super) fn reset(&mut self) {
		self.state = StreamingState::AwaitingCall;
		self.buf = RequestBuf::new();
	}
}

fn transition<Req, Resp>(
	state: StreamingState,
	ok: bool,
	buf: &RequestBuf<Req>,
	handler: &dyn Handler<Req, Resp>,
) -> (StreamingState, Option<Op<Resp>>) {
	use StreamingState::*;

	match (state, ok) {
		(AwaitingCall, false) => (Done, None),
		(AwaitingCall, true) => (ReadPending, Some(Op::Read)),
		(ReadPending, true) => match buf.take() {
			Some(request) => {
				// The stream always ends OK; per-message status only gets logged.
				let (response, status) = handler.call(&request);
				if !status.is_ok() {
					tracing::debug!(%status, "rpc.streaming.message_status");
				}
				(WritePending, Some(Op::Write(response)))
			}
			None => {
				tracing::warn!("rpc.streaming.missing_request");
				(FinishPending, Some(Op::FinishStream(Status::internal("read completed without a request"))))
			}
		},
		// Peer half-closed, or the read was cancelled.
		(ReadPending, false) => (FinishPending, Some(Op::FinishStream(Status::ok()))),
		(WritePending, true) => (ReadPending, Some(Op::Read)),
		(WritePending, false) => (FinishPending, Some(Op::FinishStream(Status::ok()))),
		(FinishPending, _) => (Done, None),
		(Done, _) => {
			tracing::warn!("rpc.streaming.event_after_done");
			(Done, None)
		}
	}
}
