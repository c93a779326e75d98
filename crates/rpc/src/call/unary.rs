use super::{Advance, Op};
use crate::Status;
use crate::transport::{Handler, RequestBuf, SharedHandler};

/// Lifecycle of a unary call slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryState {
	/// Armed for the next inbound call.
	Invoking,
	/// Finish issued, waiting for its acknowledgement.
	Finishing,
	Done,
}

/// Single-request, single-response call.
pub struct UnaryCall<Req, Resp> {
	state: UnaryState,
	buf: RequestBuf<Req>,
	handler: SharedHandler<Req, Resp>,
}

impl<Req, Resp> UnaryCall<Req, Resp> {
	pub fn new(handler: SharedHandler<Req, Resp>) -> Self {
		Self {
			state: UnaryState::Invoking,
			buf: RequestBuf::new(),
			handler,
		}
	}

	pub fn state(&self) -> UnaryState {
		self.state
	}

	pub(crate) fn buf(&self) -> &RequestBuf<Req> {
		&self.buf
	}

	pub(super) fn step(&mut self, ok: bool) -> (Advance, Option<Op<Resp>>) {
		let (next, op) = transition(self.state, ok, &self.buf, &*self.handler);
		self.state = next;
		let advance = if next == UnaryState::Done { Advance::Done } else { Advance::Continue };
		(advance, op)
	}

	pub(super) fn reset(&mut self) {
		self.state = UnaryState::Invoking;
		self.buf = RequestBuf::new();
	}
}

fn transition<Req, Resp>(
	state: UnaryState,
	ok: bool,
	buf: &RequestBuf<Req>,
	handler: &dyn Handler<Req, Resp>,
) -> (UnaryState, Option<Op<Resp>>) {
	match state {
		// Listener closed or engine shutting down.
		UnaryState::Invoking if !ok => (UnaryState::Done, None),
		UnaryState::Invoking => match buf.take() {
			Some(request) => {
				let (response, status) = handler.call(&request);
				(UnaryState::Finishing, Some(Op::FinishUnary(response, status)))
			}
			None => {
				tracing::warn!("rpc.unary.missing_request");
				(
					UnaryState::Finishing,
					Some(Op::FinishUnaryWithError(Status::internal("call delivered without a request"))),
				)
			}
		},
		UnaryState::Finishing => (UnaryState::Done, None),
		UnaryState::Done => {
			tracing::warn!("rpc.unary.event_after_done");
			(UnaryState::Done, None)
		}
	}
}
