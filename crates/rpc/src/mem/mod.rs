//! In-process transport with a client side, for tests and benchmarks.
//!
//! [`MemTransport`] is both the engine's [`Transport`] and its
//! [`CompletionQueue`]. Clients talk to it directly through
//! [`MemTransport::call_unary`] and [`MemTransport::open_stream`]; no bytes are
//! framed or copied. It also polices the engine: a second registration for a
//! tag that still has an operation outstanding is counted as a violation.

mod queue;
mod stream;

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::{mpsc, oneshot};

pub use queue::EventQueue;
pub use stream::MemStream;

use crate::transport::{RequestBuf, Transport};
use crate::{Code, Completion, CompletionQueue, Status, Tag};

/// What a unary client gets back: the response, or the non-OK status.
pub type UnaryReply<Resp> = Result<Resp, Status>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct StreamId(u64);

struct WaitingUnary<Req, Resp> {
	request: Req,
	reply: oneshot::Sender<UnaryReply<Resp>>,
}

/// Client end of one stream as seen by the server side.
struct Peer<Req, Resp> {
	tag: Option<Tag>,
	inbound: VecDeque<Req>,
	half_closed: bool,
	pending_read: Option<RequestBuf<Req>>,
	responses: mpsc::UnboundedSender<Resp>,
	status: Option<oneshot::Sender<Status>>,
}

struct State<Req, Resp> {
	accepting: bool,
	armed_unary: VecDeque<(Tag, RequestBuf<Req>)>,
	armed_streaming: VecDeque<Tag>,
	waiting_unary: VecDeque<WaitingUnary<Req, Resp>>,
	waiting_streams: VecDeque<StreamId>,
	unary_calls: FxHashMap<Tag, oneshot::Sender<UnaryReply<Resp>>>,
	peers: FxHashMap<StreamId, Peer<Req, Resp>>,
	bound_streams: FxHashMap<Tag, StreamId>,
	outstanding: FxHashSet<Tag>,
	next_stream: u64,
	violations: u64,
}

impl<Req, Resp> State<Req, Resp> {
	fn register(&mut self, tag: Tag, op: &'static str) {
		if !self.outstanding.insert(tag) {
			self.violations += 1;
			tracing::error!(%tag, op, "rpc.mem.double_registration");
		}
	}

	fn bound_peer(&mut self, tag: Tag) -> Option<&mut Peer<Req, Resp>> {
		let id = self.bound_streams.get(&tag)?;
		self.peers.get_mut(id)
	}

	fn bind_stream(&mut self, tag: Tag, id: StreamId) {
		if let Some(peer) = self.peers.get_mut(&id) {
			peer.tag = Some(tag);
			self.bound_streams.insert(tag, id);
		}
	}
}

/// In-memory transport and completion queue.
pub struct MemTransport<Req, Resp> {
	state: Mutex<State<Req, Resp>>,
	queue: EventQueue,
}

impl<Req, Resp> Default for MemTransport<Req, Resp> {
	fn default() -> Self {
		Self::new()
	}
}

impl<Req, Resp> MemTransport<Req, Resp> {
	pub fn new() -> Self {
		Self {
			state: Mutex::new(State {
				accepting: true,
				armed_unary: VecDeque::new(),
				armed_streaming: VecDeque::new(),
				waiting_unary: VecDeque::new(),
				waiting_streams: VecDeque::new(),
				unary_calls: FxHashMap::default(),
				peers: FxHashMap::default(),
				bound_streams: FxHashMap::default(),
				outstanding: FxHashSet::default(),
				next_stream: 0,
				violations: 0,
			}),
			queue: EventQueue::new(),
		}
	}

	fn complete(&self, tag: Tag, ok: bool) {
		self.queue.push(Completion::new(tag, ok));
	}

	/// Starts a unary call.
	///
	/// The call waits in line until a slot is armed for it. After
	/// [`Transport::shutdown`] calls are rejected with `UNAVAILABLE`.
	pub fn call_unary(&self, request: Req) -> oneshot::Receiver<UnaryReply<Resp>> {
		let (reply, rx) = oneshot::channel();
		let mut state = self.state.lock();
		if !state.accepting {
			let _ = reply.send(Err(Status::unavailable("server is shutting down")));
			return rx;
		}
		match state.armed_unary.pop_front() {
			Some((tag, buf)) => {
				buf.fill(request);
				state.unary_calls.insert(tag, reply);
				self.complete(tag, true);
			}
			None => state.waiting_unary.push_back(WaitingUnary { request, reply }),
		}
		rx
	}

	/// Opens a bidirectional stream.
	pub fn open_stream(self: &Arc<Self>) -> MemStream<Req, Resp> {
		let (responses, responses_rx) = mpsc::unbounded_channel();
		let (status, status_rx) = oneshot::channel();
		let mut state = self.state.lock();
		let id = StreamId(state.next_stream);
		state.next_stream += 1;

		if !state.accepting {
			let _ = status.send(Status::unavailable("server is shutting down"));
			return MemStream::new(Arc::clone(self), id, responses_rx, status_rx);
		}

		state.peers.insert(
			id,
			Peer {
				tag: None,
				inbound: VecDeque::new(),
				half_closed: false,
				pending_read: None,
				responses,
				status: Some(status),
			},
		);
		match state.armed_streaming.pop_front() {
			Some(tag) => {
				state.bind_stream(tag, id);
				self.complete(tag, true);
			}
			None => state.waiting_streams.push_back(id),
		}
		MemStream::new(Arc::clone(self), id, responses_rx, status_rx)
	}

	fn stream_send(&self, id: StreamId, request: Req) -> Result<(), Status> {
		let mut state = self.state.lock();
		let Some(peer) = state.peers.get_mut(&id) else {
			return Err(Status::new(Code::FailedPrecondition, "stream is finished"));
		};
		if peer.half_closed {
			return Err(Status::new(Code::FailedPrecondition, "send after close_send"));
		}
		match (peer.pending_read.take(), peer.tag) {
			(Some(buf), Some(tag)) => {
				buf.fill(request);
				self.complete(tag, true);
			}
			_ => peer.inbound.push_back(request),
		}
		Ok(())
	}

	fn stream_close_send(&self, id: StreamId) {
		let mut state = self.state.lock();
		let Some(peer) = state.peers.get_mut(&id) else {
			return;
		};
		if peer.half_closed {
			return;
		}
		peer.half_closed = true;
		if let (Some(_), Some(tag)) = (peer.pending_read.take(), peer.tag) {
			self.complete(tag, false);
		}
	}

	/// Number of double registrations seen so far.
	pub fn violations(&self) -> u64 {
		self.state.lock().violations
	}

	/// Number of tags with an operation outstanding.
	pub fn outstanding(&self) -> usize {
		self.state.lock().outstanding.len()
	}

	/// Number of slots armed for unary and streaming calls.
	pub fn armed(&self) -> (usize, usize) {
		let state = self.state.lock();
		(state.armed_unary.len(), state.armed_streaming.len())
	}

	pub fn is_accepting(&self) -> bool {
		self.state.lock().accepting
	}

	/// The completion queue the engine drains.
	pub fn queue(&self) -> &EventQueue {
		&self.queue
	}
}

impl<Req, Resp> CompletionQueue for MemTransport<Req, Resp>
where
	Req: Send + 'static,
	Resp: Send + 'static,
{
	fn next(&self) -> Option<Completion> {
		let completion = self.queue.next()?;
		self.state.lock().outstanding.remove(&completion.tag);
		Some(completion)
	}

	fn shutdown(&self) {
		self.queue.shutdown();
	}
}

impl<Req, Resp> Transport for MemTransport<Req, Resp>
where
	Req: Send + 'static,
	Resp: Send + 'static,
{
	type Request = Req;
	type Response = Resp;

	fn request_unary(&self, tag: Tag, buf: RequestBuf<Req>) {
		let mut state = self.state.lock();
		state.register(tag, "request_unary");
		if !state.accepting {
			self.complete(tag, false);
			return;
		}
		while let Some(waiting) = state.waiting_unary.pop_front() {
			// Skip callers that hung up while queued.
			if waiting.reply.is_closed() {
				continue;
			}
			buf.fill(waiting.request);
			state.unary_calls.insert(tag, waiting.reply);
			self.complete(tag, true);
			return;
		}
		state.armed_unary.push_back((tag, buf));
	}

	fn request_streaming(&self, tag: Tag) {
		let mut state = self.state.lock();
		state.register(tag, "request_streaming");
		if !state.accepting {
			self.complete(tag, false);
			return;
		}
		while let Some(id) = state.waiting_streams.pop_front() {
			if state.peers.contains_key(&id) {
				state.bind_stream(tag, id);
				self.complete(tag, true);
				return;
			}
		}
		state.armed_streaming.push_back(tag);
	}

	fn read(&self, tag: Tag, buf: RequestBuf<Req>) {
		let mut state = self.state.lock();
		state.register(tag, "read");
		let accepting = state.accepting;
		let Some(peer) = state.bound_peer(tag) else {
			tracing::warn!(%tag, "rpc.mem.read_unbound");
			self.complete(tag, false);
			return;
		};
		if let Some(request) = peer.inbound.pop_front() {
			buf.fill(request);
			self.complete(tag, true);
		} else if peer.half_closed || !accepting {
			self.complete(tag, false);
		} else {
			peer.pending_read = Some(buf);
		}
	}

	fn write(&self, tag: Tag, response: Resp) {
		let mut state = self.state.lock();
		state.register(tag, "write");
		let ok = state.bound_peer(tag).is_some_and(|peer| peer.responses.send(response).is_ok());
		self.complete(tag, ok);
	}

	fn finish_unary(&self, tag: Tag, response: Resp, status: Status) {
		let reply = if status.is_ok() { Ok(response) } else { Err(status) };
		let mut state = self.state.lock();
		state.register(tag, "finish_unary");
		let ok = state.unary_calls.remove(&tag).is_some_and(|tx| tx.send(reply).is_ok());
		self.complete(tag, ok);
	}

	fn finish_unary_with_error(&self, tag: Tag, status: Status) {
		let mut state = self.state.lock();
		state.register(tag, "finish_unary_with_error");
		let ok = state.unary_calls.remove(&tag).is_some_and(|tx| tx.send(Err(status)).is_ok());
		self.complete(tag, ok);
	}

	fn finish_stream(&self, tag: Tag, status: Status) {
		let mut state = self.state.lock();
		state.register(tag, "finish_stream");
		let peer = state.bound_streams.remove(&tag).and_then(|id| state.peers.remove(&id));
		let ok = match peer {
			Some(mut peer) => {
				if let Some(tx) = peer.status.take() {
					let _ = tx.send(status);
				}
				true
			}
			None => false,
		};
		self.complete(tag, ok);
	}

	fn shutdown(&self) {
		let mut guard = self.state.lock();
		let state = &mut *guard;
		if !state.accepting {
			return;
		}
		state.accepting = false;

		let armed: Vec<Tag> = state
			.armed_unary
			.drain(..)
			.map(|(tag, _)| tag)
			.chain(state.armed_streaming.drain(..))
			.collect();
		for &tag in &armed {
			self.complete(tag, false);
		}

		for waiting in state.waiting_unary.drain(..) {
			let _ = waiting.reply.send(Err(Status::unavailable("server is shutting down")));
		}
		let unbound: Vec<StreamId> = state.waiting_streams.drain(..).collect();
		for id in unbound {
			if let Some(mut peer) = state.peers.remove(&id)
				&& let Some(tx) = peer.status.take()
			{
				let _ = tx.send(Status::unavailable("server is shutting down"));
			}
		}

		let mut cancelled_reads = 0usize;
		for peer in state.peers.values_mut() {
			if let (Some(_), Some(tag)) = (peer.pending_read.take(), peer.tag) {
				self.complete(tag, false);
				cancelled_reads += 1;
			}
		}
		tracing::info!(armed = armed.len(), cancelled_reads, "rpc.mem.shutdown");
	}
}

#[cfg(test)]
mod tests;
