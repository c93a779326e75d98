//! Deterministic transport double for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::transport::{RequestBuf, SharedHandler, Transport};
use crate::{Completion, Status, Tag};

/// One operation as seen by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Recorded {
	RequestUnary,
	RequestStreaming,
	Read,
	Write(String),
	FinishUnary(String, Status),
	FinishUnaryWithError(Status),
	FinishStream(Status),
}

#[derive(Default)]
struct RecordingState {
	ops: Vec<(Tag, Recorded)>,
	bufs: FxHashMap<Tag, RequestBuf<String>>,
	outstanding: FxHashSet<Tag>,
	double_registrations: usize,
	shutdowns: usize,
}

/// Transport that records every registration and never completes anything
/// on its own. Tests feed completions by hand through [`Self::ack`].
#[derive(Default)]
pub(crate) struct RecordingTransport {
	state: Mutex<RecordingState>,
}

impl RecordingTransport {
	fn register(&self, tag: Tag, op: Recorded, buf: Option<RequestBuf<String>>) {
		let mut state = self.state.lock();
		if !state.outstanding.insert(tag) {
			state.double_registrations += 1;
		}
		if let Some(buf) = buf {
			state.bufs.insert(tag, buf);
		}
		state.ops.push((tag, op));
	}

	/// Drains the recorded operations.
	pub fn take_ops(&self) -> Vec<(Tag, Recorded)> {
		std::mem::take(&mut self.state.lock().ops)
	}

	/// Drains the recorded operations of one tag, dropping the rest.
	pub fn take_ops_for(&self, tag: Tag) -> Vec<Recorded> {
		self.take_ops().into_iter().filter(|(t, _)| *t == tag).map(|(_, op)| op).collect()
	}

	/// Deposits a request into the buffer last handed over for `tag`.
	pub fn deliver(&self, tag: Tag, request: &str) {
		let state = self.state.lock();
		let buf = state.bufs.get(&tag).expect("no buffer registered for tag");
		buf.fill(request.to_owned());
	}

	/// Completes the operation outstanding for `tag`.
	pub fn ack(&self, tag: Tag, ok: bool) -> Completion {
		let removed = self.state.lock().outstanding.remove(&tag);
		assert!(removed, "ack for {tag} with nothing outstanding");
		Completion::new(tag, ok)
	}

	pub fn is_outstanding(&self, tag: Tag) -> bool {
		self.state.lock().outstanding.contains(&tag)
	}

	pub fn double_registrations(&self) -> usize {
		self.state.lock().double_registrations
	}

	pub fn shutdowns(&self) -> usize {
		self.state.lock().shutdowns
	}
}

impl Transport for RecordingTransport {
	type Request = String;
	type Response = String;

	fn request_unary(&self, tag: Tag, buf: RequestBuf<String>) {
		self.register(tag, Recorded::RequestUnary, Some(buf));
	}

	fn request_streaming(&self, tag: Tag) {
		self.register(tag, Recorded::RequestStreaming, None);
	}

	fn read(&self, tag: Tag, buf: RequestBuf<String>) {
		self.register(tag, Recorded::Read, Some(buf));
	}

	fn write(&self, tag: Tag, response: String) {
		self.register(tag, Recorded::Write(response), None);
	}

	fn finish_unary(&self, tag: Tag, response: String, status: Status) {
		self.register(tag, Recorded::FinishUnary(response, status), None);
	}

	fn finish_unary_with_error(&self, tag: Tag, status: Status) {
		self.register(tag, Recorded::FinishUnaryWithError(status), None);
	}

	fn finish_stream(&self, tag: Tag, status: Status) {
		self.register(tag, Recorded::FinishStream(status), None);
	}

	fn shutdown(&self) {
		self.state.lock().shutdowns += 1;
	}
}

/// Handler answering `echo:<request>` and counting invocations.
pub(crate) fn counting_echo() -> (SharedHandler<String, String>, Arc<AtomicUsize>) {
	let calls = Arc::new(AtomicUsize::new(0));
	let seen = Arc::clone(&calls);
	let handler: SharedHandler<String, String> = Arc::new(move |request: &String| {
		seen.fetch_add(1, Ordering::SeqCst);
		(format!("echo:{request}"), Status::ok())
	});
	(handler, calls)
}
