use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use relay_worker::{WorkerId, WorkerRegistry, WorkerState};

use super::*;
use crate::mem::EventQueue;
use crate::testing::{Recorded, RecordingTransport, counting_echo};
use crate::transport::SharedHandler;
use crate::{Status, Tag};

type TestDispatcher = Dispatcher<EventQueue, RecordingTransport>;

fn dispatcher(
	unary: usize,
	streaming: usize,
	handler: SharedHandler<String, String>,
) -> (TestDispatcher, Arc<EventQueue>, Arc<RecordingTransport>) {
	let queue = Arc::new(EventQueue::new());
	let transport = Arc::new(RecordingTransport::default());
	let pool = CallPool::new(unary, streaming, handler).unwrap();
	let dispatcher = Dispatcher::new(Arc::clone(&queue), Arc::clone(&transport), pool);
	dispatcher.arm_all();
	(dispatcher, queue, transport)
}

fn recording_handler() -> (SharedHandler<String, String>, Arc<Mutex<Vec<String>>>) {
	let seen = Arc::new(Mutex::new(Vec::new()));
	let log = Arc::clone(&seen);
	let handler: SharedHandler<String, String> = Arc::new(move |request: &String| {
		log.lock().push(request.clone());
		(format!("echo:{request}"), Status::ok())
	});
	(handler, seen)
}

#[test]
fn unary_slot_processes_once_then_rearms() {
	let (handler, seen) = recording_handler();
	let (dispatcher, _, transport) = dispatcher(2, 0, handler);
	let (slot0, slot1) = (Tag::new(0), Tag::new(1));
	assert_eq!(
		transport.take_ops(),
		vec![(slot0, Recorded::RequestUnary), (slot1, Recorded::RequestUnary)]
	);

	transport.deliver(slot0, "A");
	assert_eq!(dispatcher.dispatch(transport.ack(slot0, true)), Outcome::Continued);
	assert_eq!(
		transport.take_ops(),
		vec![(slot0, Recorded::FinishUnary("echo:A".to_owned(), Status::ok()))]
	);

	assert_eq!(dispatcher.dispatch(transport.ack(slot0, true)), Outcome::Recycled);
	assert_eq!(transport.take_ops(), vec![(slot0, Recorded::RequestUnary)]);
	assert_eq!(*seen.lock(), vec!["A".to_owned()]);
	assert!(dispatcher.pool().get(slot0).unwrap().lock().is_awaiting_call());
	assert!(transport.is_outstanding(slot0));
	assert!(transport.is_outstanding(slot1));

	let stats = dispatcher.stats();
	assert_eq!(stats.events, 2);
	assert_eq!(stats.calls_completed, 1);
	assert_eq!(stats.recycled, 1);
	assert_eq!(transport.double_registrations(), 0);
}

#[test]
fn streaming_slot_reads_writes_then_finishes() {
	let (handler, seen) = recording_handler();
	let (dispatcher, _, transport) = dispatcher(0, 1, handler);
	let slot = Tag::new(0);

	assert_eq!(dispatcher.dispatch(transport.ack(slot, true)), Outcome::Continued);
	transport.deliver(slot, "R1");
	assert_eq!(dispatcher.dispatch(transport.ack(slot, true)), Outcome::Continued);
	assert_eq!(dispatcher.dispatch(transport.ack(slot, true)), Outcome::Continued);
	assert_eq!(dispatcher.dispatch(transport.ack(slot, false)), Outcome::Continued);

	assert_eq!(
		transport.take_ops_for(slot),
		vec![
			Recorded::RequestStreaming,
			Recorded::Read,
			Recorded::Write("echo:R1".to_owned()),
			Recorded::Read,
			Recorded::FinishStream(Status::ok()),
		]
	);
	assert_eq!(*seen.lock(), vec!["R1".to_owned()]);

	assert_eq!(dispatcher.dispatch(transport.ack(slot, true)), Outcome::Recycled);
	assert_eq!(transport.take_ops_for(slot), vec![Recorded::RequestStreaming]);
}

#[test]
fn no_reset_after_shutdown_begins() {
	let (handler, calls) = counting_echo();
	let (dispatcher, queue, transport) = dispatcher(1, 1, handler);
	transport.take_ops();

	assert!(dispatcher.begin_shutdown());
	assert!(!dispatcher.begin_shutdown());
	assert_eq!(transport.shutdowns(), 1);
	assert!(queue.is_closed());

	for tag in [Tag::new(0), Tag::new(1)] {
		assert_eq!(dispatcher.dispatch(transport.ack(tag, false)), Outcome::Dropped);
		assert!(dispatcher.pool().get(tag).unwrap().lock().is_terminal());
	}
	assert!(transport.take_ops().is_empty());
	assert_eq!(dispatcher.pool().terminal_count(), 2);
	assert_eq!(dispatcher.stats().dropped, 2);
	assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[test]
fn in_flight_call_still_finishes_during_shutdown() {
	let (handler, _) = counting_echo();
	let (dispatcher, _, transport) = dispatcher(1, 0, handler);
	let slot = Tag::new(0);
	transport.take_ops();
	transport.deliver(slot, "A");

	dispatcher.begin_shutdown();
	assert_eq!(dispatcher.dispatch(transport.ack(slot, true)), Outcome::Continued);
	assert_eq!(
		transport.take_ops(),
		vec![(slot, Recorded::FinishUnary("echo:A".to_owned(), Status::ok()))]
	);
	assert_eq!(dispatcher.dispatch(transport.ack(slot, true)), Outcome::Dropped);
	assert!(transport.take_ops().is_empty());
}

#[test]
fn unknown_tag_is_ignored() {
	let (handler, _) = counting_echo();
	let (dispatcher, _, transport) = dispatcher(1, 0, handler);
	transport.take_ops();

	assert_eq!(dispatcher.dispatch(Completion::new(Tag::new(7), true)), Outcome::UnknownTag);
	assert!(transport.take_ops().is_empty());
	assert_eq!(dispatcher.stats().unknown_tags, 1);
}

#[test]
fn run_drains_queue_and_exits_on_closure() {
	let (handler, _) = counting_echo();
	let (dispatcher, queue, transport) = dispatcher(1, 0, handler);
	let registry = WorkerRegistry::new();

	queue.push(transport.ack(Tag::new(0), false));
	dispatcher.begin_shutdown();

	let handled = dispatcher.run(WorkerId(0), "dispatch-test-0", &registry);
	assert_eq!(handled, 1);
	assert_eq!(dispatcher.stats().dropped, 1);

	let record = registry.get(WorkerId(0)).unwrap();
	assert_eq!(record.state, WorkerState::Exited);
	assert_eq!(record.events, 1);
	assert_eq!(record.name, "dispatch-test-0");
}
