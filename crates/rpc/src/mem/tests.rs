use std::sync::Arc;

use super::*;

type Mem = MemTransport<String, String>;

const T0: Tag = Tag::new(0);
const T1: Tag = Tag::new(1);

fn next_now(mem: &Mem) -> Option<Completion> {
	let completion = mem.queue().try_next()?;
	mem.state.lock().outstanding.remove(&completion.tag);
	Some(completion)
}

#[tokio::test]
async fn unary_call_waits_for_an_armed_slot() {
	let mem = Mem::new();
	let reply = mem.call_unary("A".to_owned());
	assert!(next_now(&mem).is_none());

	let buf = RequestBuf::new();
	mem.request_unary(T0, buf.clone());
	assert_eq!(next_now(&mem), Some(Completion::new(T0, true)));
	assert_eq!(buf.take().as_deref(), Some("A"));

	mem.finish_unary(T0, "echo:A".to_owned(), Status::ok());
	assert_eq!(next_now(&mem), Some(Completion::new(T0, true)));
	assert_eq!(reply.await.unwrap(), Ok("echo:A".to_owned()));
	assert_eq!(mem.outstanding(), 0);
}

#[tokio::test]
async fn armed_slot_takes_call_immediately_and_error_status_reaches_client() {
	let mem = Mem::new();
	let buf = RequestBuf::new();
	mem.request_unary(T0, buf.clone());
	assert_eq!(mem.armed(), (1, 0));

	let reply = mem.call_unary("B".to_owned());
	assert_eq!(next_now(&mem), Some(Completion::new(T0, true)));
	assert!(buf.is_filled());

	mem.finish_unary(T0, String::new(), Status::internal("Error creating payload."));
	let err = reply.await.unwrap().unwrap_err();
	assert_eq!(err.code(), Code::Internal);
	assert_eq!(err.message(), "Error creating payload.");
}

#[tokio::test]
async fn stream_read_write_and_half_close() {
	let mem = Arc::new(Mem::new());
	let mut stream = mem.open_stream();
	mem.request_streaming(T1);
	assert_eq!(next_now(&mem), Some(Completion::new(T1, true)));

	let buf = RequestBuf::new();
	mem.read(T1, buf.clone());
	assert!(next_now(&mem).is_none(), "read waits for the client");

	stream.send("r0".to_owned()).unwrap();
	assert_eq!(next_now(&mem), Some(Completion::new(T1, true)));
	assert_eq!(buf.take().as_deref(), Some("r0"));

	mem.write(T1, "echo:r0".to_owned());
	assert_eq!(next_now(&mem), Some(Completion::new(T1, true)));
	assert_eq!(stream.recv().await.as_deref(), Some("echo:r0"));

	mem.read(T1, buf.clone());
	stream.close_send();
	assert_eq!(next_now(&mem), Some(Completion::new(T1, false)));
	assert!(stream.send("late".to_owned()).is_err());

	mem.finish_stream(T1, Status::ok());
	assert_eq!(next_now(&mem), Some(Completion::new(T1, true)));
	assert!(stream.recv().await.is_none());
	assert_eq!(stream.finish().await, Status::ok());
}

#[test]
fn requests_sent_before_binding_are_read_in_order() {
	let mem = Arc::new(Mem::new());
	let stream = mem.open_stream();
	stream.send("r0".to_owned()).unwrap();
	stream.send("r1".to_owned()).unwrap();
	drop(stream);

	mem.request_streaming(T1);
	assert_eq!(next_now(&mem), Some(Completion::new(T1, true)));
	let buf = RequestBuf::new();
	for expected in ["r0", "r1"] {
		mem.read(T1, buf.clone());
		assert_eq!(next_now(&mem), Some(Completion::new(T1, true)));
		assert_eq!(buf.take().as_deref(), Some(expected));
	}
	mem.read(T1, buf.clone());
	assert_eq!(next_now(&mem), Some(Completion::new(T1, false)), "dropped handle half-closes");
}

#[test]
fn double_registration_is_counted() {
	let mem = Mem::new();
	mem.request_streaming(T0);
	mem.request_streaming(T0);
	assert_eq!(mem.violations(), 1);
}

#[tokio::test]
async fn shutdown_fails_armed_slots_and_pending_reads() {
	let mem = Arc::new(Mem::new());
	let stream = mem.open_stream();
	mem.request_streaming(T1);
	assert_eq!(next_now(&mem), Some(Completion::new(T1, true)));
	mem.read(T1, RequestBuf::new());
	mem.request_unary(T0, RequestBuf::new());

	Transport::shutdown(&*mem);
	assert!(!mem.is_accepting());
	let mut failed: Vec<_> = std::iter::from_fn(|| next_now(&mem)).collect();
	failed.sort_by_key(|c| c.tag);
	assert_eq!(failed, vec![Completion::new(T0, false), Completion::new(T1, false)]);

	let rejected = mem.call_unary("late".to_owned()).await.unwrap();
	assert_eq!(rejected.unwrap_err().code(), Code::Unavailable);
	assert_eq!(mem.open_stream().finish().await.code(), Code::Unavailable);

	mem.request_unary(T0, RequestBuf::new());
	assert_eq!(next_now(&mem), Some(Completion::new(T0, false)), "re-arming after shutdown fails at once");
	drop(stream);
}

#[tokio::test]
async fn shutdown_rejects_queued_calls() {
	let mem = Mem::new();
	let reply = mem.call_unary("queued".to_owned());
	Transport::shutdown(&mem);
	assert_eq!(reply.await.unwrap().unwrap_err().code(), Code::Unavailable);
}
