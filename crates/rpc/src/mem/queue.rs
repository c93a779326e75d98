use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use crate::{Completion, CompletionQueue};

struct QueueState {
	events: VecDeque<Completion>,
	closed: bool,
}

/// Blocking multi-consumer completion queue.
///
/// Pushes are accepted after [`CompletionQueue::shutdown`] so completions of
/// operations still in flight keep draining; `next` reports closure only once
/// the queue is both closed and empty.
pub struct EventQueue {
	state: Mutex<QueueState>,
	ready: Condvar,
}

impl Default for EventQueue {
	fn default() -> Self {
		Self::new()
	}
}

impl EventQueue {
	pub fn new() -> Self {
		Self {
			state: Mutex::new(QueueState {
				events: VecDeque::new(),
				closed: false,
			}),
			ready: Condvar::new(),
		}
	}

	/// Queues one completion and wakes a waiting worker.
	pub fn push(&self, completion: Completion) {
		self.state.lock().events.push_back(completion);
		self.ready.notify_one();
	}

	/// Returns a completion without blocking.
	pub fn try_next(&self) -> Option<Completion> {
		self.state.lock().events.pop_front()
	}

	pub fn len(&self) -> usize {
		self.state.lock().events.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn is_closed(&self) -> bool {
		self.state.lock().closed
	}
}

impl CompletionQueue for EventQueue {
	fn next(&self) -> Option<Completion> {
		let mut state = self.state.lock();
		loop {
			if let Some(completion) = state.events.pop_front() {
				return Some(completion);
			}
			if state.closed {
				return None;
			}
			self.ready.wait(&mut state);
		}
	}

	fn shutdown(&self) {
		self.state.lock().closed = true;
		self.ready.notify_all();
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::time::Duration;

	use super::*;
	use crate::Tag;

	#[test]
	fn drains_queued_events_before_reporting_closure() {
		let queue = EventQueue::new();
		queue.push(Completion::new(Tag::new(0), true));
		queue.push(Completion::new(Tag::new(1), false));
		queue.shutdown();
		queue.push(Completion::new(Tag::new(2), true));

		assert_eq!(queue.next(), Some(Completion::new(Tag::new(0), true)));
		assert_eq!(queue.next(), Some(Completion::new(Tag::new(1), false)));
		assert_eq!(queue.next(), Some(Completion::new(Tag::new(2), true)));
		assert_eq!(queue.next(), None);
		assert_eq!(queue.next(), None);
	}

	#[test]
	fn shutdown_wakes_every_blocked_consumer() {
		let queue = Arc::new(EventQueue::new());
		let consumers: Vec<_> = (0..3)
			.map(|_| {
				let queue = Arc::clone(&queue);
				std::thread::spawn(move || queue.next())
			})
			.collect();

		std::thread::sleep(Duration::from_millis(20));
		queue.shutdown();
		for consumer in consumers {
			assert_eq!(consumer.join().unwrap(), None);
		}
	}

	#[test]
	fn blocked_consumer_receives_push() {
		let queue = Arc::new(EventQueue::new());
		let consumer = {
			let queue = Arc::clone(&queue);
			std::thread::spawn(move || queue.next())
		};
		std::thread::sleep(Duration::from_millis(20));
		queue.push(Completion::new(Tag::new(9), true));
		assert_eq!(consumer.join().unwrap(), Some(Completion::new(Tag::new(9), true)));
	}
}
