//! Fixed-size arena of call slots.

use parking_lot::Mutex;

use crate::call::{Call, CallKind};
use crate::transport::SharedHandler;
use crate::{Error, Result, Tag};

/// Owns every call slot for the engine's lifetime.
///
/// Unary slots come first, streaming slots after them. A slot's index is its
/// [`Tag`]. The per-slot mutex is never contended while the transport keeps to
/// one outstanding operation per tag: only the worker holding that tag's
/// completion touches the slot.
pub struct CallPool<Req, Resp> {
	slots: Box<[Mutex<Call<Req, Resp>>]>,
	unary: usize,
}

impl<Req, Resp> CallPool<Req, Resp> {
	/// Allocates `unary + streaming` slots, all in their initial state.
	///
	/// Nothing is registered with the transport yet.
	pub fn new(unary: usize, streaming: usize, handler: SharedHandler<Req, Resp>) -> Result<Self> {
		let total = unary.checked_add(streaming).ok_or(Error::TagSpaceExhausted { slots: usize::MAX })?;
		if u32::try_from(total).is_err() {
			return Err(Error::TagSpaceExhausted { slots: total });
		}

		let mut slots = Vec::new();
		slots
			.try_reserve_exact(total)
			.map_err(|_| Error::PoolAllocation { slots: total })?;
		for index in 0..total {
			let kind = if index < unary { CallKind::Unary } else { CallKind::Streaming };
			slots.push(Mutex::new(Call::new(kind, handler.clone())));
		}

		Ok(Self {
			slots: slots.into_boxed_slice(),
			unary,
		})
	}

	pub fn len(&self) -> usize {
		self.slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	pub fn unary_len(&self) -> usize {
		self.unary
	}

	pub fn streaming_len(&self) -> usize {
		self.slots.len() - self.unary
	}

	/// Resolves a tag to its slot.
	pub fn get(&self, tag: Tag) -> Option<&Mutex<Call<Req, Resp>>> {
		self.slots.get(tag.index())
	}

	/// Returns the shape served by the slot behind `tag`.
	pub fn kind(&self, tag: Tag) -> Option<CallKind> {
		(tag.index() < self.slots.len()).then(|| if tag.index() < self.unary { CallKind::Unary } else { CallKind::Streaming })
	}

	/// Iterates over every slot's tag in index order.
	pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
		// `new` guarantees every index fits in a u32.
		(0..self.slots.len() as u32).map(Tag::new)
	}

	/// Counts slots sitting in their terminal state.
	pub fn terminal_count(&self) -> usize {
		self.slots.iter().filter(|slot| slot.lock().is_terminal()).count()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::counting_echo;

	#[test]
	fn lays_out_unary_then_streaming() {
		let (handler, _) = counting_echo();
		let pool = CallPool::new(2, 3, handler).unwrap();
		assert_eq!(pool.len(), 5);
		assert_eq!(pool.unary_len(), 2);
		assert_eq!(pool.streaming_len(), 3);
		assert_eq!(pool.kind(Tag::new(1)), Some(CallKind::Unary));
		assert_eq!(pool.kind(Tag::new(2)), Some(CallKind::Streaming));
		assert_eq!(pool.kind(Tag::new(5)), None);
		assert_eq!(pool.tags().collect::<Vec<_>>(), (0..5).map(Tag::new).collect::<Vec<_>>());

		for tag in pool.tags() {
			let call = pool.get(tag).unwrap().lock();
			assert_eq!(Some(call.kind()), pool.kind(tag));
			assert!(call.is_awaiting_call());
		}
		assert_eq!(pool.terminal_count(), 0);
	}

	#[test]
	fn unknown_tag_resolves_to_nothing() {
		let (handler, _) = counting_echo();
		let pool = CallPool::new(1, 0, handler).unwrap();
		assert!(pool.get(Tag::new(1)).is_none());
		assert!(pool.get(Tag::new(u32::MAX)).is_none());
	}

	#[test]
	fn rejects_pools_larger_than_the_tag_space() {
		let (handler, _) = counting_echo();
		let err = CallPool::new(usize::MAX, 1, handler).err().unwrap();
		assert!(matches!(err, Error::TagSpaceExhausted { .. }));
	}
}
