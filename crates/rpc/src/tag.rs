/// Correlation token for one outstanding operation.
///
/// A tag is the issuing call's slot index in the
/// [`CallPool`](crate::pool::CallPool). Slots never move, so the tag stays
/// valid for the engine's lifetime and resolves back to the same call state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(u32);

impl Tag {
	/// Creates a tag from a raw slot index.
	pub const fn new(index: u32) -> Self {
		Self(index)
	}

	/// Returns the slot index this tag refers to.
	pub const fn index(self) -> usize {
		self.0 as usize
	}
}

impl std::fmt::Display for Tag {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// One completed operation delivered by a
/// [`CompletionQueue`](crate::CompletionQueue).
///
/// `ok == false` means the operation did not complete as requested: the peer
/// went away, the call was cancelled, or the transport is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
	pub tag: Tag,
	pub ok: bool,
}

impl Completion {
	pub const fn new(tag: Tag, ok: bool) -> Self {
		Self { tag, ok }
	}
}
