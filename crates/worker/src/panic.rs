use std::any::Any;

/// Extracts the message from a thread panic payload.
///
/// Returns `None` when the payload is neither a `&'static str` nor a `String`
/// (e.g. `std::panic::panic_any` with a custom type).
pub fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
	if let Some(msg) = payload.downcast_ref::<&'static str>() {
		return Some((*msg).to_owned());
	}
	payload.downcast_ref::<String>().cloned()
}

#[cfg(test)]
#[path = "panic_tests.rs"]
mod tests;
