use std::thread::JoinHandle;

/// Spawns a dedicated named OS thread.
///
/// All worker threads go through here so thread creation shows up in traces
/// under one event name.
pub fn spawn_named_thread<F, R>(name: impl Into<String>, f: F) -> std::io::Result<JoinHandle<R>>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	let name = name.into();
	tracing::trace!(thread = %name, "worker.spawn_named_thread");
	std::thread::Builder::new().name(name).spawn(f)
}
