//! Worker thread primitives shared by the dispatch engine.
//!
//! * [`WorkerPool`]: a fixed set of named OS threads joined as one unit
//! * [`WorkerRegistry`]: status snapshots for each worker thread
//! * [`spawn_named_thread`]: the single thread spawn entrypoint, traced

mod panic;
mod pool;
mod registry;
mod spawn;

pub use panic::panic_message;
pub use pool::{JoinReport, SpawnError, WorkerId, WorkerPanic, WorkerPool};
pub use registry::{WorkerRecord, WorkerRegistry, WorkerState};
pub use spawn::spawn_named_thread;
