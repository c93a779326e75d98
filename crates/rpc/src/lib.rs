//! Completion-queue RPC dispatch engine.
//!
//! A fixed pool of OS worker threads drains one shared [`CompletionQueue`].
//! Every completion carries a [`Tag`] naming the call slot that armed the
//! operation; the worker advances that slot's state machine, which arms the
//! slot's next operation or, once the call is over, gets the slot recycled.
//!
//! * [`Engine`]: bring-up and ordered shutdown
//! * [`Transport`] / [`CompletionQueue`]: what the engine consumes
//! * [`call`]: unary and streaming call state machines
//! * [`mem`]: an in-process transport for tests and benchmarks

pub mod call;
pub mod config;
mod dispatch;
pub mod engine;
pub mod error;
pub mod mem;
pub mod pool;
mod shutdown;
mod stats;
pub mod status;
mod tag;
pub mod transport;

#[cfg(test)]
mod testing;

pub use config::EngineConfig;
pub use engine::{Engine, ShutdownReport};
pub use error::{Error, Result};
pub use stats::StatsSnapshot;
pub use status::{Code, Status};
pub use tag::{Completion, Tag};
pub use transport::{CompletionQueue, Handler, RequestBuf, Transport};
