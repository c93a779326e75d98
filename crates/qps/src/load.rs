//! Closed-loop async clients driving the in-process transport.
//!
//! Each client keeps exactly one request in flight: unary clients issue the
//! next call once the previous reply arrives, streaming clients send the next
//! message once the previous response was read.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use relay_rpc::mem::MemTransport;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::LoadConfig;
use crate::payload::{SimpleRequest, SimpleResponse};

pub type QpsTransport = MemTransport<SimpleRequest, SimpleResponse>;

#[derive(Debug, Default)]
struct Counters {
	unary_ok: AtomicU64,
	unary_failed: AtomicU64,
	stream_messages: AtomicU64,
	streams_failed: AtomicU64,
}

/// Totals gathered by a finished load run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
	pub unary_ok: u64,
	pub unary_failed: u64,
	pub stream_messages: u64,
	pub streams_failed: u64,
	pub elapsed: Duration,
}

impl LoadReport {
	/// Successful round trips of either shape.
	pub fn completed(&self) -> u64 {
		self.unary_ok + self.stream_messages
	}

	/// Completed round trips per second.
	pub fn qps(&self) -> f64 {
		let secs = self.elapsed.as_secs_f64();
		if secs == 0.0 { 0.0 } else { self.completed() as f64 / secs }
	}
}

/// Running set of client tasks.
pub struct LoadGenerator {
	tasks: JoinSet<()>,
	counters: Arc<Counters>,
	cancel: CancellationToken,
	started: Instant,
}

impl LoadGenerator {
	/// Spawns the configured clients on the current runtime.
	pub fn spawn(transport: &Arc<QpsTransport>, config: &LoadConfig, cancel: CancellationToken) -> Self {
		let counters = Arc::new(Counters::default());
		let request = SimpleRequest {
			response_type: config.response_type,
			response_size: config.response_size,
		};
		let mut tasks = JoinSet::new();
		for _ in 0..config.unary_clients {
			tasks.spawn(unary_client(
				Arc::clone(transport),
				request.clone(),
				Arc::clone(&counters),
				cancel.clone(),
			));
		}
		for _ in 0..config.streaming_clients {
			tasks.spawn(streaming_client(
				Arc::clone(transport),
				request.clone(),
				Arc::clone(&counters),
				cancel.clone(),
			));
		}
		debug!(
			unary = config.unary_clients,
			streaming = config.streaming_clients,
			"qps.load.spawned"
		);
		Self {
			tasks,
			counters,
			cancel,
			started: Instant::now(),
		}
	}

	/// Cancels every client and waits for their in-flight requests to finish.
	pub async fn stop(mut self) -> LoadReport {
		self.cancel.cancel();
		while let Some(joined) = self.tasks.join_next().await {
			if let Err(err) = joined {
				warn!(error = %err, "qps.load.client_failed");
			}
		}
		LoadReport {
			unary_ok: self.counters.unary_ok.load(Ordering::Relaxed),
			unary_failed: self.counters.unary_failed.load(Ordering::Relaxed),
			stream_messages: self.counters.stream_messages.load(Ordering::Relaxed),
			streams_failed: self.counters.streams_failed.load(Ordering::Relaxed),
			elapsed: self.started.elapsed(),
		}
	}
}

async fn unary_client(transport: Arc<QpsTransport>, request: SimpleRequest, counters: Arc<Counters>, cancel: CancellationToken) {
	while !cancel.is_cancelled() {
		match transport.call_unary(request.clone()).await {
			Ok(Ok(_)) => {
				counters.unary_ok.fetch_add(1, Ordering::Relaxed);
			}
			Ok(Err(status)) => {
				counters.unary_failed.fetch_add(1, Ordering::Relaxed);
				debug!(%status, "qps.unary.failed");
				if status.code() == relay_rpc::Code::Unavailable {
					break;
				}
			}
			Err(_) => {
				counters.unary_failed.fetch_add(1, Ordering::Relaxed);
				break;
			}
		}
	}
}

async fn streaming_client(transport: Arc<QpsTransport>, request: SimpleRequest, counters: Arc<Counters>, cancel: CancellationToken) {
	let mut stream = transport.open_stream();
	while !cancel.is_cancelled() {
		if stream.send(request.clone()).is_err() {
			break;
		}
		// Responses are withheld until the server takes the stream from the
		// queue, so a cancelled client must not wait on a stream still in line.
		let response = tokio::select! {
			response = stream.recv() => response,
			() = cancel.cancelled() => break,
		};
		match response {
			Some(_) => {
				counters.stream_messages.fetch_add(1, Ordering::Relaxed);
			}
			None => break,
		}
	}
	let status = stream.finish().await;
	if !status.is_ok() {
		counters.streams_failed.fetch_add(1, Ordering::Relaxed);
		debug!(%status, "qps.stream.failed");
	}
}

#[cfg(test)]
mod tests {
	use relay_rpc::{Engine, EngineConfig};

	use super::*;
	use crate::payload::{self, PayloadType};

	fn engine_config() -> EngineConfig {
		EngineConfig::default().worker_threads(2).slots(4, 4).thread_name("qps-test")
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn closed_loop_run_completes_requests() {
		let transport = Arc::new(QpsTransport::new());
		let engine = Engine::start(&engine_config(), Arc::clone(&transport), Arc::clone(&transport), payload::process).unwrap();

		let config = LoadConfig {
			unary_clients: 2,
			streaming_clients: 2,
			response_type: PayloadType::Compressable,
			response_size: 8,
			duration_secs: 0,
		};
		let load = LoadGenerator::spawn(&transport, &config, CancellationToken::new());
		tokio::time::sleep(Duration::from_millis(50)).await;
		let report = load.stop().await;

		assert!(report.unary_ok > 0);
		assert!(report.stream_messages > 0);
		assert_eq!(report.unary_failed, 0);
		assert_eq!(report.streams_failed, 0);
		assert!(report.qps() > 0.0);

		let shutdown = tokio::task::spawn_blocking(move || engine.shutdown()).await.unwrap();
		assert!(shutdown.worker_panics.is_empty());
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn unsupported_payload_counts_failures() {
		let transport = Arc::new(QpsTransport::new());
		let engine = Engine::start(&engine_config(), Arc::clone(&transport), Arc::clone(&transport), payload::process).unwrap();

		let config = LoadConfig {
			unary_clients: 1,
			streaming_clients: 0,
			response_type: PayloadType::Uncompressable,
			response_size: 8,
			duration_secs: 0,
		};
		let load = LoadGenerator::spawn(&transport, &config, CancellationToken::new());
		tokio::time::sleep(Duration::from_millis(20)).await;
		let report = load.stop().await;

		assert_eq!(report.unary_ok, 0);
		assert!(report.unary_failed > 0);

		tokio::task::spawn_blocking(move || drop(engine)).await.unwrap();
	}

	#[test]
	fn qps_of_empty_run_is_zero() {
		let report = LoadReport {
			unary_ok: 0,
			unary_failed: 0,
			stream_messages: 0,
			streams_failed: 0,
			elapsed: Duration::ZERO,
		};
		assert_eq!(report.qps(), 0.0);
	}
}
