//! Relay QPS benchmark.
//!
//! Brings up a dispatch engine over the in-process transport, drives it with
//! closed-loop unary and streaming clients for a fixed time (or until Ctrl-C),
//! then shuts it down in order and prints throughput.

mod config;
mod load;
mod payload;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use relay_rpc::Engine;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::QpsConfig;
use crate::load::{LoadGenerator, QpsTransport};
use crate::payload::PayloadType;

/// Benchmark command line arguments. Flags override the config file.
#[derive(Parser, Debug)]
#[command(name = "relay-qps")]
#[command(about = "Closed-loop throughput benchmark for the relay dispatch engine")]
struct Args {
	/// TOML config file
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Dispatch worker threads
	#[arg(short = 't', long)]
	threads: Option<usize>,

	/// Slots per call shape
	#[arg(short, long)]
	slots: Option<usize>,

	/// Closed-loop unary clients
	#[arg(long)]
	unary_clients: Option<usize>,

	/// Closed-loop streaming clients
	#[arg(long)]
	streaming_clients: Option<usize>,

	/// Response payload size in bytes
	#[arg(long)]
	response_size: Option<usize>,

	/// Response payload type
	#[arg(long, value_enum)]
	response_type: Option<PayloadType>,

	/// Benchmark length in seconds
	#[arg(short, long)]
	duration: Option<u64>,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

impl Args {
	fn resolve(&self) -> anyhow::Result<QpsConfig> {
		let mut config = match &self.config {
			Some(path) => QpsConfig::load(path)?,
			None => QpsConfig::default(),
		};
		if let Some(threads) = self.threads {
			config.engine.worker_threads = threads;
		}
		if let Some(slots) = self.slots {
			config.engine.unary_slots = slots;
			config.engine.streaming_slots = slots;
		}
		if let Some(n) = self.unary_clients {
			config.load.unary_clients = n;
		}
		if let Some(n) = self.streaming_clients {
			config.load.streaming_clients = n;
		}
		if let Some(size) = self.response_size {
			config.load.response_size = size;
		}
		if let Some(kind) = self.response_type {
			config.load.response_type = kind;
		}
		if let Some(secs) = self.duration {
			config.load.duration_secs = secs;
		}
		config.engine.validate()?;
		Ok(config)
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	setup_tracing(args.verbose);

	let config = args.resolve()?;
	info!(
		workers = config.engine.worker_threads,
		unary_slots = config.engine.unary_slots,
		streaming_slots = config.engine.streaming_slots,
		"starting relay-qps"
	);

	let transport = Arc::new(QpsTransport::new());
	let engine = Engine::start(&config.engine, Arc::clone(&transport), Arc::clone(&transport), payload::process)
		.context("starting dispatch engine")?;

	let cancel = CancellationToken::new();
	let load = LoadGenerator::spawn(&transport, &config.load, cancel.clone());

	tokio::select! {
		() = tokio::time::sleep(config.load.duration()) => {}
		res = tokio::signal::ctrl_c() => {
			res.context("waiting for Ctrl-C")?;
			info!("interrupted");
		}
	}

	let load = load.stop().await;
	let report = tokio::task::spawn_blocking(move || engine.shutdown())
		.await
		.context("joining engine shutdown")?;

	for panic in &report.worker_panics {
		tracing::error!(worker = %panic.name, message = %panic.message, "worker panicked");
	}

	println!("elapsed:          {:.3}s", load.elapsed.as_secs_f64());
	println!("unary ok/failed:  {}/{}", load.unary_ok, load.unary_failed);
	println!("stream messages:  {}", load.stream_messages);
	println!("streams failed:   {}", load.streams_failed);
	println!("qps:              {:.0}", load.qps());
	println!(
		"engine:           {} events, {} calls completed, {} slots recycled",
		report.stats.events, report.stats.calls_completed, report.stats.recycled
	);

	if !report.worker_panics.is_empty() {
		anyhow::bail!("{} dispatch worker(s) panicked", report.worker_panics.len());
	}
	Ok(())
}

fn setup_tracing(verbose: bool) {
	use std::fs::OpenOptions;

	use tracing_subscriber::EnvFilter;
	use tracing_subscriber::prelude::*;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("relay_rpc=debug,relay_worker=debug,relay_qps=debug,info")
		} else {
			EnvFilter::new("info")
		}
	});

	// RELAY_LOG_DIR sends logs to a per-process file instead of stderr
	if let Some(log_dir) = std::env::var("RELAY_LOG_DIR").ok().map(PathBuf::from)
		&& std::fs::create_dir_all(&log_dir).is_ok()
	{
		let log_path = log_dir.join(format!("relay-qps.{}.log", std::process::id()));
		if let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) {
			let file_layer = tracing_subscriber::fmt::layer().with_writer(file).with_ansi(false).with_target(true);
			tracing_subscriber::registry().with(filter).with(file_layer).init();
			tracing::info!(path = ?log_path, "qps tracing initialized");
			return;
		}
	}

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
