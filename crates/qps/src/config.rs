//! Benchmark configuration: TOML file plus command line overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use relay_rpc::EngineConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::payload::PayloadType;

/// Errors that can occur when loading the benchmark configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// The config file could not be read.
	#[error("I/O error reading {path}: {error}")]
	Io {
		path: PathBuf,
		error: std::io::Error,
	},

	/// The config file is not valid TOML or has unknown keys.
	#[error("invalid config {path}: {error}")]
	Parse {
		path: PathBuf,
		error: toml::de::Error,
	},
}

/// Load generator settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
	/// Concurrent closed-loop unary clients.
	pub unary_clients: usize,
	/// Concurrent closed-loop streaming clients.
	pub streaming_clients: usize,
	pub response_type: PayloadType,
	pub response_size: usize,
	/// Benchmark length in seconds.
	pub duration_secs: u64,
}

impl Default for LoadConfig {
	fn default() -> Self {
		Self {
			unary_clients: 8,
			streaming_clients: 8,
			response_type: PayloadType::Compressable,
			response_size: 0,
			duration_secs: 5,
		}
	}
}

impl LoadConfig {
	pub fn duration(&self) -> Duration {
		Duration::from_secs(self.duration_secs)
	}
}

/// Complete benchmark configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QpsConfig {
	pub engine: EngineConfig,
	pub load: LoadConfig,
}

impl QpsConfig {
	/// Parses a configuration from TOML text.
	pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
		toml::from_str(text).map_err(|error| ConfigError::Parse {
			path: path.to_path_buf(),
			error,
		})
	}

	/// Reads and parses a TOML configuration file.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::parse(&text, path)
	}
}
