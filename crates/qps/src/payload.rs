//! Benchmark messages and the processing function the server runs.

use relay_rpc::Status;
use serde::Deserialize;

/// How the server fills response payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PayloadType {
	/// Zero-filled body.
	#[default]
	Compressable,
	/// Incompressible body; the server does not produce these.
	Uncompressable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
	pub kind: PayloadType,
	pub body: Vec<u8>,
}

/// Request asking the server for a response of a given shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleRequest {
	pub response_type: PayloadType,
	pub response_size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleResponse {
	pub payload: Option<Payload>,
}

/// Builds a payload of `size` bytes, or `None` if `kind` is unsupported.
fn make_payload(kind: PayloadType, size: usize) -> Option<Payload> {
	match kind {
		PayloadType::Compressable => Some(Payload {
			kind,
			body: vec![0; size],
		}),
		PayloadType::Uncompressable => None,
	}
}

/// Server processing function for both unary and streaming calls.
pub fn process(request: &SimpleRequest) -> (SimpleResponse, Status) {
	let mut response = SimpleResponse::default();
	if request.response_size > 0 {
		match make_payload(request.response_type, request.response_size) {
			Some(payload) => response.payload = Some(payload),
			None => return (response, Status::internal("Error creating payload.")),
		}
	}
	(response, Status::ok())
}
