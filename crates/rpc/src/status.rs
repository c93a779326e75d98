//! RPC outcome carried by finish operations.

use std::fmt;

/// Canonical RPC status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
	Ok,
	Cancelled,
	Unknown,
	InvalidArgument,
	DeadlineExceeded,
	NotFound,
	AlreadyExists,
	PermissionDenied,
	ResourceExhausted,
	FailedPrecondition,
	Aborted,
	OutOfRange,
	Unimplemented,
	Internal,
	Unavailable,
	DataLoss,
	Unauthenticated,
}

impl Code {
	/// Returns the upper snake case wire name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Ok => "OK",
			Self::Cancelled => "CANCELLED",
			Self::Unknown => "UNKNOWN",
			Self::InvalidArgument => "INVALID_ARGUMENT",
			Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
			Self::NotFound => "NOT_FOUND",
			Self::AlreadyExists => "ALREADY_EXISTS",
			Self::PermissionDenied => "PERMISSION_DENIED",
			Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
			Self::FailedPrecondition => "FAILED_PRECONDITION",
			Self::Aborted => "ABORTED",
			Self::OutOfRange => "OUT_OF_RANGE",
			Self::Unimplemented => "UNIMPLEMENTED",
			Self::Internal => "INTERNAL",
			Self::Unavailable => "UNAVAILABLE",
			Self::DataLoss => "DATA_LOSS",
			Self::Unauthenticated => "UNAUTHENTICATED",
		}
	}
}

impl fmt::Display for Code {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Outcome of one RPC: a code plus an optional human readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
	code: Code,
	message: String,
}

impl Status {
	/// Creates a status with the given code and message.
	pub fn new(code: Code, message: impl Into<String>) -> Self {
		Self {
			code,
			message: message.into(),
		}
	}

	/// The successful status.
	pub const fn ok() -> Self {
		Self {
			code: Code::Ok,
			message: String::new(),
		}
	}

	pub fn internal(message: impl Into<String>) -> Self {
		Self::new(Code::Internal, message)
	}

	pub fn unavailable(message: impl Into<String>) -> Self {
		Self::new(Code::Unavailable, message)
	}

	pub fn cancelled(message: impl Into<String>) -> Self {
		Self::new(Code::Cancelled, message)
	}

	pub fn code(&self) -> Code {
		self.code
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	pub fn is_ok(&self) -> bool {
		self.code == Code::Ok
	}
}

impl Default for Status {
	fn default() -> Self {
		Self::ok()
	}
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.message.is_empty() {
			write!(f, "{}", self.code)
		} else {
			write!(f, "{}: {}", self.code, self.message)
		}
	}
}
