#![forbid(unsafe_code)]

use crate::proto::ControlCommand;
use thiserror::Error as ThisError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, ThisError)]
pub enum Error {
	/// No token configured. Raised locally, never sent to the network.
	#[error("no credential configured: enter an access token first")]
	NoCredential,
	#[error("invalid settings: {0}")]
	Validation(#[from] ValidationError),
	#[error("connection failed: {0}")]
	Transport(String),
	#[error("{}", remote_detail(.status, .body))]
	Remote { status: u16, body: Option<String> },
	#[error("`{0}` requires confirmation before it is sent")]
	ConfirmationRequired(ControlCommand),
	#[error("{0} already in progress")]
	Busy(&'static str),
	#[error("serialization error: {0}")]
	Serde(#[from] serde_json::Error),
	#[error("configuration error: {0}")]
	Config(String),
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

impl Error {
	pub fn config(msg: impl Into<String>) -> Self { Error::Config(msg.into()) }
	pub fn transport(msg: impl Into<String>) -> Self { Error::Transport(msg.into()) }

	/// True for failures raised before any request left the client.
	pub fn is_preflight(&self) -> bool {
		matches!(self, Error::NoCredential | Error::Validation(_) | Error::ConfirmationRequired(_) | Error::Busy(_))
	}
}

fn remote_detail(status: &u16, body: &Option<String>) -> String {
	match body.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
		Some(b) => b.to_string(),
		None => format!("HTTP {status}"),
	}
}

/// Reasons a settings form is refused before submission.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ValidationError {
	#[error("{field} is required")]
	EmptyRequiredField { field: &'static str },
	#[error("{field} must be a whole number (got {input:?})")]
	NotANumber { field: &'static str, input: String },
	#[error("{field} must be {}, got {value}", range_text(.min, .max))]
	OutOfRange { field: &'static str, value: i64, min: i64, max: Option<i64> },
}

fn range_text(min: &i64, max: &Option<i64>) -> String {
	match max {
		Some(max) => format!("between {min} and {max}"),
		None => format!("at least {min}"),
	}
}
