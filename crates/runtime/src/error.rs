//! Error types for the runtime crate.

use leasekeep_protocol::webdriver::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
	#[error("webdriver {code}: {message}")]
	Protocol { code: ErrorCode, message: String },

	#[error("webdriver returned HTTP {status}: {body}")]
	Status { status: u16, body: String },

	#[error("webdriver transport: {0}")]
	Http(#[from] reqwest::Error),

	#[error("invalid webdriver endpoint: {0}")]
	Endpoint(#[from] url::ParseError),

	#[error("malformed webdriver payload: {0}")]
	Json(#[from] serde_json::Error),

	#[error("invalid screenshot encoding: {0}")]
	Base64(#[from] base64::DecodeError),
}

impl DriverError {
	/// Protocol error code, when the driver answered with one.
	pub fn code(&self) -> Option<&ErrorCode> {
		match self {
			Self::Protocol { code, .. } => Some(code),
			_ => None,
		}
	}

	pub fn is_no_such_element(&self) -> bool {
		matches!(self.code(), Some(ErrorCode::NoSuchElement))
	}

	pub fn is_stale(&self) -> bool {
		matches!(self.code(), Some(ErrorCode::StaleElementReference))
	}
}

pub type Result<T> = std::result::Result<T, DriverError>;
