//! Framework error type.

use crate::response::Response;

/// Result alias used by handlers and message-model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building messages or handling a request.
///
/// [`Error::Halt`] is not a failure: it is the early-response signal a
/// handler raises (usually with `?` from a nested call) to finish the request
/// with a specific response. The dispatcher intercepts it at exactly one
/// point and turns it into the final response.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// The status code is not part of the registry.
	#[error("Unrecognised HTTP status code '{0}'")]
	UnknownStatusCode(u16),

	/// The request cannot be trusted or parsed (bad upload provenance,
	/// unparseable URL).
	#[error("Malformed request: {0}")]
	MalformedRequest(String),

	/// Early-response signal carrying the final response.
	#[error("Request halted with status {}", .0.status_code())]
	Halt(Box<Response>),

	/// Session payload could not be (de)serialized.
	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// Any other handler fault.
	#[error("Internal error: {0}")]
	Internal(String),
}

impl Error {
	/// Build the early-response signal for `response`.
	///
	/// # Examples
	///
	/// ```
	/// use portico_http::{Error, Response};
	///
	/// let mut forbidden = Response::new();
	/// forbidden.set_status_code(403, None).unwrap();
	///
	/// let err = Error::halt(forbidden);
	/// assert_eq!(err.status_code(), 403);
	/// ```
	pub fn halt(response: Response) -> Self {
		Error::Halt(Box::new(response))
	}

	/// HTTP status code a transport should use when this error escapes.
	pub fn status_code(&self) -> u16 {
		match self {
			Error::Halt(response) => response.status_code(),
			Error::MalformedRequest(_) => 400,
			Error::UnknownStatusCode(_) | Error::Serialization(_) | Error::Internal(_) => 500,
		}
	}

	/// Returns true for the early-response signal.
	pub fn is_halt(&self) -> bool {
		matches!(self, Error::Halt(_))
	}
}
