use bytes::Bytes;
use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::status;

const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// HTTP response produced by the dispatch pipeline.
///
/// Header names are kept exactly as they were stored: `Content-Type` and
/// `content-type` are two distinct entries. Output order follows insertion
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
	status_code: u16,
	status_description: String,
	headers: IndexMap<String, String>,
	body: Bytes,
}

impl Response {
	/// Create an empty `200 OK` response with the default content type.
	///
	/// # Examples
	///
	/// ```
	/// use portico_http::Response;
	///
	/// let response = Response::new();
	/// assert_eq!(response.status_code(), 200);
	/// assert_eq!(response.status_description(), "OK");
	/// assert_eq!(response.header("Content-Type"), Some("text/html; charset=utf-8"));
	/// assert_eq!(response.header("Content-Length"), Some("0"));
	/// ```
	pub fn new() -> Self {
		let mut headers = IndexMap::new();
		headers.insert("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string());
		let mut response = Self {
			status_code: 200,
			status_description: "OK".to_string(),
			headers,
			body: Bytes::new(),
		};
		response.set_body(Bytes::new());
		response
	}

	/// Create a `200 OK` response carrying `body`.
	pub fn with_body(body: impl Into<Bytes>) -> Self {
		let mut response = Self::new();
		response.set_body(body);
		response
	}

	/// Create a response with the given registered status code.
	///
	/// # Examples
	///
	/// ```
	/// use portico_http::Response;
	///
	/// let response = Response::with_status(404).unwrap();
	/// assert_eq!(response.status_description(), "Not Found");
	/// assert!(Response::with_status(299).is_err());
	/// ```
	pub fn with_status(code: u16) -> Result<Self> {
		let mut response = Self::new();
		response.set_status_code(code, None)?;
		Ok(response)
	}

	/// Create a redirect response, see [`Response::redirect`].
	pub fn redirect_to(destination: &str, code: u16) -> Self {
		let mut response = Self::new();
		response.redirect(destination, code);
		response
	}

	/// Set the status code and its description.
	///
	/// Without a description (or with an empty one) the registry description
	/// for `code` is used. Unregistered codes are rejected and leave the
	/// response untouched.
	///
	/// # Examples
	///
	/// ```
	/// use portico_http::{Error, Response};
	///
	/// let mut response = Response::new();
	/// response.set_status_code(503, Some("Down for maintenance")).unwrap();
	/// assert_eq!(response.status_description(), "Down for maintenance");
	///
	/// let err = response.set_status_code(299, None).unwrap_err();
	/// assert!(matches!(err, Error::UnknownStatusCode(299)));
	/// assert_eq!(response.status_code(), 503);
	/// ```
	pub fn set_status_code(&mut self, code: u16, description: Option<&str>) -> Result<()> {
		let registered = status::description(code).ok_or(Error::UnknownStatusCode(code))?;
		self.status_code = code;
		self.status_description = match description {
			Some(description) if !description.is_empty() => description.to_string(),
			_ => registered.to_string(),
		};
		Ok(())
	}

	/// Set the reason phrase. Overwritten by the next [`set_status_code`](Self::set_status_code).
	pub fn set_status_description(&mut self, description: impl Into<String>) {
		self.status_description = description.into();
	}

	pub fn status_code(&self) -> u16 {
		self.status_code
	}

	/// Reason phrase with carriage returns and newlines removed.
	pub fn status_description(&self) -> String {
		self.status_description.replace(['\r', '\n'], "")
	}

	/// Replace the body and recompute `Content-Length` from its byte length.
	///
	/// # Examples
	///
	/// ```
	/// use portico_http::Response;
	///
	/// let mut response = Response::new();
	/// response.set_body("héllo");
	/// assert_eq!(response.header("Content-Length"), Some("6"));
	/// ```
	pub fn set_body(&mut self, body: impl Into<Bytes>) {
		self.body = body.into();
		let length = self.body.len().to_string();
		self.set_header("Content-Length", length);
	}

	pub fn body(&self) -> &Bytes {
		&self.body
	}

	/// Body decoded as UTF-8, replacing invalid sequences.
	pub fn body_text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Insert or replace a header, keyed exactly as given.
	pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
		self.headers.insert(name.into(), value.into());
	}

	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).map(String::as_str)
	}

	pub fn remove_header(&mut self, name: &str) -> Option<String> {
		self.headers.shift_remove(name)
	}

	pub fn headers(&self) -> &IndexMap<String, String> {
		&self.headers
	}

	/// Returns true for informational codes and anything above 399.
	pub fn is_error(&self) -> bool {
		self.status_code < 200 || self.status_code > 399
	}

	/// Returns true if the status code is a 3xx code.
	pub fn is_redirect(&self) -> bool {
		status::is_redirect(self.status_code)
	}

	/// Returns true when no further body-producing work should happen:
	/// a redirect was issued or authentication is required.
	///
	/// # Examples
	///
	/// ```
	/// use portico_http::Response;
	///
	/// assert!(!Response::new().is_finished());
	/// assert!(Response::redirect_to("/login", 302).is_finished());
	/// assert!(Response::with_status(401).unwrap().is_finished());
	/// assert!(!Response::redirect_to("/other", 303).is_finished());
	/// ```
	pub fn is_finished(&self) -> bool {
		status::FINISHED_CODES.contains(&self.status_code)
	}

	/// Turn this response into a redirect to `destination`.
	///
	/// `code` is kept when it is a registered 3xx code, otherwise 302 is used.
	///
	/// # Examples
	///
	/// ```
	/// use portico_http::Response;
	///
	/// let mut response = Response::new();
	/// response.redirect("/home", 200);
	/// assert_eq!(response.status_code(), 302);
	/// assert_eq!(response.header("Location"), Some("/home"));
	///
	/// response.redirect("/moved", 301);
	/// assert_eq!(response.status_code(), 301);
	/// ```
	pub fn redirect(&mut self, destination: &str, code: u16) {
		let code = if status::is_redirect(code) && status::is_registered(code) {
			code
		} else {
			302
		};
		// 302 is always registered
		let _ = self.set_status_code(code, None);
		self.set_header("Location", destination);
	}

	/// Convert into an [`http::Response`] for a transport adapter.
	///
	/// Headers that are not valid HTTP header names or values are skipped.
	pub fn into_http(self) -> http::Response<Bytes> {
		let mut builder = http::Response::builder().status(self.status_code);
		for (name, value) in &self.headers {
			match (
				http::HeaderName::from_bytes(name.as_bytes()),
				http::HeaderValue::from_str(value),
			) {
				(Ok(name), Ok(value)) => {
					builder = builder.header(name, value);
				}
				_ => {
					tracing::warn!(header = %name, "Skipping invalid response header");
				}
			}
		}
		builder.body(self.body).unwrap_or_else(|err| {
			tracing::error!(error = %err, "Failed to convert response");
			let mut fallback = http::Response::new(Bytes::new());
			*fallback.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
			fallback
		})
	}
}

impl Default for Response {
	fn default() -> Self {
		Self::new()
	}
}

impl From<&str> for Response {
	fn from(body: &str) -> Self {
		Self::with_body(body.to_string())
	}
}

impl From<String> for Response {
	fn from(body: String) -> Self {
		Self::with_body(body)
	}
}
