//! Pre-parsed HTTP request.

mod methods;
mod params;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::upload::UploadedFile;

/// Parameters captured by one routing stage.
pub type Params = HashMap<String, String>;

/// HTTP request as handed over by the transport adapter.
///
/// The path is stored relative to the site root, without leading or trailing
/// slashes: `/about/team/` becomes `about/team`. Whether the request path
/// ended in a slash is kept for [`Request::request_uri`]. Routing stages push the
/// parameters they capture onto a stack; see [`Request::param`].
#[derive(Debug, Clone)]
pub struct Request {
	pub method: Method,
	pub headers: HeaderMap,
	pub body: Bytes,
	path: String,
	trailing_slash: bool,
	raw_query: Option<String>,
	query: Params,
	post_vars: Params,
	cookies: HashMap<String, String>,
	files: Vec<UploadedFile>,
	is_secure: bool,
	base_url: String,
	param_stack: Vec<Params>,
	consumed_segments: usize,
}

impl Request {
	/// Start building a request.
	///
	/// # Examples
	///
	/// ```
	/// use portico_http::Request;
	/// use http::Method;
	///
	/// let request = Request::builder()
	///     .method(Method::POST)
	///     .uri("http://example.com/contact/send")
	///     .post_var("email", "a@example.com")
	///     .build()
	///     .unwrap();
	///
	/// assert_eq!(request.host(), Some("example.com"));
	/// assert_eq!(request.path(), "contact/send");
	/// assert_eq!(request.post_var("email"), Some("a@example.com"));
	/// ```
	pub fn builder() -> RequestBuilder {
		RequestBuilder::new()
	}

	/// Site-relative path without surrounding slashes.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Raw query string, if any.
	pub fn raw_query(&self) -> Option<&str> {
		self.raw_query.as_deref()
	}

	/// Path segments of the site-relative path.
	pub fn segments(&self) -> Vec<&str> {
		self.path.split('/').filter(|s| !s.is_empty()).collect()
	}

	/// Segments not yet consumed by a routing stage.
	pub fn remaining_segments(&self) -> Vec<&str> {
		self.segments().into_iter().skip(self.consumed_segments).collect()
	}

	/// Remaining path joined with `/`.
	pub fn remaining(&self) -> String {
		self.remaining_segments().join("/")
	}

	/// Mark `count` more segments as consumed. Saturates at the path length.
	pub fn shift(&mut self, count: usize) {
		let total = self.segments().len();
		self.consumed_segments = (self.consumed_segments + count).min(total);
	}

	/// Returns true once every segment has been consumed.
	pub fn all_segments_consumed(&self) -> bool {
		self.consumed_segments >= self.segments().len()
	}

	pub fn cookies(&self) -> &HashMap<String, String> {
		&self.cookies
	}

	pub fn cookie(&self, name: &str) -> Option<&str> {
		self.cookies.get(name).map(String::as_str)
	}

	pub fn files(&self) -> &[UploadedFile] {
		&self.files
	}

	/// Base URL of the site as seen by the transport, `/` by default.
	pub fn base_url(&self) -> &str {
		&self.base_url
	}
}

/// Builder for [`Request`].
#[derive(Debug)]
pub struct RequestBuilder {
	method: Method,
	uri: String,
	headers: HeaderMap,
	body: Bytes,
	post_vars: Params,
	query: Params,
	cookies: HashMap<String, String>,
	files: Vec<UploadedFile>,
	is_secure: bool,
	base_url: String,
	errors: Vec<String>,
}

impl RequestBuilder {
	pub fn new() -> Self {
		Self {
			method: Method::GET,
			uri: "/".to_string(),
			headers: HeaderMap::new(),
			body: Bytes::new(),
			post_vars: Params::new(),
			query: Params::new(),
			cookies: HashMap::new(),
			files: Vec::new(),
			is_secure: false,
			base_url: "/".to_string(),
			errors: Vec::new(),
		}
	}

	pub fn method(mut self, method: Method) -> Self {
		self.method = method;
		self
	}

	/// Origin-form (`/a/b?x=1`) or absolute-form (`http://host/a`) URI.
	pub fn uri(mut self, uri: impl Into<String>) -> Self {
		self.uri = uri.into();
		self
	}

	/// Add a header. Invalid names or values make [`build`](Self::build) fail.
	pub fn header(mut self, name: &str, value: &str) -> Self {
		match (
			HeaderName::from_bytes(name.as_bytes()),
			HeaderValue::from_str(value),
		) {
			(Ok(name), Ok(value)) => {
				self.headers.append(name, value);
			}
			_ => self.errors.push(format!("invalid header '{}'", name)),
		}
		self
	}

	pub fn headers(mut self, headers: HeaderMap) -> Self {
		self.headers.extend(headers);
		self
	}

	pub fn body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	pub fn post_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.post_vars.insert(name.into(), value.into());
		self
	}

	pub fn post_vars(mut self, vars: Params) -> Self {
		self.post_vars.extend(vars);
		self
	}

	/// Add a query variable on top of those parsed from the URI.
	pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.insert(name.into(), value.into());
		self
	}

	pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.cookies.insert(name.into(), value.into());
		self
	}

	pub fn file(mut self, file: UploadedFile) -> Self {
		self.files.push(file);
		self
	}

	pub fn secure(mut self, secure: bool) -> Self {
		self.is_secure = secure;
		self
	}

	pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into();
		self
	}

	/// Build the request.
	///
	/// # Errors
	///
	/// Returns [`Error::MalformedRequest`] when the URI cannot be parsed or a
	/// header was invalid.
	pub fn build(self) -> Result<Request> {
		if let Some(error) = self.errors.first() {
			return Err(Error::MalformedRequest(error.clone()));
		}

		let uri: Uri = self
			.uri
			.parse()
			.map_err(|e| Error::MalformedRequest(format!("unparseable URL '{}': {}", self.uri, e)))?;

		let mut headers = self.headers;
		if let Some(authority) = uri.authority()
			&& !headers.contains_key(http::header::HOST)
		{
			let value = HeaderValue::from_str(authority.as_str())
				.map_err(|e| Error::MalformedRequest(e.to_string()))?;
			headers.insert(http::header::HOST, value);
		}
		let is_secure = self.is_secure || uri.scheme_str() == Some("https");

		let path = uri.path().trim_matches('/');
		let trailing_slash = !path.is_empty() && uri.path().ends_with('/');
		let raw_query = uri.query().map(str::to_string);
		let mut query = raw_query.as_deref().map(Request::parse_query).unwrap_or_default();
		query.extend(self.query);

		let mut cookies = Request::parse_cookie_header(&headers);
		cookies.extend(self.cookies);

		Ok(Request {
			method: self.method,
			headers,
			body: self.body,
			path: path.to_string(),
			trailing_slash,
			raw_query,
			query,
			post_vars: self.post_vars,
			cookies,
			files: self.files,
			is_secure,
			base_url: self.base_url,
			param_stack: Vec::new(),
			consumed_segments: 0,
		})
	}
}

impl Default for RequestBuilder {
	fn default() -> Self {
		Self::new()
	}
}
