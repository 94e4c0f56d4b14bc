//! Requests for test-mode dispatch, see [`Dispatcher::test`](crate::Dispatcher::test).

use bytes::Bytes;
use http::Method;
use portico_conf::Settings;
use portico_http::{Params, Request, Session, UploadedFile};
use portico_urls::{UrlContext, UrlResolver};
use std::collections::HashMap;

use crate::{DispatchError, request_error};

/// A request to run through the pipeline in test mode.
///
/// Pass the same [`Session`] to several test requests to simulate a client
/// that keeps its session between requests.
///
/// # Examples
///
/// ```
/// use portico_dispatch::TestRequest;
/// use portico_http::Session;
///
/// let mut session = Session::new();
/// let request = TestRequest::new("/contact?ref=footer")
///     .post_var("email", "a@example.com")
///     .cookie("theme", "dark")
///     .session(&mut session);
/// # drop(request);
/// ```
#[derive(Debug, Default)]
pub struct TestRequest<'s> {
	url: String,
	post_vars: Option<Params>,
	session: Option<&'s mut Session>,
	method: Option<Method>,
	body: Bytes,
	headers: Vec<(String, String)>,
	cookies: HashMap<String, String>,
	files: Vec<UploadedFile>,
}

impl<'s> TestRequest<'s> {
	/// Request for `url`, either site-relative (`/about?x=1`) or absolute
	/// (`http://example.com/about`). An absolute URL also sets the host.
	pub fn new(url: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			..Self::default()
		}
	}

	/// Post variables. Their presence, even empty, makes the default method
	/// `POST`; a `_method` variable overrides the method.
	pub fn post_vars(mut self, vars: Params) -> Self {
		self.post_vars.get_or_insert_with(Params::new).extend(vars);
		self
	}

	pub fn post_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.post_vars
			.get_or_insert_with(Params::new)
			.insert(name.into(), value.into());
		self
	}

	/// Session to run with. It is updated in place and never written to the
	/// session store.
	pub fn session(mut self, session: &'s mut Session) -> Self {
		self.session = Some(session);
		self
	}

	pub fn method(mut self, method: Method) -> Self {
		self.method = Some(method);
		self
	}

	pub fn body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));
		self
	}

	pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.cookies.insert(name.into(), value.into());
		self
	}

	/// Upload field. Test uploads are treated as genuine.
	pub fn file(mut self, file: UploadedFile) -> Self {
		self.files.push(file);
		self
	}

	pub(crate) fn files(&self) -> &[UploadedFile] {
		&self.files
	}

	fn resolve_method(&self) -> Result<Method, DispatchError> {
		if let Some(method) = self
			.post_vars
			.as_ref()
			.and_then(|vars| vars.get("_method"))
		{
			return Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|_| {
				DispatchError::MalformedRequest(format!("invalid _method '{}'", method))
			});
		}
		Ok(match &self.method {
			Some(method) => method.clone(),
			None if self.post_vars.is_some() || !self.files.is_empty() => Method::POST,
			None => Method::GET,
		})
	}

	/// Build the request, handing back the caller's session if one was given.
	pub(crate) fn into_request(
		self,
		settings: &Settings,
	) -> Result<(Request, Option<&'s mut Session>), DispatchError> {
		let method = self.resolve_method()?;

		let mut ctx = settings.url_context(UrlContext::default());
		if !ctx.base_url.starts_with('/') {
			ctx = ctx.with_base_url("/");
		}
		let base_url = ctx.base_url.clone();

		let mut url = self.url.trim().to_string();
		let mut host = None;
		if let Ok(uri) = url.parse::<http::Uri>()
			&& uri.scheme().is_some()
			&& let Some(uri_host) = uri.host()
		{
			let resolver = UrlResolver::new(ctx.with_host(uri_host));
			let relative = resolver.to_relative(&url);
			url = if relative.contains("://") {
				uri.path_and_query()
					.map(|pq| pq.as_str().to_string())
					.unwrap_or_default()
			} else {
				relative
			};
			host = Some(uri_host.to_string());
		}

		let mut builder = Request::builder()
			.method(method)
			.uri(format!("/{}", url.trim_start_matches('/')))
			.base_url(base_url)
			.body(self.body);
		if let Some(host) = &host {
			builder = builder.header("Host", host);
		}
		for (name, value) in &self.headers {
			builder = builder.header(name, value);
		}
		if let Some(vars) = self.post_vars {
			builder = builder.post_vars(vars);
		}
		for (name, value) in self.cookies {
			builder = builder.cookie(name, value);
		}
		for file in self.files {
			builder = builder.file(file);
		}

		let request = builder.build().map_err(request_error)?;
		Ok((request, self.session))
	}
}
