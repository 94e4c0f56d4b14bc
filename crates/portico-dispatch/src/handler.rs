//! Handlers and the per-request context they run in.

use async_trait::async_trait;
use bytes::Bytes;
use portico_conf::{EnvironmentType, Settings};
use portico_http::{Extensions, Request, Response, Session};
use portico_urls::UrlResolver;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::ambient::Ambient;

/// Request handler selected by a routing rule.
///
/// Return [`Err(Error::Halt)`](portico_http::Error::Halt) from anywhere in a
/// handler, including nested calls, to finish the request with that
/// response. Any other error is a fatal dispatch fault.
#[async_trait]
pub trait Handler: Send + Sync {
	async fn handle(
		&self,
		request: &mut Request,
		ctx: &mut RequestContext<'_>,
	) -> portico_http::Result<Outcome>;
}

/// What a handler produced.
pub enum Outcome {
	/// A finished response.
	Response(Response),
	/// A body for a `200` response.
	Body(Bytes),
	/// Nothing; becomes an empty `200` response.
	Empty,
	/// Hand the request to another handler, which continues with the same
	/// request and remaining path.
	Delegate(Arc<dyn Handler>),
}

impl Outcome {
	pub fn body(body: impl Into<Bytes>) -> Self {
		Outcome::Body(body.into())
	}

	pub fn delegate(handler: impl Handler + 'static) -> Self {
		Outcome::Delegate(Arc::new(handler))
	}

	/// The response this outcome finishes with, or `None` for a delegation.
	pub(crate) fn into_response(self) -> Option<Response> {
		match self {
			Outcome::Response(response) => Some(response),
			Outcome::Body(body) => Some(Response::with_body(body)),
			Outcome::Empty => Some(Response::new()),
			Outcome::Delegate(_) => None,
		}
	}
}

impl From<Response> for Outcome {
	fn from(response: Response) -> Self {
		Outcome::Response(response)
	}
}

impl fmt::Debug for Outcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Outcome::Response(response) => f.debug_tuple("Response").field(response).finish(),
			Outcome::Body(body) => f.debug_tuple("Body").field(body).finish(),
			Outcome::Empty => f.write_str("Empty"),
			Outcome::Delegate(_) => f.write_str("Delegate(..)"),
		}
	}
}

/// Everything a handler sees besides the request itself.
pub struct RequestContext<'a> {
	/// Session of the client. Saved once the pipeline finishes.
	pub session: &'a mut Session,
	/// Request-scoped data shared with the request hooks.
	pub model: Extensions,
	pub environment: EnvironmentType,
	/// URL helpers bound to this request's host, scheme and base URL.
	pub urls: UrlResolver,
	/// Ambient request state, see [`Ambient`].
	pub ambient: Ambient,
	pub settings: Arc<Settings>,
}

impl RequestContext<'_> {
	/// Where to send the client back to: the referring page when it belongs
	/// to this site, otherwise the site root.
	pub fn back_url(&self, request: &Request) -> String {
		match request.header_str("Referer") {
			Some(referer) if self.urls.is_site_url(referer) => referer.to_string(),
			_ => self.urls.context().base_url.clone(),
		}
	}
}

impl fmt::Debug for RequestContext<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RequestContext")
			.field("session", &self.session)
			.field("environment", &self.environment)
			.field("urls", &self.urls)
			.finish_non_exhaustive()
	}
}

/// Creates a fresh handler instance.
pub type HandlerFactory = Arc<dyn Fn() -> Arc<dyn Handler> + Send + Sync>;

/// Handler ids mapped to factories.
///
/// Rule targets name handlers by id; every dispatched request gets its own
/// instance from the factory.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use portico_dispatch::{Handler, HandlerRegistry, Outcome, RequestContext};
/// use portico_http::Request;
/// use std::sync::Arc;
///
/// struct PageHandler;
///
/// #[async_trait]
/// impl Handler for PageHandler {
///     async fn handle(&self, _: &mut Request, _: &mut RequestContext<'_>) -> portico_http::Result<Outcome> {
///         Ok(Outcome::Empty)
///     }
/// }
///
/// let mut registry = HandlerRegistry::new();
/// registry.register("PageHandler", || Arc::new(PageHandler));
///
/// assert!(registry.create("PageHandler").is_some());
/// assert!(registry.create("Missing").is_none());
/// ```
#[derive(Clone, Default)]
pub struct HandlerRegistry {
	factories: HashMap<String, HandlerFactory>,
}

impl HandlerRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register `factory` under `id`, replacing any earlier registration.
	pub fn register<F>(&mut self, id: impl Into<String>, factory: F)
	where
		F: Fn() -> Arc<dyn Handler> + Send + Sync + 'static,
	{
		self.factories.insert(id.into(), Arc::new(factory));
	}

	/// Register one instance shared by all requests.
	pub fn register_shared(&mut self, id: impl Into<String>, handler: Arc<dyn Handler>) {
		self.register(id, move || handler.clone());
	}

	/// New handler instance for `id`.
	pub fn create(&self, id: &str) -> Option<Arc<dyn Handler>> {
		self.factories.get(id).map(|factory| factory())
	}

	pub fn contains(&self, id: &str) -> bool {
		self.factories.contains_key(id)
	}

	pub fn len(&self) -> usize {
		self.factories.len()
	}

	pub fn is_empty(&self) -> bool {
		self.factories.is_empty()
	}
}

impl fmt::Debug for HandlerRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
		ids.sort_unstable();
		f.debug_struct("HandlerRegistry").field("handlers", &ids).finish()
	}
}
