//! The request dispatch pipeline.

use portico_conf::{
	AccessGate, ConfigError, DenyAllGate, EnvironmentClassifier, EnvironmentType, Settings,
};
use portico_http::{
	Extensions, InMemorySessionStore, Params, Request, Response, Session, SessionStore,
	UploadRegistry, UploadVerifier,
};
use portico_urls::{
	Binding, PatternRouter, RedirectTarget, RouteResult, RuleRouter, RuleSet, UrlContext,
	UrlResolver,
};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

use crate::ambient::{Ambient, AmbientState};
use crate::handler::{Handler, HandlerRegistry, Outcome, RequestContext};
use crate::hooks::{ProcessorChain, RequestProcessor};
use crate::testing::TestRequest;
use crate::{DispatchError, rejection_response, request_error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
	Direct,
	Test,
}

/// Routes requests to handlers and runs the request lifecycle.
///
/// A dispatcher is built once and shared between requests; everything it
/// holds is read-only after [`DispatcherBuilder::build`].
pub struct Dispatcher {
	settings: Arc<Settings>,
	rules: RuleSet,
	router: Arc<dyn RuleRouter>,
	handlers: HandlerRegistry,
	processors: Arc<dyn RequestProcessor>,
	classifier: EnvironmentClassifier,
	sessions: Arc<dyn SessionStore>,
	uploads: Arc<dyn UploadVerifier>,
	ssl_patterns: Vec<Regex>,
}

impl Dispatcher {
	pub fn builder(settings: Settings) -> DispatcherBuilder {
		DispatcherBuilder::new(settings)
	}

	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	pub fn rules(&self) -> &RuleSet {
		&self.rules
	}

	pub fn classifier(&self) -> &EnvironmentClassifier {
		&self.classifier
	}

	/// Dispatch a request received from the transport.
	///
	/// Returns `Ok(None)` when no rule matches. The session named by the
	/// session cookie is loaded from the session store and saved back once
	/// the handler has finished; a newly created session is announced with a
	/// `Set-Cookie` header.
	///
	/// # Errors
	///
	/// - [`DispatchError::MalformedRequest`] for uploads the upload verifier
	///   does not recognise
	/// - [`DispatchError::RequestRejected`] when a pre-request hook vetoes
	/// - [`DispatchError::NoHandler`], [`DispatchError::InvalidHandlerResult`]
	///   and [`DispatchError::Handler`] for handler faults
	/// - [`DispatchError::ResponseRejected`] when a post-request hook vetoes
	pub async fn direct(&self, request: Request) -> Result<Option<Response>, DispatchError> {
		verify_uploads(&request, self.uploads.as_ref())?;

		let cookie = self.settings.session_cookie_name.as_str();
		let mut session = Session::load(self.sessions.as_ref(), request.cookie(cookie)).await;
		let ambient = Ambient::from_state(AmbientState::from_request(&request, &session));

		self.run(request, &mut session, ambient, Mode::Direct).await
	}

	/// Dispatch a test request.
	///
	/// The full pipeline runs against the test request. While it runs,
	/// `ambient` holds the test request's state; the caller's state is put
	/// back on every exit path, including errors and panics. Sessions are
	/// never written to the session store.
	///
	/// # Examples
	///
	/// ```
	/// use portico_conf::SettingsBuilder;
	/// use portico_dispatch::{Ambient, Dispatcher, TestRequest};
	///
	/// # tokio_test::block_on(async {
	/// let dispatcher = Dispatcher::builder(SettingsBuilder::new().rule(10, "old", "->301 /new").build().unwrap())
	///     .build()
	///     .unwrap();
	///
	/// let ambient = Ambient::new();
	/// let response = dispatcher
	///     .test(&ambient, TestRequest::new("http://example.com/old"))
	///     .await
	///     .unwrap()
	///     .unwrap();
	///
	/// assert_eq!(response.status_code(), 301);
	/// assert_eq!(response.header("Location"), Some("/new"));
	/// # });
	/// ```
	pub async fn test(
		&self,
		ambient: &Ambient,
		request: TestRequest<'_>,
	) -> Result<Option<Response>, DispatchError> {
		let uploads = UploadRegistry::new();
		uploads.register_all(request.files());

		let (request, session) = request.into_request(&self.settings)?;
		let mut fresh = Session::new();
		let session = session.unwrap_or(&mut fresh);

		let saved = ambient.replace(AmbientState::from_request(&request, session));
		let restore = ambient.clone();
		let _restore = scopeguard::guard(saved, move |saved| restore.restore(saved));

		verify_uploads(&request, &uploads)?;
		self.run(request, session, ambient.clone(), Mode::Test).await
	}

	async fn run(
		&self,
		mut request: Request,
		session: &mut Session,
		ambient: Ambient,
		mode: Mode,
	) -> Result<Option<Response>, DispatchError> {
		let urls = UrlResolver::new(self.settings.url_context(UrlContext::from_request(&request)));
		let model = Extensions::new();

		let (environment, early) = match self.classifier.classify(&request, session).await {
			Ok(environment) => (environment, self.canonical_redirect(&urls, environment)),
			Err(portico_http::Error::Halt(response)) => {
				tracing::debug!(status = response.status_code(), "Classification finished the request");
				(EnvironmentType::Live, Some(*response))
			}
			Err(err) => return Err(DispatchError::Handler(err)),
		};

		let response = match early {
			Some(response) => Some(response),
			None => {
				if !self.processors.pre_request(&request, session, &model).await {
					return Err(DispatchError::RequestRejected(Box::new(rejection_response(
						&self.settings.rejection_message,
					))));
				}
				let mut ctx = RequestContext {
					session: &mut *session,
					model: model.clone(),
					environment,
					urls: urls.clone(),
					ambient,
					settings: self.settings.clone(),
				};
				self.route(&mut request, &mut ctx).await?
			}
		};

		let created = match mode {
			Mode::Direct => session.save(self.sessions.as_ref()).await,
			Mode::Test => None,
		};

		let Some(mut response) = response else {
			tracing::debug!(path = %request.path(), "No rule matched");
			return Ok(None);
		};
		if let Some(id) = created {
			response.set_header("Set-Cookie", self.session_cookie(&id, &urls, request.is_secure()));
		}

		if !self.processors.post_request(&request, &response, &model).await {
			return Err(DispatchError::ResponseRejected);
		}
		Ok(Some(response))
	}

	/// Redirects to the canonical `www.` host or to `https`, when configured.
	fn canonical_redirect(&self, urls: &UrlResolver, environment: EnvironmentType) -> Option<Response> {
		let redirects = &self.settings.redirects;
		if redirects.force_www
			&& let Some(target) = urls.www_redirect_target(environment.is_live())
		{
			return Some(Response::redirect_to(&target, 301));
		}
		if redirects.force_ssl
			&& let Some(target) = urls.ssl_redirect_target(&self.ssl_patterns)
		{
			return Some(Response::redirect_to(&target, 302));
		}
		None
	}

	async fn route(
		&self,
		request: &mut Request,
		ctx: &mut RequestContext<'_>,
	) -> Result<Option<Response>, DispatchError> {
		let Some(result) = self.router.resolve(request, &self.rules) else {
			return Ok(None);
		};
		match result {
			RouteResult::Redirect(target) => Ok(Some(redirect_response(&target))),
			RouteResult::Binding(binding) => self.invoke(request, ctx, binding).await.map(Some),
		}
	}

	async fn invoke(
		&self,
		request: &mut Request,
		ctx: &mut RequestContext<'_>,
		binding: Binding,
	) -> Result<Response, DispatchError> {
		request.shift(binding.consumed);
		request.push_params(binding.params);

		// Captured `Redirect` and `Controller` params take precedence over the
		// rule target.
		let latest = request.latest_params().cloned().unwrap_or_default();
		if let Some(location) = latest.get("Redirect") {
			return Ok(Response::redirect_to(location, 302));
		}
		let id = latest
			.get("Controller")
			.cloned()
			.unwrap_or(binding.handler);
		if let RouteResult::Redirect(target) = RouteResult::from_target(&id, Params::new(), 0) {
			return Ok(redirect_response(&target));
		}
		if id.is_empty() {
			return Err(DispatchError::NoHandler(
				"The matched rule did not provide a handler".to_string(),
			));
		}
		let handler = self
			.handlers
			.create(&id)
			.ok_or_else(|| DispatchError::NoHandler(format!("No handler registered for '{}'", id)))?;

		tracing::debug!(handler = %id, remaining = %request.remaining(), "Invoking handler");
		self.run_handler(&id, handler, request, ctx).await
	}

	/// Run `handler`, following delegations, and catch early responses.
	async fn run_handler(
		&self,
		id: &str,
		mut handler: Arc<dyn Handler>,
		request: &mut Request,
		ctx: &mut RequestContext<'_>,
	) -> Result<Response, DispatchError> {
		let max_depth = self.settings.max_delegation_depth;
		let mut delegations = 0;
		loop {
			let outcome = match handler.handle(request, ctx).await {
				Ok(outcome) => outcome,
				Err(portico_http::Error::Halt(response)) => {
					tracing::debug!(handler = %id, status = response.status_code(), "Handler halted");
					return Ok(*response);
				}
				Err(err) => return Err(DispatchError::Handler(err)),
			};

			match outcome {
				Outcome::Delegate(next) => {
					delegations += 1;
					if delegations > max_depth {
						return Err(DispatchError::InvalidHandlerResult(format!(
							"'{}' delegated more than {} times",
							id, max_depth
						)));
					}
					handler = next;
				}
				outcome => {
					return outcome.into_response().ok_or_else(|| {
						DispatchError::InvalidHandlerResult(format!("'{}' produced no response", id))
					});
				}
			}
		}
	}

	fn session_cookie(&self, id: &str, urls: &UrlResolver, secure: bool) -> String {
		let base_url = urls.context().base_url.as_str();
		let path = if base_url.starts_with('/') { base_url } else { "/" };
		let mut cookie = format!(
			"{}={}; Path={}; HttpOnly",
			self.settings.session_cookie_name, id, path
		);
		if secure {
			cookie.push_str("; Secure");
		}
		cookie
	}
}

impl fmt::Debug for Dispatcher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Dispatcher")
			.field("settings", &self.settings)
			.field("rules", &self.rules)
			.field("handlers", &self.handlers)
			.finish_non_exhaustive()
	}
}

fn verify_uploads(request: &Request, uploads: &dyn UploadVerifier) -> Result<(), DispatchError> {
	for file in request.files() {
		file.verify(uploads).map_err(request_error)?;
	}
	Ok(())
}

fn redirect_response(target: &RedirectTarget) -> Response {
	Response::redirect_to(&target.location, target.code.unwrap_or(302))
}

/// Builder for [`Dispatcher`].
///
/// Without further configuration the dispatcher routes with
/// [`PatternRouter`] over the settings' rules, keeps sessions in memory,
/// denies every environment override and treats every upload as unverified.
pub struct DispatcherBuilder {
	settings: Settings,
	rules: Option<RuleSet>,
	router: Arc<dyn RuleRouter>,
	handlers: HandlerRegistry,
	processors: ProcessorChain,
	gate: Arc<dyn AccessGate>,
	sessions: Arc<dyn SessionStore>,
	uploads: Arc<dyn UploadVerifier>,
}

impl DispatcherBuilder {
	pub fn new(settings: Settings) -> Self {
		Self {
			settings,
			rules: None,
			router: Arc::new(PatternRouter),
			handlers: HandlerRegistry::new(),
			processors: ProcessorChain::new(),
			gate: Arc::new(DenyAllGate),
			sessions: Arc::new(InMemorySessionStore::new()),
			uploads: Arc::new(UploadRegistry::new()),
		}
	}

	/// Route with `rules` instead of the rules in the settings.
	pub fn rules(mut self, rules: RuleSet) -> Self {
		self.rules = Some(rules);
		self
	}

	pub fn router(mut self, router: Arc<dyn RuleRouter>) -> Self {
		self.router = router;
		self
	}

	/// Register a handler factory under `id`.
	pub fn handler<F>(mut self, id: impl Into<String>, factory: F) -> Self
	where
		F: Fn() -> Arc<dyn Handler> + Send + Sync + 'static,
	{
		self.handlers.register(id, factory);
		self
	}

	pub fn handlers(mut self, handlers: HandlerRegistry) -> Self {
		self.handlers = handlers;
		self
	}

	/// Adds a request processor to the end of the hook chain.
	pub fn processor(mut self, processor: Arc<dyn RequestProcessor>) -> Self {
		self.processors.push(processor);
		self
	}

	pub fn access_gate(mut self, gate: Arc<dyn AccessGate>) -> Self {
		self.gate = gate;
		self
	}

	pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
		self.sessions = store;
		self
	}

	pub fn upload_verifier(mut self, verifier: Arc<dyn UploadVerifier>) -> Self {
		self.uploads = verifier;
		self
	}

	/// Validate the settings and build the dispatcher.
	///
	/// # Errors
	///
	/// Returns [`ConfigError::Validation`] when the settings are inconsistent.
	pub fn build(self) -> Result<Dispatcher, ConfigError> {
		self.settings.validate()?;
		let ssl_patterns = self.settings.redirects.compiled_ssl_patterns()?;
		let rules = self.rules.unwrap_or_else(|| self.settings.rule_set());
		let classifier = EnvironmentClassifier::new(self.settings.environment.clone(), self.gate);

		tracing::debug!(
			rules = rules.len(),
			handlers = self.handlers.len(),
			processors = self.processors.len(),
			"Dispatcher built"
		);
		Ok(Dispatcher {
			settings: Arc::new(self.settings),
			rules,
			router: self.router,
			handlers: self.handlers,
			processors: Arc::new(self.processors),
			classifier,
			sessions: self.sessions,
			uploads: self.uploads,
			ssl_patterns,
		})
	}
}

impl fmt::Debug for DispatcherBuilder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DispatcherBuilder")
			.field("settings", &self.settings)
			.field("rules", &self.rules)
			.field("handlers", &self.handlers)
			.field("processors", &self.processors)
			.finish_non_exhaustive()
	}
}
