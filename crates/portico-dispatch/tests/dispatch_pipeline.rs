//! Integration tests for the direct dispatch pipeline
//!
//! Covers each pipeline stage:
//! - Redirect rules and handler invocation
//! - Early responses from nested handler code and delegation chains
//! - Pre/post request vetoes
//! - Fatal handler faults
//! - Session persistence and canonical redirects

use async_trait::async_trait;
use portico_conf::{Settings, SettingsBuilder, StaticGate};
use portico_dispatch::{
	DispatchError, Dispatcher, DispatcherBuilder, Handler, Outcome, RequestContext, RequestProcessor,
};
use portico_http::{
	Error, Extensions, Request, Response, Session, UploadEntry, UploadRegistry, UploadedFile,
};
use rstest::rstest;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Echoes what routing left on the request
struct EchoHandler;

#[async_trait]
impl Handler for EchoHandler {
	async fn handle(
		&self,
		request: &mut Request,
		ctx: &mut RequestContext<'_>,
	) -> portico_http::Result<Outcome> {
		Ok(Outcome::body(format!(
			"env={} remaining={} year={}",
			ctx.environment,
			request.remaining(),
			request.param("Year").unwrap_or("-")
		)))
	}
}

fn require_admin() -> portico_http::Result<()> {
	let mut forbidden = Response::with_body("Forbidden");
	forbidden.set_status_code(403, None)?;
	Err(Error::halt(forbidden))
}

/// Finishes early from a nested call
struct AdminHandler;

#[async_trait]
impl Handler for AdminHandler {
	async fn handle(
		&self,
		_request: &mut Request,
		_ctx: &mut RequestContext<'_>,
	) -> portico_http::Result<Outcome> {
		require_admin()?;
		Ok(Outcome::body("admin area"))
	}
}

struct FailingHandler;

#[async_trait]
impl Handler for FailingHandler {
	async fn handle(
		&self,
		_request: &mut Request,
		_ctx: &mut RequestContext<'_>,
	) -> portico_http::Result<Outcome> {
		Err(Error::Internal("database unavailable".to_string()))
	}
}

/// Delegates forever
struct LoopHandler;

#[async_trait]
impl Handler for LoopHandler {
	async fn handle(
		&self,
		_request: &mut Request,
		_ctx: &mut RequestContext<'_>,
	) -> portico_http::Result<Outcome> {
		Ok(Outcome::delegate(LoopHandler))
	}
}

/// Consumes one more segment and hands over to [`EchoHandler`]
struct NestedHandler;

#[async_trait]
impl Handler for NestedHandler {
	async fn handle(
		&self,
		request: &mut Request,
		_ctx: &mut RequestContext<'_>,
	) -> portico_http::Result<Outcome> {
		request.shift(1);
		Ok(Outcome::delegate(EchoHandler))
	}
}

/// Counts visits in the session
struct VisitHandler;

#[async_trait]
impl Handler for VisitHandler {
	async fn handle(
		&self,
		_request: &mut Request,
		ctx: &mut RequestContext<'_>,
	) -> portico_http::Result<Outcome> {
		let visits = ctx
			.session
			.get("visits")
			.and_then(|v| v.as_u64())
			.unwrap_or(0)
			+ 1;
		ctx.session.set("visits", json!(visits));
		Ok(Outcome::body(visits.to_string()))
	}
}

/// Counts itself and hands over to the next handler in the chain
struct StepHandler {
	next: Arc<dyn Handler>,
	steps: Arc<AtomicUsize>,
}

#[async_trait]
impl Handler for StepHandler {
	async fn handle(
		&self,
		request: &mut Request,
		_ctx: &mut RequestContext<'_>,
	) -> portico_http::Result<Outcome> {
		self.steps.fetch_add(1, Ordering::SeqCst);
		request.shift(1);
		Ok(Outcome::Delegate(self.next.clone()))
	}
}

fn denied() -> Response {
	let mut response = Response::with_body("Denied by policy");
	response.set_status_code(403, Some("Denied")).unwrap();
	response.set_header("X-Denied-By", "policy");
	response
}

fn deny() -> portico_http::Result<()> {
	Err(Error::halt(denied()))
}

/// Innermost handler of the chain, finishes with a 403
struct DenyingHandler {
	after_halt: Arc<AtomicUsize>,
}

#[async_trait]
impl Handler for DenyingHandler {
	async fn handle(
		&self,
		_request: &mut Request,
		_ctx: &mut RequestContext<'_>,
	) -> portico_http::Result<Outcome> {
		deny()?;
		self.after_halt.fetch_add(1, Ordering::SeqCst);
		Ok(Outcome::body("allowed"))
	}
}

/// Records hook calls and vetoes as configured
#[derive(Default)]
struct Gatekeeper {
	allow_request: bool,
	allow_response: bool,
	pre_calls: AtomicUsize,
	post_calls: AtomicUsize,
}

impl Gatekeeper {
	fn new(allow_request: bool, allow_response: bool) -> Arc<Self> {
		Arc::new(Self {
			allow_request,
			allow_response,
			..Self::default()
		})
	}
}

#[async_trait]
impl RequestProcessor for Gatekeeper {
	async fn pre_request(&self, _: &Request, _: &Session, _: &Extensions) -> bool {
		self.pre_calls.fetch_add(1, Ordering::SeqCst);
		self.allow_request
	}

	async fn post_request(&self, _: &Request, _: &Response, _: &Extensions) -> bool {
		self.post_calls.fetch_add(1, Ordering::SeqCst);
		self.allow_response
	}
}

fn settings() -> Settings {
	SettingsBuilder::new()
		.rule(100, "", "->/home")
		.rule(90, "old-news", "->301 /news")
		.rule(50, "blog/$Year!", "EchoHandler")
		.rule(50, "admin", "AdminHandler")
		.rule(50, "fail", "FailingHandler")
		.rule(50, "loop", "LoopHandler")
		.rule(50, "nested", "NestedHandler")
		.rule(50, "visit", "VisitHandler")
		.rule(50, "ghost", "GhostHandler")
		.rule(40, "go/$Redirect!", "EchoHandler")
		.rule(10, "$Controller!/$Action", "MissingHandler")
		.dev_server("localhost")
		.max_delegation_depth(3)
		.build()
		.unwrap()
}

fn builder(settings: Settings) -> DispatcherBuilder {
	Dispatcher::builder(settings)
		.handler("EchoHandler", || Arc::new(EchoHandler))
		.handler("AdminHandler", || Arc::new(AdminHandler))
		.handler("FailingHandler", || Arc::new(FailingHandler))
		.handler("LoopHandler", || Arc::new(LoopHandler))
		.handler("NestedHandler", || Arc::new(NestedHandler))
		.handler("VisitHandler", || Arc::new(VisitHandler))
}

fn dispatcher() -> Dispatcher {
	builder(settings()).build().unwrap()
}

fn get(uri: &str) -> Request {
	Request::builder().uri(uri).build().unwrap()
}

#[rstest]
#[case("http://example.com/", 302, "/home")]
#[case("http://example.com/old-news", 301, "/news")]
#[case("http://example.com/go/elsewhere", 302, "elsewhere")]
#[tokio::test]
async fn test_redirects(#[case] uri: &str, #[case] status: u16, #[case] location: &str) {
	let response = dispatcher().direct(get(uri)).await.unwrap().unwrap();

	assert_eq!(response.status_code(), status);
	assert_eq!(response.header("Location"), Some(location));
}

#[tokio::test]
async fn test_handler_sees_remaining_path_and_params() {
	let response = dispatcher()
		.direct(get("http://example.com/blog/2024/hello/world"))
		.await
		.unwrap()
		.unwrap();

	assert_eq!(response.status_code(), 200);
	assert_eq!(response.body_text(), "env=live remaining=hello/world year=2024");
}

#[tokio::test]
async fn test_environment_reaches_handler() {
	let response = dispatcher()
		.direct(get("http://localhost/blog/2024"))
		.await
		.unwrap()
		.unwrap();

	assert_eq!(response.body_text(), "env=dev remaining= year=2024");
}

#[tokio::test]
async fn test_nested_halt_becomes_response() {
	let response = dispatcher()
		.direct(get("http://example.com/admin"))
		.await
		.unwrap()
		.unwrap();

	assert_eq!(response.status_code(), 403);
	assert_eq!(response.body_text(), "Forbidden");
}

#[tokio::test]
async fn test_halt_at_end_of_delegation_chain_is_final_response() {
	let steps = Arc::new(AtomicUsize::new(0));
	let after_halt = Arc::new(AtomicUsize::new(0));
	let settings = SettingsBuilder::new()
		.rule(50, "members", "ChainHandler")
		.max_delegation_depth(3)
		.build()
		.unwrap();
	let dispatcher = Dispatcher::builder(settings)
		.handler("ChainHandler", {
			let steps = steps.clone();
			let after_halt = after_halt.clone();
			move || -> Arc<dyn Handler> {
				let denying = Arc::new(DenyingHandler {
					after_halt: after_halt.clone(),
				});
				let inner = Arc::new(StepHandler {
					next: denying,
					steps: steps.clone(),
				});
				Arc::new(StepHandler {
					next: inner,
					steps: steps.clone(),
				})
			}
		})
		.build()
		.unwrap();

	let response = dispatcher
		.direct(get("http://example.com/members/area/profile"))
		.await
		.unwrap()
		.unwrap();

	let expected = denied();
	assert_eq!(response.status_code(), 403);
	assert_eq!(response.status_description(), "Denied");
	assert_eq!(response.body_text(), "Denied by policy");
	assert_eq!(response.headers(), expected.headers());
	assert_eq!(response.header("X-Denied-By"), Some("policy"));
	assert_eq!(steps.load(Ordering::SeqCst), 2);
	assert_eq!(after_halt.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_routing_miss_returns_none() {
	let settings = SettingsBuilder::new().rule(10, "about", "EchoHandler").build().unwrap();
	let dispatcher = builder(settings).build().unwrap();

	let result = dispatcher.direct(get("http://example.com/contact")).await.unwrap();
	assert!(result.is_none());
}

#[tokio::test]
async fn test_controller_param_overrides_target() {
	let response = dispatcher()
		.direct(get("http://example.com/EchoHandler/show"))
		.await
		.unwrap()
		.unwrap();

	assert_eq!(response.status_code(), 200);
	assert!(response.body_text().starts_with("env=live"));
}

#[rstest]
#[case("http://example.com/ghost", "No handler registered for 'GhostHandler'")]
#[case("http://example.com/Unknown/x", "No handler registered for 'Unknown'")]
#[tokio::test]
async fn test_unknown_handler_is_fatal(#[case] uri: &str, #[case] message: &str) {
	let err = dispatcher().direct(get(uri)).await.unwrap_err();

	assert!(matches!(err, DispatchError::NoHandler(_)));
	assert_eq!(err.to_string(), message);
	assert_eq!(err.to_response().status_code(), 500);
}

#[tokio::test]
async fn test_handler_error_is_fatal() {
	let err = dispatcher()
		.direct(get("http://example.com/fail"))
		.await
		.unwrap_err();

	assert!(matches!(err, DispatchError::Handler(Error::Internal(_))));
	let response = err.to_response();
	assert_eq!(response.status_code(), 500);
	assert!(!response.body_text().contains("database"));
}

#[tokio::test]
async fn test_delegation_is_followed() {
	let response = dispatcher()
		.direct(get("http://example.com/nested/inner/rest"))
		.await
		.unwrap()
		.unwrap();

	assert_eq!(response.body_text(), "env=live remaining=rest year=-");
}

#[tokio::test]
async fn test_delegation_depth_exhaustion() {
	let err = dispatcher()
		.direct(get("http://example.com/loop"))
		.await
		.unwrap_err();

	assert!(matches!(err, DispatchError::InvalidHandlerResult(_)));
}

#[tokio::test]
async fn test_pre_request_veto_rejects_before_handler() {
	let gatekeeper = Gatekeeper::new(false, true);
	let dispatcher = builder(settings())
		.processor(gatekeeper.clone())
		.build()
		.unwrap();

	let err = dispatcher
		.direct(get("http://example.com/visit"))
		.await
		.unwrap_err();

	let DispatchError::RequestRejected(response) = &err else {
		panic!("expected a rejected request");
	};
	assert_eq!(response.status_code(), 400);
	assert_eq!(response.body_text(), "Invalid request");
	assert_eq!(err.to_response().body_text(), "Invalid request");
	assert_eq!(gatekeeper.post_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_post_request_veto_is_fatal() {
	let gatekeeper = Gatekeeper::new(true, false);
	let dispatcher = builder(settings())
		.processor(gatekeeper.clone())
		.build()
		.unwrap();

	let err = dispatcher
		.direct(get("http://example.com/blog/2024"))
		.await
		.unwrap_err();

	assert!(matches!(err, DispatchError::ResponseRejected));
	assert_eq!(gatekeeper.pre_calls.load(Ordering::SeqCst), 1);
	assert_eq!(gatekeeper.post_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_denied_override_challenge_runs_post_hook() {
	let gatekeeper = Gatekeeper::new(true, true);
	let dispatcher = builder(settings())
		.processor(gatekeeper.clone())
		.build()
		.unwrap();

	let response = dispatcher
		.direct(get("http://example.com/blog/2024?isDev=1"))
		.await
		.unwrap()
		.unwrap();

	assert_eq!(response.status_code(), 401);
	assert!(response.header("WWW-Authenticate").is_some());
	assert_eq!(gatekeeper.pre_calls.load(Ordering::SeqCst), 0);
	assert_eq!(gatekeeper.post_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_granted_override_persists_in_session() {
	let dispatcher = builder(settings())
		.access_gate(Arc::new(StaticGate::granting()))
		.build()
		.unwrap();

	let response = dispatcher
		.direct(get("http://example.com/blog/2024?isDev=1"))
		.await
		.unwrap()
		.unwrap();
	assert!(response.body_text().starts_with("env=dev"));

	let cookie = response.header("Set-Cookie").unwrap();
	let id = cookie
		.strip_prefix("PORTICOSESSID=")
		.and_then(|rest| rest.split(';').next())
		.unwrap();

	let request = Request::builder()
		.uri("http://example.com/blog/2024")
		.cookie("PORTICOSESSID", id)
		.build()
		.unwrap();
	let response = dispatcher.direct(request).await.unwrap().unwrap();
	assert!(response.body_text().starts_with("env=dev"));
}

#[tokio::test]
async fn test_session_is_saved_and_resumed() {
	let dispatcher = dispatcher();

	let first = dispatcher
		.direct(get("http://example.com/visit"))
		.await
		.unwrap()
		.unwrap();
	assert_eq!(first.body_text(), "1");
	let cookie = first.header("Set-Cookie").unwrap().to_string();
	assert!(cookie.ends_with("; Path=/; HttpOnly"));

	let id = cookie
		.strip_prefix("PORTICOSESSID=")
		.and_then(|rest| rest.split(';').next())
		.unwrap();
	let request = Request::builder()
		.uri("http://example.com/visit")
		.header("Cookie", &format!("PORTICOSESSID={}", id))
		.build()
		.unwrap();
	let second = dispatcher.direct(request).await.unwrap().unwrap();

	assert_eq!(second.body_text(), "2");
	assert_eq!(second.header("Set-Cookie"), None);
}

#[tokio::test]
async fn test_unknown_session_id_is_not_adopted() {
	let request = Request::builder()
		.uri("http://example.com/visit")
		.cookie("PORTICOSESSID", "chosen-by-client")
		.build()
		.unwrap();

	let response = dispatcher().direct(request).await.unwrap().unwrap();
	let cookie = response.header("Set-Cookie").unwrap();
	assert!(!cookie.contains("chosen-by-client"));
}

fn upload(path: &str) -> UploadedFile {
	UploadedFile::single(
		"attachment",
		UploadEntry {
			filename: "report.pdf".to_string(),
			tmp_path: Some(path.into()),
			content_type: Some("application/pdf".to_string()),
			size: 1024,
		},
	)
}

#[tokio::test]
async fn test_unknown_upload_is_malformed() {
	let request = Request::builder()
		.uri("http://example.com/blog/2024")
		.file(upload("/etc/passwd"))
		.build()
		.unwrap();

	let err = dispatcher().direct(request).await.unwrap_err();

	let DispatchError::MalformedRequest(message) = &err else {
		panic!("expected a malformed request");
	};
	assert_eq!(message, "File upload 'attachment' doesn't appear to be a valid upload");
	assert_eq!(err.to_response().status_code(), 400);
}

#[tokio::test]
async fn test_registered_upload_is_accepted() {
	let uploads = UploadRegistry::new();
	uploads.register("/tmp/upload-abc");
	let dispatcher = builder(settings())
		.upload_verifier(Arc::new(uploads))
		.build()
		.unwrap();

	let request = Request::builder()
		.uri("http://example.com/blog/2024")
		.file(upload("/tmp/upload-abc"))
		.build()
		.unwrap();

	let response = dispatcher.direct(request).await.unwrap().unwrap();
	assert_eq!(response.status_code(), 200);
}

#[rstest]
#[case(Vec::new(), "http://example.com/blog/2024", Some("https://example.com/blog/2024"))]
#[case(vec!["^admin"], "http://example.com/admin", Some("https://example.com/admin"))]
#[case(vec!["^admin"], "http://example.com/blog/2024", None)]
#[case(Vec::new(), "https://example.com/blog/2024", None)]
#[tokio::test]
async fn test_force_ssl(
	#[case] patterns: Vec<&str>,
	#[case] uri: &str,
	#[case] location: Option<&str>,
) {
	let settings = SettingsBuilder::from_settings(settings())
		.force_ssl(patterns)
		.build()
		.unwrap();
	let dispatcher = builder(settings).build().unwrap();

	let response = dispatcher.direct(get(uri)).await.unwrap().unwrap();

	match location {
		Some(location) => {
			assert_eq!(response.status_code(), 302);
			assert_eq!(response.header("Location"), Some(location));
		}
		None => assert_ne!(response.status_code(), 302),
	}
}
