//! Test-mode dispatch leaves the caller's ambient state untouched
//!
//! The ambient snapshot must come back bit-identical after a normal run, a
//! handler error, a panic and a cancelled dispatch.

use async_trait::async_trait;
use futures::FutureExt;
use http::Method;
use portico_conf::{Settings, SettingsBuilder, StaticGate};
use portico_dispatch::{
	Ambient, AmbientState, DispatchError, Dispatcher, Handler, Outcome, RequestContext, TestRequest,
};
use portico_http::{Error, InMemorySessionStore, Request, Session, UploadEntry, UploadedFile};
use rstest::{fixture, rstest};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// Reports what the handler can see of the ambient state
struct InspectHandler;

#[async_trait]
impl Handler for InspectHandler {
	async fn handle(
		&self,
		request: &mut Request,
		ctx: &mut RequestContext<'_>,
	) -> portico_http::Result<Outcome> {
		Ok(Outcome::body(format!(
			"q={} theme={} method={} env={}",
			ctx.ambient.get_var("q").unwrap_or_default(),
			ctx.ambient.cookie("theme").unwrap_or_default(),
			request.method,
			ctx.environment
		)))
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
		Err(Error::Internal("boom".to_string()))
	}
}

struct PanickingHandler;

#[async_trait]
impl Handler for PanickingHandler {
	async fn handle(
		&self,
		_request: &mut Request,
		_ctx: &mut RequestContext<'_>,
	) -> portico_http::Result<Outcome> {
		panic!("handler bug");
	}
}

struct StalledHandler;

#[async_trait]
impl Handler for StalledHandler {
	async fn handle(
		&self,
		_request: &mut Request,
		_ctx: &mut RequestContext<'_>,
	) -> portico_http::Result<Outcome> {
		std::future::pending::<()>().await;
		Ok(Outcome::Empty)
	}
}

fn settings() -> Settings {
	SettingsBuilder::new()
		.rule(50, "inspect", "InspectHandler")
		.rule(50, "fail", "FailingHandler")
		.rule(50, "panic", "PanickingHandler")
		.rule(50, "stall", "StalledHandler")
		.build()
		.unwrap()
}

struct Harness {
	dispatcher: Dispatcher,
	store: Arc<InMemorySessionStore>,
}

#[fixture]
fn harness() -> Harness {
	let store = Arc::new(InMemorySessionStore::new());
	let dispatcher = Dispatcher::builder(settings())
		.handler("InspectHandler", || Arc::new(InspectHandler))
		.handler("FailingHandler", || Arc::new(FailingHandler))
		.handler("PanickingHandler", || Arc::new(PanickingHandler))
		.handler("StalledHandler", || Arc::new(StalledHandler))
		.access_gate(Arc::new(StaticGate::granting()))
		.session_store(store.clone())
		.build()
		.unwrap();
	Harness { dispatcher, store }
}

#[fixture]
fn ambient() -> Ambient {
	let mut state = AmbientState::default();
	state.get_vars.insert("q".to_string(), "outer".to_string());
	state.cookies.insert("theme".to_string(), "light".to_string());
	state
		.session_vars
		.insert("user".to_string(), serde_json::json!(7));
	state
		.server
		.insert("HTTP_HOST".to_string(), "caller.example".to_string());
	Ambient::from_state(state)
}

#[rstest]
#[tokio::test]
async fn test_handler_sees_test_values(harness: Harness, ambient: Ambient) {
	let before = ambient.snapshot();

	let response = harness
		.dispatcher
		.test(
			&ambient,
			TestRequest::new("/inspect?q=inner").cookie("theme", "dark"),
		)
		.await
		.unwrap()
		.unwrap();

	assert_eq!(response.body_text(), "q=inner theme=dark method=GET env=live");
	assert_eq!(ambient.snapshot(), before);
}

#[rstest]
#[tokio::test]
async fn test_post_vars_default_to_post(harness: Harness, ambient: Ambient) {
	let response = harness
		.dispatcher
		.test(&ambient, TestRequest::new("/inspect").post_var("name", "x"))
		.await
		.unwrap()
		.unwrap();

	assert!(response.body_text().contains("method=POST"));

	let response = harness
		.dispatcher
		.test(
			&ambient,
			TestRequest::new("/inspect").post_var("_method", "DELETE"),
		)
		.await
		.unwrap()
		.unwrap();
	assert!(response.body_text().contains(&format!("method={}", Method::DELETE)));
}

#[rstest]
#[tokio::test]
async fn test_state_restored_after_error(harness: Harness, ambient: Ambient) {
	let before = ambient.snapshot();

	let result = harness
		.dispatcher
		.test(&ambient, TestRequest::new("/fail?q=inner"))
		.await;

	assert!(matches!(result, Err(DispatchError::Handler(_))));
	assert_eq!(ambient.snapshot(), before);
}

#[rstest]
#[tokio::test]
async fn test_state_restored_after_panic(harness: Harness, ambient: Ambient) {
	let before = ambient.snapshot();

	let result = AssertUnwindSafe(
		harness
			.dispatcher
			.test(&ambient, TestRequest::new("/panic?q=inner").cookie("theme", "dark")),
	)
	.catch_unwind()
	.await;

	assert!(result.is_err());
	assert_eq!(ambient.snapshot(), before);
}

#[rstest]
#[tokio::test]
async fn test_state_restored_after_cancellation(harness: Harness, ambient: Ambient) {
	let before = ambient.snapshot();

	let result = tokio::time::timeout(
		Duration::from_millis(20),
		harness
			.dispatcher
			.test(&ambient, TestRequest::new("/stall?q=inner")),
	)
	.await;

	assert!(result.is_err());
	assert_eq!(ambient.snapshot(), before);
}

#[rstest]
#[tokio::test]
async fn test_session_override_persists_across_calls(harness: Harness, ambient: Ambient) {
	let mut session = Session::new();

	let response = harness
		.dispatcher
		.test(
			&ambient,
			TestRequest::new("/inspect?isDev=1").session(&mut session),
		)
		.await
		.unwrap()
		.unwrap();
	assert!(response.body_text().ends_with("env=dev"));
	assert!(session.is_truthy("isDev"));

	let response = harness
		.dispatcher
		.test(&ambient, TestRequest::new("/inspect").session(&mut session))
		.await
		.unwrap()
		.unwrap();
	assert!(response.body_text().ends_with("env=dev"));

	// a different session is unaffected
	let response = harness
		.dispatcher
		.test(&ambient, TestRequest::new("/inspect"))
		.await
		.unwrap()
		.unwrap();
	assert!(response.body_text().ends_with("env=live"));

	assert!(harness.store.is_empty().await);
}

#[rstest]
#[tokio::test]
async fn test_test_uploads_are_genuine(harness: Harness, ambient: Ambient) {
	let file = UploadedFile::single(
		"avatar",
		UploadEntry {
			filename: "me.png".to_string(),
			tmp_path: Some("/tmp/portico-test-upload".into()),
			content_type: Some("image/png".to_string()),
			size: 64,
		},
	);

	let response = harness
		.dispatcher
		.test(&ambient, TestRequest::new("/inspect").file(file.clone()))
		.await
		.unwrap()
		.unwrap();
	assert!(response.body_text().contains("method=POST"));

	let request = Request::builder()
		.method(Method::POST)
		.uri("http://example.com/inspect")
		.file(file)
		.build()
		.unwrap();
	let result = harness.dispatcher.direct(request).await;
	assert!(matches!(result, Err(DispatchError::MalformedRequest(_))));
}

#[rstest]
#[tokio::test]
async fn test_absolute_url_sets_host(harness: Harness, ambient: Ambient) {
	let response = harness
		.dispatcher
		.test(&ambient, TestRequest::new("http://www.example.com/inspect?q=abs"))
		.await
		.unwrap()
		.unwrap();

	assert!(response.body_text().starts_with("q=abs"));
	assert_eq!(ambient.server_var("HTTP_HOST").as_deref(), Some("caller.example"));
}
