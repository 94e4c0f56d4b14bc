//! # Portico Dispatch
//!
//! The front door of a site: turns one parsed request into a handler
//! invocation and a finished response.
//!
//! ## Overview
//!
//! The dispatch pipeline handles:
//! - Upload provenance checks
//! - Environment classification (dev, test or live)
//! - Pre- and post-request hooks
//! - Rule lookup and handler invocation
//! - Early responses raised from nested handler code
//! - Session persistence
//!
//! ## Architecture
//!
//! ```text
//! Request → Init → Classify → PreRequest → Route ─┬─ Redirect ─┐
//!                      ↓                          └─ Invoke ───┤
//!                 (challenge)                                  ↓
//!                      └──────→ SessionSave → Normalize → PostRequest → Response
//! ```
//!
//! ## Examples
//!
//! ```rust
//! use async_trait::async_trait;
//! use portico_dispatch::{Dispatcher, Handler, Outcome, RequestContext};
//! use portico_conf::SettingsBuilder;
//! use portico_http::Request;
//! use std::sync::Arc;
//!
//! struct HelloHandler;
//!
//! #[async_trait]
//! impl Handler for HelloHandler {
//!     async fn handle(
//!         &self,
//!         _request: &mut Request,
//!         _ctx: &mut RequestContext<'_>,
//!     ) -> portico_http::Result<Outcome> {
//!         Ok(Outcome::body("Hello, World!"))
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let settings = SettingsBuilder::new()
//!     .rule(100, "", "->/hello")
//!     .rule(50, "hello", "HelloHandler")
//!     .build()
//!     .unwrap();
//!
//! let dispatcher = Dispatcher::builder(settings)
//!     .handler("HelloHandler", || Arc::new(HelloHandler))
//!     .build()
//!     .unwrap();
//!
//! let request = Request::builder().uri("http://example.com/hello").build().unwrap();
//! let response = dispatcher.direct(request).await.unwrap().unwrap();
//! assert_eq!(response.body_text(), "Hello, World!");
//!
//! let request = Request::builder().uri("http://example.com/").build().unwrap();
//! let response = dispatcher.direct(request).await.unwrap().unwrap();
//! assert_eq!(response.status_code(), 302);
//! assert_eq!(response.header("Location"), Some("/hello"));
//! # });
//! ```

pub mod ambient;
pub mod dispatcher;
pub mod handler;
pub mod hooks;
pub mod testing;

// Re-exports
pub use ambient::{Ambient, AmbientState};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use handler::{Handler, HandlerFactory, HandlerRegistry, Outcome, RequestContext};
pub use hooks::{ProcessorChain, RequestProcessor};
pub use testing::TestRequest;

use portico_http::Response;
use thiserror::Error;

/// Errors that end a dispatch without a handler-chosen response
#[derive(Debug, Error)]
pub enum DispatchError {
	/// The request cannot be trusted, e.g. an upload with an unknown
	/// temporary file
	#[error("Malformed request: {0}")]
	MalformedRequest(String),

	/// A pre-request hook vetoed the request. Carries the `400` response to
	/// send.
	#[error("Request rejected: {}", .0.body_text())]
	RequestRejected(Box<Response>),

	/// The matched rule names no handler, or an unregistered one
	#[error("{0}")]
	NoHandler(String),

	/// The handler chain did not produce a response
	#[error("Invalid result returned from handler: {0}")]
	InvalidHandlerResult(String),

	/// Handler fault other than an early response
	#[error("Handler error: {0}")]
	Handler(#[source] portico_http::Error),

	/// A post-request hook vetoed the response
	#[error("Invalid response")]
	ResponseRejected,
}

impl DispatchError {
	/// HTTP status code a transport should send for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			DispatchError::MalformedRequest(_) => 400,
			DispatchError::RequestRejected(response) => response.status_code(),
			_ => 500,
		}
	}

	/// Response for the transport boundary.
	///
	/// Client errors are answered with `400`; everything else is logged and
	/// answered with a generic `500` so no internals reach the client.
	///
	/// # Examples
	///
	/// ```
	/// use portico_dispatch::DispatchError;
	///
	/// let response = DispatchError::ResponseRejected.to_response();
	/// assert_eq!(response.status_code(), 500);
	/// assert_eq!(response.body_text(), "Internal Server Error");
	///
	/// let response = DispatchError::MalformedRequest("bad upload".to_string()).to_response();
	/// assert_eq!(response.status_code(), 400);
	/// ```
	pub fn to_response(&self) -> Response {
		match self {
			DispatchError::RequestRejected(response) => response.as_ref().clone(),
			DispatchError::MalformedRequest(message) => {
				tracing::warn!(error = %message, "Malformed request");
				plain_response(400, "Bad Request")
			}
			other => {
				tracing::error!(error = %other, "Request dispatch failed");
				plain_response(500, "Internal Server Error")
			}
		}
	}
}

fn plain_response(code: u16, body: &str) -> Response {
	let mut response = Response::with_body(body.to_string());
	// 400 and 500 are registered
	let _ = response.set_status_code(code, None);
	response.set_header("Content-Type", "text/plain; charset=utf-8");
	response
}

pub(crate) fn rejection_response(message: &str) -> Response {
	plain_response(400, message)
}

/// Map a message-model error raised while taking a request apart.
pub(crate) fn request_error(err: portico_http::Error) -> DispatchError {
	match err {
		portico_http::Error::MalformedRequest(message) => DispatchError::MalformedRequest(message),
		other => DispatchError::Handler(other),
	}
}
