//! # Portico
//!
//! The front door of a web site: takes a parsed HTTP request, decides which
//! environment it runs in, finds the rule that matches its URL and runs the
//! handler the rule names.
//!
//! The facade re-exports the member crates:
//!
//! - [`http`] (`portico-http`): requests, responses, sessions, uploads
//! - [`urls`] (`portico-urls`): URL resolution and rule routing
//! - [`conf`] (`portico-conf`): settings and environment classification
//! - [`dispatch`] (`portico-dispatch`): the dispatch pipeline
//!
//! ## Feature Flags
//!
//! - `minimal` - Message model and URL utilities only
//! - `full` (default) - Everything
//! - `conf` - Settings and environment classification
//! - `dispatch` - The dispatch pipeline (implies `conf`)
//!
//! ## Quick Example
//!
//! ```rust
//! # #[cfg(feature = "dispatch")]
//! # tokio_test::block_on(async {
//! use portico::prelude::*;
//! use std::sync::Arc;
//!
//! struct ArticleHandler;
//!
//! #[async_trait]
//! impl Handler for ArticleHandler {
//!     async fn handle(
//!         &self,
//!         request: &mut Request,
//!         _ctx: &mut RequestContext<'_>,
//!     ) -> portico::http::Result<Outcome> {
//!         let slug = request.param("Slug").unwrap_or("index").to_string();
//!         Ok(Outcome::body(format!("article {}", slug)))
//!     }
//! }
//!
//! let settings = SettingsBuilder::new()
//!     .rule(10, "articles/$Slug", "ArticleHandler")
//!     .build()
//!     .unwrap();
//! let dispatcher = Dispatcher::builder(settings)
//!     .handler("ArticleHandler", || Arc::new(ArticleHandler))
//!     .build()
//!     .unwrap();
//!
//! let ambient = Ambient::new();
//! let response = dispatcher
//!     .test(&ambient, TestRequest::new("/articles/hello"))
//!     .await
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(response.body_text(), "article hello");
//! # });
//! ```

pub use portico_http as http;
pub use portico_urls as urls;

#[cfg(feature = "conf")]
pub use portico_conf as conf;

#[cfg(feature = "dispatch")]
pub use portico_dispatch as dispatch;

// Message model
pub use portico_http::{
	Error, Extensions, InMemorySessionStore, Params, Request, RequestBuilder, Response, Session,
	SessionStore, UploadRegistry, UploadVerifier, UploadedFile,
};

// URL resolution and routing
pub use portico_urls::{
	PatternRouter, RouteResult, Rule, RuleRouter, RuleSet, UrlContext, UrlResolver,
};

#[cfg(feature = "conf")]
pub use portico_conf::{
	AccessGate, ConfigError, EnvironmentClassifier, EnvironmentType, Settings, SettingsBuilder,
};

#[cfg(feature = "dispatch")]
pub use portico_dispatch::{
	Ambient, DispatchError, Dispatcher, Handler, HandlerRegistry, Outcome, ProcessorChain,
	RequestContext, RequestProcessor, TestRequest,
};

/// Commonly used types.
pub mod prelude {
	pub use crate::{
		Error, PatternRouter, Request, Response, RuleSet, Session, UrlContext, UrlResolver,
	};

	// External
	pub use async_trait::async_trait;

	#[cfg(feature = "conf")]
	pub use crate::{EnvironmentType, Settings, SettingsBuilder};

	#[cfg(feature = "dispatch")]
	pub use crate::{
		Ambient, DispatchError, Dispatcher, Handler, Outcome, RequestContext, RequestProcessor,
		TestRequest,
	};
}
