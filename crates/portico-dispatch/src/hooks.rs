//! Request lifecycle hooks.

use async_trait::async_trait;
use portico_http::{Extensions, Request, Response, Session};
use std::sync::Arc;

/// Hooks run around every dispatched request.
///
/// Returning `false` from [`pre_request`](Self::pre_request) rejects the
/// request with a `400` before any handler runs. Returning `false` from
/// [`post_request`](Self::post_request) turns the finished response into a
/// fatal error.
#[async_trait]
pub trait RequestProcessor: Send + Sync {
	async fn pre_request(&self, _request: &Request, _session: &Session, _model: &Extensions) -> bool {
		true
	}

	async fn post_request(&self, _request: &Request, _response: &Response, _model: &Extensions) -> bool {
		true
	}
}

/// Runs several processors as one.
///
/// Pre-request hooks run in the order the processors were added and
/// post-request hooks in reverse order. The first veto stops the chain.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use portico_dispatch::{ProcessorChain, RequestProcessor};
/// use portico_http::{Extensions, Request, Session};
/// use std::sync::Arc;
///
/// struct RequireHost;
///
/// #[async_trait]
/// impl RequestProcessor for RequireHost {
///     async fn pre_request(&self, request: &Request, _: &Session, _: &Extensions) -> bool {
///         request.host().is_some()
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let chain = ProcessorChain::new().add_processor(Arc::new(RequireHost));
///
/// let request = Request::builder().uri("/").build().unwrap();
/// assert!(!chain.pre_request(&request, &Session::new(), &Extensions::new()).await);
/// # });
/// ```
#[derive(Clone, Default)]
pub struct ProcessorChain {
	processors: Vec<Arc<dyn RequestProcessor>>,
}

impl ProcessorChain {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a processor to the end of the chain.
	pub fn add_processor(mut self, processor: Arc<dyn RequestProcessor>) -> Self {
		self.processors.push(processor);
		self
	}

	pub fn push(&mut self, processor: Arc<dyn RequestProcessor>) {
		self.processors.push(processor);
	}

	pub fn len(&self) -> usize {
		self.processors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.processors.is_empty()
	}
}

#[async_trait]
impl RequestProcessor for ProcessorChain {
	async fn pre_request(&self, request: &Request, session: &Session, model: &Extensions) -> bool {
		for (idx, processor) in self.processors.iter().enumerate() {
			if !processor.pre_request(request, session, model).await {
				tracing::debug!(processor = idx, "Pre-request hook rejected the request");
				return false;
			}
		}
		true
	}

	async fn post_request(&self, request: &Request, response: &Response, model: &Extensions) -> bool {
		for (idx, processor) in self.processors.iter().enumerate().rev() {
			if !processor.post_request(request, response, model).await {
				tracing::debug!(processor = idx, "Post-request hook rejected the response");
				return false;
			}
		}
		true
	}
}

impl std::fmt::Debug for ProcessorChain {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ProcessorChain")
			.field("processors", &self.processors.len())
			.finish()
	}
}
