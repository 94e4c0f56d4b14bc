//! Ambient request state.
//!
//! Code that cannot be handed the request explicitly (templating helpers,
//! legacy integrations) reads the current request variables, session values,
//! cookies and server values from an [`Ambient`]. Direct dispatch builds a
//! fresh one per request. Test dispatch swaps the caller's state for the
//! test request's and swaps it back on every exit path.

use parking_lot::Mutex;
use portico_http::{Params, Request, Session, UploadedFile};
use std::collections::HashMap;
use std::sync::Arc;

/// Values visible as ambient state while one request runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AmbientState {
	pub get_vars: Params,
	pub post_vars: Params,
	/// Query and post variables together, post winning.
	pub request_vars: Params,
	pub session_vars: HashMap<String, serde_json::Value>,
	pub cookies: HashMap<String, String>,
	/// Transport values such as `REQUEST_METHOD` and `HTTP_HOST`.
	pub server: HashMap<String, String>,
	pub files: Vec<UploadedFile>,
}

impl AmbientState {
	/// State describing `request` and `session`.
	pub fn from_request(request: &Request, session: &Session) -> Self {
		let get_vars = request.query_params().clone();
		let post_vars = request.post_vars().clone();
		let mut request_vars = get_vars.clone();
		request_vars.extend(post_vars.clone());

		let mut server = HashMap::new();
		server.insert("REQUEST_METHOD".to_string(), request.method.to_string());
		server.insert("REQUEST_URI".to_string(), request.request_uri());
		if let Some(host) = request.host() {
			server.insert("HTTP_HOST".to_string(), host.to_string());
		}
		if request.is_secure() {
			server.insert("HTTPS".to_string(), "on".to_string());
		}

		Self {
			get_vars,
			post_vars,
			request_vars,
			session_vars: session.data.clone(),
			cookies: request.cookies().clone(),
			server,
			files: request.files().to_vec(),
		}
	}
}

/// Shared handle to [`AmbientState`].
///
/// Clones refer to the same state.
///
/// # Examples
///
/// ```
/// use portico_dispatch::{Ambient, AmbientState};
///
/// let ambient = Ambient::new();
/// let saved = ambient.snapshot();
///
/// ambient.with(|state| {
///     state.cookies.insert("theme".to_string(), "dark".to_string());
/// });
/// assert_eq!(ambient.snapshot().cookies["theme"], "dark");
///
/// ambient.restore(saved);
/// assert_eq!(ambient.snapshot(), AmbientState::default());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Ambient {
	state: Arc<Mutex<AmbientState>>,
}

impl Ambient {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_state(state: AmbientState) -> Self {
		Self {
			state: Arc::new(Mutex::new(state)),
		}
	}

	/// Copy of the current state.
	pub fn snapshot(&self) -> AmbientState {
		self.state.lock().clone()
	}

	/// Put `state` back, dropping whatever is current.
	pub fn restore(&self, state: AmbientState) {
		*self.state.lock() = state;
	}

	/// Install `state` and return the previous one.
	pub fn replace(&self, state: AmbientState) -> AmbientState {
		std::mem::replace(&mut *self.state.lock(), state)
	}

	pub fn with<R>(&self, f: impl FnOnce(&mut AmbientState) -> R) -> R {
		f(&mut self.state.lock())
	}

	pub fn get_var(&self, name: &str) -> Option<String> {
		self.state.lock().get_vars.get(name).cloned()
	}

	pub fn request_var(&self, name: &str) -> Option<String> {
		self.state.lock().request_vars.get(name).cloned()
	}

	pub fn cookie(&self, name: &str) -> Option<String> {
		self.state.lock().cookies.get(name).cloned()
	}

	pub fn session_var(&self, name: &str) -> Option<serde_json::Value> {
		self.state.lock().session_vars.get(name).cloned()
	}

	pub fn server_var(&self, name: &str) -> Option<String> {
		self.state.lock().server.get(name).cloned()
	}
}
