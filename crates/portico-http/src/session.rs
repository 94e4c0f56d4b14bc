//! Per-request session state and pluggable session storage.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Session ID type
pub type SessionId = String;

/// Returns true when a session or query value counts as "set".
///
/// `null`, `false`, `0`, the empty string, `"0"` and the strings `false`,
/// `off` and `no` (in any case) are falsy. Everything else is truthy.
///
/// # Examples
///
/// ```
/// use portico_http::is_truthy;
/// use serde_json::json;
///
/// assert!(is_truthy(&json!(1)));
/// assert!(is_truthy(&json!("yes")));
/// assert!(!is_truthy(&json!("0")));
/// assert!(!is_truthy(&json!("Off")));
/// assert!(!is_truthy(&json!(null)));
/// ```
pub fn is_truthy(value: &serde_json::Value) -> bool {
	use serde_json::Value;

	match value {
		Value::Null => false,
		Value::Bool(b) => *b,
		Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
		Value::String(s) => is_truthy_str(s),
		Value::Array(_) | Value::Object(_) => true,
	}
}

/// String form of [`is_truthy`], used for query-string flags.
pub fn is_truthy_str(value: &str) -> bool {
	let value = value.trim();
	!(value.is_empty()
		|| value == "0"
		|| value.eq_ignore_ascii_case("false")
		|| value.eq_ignore_ascii_case("off")
		|| value.eq_ignore_ascii_case("no"))
}

/// Session data for one client.
///
/// A session without an id has never been persisted. [`Session::save`]
/// assigns one on first write.
///
/// # Examples
///
/// ```
/// use portico_http::Session;
/// use serde_json::json;
///
/// let mut session = Session::new();
/// assert!(session.is_empty());
///
/// session.set("isDev", json!("1"));
/// assert!(session.is_truthy("isDev"));
/// assert!(session.is_modified());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
	#[serde(skip)]
	id: Option<SessionId>,
	/// Session data as key-value pairs
	pub data: HashMap<String, serde_json::Value>,
	#[serde(skip)]
	modified: bool,
}

impl Session {
	pub fn new() -> Self {
		Self::default()
	}

	/// Load the session named by `id` from `store`.
	///
	/// Unknown ids yield a fresh session without an id, so a client cannot
	/// pick its own session id.
	pub async fn load(store: &dyn SessionStore, id: Option<&str>) -> Self {
		let Some(id) = id.filter(|id| !id.is_empty()) else {
			return Self::new();
		};
		match store.load(&id.to_string()).await {
			Some(mut session) => {
				session.id = Some(id.to_string());
				session.modified = false;
				session
			}
			None => {
				tracing::debug!(session_id = %id, "Unknown session id, starting a new session");
				Self::new()
			}
		}
	}

	pub fn id(&self) -> Option<&str> {
		self.id.as_deref()
	}

	pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value) {
		self.data.insert(key.into(), value);
		self.modified = true;
	}

	pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
		self.data.get(key)
	}

	/// Returns true when `key` is present and truthy, see [`is_truthy`].
	pub fn is_truthy(&self, key: &str) -> bool {
		self.get(key).is_some_and(is_truthy)
	}

	pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
		let removed = self.data.remove(key);
		if removed.is_some() {
			self.modified = true;
		}
		removed
	}

	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	pub fn clear(&mut self) {
		if !self.data.is_empty() {
			self.modified = true;
		}
		self.data.clear();
	}

	/// Returns true if the data changed since the session was loaded or saved.
	pub fn is_modified(&self) -> bool {
		self.modified
	}

	/// Persist the session if it changed.
	///
	/// Returns the id when one was newly assigned, so the caller can send it
	/// to the client.
	pub async fn save(&mut self, store: &dyn SessionStore) -> Option<SessionId> {
		if !self.modified {
			return None;
		}
		let (id, created) = match &self.id {
			Some(id) => (id.clone(), false),
			None => (store.create_session_id(), true),
		};
		store.save(&id, self).await;
		self.id = Some(id.clone());
		self.modified = false;
		tracing::debug!(session_id = %id, created, "Session saved");
		created.then_some(id)
	}
}

/// Session store trait for different backends
#[async_trait]
pub trait SessionStore: Send + Sync {
	/// Load session data by session ID
	async fn load(&self, session_id: &SessionId) -> Option<Session>;

	/// Save session data
	async fn save(&self, session_id: &SessionId, session: &Session);

	/// Delete session data
	async fn delete(&self, session_id: &SessionId);

	/// Create a new session ID
	fn create_session_id(&self) -> SessionId {
		Uuid::new_v4().to_string()
	}
}

/// In-memory session store for tests and single-process deployments.
///
/// # Examples
///
/// ```
/// use portico_http::{InMemorySessionStore, Session};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let store = InMemorySessionStore::new();
///
/// let mut session = Session::new();
/// session.set("isTest", json!(1));
/// let id = session.save(&store).await.unwrap();
///
/// let loaded = Session::load(&store, Some(&id)).await;
/// assert!(loaded.is_truthy("isTest"));
/// # });
/// ```
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
	sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
}

impl InMemorySessionStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of stored sessions.
	pub async fn len(&self) -> usize {
		self.sessions.lock().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.sessions.lock().await.is_empty()
	}
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
	async fn load(&self, session_id: &SessionId) -> Option<Session> {
		let sessions = self.sessions.lock().await;
		sessions.get(session_id).cloned()
	}

	async fn save(&self, session_id: &SessionId, session: &Session) {
		let mut sessions = self.sessions.lock().await;
		sessions.insert(session_id.clone(), session.clone());
	}

	async fn delete(&self, session_id: &SessionId) {
		let mut sessions = self.sessions.lock().await;
		sessions.remove(session_id);
	}
}
