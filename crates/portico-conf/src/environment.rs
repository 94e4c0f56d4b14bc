//! Environment classification.
//!
//! Every request is classified as development, test or live. The
//! classification is recomputed per request from the settings, the request
//! host and the session. A query parameter can switch one session into dev
//! or test mode, but only after an [`AccessGate`] grants the configured
//! permission; without it the client receives a credential challenge.

use async_trait::async_trait;
use portico_http::{Error, Request, Response, Session, is_truthy_str};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::settings::EnvironmentSettings;

/// Runtime environment of a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentType {
	Dev,
	Test,
	Live,
}

impl EnvironmentType {
	pub fn as_str(&self) -> &'static str {
		match self {
			EnvironmentType::Dev => "dev",
			EnvironmentType::Test => "test",
			EnvironmentType::Live => "live",
		}
	}

	pub fn is_dev(&self) -> bool {
		*self == EnvironmentType::Dev
	}

	pub fn is_test(&self) -> bool {
		*self == EnvironmentType::Test
	}

	pub fn is_live(&self) -> bool {
		*self == EnvironmentType::Live
	}
}

impl fmt::Display for EnvironmentType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for EnvironmentType {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim() {
			"dev" => Ok(EnvironmentType::Dev),
			"test" => Ok(EnvironmentType::Test),
			"live" => Ok(EnvironmentType::Live),
			other => Err(ConfigError::InvalidEnvironmentType(other.to_string())),
		}
	}
}

/// Yes/no gate in front of environment overrides.
#[async_trait]
pub trait AccessGate: Send + Sync {
	/// Returns true once the permission backend can be consulted.
	async fn storage_ready(&self) -> bool;

	/// Returns true if the client of `request` holds permission `code`.
	async fn has_permission(&self, request: &Request, session: &Session, code: &str) -> bool;
}

/// Gate with fixed answers.
#[derive(Debug, Clone, Copy)]
pub struct StaticGate {
	pub ready: bool,
	pub granted: bool,
}

impl StaticGate {
	pub fn granting() -> Self {
		Self {
			ready: true,
			granted: true,
		}
	}

	pub fn denying() -> Self {
		Self {
			ready: true,
			granted: false,
		}
	}

	pub fn not_ready() -> Self {
		Self {
			ready: false,
			granted: false,
		}
	}
}

#[async_trait]
impl AccessGate for StaticGate {
	async fn storage_ready(&self) -> bool {
		self.ready
	}

	async fn has_permission(&self, _request: &Request, _session: &Session, _code: &str) -> bool {
		self.granted
	}
}

/// Gate for sites without a permission backend: overrides are never granted.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAllGate;

#[async_trait]
impl AccessGate for DenyAllGate {
	async fn storage_ready(&self) -> bool {
		true
	}

	async fn has_permission(&self, _request: &Request, _session: &Session, _code: &str) -> bool {
		false
	}
}

/// Host without port, lowercased.
fn host_name(host: &str) -> String {
	let host = host.trim().to_ascii_lowercase();
	if host.starts_with('[') {
		// IPv6 literal
		return match host.find(']') {
			Some(end) => host[..=end].to_string(),
			None => host,
		};
	}
	match host.rsplit_once(':') {
		Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name.to_string(),
		_ => host,
	}
}

fn host_listed(host: Option<&str>, servers: &[String]) -> bool {
	let Some(host) = host else {
		return false;
	};
	let full = host.trim().to_ascii_lowercase();
	let name = host_name(host);
	servers.iter().any(|server| {
		let server = server.trim().to_ascii_lowercase();
		server == full || server == name
	})
}

/// Classifies requests as dev, test or live.
///
/// # Examples
///
/// ```
/// use portico_conf::{EnvironmentClassifier, EnvironmentSettings, EnvironmentType, StaticGate};
/// use portico_http::{Request, Session};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let settings = EnvironmentSettings {
///     test_servers: vec!["staging.example.com".to_string()],
///     ..EnvironmentSettings::default()
/// };
/// let classifier = EnvironmentClassifier::new(settings, Arc::new(StaticGate::granting()));
///
/// let request = Request::builder()
///     .uri("http://staging.example.com/")
///     .build()
///     .unwrap();
/// let mut session = Session::new();
///
/// let env = classifier.classify(&request, &mut session).await.unwrap();
/// assert_eq!(env, EnvironmentType::Test);
/// # });
/// ```
#[derive(Clone)]
pub struct EnvironmentClassifier {
	settings: EnvironmentSettings,
	gate: Arc<dyn AccessGate>,
}

impl fmt::Debug for EnvironmentClassifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EnvironmentClassifier")
			.field("settings", &self.settings)
			.finish_non_exhaustive()
	}
}

impl EnvironmentClassifier {
	pub fn new(settings: EnvironmentSettings, gate: Arc<dyn AccessGate>) -> Self {
		Self { settings, gate }
	}

	pub fn settings(&self) -> &EnvironmentSettings {
		&self.settings
	}

	/// Classify `request`.
	///
	/// Dev is checked first, then test, and everything else is live.
	///
	/// # Errors
	///
	/// Returns [`Error::Halt`] carrying a `401` credential challenge when the
	/// request asks for an override the client is not allowed to set.
	pub async fn classify(
		&self,
		request: &Request,
		session: &mut Session,
	) -> portico_http::Result<EnvironmentType> {
		let dev = self.is_dev(request, session).await?;
		let env = if dev {
			EnvironmentType::Dev
		} else if self.is_test_given(request, session, dev).await? {
			EnvironmentType::Test
		} else {
			EnvironmentType::Live
		};
		tracing::debug!(environment = %env, "Request classified");
		Ok(env)
	}

	/// Returns true if `request` runs in development mode.
	///
	/// `dev_servers` is only consulted when no environment type is configured.
	pub async fn is_dev(
		&self,
		request: &Request,
		session: &mut Session,
	) -> portico_http::Result<bool> {
		let param = self.settings.dev_override_param.as_str();

		if session.is_truthy(param) {
			return Ok(true);
		}
		match self.settings.environment_type {
			Some(env) if env.is_dev() => return Ok(true),
			Some(_) => {}
			None if host_listed(request.host(), &self.settings.dev_servers) => return Ok(true),
			None => {}
		}

		if let Some(value) = request.query_param(param) {
			if let Some(enabled) = self.apply_override(request, session, param, value).await? {
				return Ok(enabled);
			}
		}
		Ok(false)
	}

	/// Returns true if `request` runs in test mode.
	pub async fn is_test(
		&self,
		request: &Request,
		session: &mut Session,
	) -> portico_http::Result<bool> {
		let dev = self.is_dev(request, session).await?;
		self.is_test_given(request, session, dev).await
	}

	/// Returns true if `request` runs in live mode.
	pub async fn is_live(
		&self,
		request: &Request,
		session: &mut Session,
	) -> portico_http::Result<bool> {
		Ok(self.classify(request, session).await?.is_live())
	}

	async fn is_test_given(
		&self,
		request: &Request,
		session: &mut Session,
		dev: bool,
	) -> portico_http::Result<bool> {
		let param = self.settings.test_override_param.as_str();

		if let Some(value) = request.query_param(param) {
			self.apply_override(request, session, param, value).await?;
		}
		if dev {
			return Ok(false);
		}
		if session.is_truthy(param) {
			return Ok(true);
		}
		if let Some(env) = self.settings.environment_type {
			return Ok(env.is_test());
		}
		Ok(host_listed(request.host(), &self.settings.test_servers))
	}

	/// Persist a query override into the session after the permission check.
	///
	/// Returns `None` when storage is not ready and the override was ignored,
	/// otherwise the truthiness of `value`.
	async fn apply_override(
		&self,
		request: &Request,
		session: &mut Session,
		param: &str,
		value: &str,
	) -> portico_http::Result<Option<bool>> {
		if !self.gate.storage_ready().await {
			tracing::warn!(param, "Ignoring environment override, permission storage is not ready");
			return Ok(None);
		}

		let code = self.settings.override_permission.as_str();
		if !self.gate.has_permission(request, session, code).await {
			tracing::warn!(param, permission = code, "Environment override requires a login");
			return Err(Error::halt(self.challenge()));
		}

		session.set(param, serde_json::Value::String(value.to_string()));
		Ok(Some(is_truthy_str(value)))
	}

	/// `401` response asking the client for credentials.
	pub fn challenge(&self) -> Response {
		let mut response = Response::with_body("Authentication required");
		// 401 is registered
		let _ = response.set_status_code(401, None);
		response.set_header(
			"WWW-Authenticate",
			format!("Basic realm=\"{}\"", self.settings.challenge_realm),
		);
		response
	}
}
