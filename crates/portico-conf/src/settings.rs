//! Dispatcher settings.

use portico_urls::{Rule, RuleSet, UrlContext};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::environment::EnvironmentType;
use crate::error::{ConfigError, Result};

/// Settings for one site.
///
/// Every field has a default, so a TOML file only needs the values it
/// changes:
///
/// ```
/// use portico_conf::{EnvironmentType, Settings};
///
/// let settings = Settings::from_toml_str(r#"
///     base_url = "/site/"
///
///     [environment]
///     environment_type = "test"
///
///     [[rules]]
///     priority = 10
///     pattern = ""
///     target = "->/home"
/// "#).unwrap();
///
/// assert_eq!(settings.base_url.as_deref(), Some("/site/"));
/// assert_eq!(settings.environment.environment_type, Some(EnvironmentType::Test));
/// assert_eq!(settings.rule_set().len(), 1);
/// assert_eq!(settings.max_delegation_depth, 16);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	/// Base URL override. When unset the transport's base URL is used.
	pub base_url: Option<String>,
	/// Filesystem folder the site is installed in.
	pub base_folder: String,
	/// Folder relative file references resolve against. Defaults to `base_folder`.
	pub public_dir: Option<PathBuf>,
	pub environment: EnvironmentSettings,
	pub redirects: RedirectSettings,
	/// Cookie carrying the session id.
	pub session_cookie_name: String,
	/// Body of the 400 response sent when a pre-request hook rejects a request.
	pub rejection_message: String,
	/// How many times a handler may delegate to another before the result is
	/// treated as invalid.
	pub max_delegation_depth: usize,
	pub rules: Vec<RuleConfig>,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			base_url: None,
			base_folder: String::new(),
			public_dir: None,
			environment: EnvironmentSettings::default(),
			redirects: RedirectSettings::default(),
			session_cookie_name: "PORTICOSESSID".to_string(),
			rejection_message: "Invalid request".to_string(),
			max_delegation_depth: 16,
			rules: Vec::new(),
		}
	}
}

/// Environment classification settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentSettings {
	/// Explicit environment type. Takes precedence over host lists.
	pub environment_type: Option<EnvironmentType>,
	/// Hosts treated as development servers.
	pub dev_servers: Vec<String>,
	/// Hosts treated as test servers.
	pub test_servers: Vec<String>,
	/// Query parameter and session key for the dev override.
	pub dev_override_param: String,
	/// Query parameter and session key for the test override.
	pub test_override_param: String,
	/// Permission required to set an override.
	pub override_permission: String,
	/// Realm of the credential challenge sent when the permission is missing.
	pub challenge_realm: String,
}

impl Default for EnvironmentSettings {
	fn default() -> Self {
		Self {
			environment_type: None,
			dev_servers: Vec::new(),
			test_servers: Vec::new(),
			dev_override_param: "isDev".to_string(),
			test_override_param: "isTest".to_string(),
			override_permission: "ADMIN".to_string(),
			challenge_realm: "Developer access".to_string(),
		}
	}
}

/// Canonical-host redirects applied before routing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectSettings {
	/// Redirect insecure requests to `https`.
	pub force_ssl: bool,
	/// Restrict `force_ssl` to site-relative URLs matching one of these
	/// regular expressions. Empty means the whole site.
	pub ssl_patterns: Vec<String>,
	/// Redirect live sites to the `www.` host.
	pub force_www: bool,
}

impl RedirectSettings {
	/// Compiled `ssl_patterns`.
	///
	/// # Errors
	///
	/// Returns [`ConfigError::Validation`] listing every invalid pattern.
	pub fn compiled_ssl_patterns(&self) -> Result<Vec<Regex>> {
		let mut compiled = Vec::with_capacity(self.ssl_patterns.len());
		let mut errors = Vec::new();
		for (idx, pattern) in self.ssl_patterns.iter().enumerate() {
			match Regex::new(pattern) {
				Ok(regex) => compiled.push(regex),
				Err(err) => errors.push(crate::ValidationError::new(
					format!("redirects.ssl_patterns[{}]", idx),
					err.to_string(),
				)),
			}
		}
		if errors.is_empty() {
			Ok(compiled)
		} else {
			Err(ConfigError::Validation(errors))
		}
	}
}

/// One routing rule as written in the settings file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
	#[serde(default = "default_rule_priority")]
	pub priority: i32,
	pub pattern: String,
	pub target: String,
}

fn default_rule_priority() -> i32 {
	100
}

impl Settings {
	/// Parse settings from TOML. The result is not validated.
	pub fn from_toml_str(source: &str) -> Result<Self> {
		Ok(toml::from_str(source)?)
	}

	/// Read settings from a TOML file. The result is not validated.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_toml_str(&source)
	}

	/// Read `path`, overlay `PORTICO_*` environment variables and validate.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let mut settings = Self::from_file(path)?;
		settings.apply_env()?;
		settings.validate()?;
		tracing::debug!(rules = settings.rules.len(), "Settings loaded");
		Ok(settings)
	}

	/// Rules in dispatch order.
	pub fn rule_set(&self) -> RuleSet {
		self.rules
			.iter()
			.map(|rule| Rule::new(rule.priority, &rule.pattern, &rule.target))
			.collect()
	}

	/// URL reference points for a request with the given transport values.
	///
	/// The configured base URL wins over the transport's.
	pub fn url_context(&self, mut ctx: UrlContext) -> UrlContext {
		if let Some(base_url) = &self.base_url {
			ctx = ctx.with_base_url(base_url.clone());
		}
		let public_dir = self
			.public_dir
			.clone()
			.unwrap_or_else(|| PathBuf::from(&self.base_folder));
		ctx.with_base_folder(self.base_folder.clone())
			.with_public_dir(public_dir)
	}
}
