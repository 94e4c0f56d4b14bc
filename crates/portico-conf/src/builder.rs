//! Fluent, validated construction of [`Settings`].

use std::path::PathBuf;

use crate::environment::EnvironmentType;
use crate::error::Result;
use crate::settings::{RuleConfig, Settings};

/// Builder for [`Settings`].
///
/// # Examples
///
/// ```
/// use portico_conf::{EnvironmentType, SettingsBuilder};
///
/// let settings = SettingsBuilder::new()
///     .base_url("/site/")
///     .environment_type(EnvironmentType::Live)
///     .test_server("staging.example.com")
///     .rule(10, "", "->/home")
///     .rule(10, "admin", "AdminHandler")
///     .build()
///     .unwrap();
///
/// assert_eq!(settings.rules.len(), 2);
/// assert!(SettingsBuilder::new().max_delegation_depth(0).build().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SettingsBuilder {
	settings: Settings,
}

impl SettingsBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Start from existing settings, e.g. ones parsed from a file.
	pub fn from_settings(settings: Settings) -> Self {
		Self { settings }
	}

	pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
		self.settings.base_url = Some(base_url.into());
		self
	}

	pub fn base_folder(mut self, base_folder: impl Into<String>) -> Self {
		self.settings.base_folder = base_folder.into();
		self
	}

	pub fn public_dir(mut self, public_dir: impl Into<PathBuf>) -> Self {
		self.settings.public_dir = Some(public_dir.into());
		self
	}

	pub fn environment_type(mut self, environment_type: EnvironmentType) -> Self {
		self.settings.environment.environment_type = Some(environment_type);
		self
	}

	pub fn dev_server(mut self, host: impl Into<String>) -> Self {
		self.settings.environment.dev_servers.push(host.into());
		self
	}

	pub fn test_server(mut self, host: impl Into<String>) -> Self {
		self.settings.environment.test_servers.push(host.into());
		self
	}

	pub fn override_permission(mut self, code: impl Into<String>) -> Self {
		self.settings.environment.override_permission = code.into();
		self
	}

	pub fn challenge_realm(mut self, realm: impl Into<String>) -> Self {
		self.settings.environment.challenge_realm = realm.into();
		self
	}

	pub fn force_ssl(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.settings.redirects.force_ssl = true;
		self.settings.redirects.ssl_patterns = patterns.into_iter().map(Into::into).collect();
		self
	}

	pub fn force_www(mut self, enabled: bool) -> Self {
		self.settings.redirects.force_www = enabled;
		self
	}

	pub fn session_cookie_name(mut self, name: impl Into<String>) -> Self {
		self.settings.session_cookie_name = name.into();
		self
	}

	pub fn rejection_message(mut self, message: impl Into<String>) -> Self {
		self.settings.rejection_message = message.into();
		self
	}

	pub fn max_delegation_depth(mut self, depth: usize) -> Self {
		self.settings.max_delegation_depth = depth;
		self
	}

	pub fn rule(mut self, priority: i32, pattern: impl Into<String>, target: impl Into<String>) -> Self {
		self.settings.rules.push(RuleConfig {
			priority,
			pattern: pattern.into(),
			target: target.into(),
		});
		self
	}

	/// Validate and return the settings.
	pub fn build(self) -> Result<Settings> {
		self.settings.validate()?;
		Ok(self.settings)
	}
}
