//! `PORTICO_*` environment variable overlay.

use crate::environment::EnvironmentType;
use crate::error::Result;
use crate::settings::Settings;

pub const ENV_ENVIRONMENT_TYPE: &str = "PORTICO_ENVIRONMENT_TYPE";
pub const ENV_BASE_URL: &str = "PORTICO_BASE_URL";
pub const ENV_BASE_FOLDER: &str = "PORTICO_BASE_FOLDER";
pub const ENV_DEV_SERVERS: &str = "PORTICO_DEV_SERVERS";
pub const ENV_TEST_SERVERS: &str = "PORTICO_TEST_SERVERS";

/// Split a comma separated host list, dropping empty entries.
fn parse_list(value: &str) -> Vec<String> {
	value
		.split(',')
		.map(str::trim)
		.filter(|host| !host.is_empty())
		.map(str::to_string)
		.collect()
}

impl Settings {
	/// Overlay values from the process environment.
	pub fn apply_env(&mut self) -> Result<()> {
		self.apply_env_from(|name| std::env::var(name).ok())
	}

	/// Overlay values from `lookup`, which maps a variable name to its value.
	///
	/// # Examples
	///
	/// ```
	/// use portico_conf::{EnvironmentType, Settings};
	///
	/// let mut settings = Settings::default();
	/// settings
	///     .apply_env_from(|name| match name {
	///         "PORTICO_ENVIRONMENT_TYPE" => Some("dev".to_string()),
	///         "PORTICO_DEV_SERVERS" => Some("localhost, 127.0.0.1".to_string()),
	///         _ => None,
	///     })
	///     .unwrap();
	///
	/// assert_eq!(settings.environment.environment_type, Some(EnvironmentType::Dev));
	/// assert_eq!(settings.environment.dev_servers, ["localhost", "127.0.0.1"]);
	/// ```
	pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
		if let Some(value) = lookup(ENV_ENVIRONMENT_TYPE) {
			self.environment.environment_type = Some(value.parse::<EnvironmentType>()?);
		}
		if let Some(value) = lookup(ENV_BASE_URL) {
			self.base_url = Some(value);
		}
		if let Some(value) = lookup(ENV_BASE_FOLDER) {
			self.base_folder = value;
		}
		if let Some(value) = lookup(ENV_DEV_SERVERS) {
			self.environment.dev_servers = parse_list(&value);
		}
		if let Some(value) = lookup(ENV_TEST_SERVERS) {
			self.environment.test_servers = parse_list(&value);
		}
		Ok(())
	}
}
