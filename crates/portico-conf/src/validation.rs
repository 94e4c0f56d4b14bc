//! Settings validation. Every problem is reported, not just the first.

use portico_http::{Params, status};
use portico_urls::{RedirectTarget, RouteResult};

use crate::error::{ConfigError, Result, ValidationError};
use crate::settings::Settings;

fn is_cookie_token(name: &str) -> bool {
	!name.is_empty()
		&& name.bytes().all(|b| {
			b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
		})
}

fn is_valid_base_url(base_url: &str) -> bool {
	base_url.starts_with('/')
		|| base_url.starts_with("http://")
		|| base_url.starts_with("https://")
}

impl Settings {
	/// Check the settings for consistency.
	///
	/// # Examples
	///
	/// ```
	/// use portico_conf::{ConfigError, Settings};
	///
	/// let mut settings = Settings::default();
	/// assert!(settings.validate().is_ok());
	///
	/// settings.max_delegation_depth = 0;
	/// settings.session_cookie_name = "bad cookie".to_string();
	///
	/// let Err(ConfigError::Validation(errors)) = settings.validate() else {
	///     panic!("expected validation errors");
	/// };
	/// assert_eq!(errors.len(), 2);
	/// ```
	pub fn validate(&self) -> Result<()> {
		let mut errors = Vec::new();

		if let Some(base_url) = &self.base_url
			&& !is_valid_base_url(base_url)
		{
			errors.push(ValidationError::new(
				"base_url",
				format!("'{}' must start with '/' or be an http(s) URL", base_url),
			));
		}

		if self.max_delegation_depth == 0 {
			errors.push(ValidationError::new(
				"max_delegation_depth",
				"must be at least 1",
			));
		}

		if !is_cookie_token(&self.session_cookie_name) {
			errors.push(ValidationError::new(
				"session_cookie_name",
				format!("'{}' is not a valid cookie name", self.session_cookie_name),
			));
		}

		let env = &self.environment;
		for (field, value) in [
			("environment.dev_override_param", &env.dev_override_param),
			("environment.test_override_param", &env.test_override_param),
			("environment.override_permission", &env.override_permission),
		] {
			if value.trim().is_empty() {
				errors.push(ValidationError::new(field, "must not be empty"));
			}
		}
		if !env.dev_override_param.is_empty() && env.dev_override_param == env.test_override_param {
			errors.push(ValidationError::new(
				"environment.test_override_param",
				"must differ from environment.dev_override_param",
			));
		}
		if env.challenge_realm.contains(['"', '\r', '\n']) {
			errors.push(ValidationError::new(
				"environment.challenge_realm",
				"must not contain quotes or line breaks",
			));
		}
		for (field, servers) in [
			("environment.dev_servers", &env.dev_servers),
			("environment.test_servers", &env.test_servers),
		] {
			for (idx, host) in servers.iter().enumerate() {
				if host.trim().is_empty() {
					errors.push(ValidationError::new(
						format!("{}[{}]", field, idx),
						"host must not be empty",
					));
				}
			}
		}

		if let Err(ConfigError::Validation(pattern_errors)) =
			self.redirects.compiled_ssl_patterns()
		{
			errors.extend(pattern_errors);
		}

		for (idx, rule) in self.rules.iter().enumerate() {
			let field = format!("rules[{}].target", idx);
			match RouteResult::from_target(&rule.target, Params::new(), 0) {
				RouteResult::Redirect(target) if target.location.is_empty() => {
					errors.push(ValidationError::new(field, "redirect has no location"));
				}
				RouteResult::Redirect(RedirectTarget {
					code: Some(code), ..
				}) if !(status::is_redirect(code) && status::is_registered(code)) => {
					errors.push(ValidationError::new(
						field,
						format!("{} is not a redirect status code", code),
					));
				}
				RouteResult::Binding(binding) if binding.handler.is_empty() => {
					errors.push(ValidationError::new(field, "must not be empty"));
				}
				_ => {}
			}
		}

		if errors.is_empty() {
			Ok(())
		} else {
			Err(ConfigError::Validation(errors))
		}
	}
}
