use std::fmt;
use std::path::PathBuf;

/// One problem found while validating [`Settings`](crate::Settings).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
	/// Dotted path of the offending field, e.g. `environment.dev_servers`.
	pub field: String,
	pub message: String,
}

impl ValidationError {
	pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			field: field.into(),
			message: message.into(),
		}
	}
}

impl fmt::Display for ValidationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.field, self.message)
	}
}

/// Errors raised while loading or validating settings.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Failed to read settings file {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse settings: {0}")]
	Parse(#[from] toml::de::Error),

	#[error("Invalid settings: {}", join(.0))]
	Validation(Vec<ValidationError>),

	#[error("Unknown environment type '{0}', expected dev, test or live")]
	InvalidEnvironmentType(String),
}

fn join(errors: &[ValidationError]) -> String {
	errors
		.iter()
		.map(ToString::to_string)
		.collect::<Vec<_>>()
		.join("; ")
}

pub type Result<T> = std::result::Result<T, ConfigError>;
