//! # Portico Conf
//!
//! Site settings and per-request environment classification.
//!
//! Settings are read from TOML, overlaid with `PORTICO_*` environment
//! variables and validated once at startup. The resulting [`Settings`] value
//! is immutable and shared by every request.
//!
//! ```no_run
//! use portico_conf::Settings;
//!
//! let settings = Settings::load("portico.toml")?;
//! println!("{} rules", settings.rules.len());
//! # Ok::<(), portico_conf::ConfigError>(())
//! ```

pub mod builder;
pub mod env;
pub mod environment;
pub mod error;
pub mod settings;
mod validation;

pub use builder::SettingsBuilder;
pub use environment::{
	AccessGate, DenyAllGate, EnvironmentClassifier, EnvironmentType, StaticGate,
};
pub use error::{ConfigError, Result, ValidationError};
pub use settings::{EnvironmentSettings, RedirectSettings, RuleConfig, Settings};
