//! Loading settings from files.

use portico_conf::{ConfigError, EnvironmentType, Settings};
use rstest::{fixture, rstest};
use std::fs;
use tempfile::TempDir;

#[fixture]
fn temp_dir() -> TempDir {
	TempDir::new().expect("Failed to create temporary directory")
}

#[rstest]
fn test_load_valid_file(temp_dir: TempDir) {
	let path = temp_dir.path().join("portico.toml");
	fs::write(
		&path,
		r#"
base_url = "/"
base_folder = "/var/www/site"
rejection_message = "Request refused"

[environment]
environment_type = "live"
test_servers = ["staging.example.com"]

[redirects]
force_ssl = true
ssl_patterns = ["^admin"]

[[rules]]
priority = 10
pattern = ""
target = "->/home"

[[rules]]
priority = 50
pattern = "admin"
target = "AdminHandler"
"#,
	)
	.unwrap();

	let settings = Settings::from_file(&path).unwrap();
	settings.validate().unwrap();

	assert_eq!(settings.rejection_message, "Request refused");
	assert_eq!(settings.environment.environment_type, Some(EnvironmentType::Live));
	let first = settings.rule_set().iter().next().cloned().unwrap();
	assert_eq!(first.target, "AdminHandler");
}

#[rstest]
fn test_missing_file_is_io_error(temp_dir: TempDir) {
	let path = temp_dir.path().join("missing.toml");
	let err = Settings::from_file(&path).unwrap_err();
	assert!(matches!(err, ConfigError::Io { .. }));
	assert!(err.to_string().contains("missing.toml"));
}

#[rstest]
fn test_malformed_toml_is_parse_error(temp_dir: TempDir) {
	let path = temp_dir.path().join("broken.toml");
	fs::write(&path, "base_url = [").unwrap();
	assert!(matches!(
		Settings::from_file(&path),
		Err(ConfigError::Parse(_))
	));
}

#[rstest]
fn test_validation_error_lists_all_fields(temp_dir: TempDir) {
	let path = temp_dir.path().join("invalid.toml");
	fs::write(
		&path,
		r#"
base_url = "relative/"
max_delegation_depth = 0

[[rules]]
pattern = "old"
target = "->200 /new"
"#,
	)
	.unwrap();

	let settings = Settings::from_file(&path).unwrap();
	let err = settings.validate().unwrap_err();
	let message = err.to_string();

	assert!(message.contains("base_url"));
	assert!(message.contains("max_delegation_depth"));
	assert!(message.contains("rules[0].target"));
}
