//! Layered settings: built-in defaults, settings file, environment, flags.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use outreach::{Limits, LoginCredentials};
use outreach_protocol::{ConnectionDegree, SearchCriteria};
use serde::Deserialize;
use tracing::debug;

use crate::error::{CliError, Result};

const APP_DIR: &str = "outreach";
const SETTINGS_FILE: &str = "settings.json";
const DATABASE_FILE: &str = "outreach.db";
const CREDENTIALS_FILE: &str = "session.json";

/// Optional values read from the JSON settings file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SettingsFile {
	pub email: Option<String>,
	pub password: Option<String>,
	pub max_per_day: Option<u32>,
	pub max_per_week: Option<u32>,
	/// Seconds.
	pub min_wait: Option<f64>,
	/// Seconds.
	pub max_wait: Option<f64>,
	pub max_profiles: Option<u32>,
	pub database: Option<PathBuf>,
	pub credentials_file: Option<PathBuf>,
	pub default_sector: Option<String>,
	pub default_job_title: Option<String>,
	pub default_location: Option<String>,
	pub default_degree: Option<ConnectionDegree>,
}

impl SettingsFile {
	/// Reads `path`. A missing file is only an error when `required`.
	pub fn read(path: &Path, required: bool) -> Result<Self> {
		if !path.exists() {
			if required {
				return Err(CliError::Settings(format!("settings file not found: {}", path.display())));
			}
			debug!(target = "outreach.settings", path = %path.display(), "no settings file");
			return Ok(Self::default());
		}

		let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
		let file = serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
		Ok(file)
	}
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
	pub limits: Limits,
	pub credentials: Option<LoginCredentials>,
	pub database: PathBuf,
	pub credentials_file: PathBuf,
	pub default_criteria: SearchCriteria,
}

/// Values given on the command line. They win over every other layer.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
	pub config: Option<PathBuf>,
	pub database: Option<PathBuf>,
}

impl Settings {
	pub fn load(overrides: &Overrides) -> Result<Self> {
		let file = match &overrides.config {
			Some(path) => SettingsFile::read(path, true)?,
			None => SettingsFile::read(&app_dir().join(SETTINGS_FILE), false)?,
		};
		Self::resolve(file, |key| std::env::var(key).ok(), overrides)
	}

	/// Applies the environment (through `env`) and `overrides` on top of `file`.
	pub fn resolve(file: SettingsFile, env: impl Fn(&str) -> Option<String>, overrides: &Overrides) -> Result<Self> {
		let env = |key: &str| env(key).filter(|value| !value.trim().is_empty());

		let defaults = Limits::default();
		let limits = Limits {
			max_per_day: parse_env(&env, "OUTREACH_MAX_PER_DAY")?.or(file.max_per_day).unwrap_or(defaults.max_per_day),
			max_per_week: parse_env(&env, "OUTREACH_MAX_PER_WEEK")?.or(file.max_per_week).unwrap_or(defaults.max_per_week),
			min_wait: seconds(parse_env(&env, "OUTREACH_MIN_WAIT")?.or(file.min_wait), "min_wait")?.unwrap_or(defaults.min_wait),
			max_wait: seconds(parse_env(&env, "OUTREACH_MAX_WAIT")?.or(file.max_wait), "max_wait")?.unwrap_or(defaults.max_wait),
			max_profiles_per_run: parse_env(&env, "OUTREACH_MAX_PROFILES")?.or(file.max_profiles).unwrap_or(defaults.max_profiles_per_run),
		};

		let credentials = LoginCredentials::from_parts(env("OUTREACH_EMAIL").or(file.email), env("OUTREACH_PASSWORD").or(file.password));

		let database = overrides
			.database
			.clone()
			.or_else(|| env("OUTREACH_DATABASE").map(PathBuf::from))
			.or(file.database)
			.unwrap_or_else(|| app_dir().join(DATABASE_FILE));

		let credentials_file = env("OUTREACH_CREDENTIALS_FILE")
			.map(PathBuf::from)
			.or(file.credentials_file)
			.unwrap_or_else(|| app_dir().join(CREDENTIALS_FILE));

		let mut default_criteria = SearchCriteria::default().with_connection_degree(file.default_degree);
		if let Some(sector) = file.default_sector {
			default_criteria = default_criteria.with_sector(sector);
		}
		if let Some(job_title) = file.default_job_title {
			default_criteria = default_criteria.with_job_title(job_title);
		}
		if let Some(location) = file.default_location {
			default_criteria = default_criteria.with_location(location);
		}

		Ok(Self {
			limits,
			credentials,
			database,
			credentials_file,
			default_criteria,
		})
	}
}

/// `<data dir>/outreach`, or `.outreach` in the working directory when the
/// platform has no data directory.
pub fn app_dir() -> PathBuf {
	dirs::data_dir().map(|dir| dir.join(APP_DIR)).unwrap_or_else(|| PathBuf::from(".outreach"))
}

fn parse_env<T>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
	T: FromStr,
	T::Err: std::fmt::Display,
{
	match env(key) {
		Some(raw) => raw
			.trim()
			.parse()
			.map(Some)
			.map_err(|err| CliError::Settings(format!("{key}={raw}: {err}"))),
		None => Ok(None),
	}
}

fn seconds(value: Option<f64>, name: &str) -> Result<Option<Duration>> {
	value
		.map(|secs| Duration::try_from_secs_f64(secs).map_err(|err| CliError::Settings(format!("{name}: {err}"))))
		.transpose()
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use tempfile::TempDir;

	use super::*;

	fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
		move |key| map.get(key).cloned()
	}

	#[test]
	fn defaults_apply_without_sources() {
		let settings = Settings::resolve(SettingsFile::default(), env(&[]), &Overrides::default()).unwrap();
		assert_eq!(settings.limits, Limits::default());
		assert!(settings.credentials.is_none());
		assert!(settings.database.ends_with(DATABASE_FILE));
		assert!(settings.default_criteria.is_unfiltered());
	}

	#[test]
	fn environment_overrides_file_and_flags_override_environment() {
		let file = SettingsFile {
			max_per_day: Some(5),
			max_per_week: Some(25),
			min_wait: Some(2.5),
			database: Some(PathBuf::from("/from/file.db")),
			..SettingsFile::default()
		};
		let env = env(&[("OUTREACH_MAX_PER_DAY", "7"), ("OUTREACH_DATABASE", "/from/env.db"), ("OUTREACH_MAX_WAIT", "4")]);

		let settings = Settings::resolve(file.clone(), &env, &Overrides::default()).unwrap();
		assert_eq!(settings.limits.max_per_day, 7);
		assert_eq!(settings.limits.max_per_week, 25);
		assert_eq!(settings.limits.min_wait, Duration::from_millis(2500));
		assert_eq!(settings.limits.max_wait, Duration::from_secs(4));
		assert_eq!(settings.database, PathBuf::from("/from/env.db"));

		let overrides = Overrides {
			database: Some(PathBuf::from("/from/flag.db")),
			..Overrides::default()
		};
		let settings = Settings::resolve(file, &env, &overrides).unwrap();
		assert_eq!(settings.database, PathBuf::from("/from/flag.db"));
	}

	#[test]
	fn unparsable_environment_value_is_an_error() {
		let err = Settings::resolve(SettingsFile::default(), env(&[("OUTREACH_MAX_PER_WEEK", "lots")]), &Overrides::default()).unwrap_err();
		assert!(matches!(err, CliError::Settings(msg) if msg.starts_with("OUTREACH_MAX_PER_WEEK")));
	}

	#[test]
	fn credentials_need_email_and_password() {
		let only_email = Settings::resolve(SettingsFile::default(), env(&[("OUTREACH_EMAIL", "me@example.com")]), &Overrides::default()).unwrap();
		assert!(only_email.credentials.is_none());

		let file = SettingsFile {
			password: Some("secret".into()),
			..SettingsFile::default()
		};
		let both = Settings::resolve(file, env(&[("OUTREACH_EMAIL", "me@example.com")]), &Overrides::default()).unwrap();
		assert_eq!(both.credentials.unwrap().email, "me@example.com");
	}

	#[test]
	fn settings_file_supplies_default_criteria() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("settings.json");
		std::fs::write(&path, r#"{"defaultSector":"Fintech","defaultDegree":"3rd","maxProfiles":12}"#).unwrap();

		let file = SettingsFile::read(&path, true).unwrap();
		let settings = Settings::resolve(file, env(&[]), &Overrides::default()).unwrap();
		assert_eq!(settings.default_criteria.sector.as_deref(), Some("Fintech"));
		assert_eq!(settings.default_criteria.connection_degree, Some(ConnectionDegree::Third));
		assert_eq!(settings.limits.max_profiles_per_run, 12);
	}

	#[test]
	fn explicit_missing_settings_file_is_an_error() {
		let temp = TempDir::new().unwrap();
		assert!(SettingsFile::read(&temp.path().join("absent.json"), true).is_err());
		assert!(SettingsFile::read(&temp.path().join("absent.json"), false).is_ok());
	}
}
