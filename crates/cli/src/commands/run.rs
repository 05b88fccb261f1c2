//! `outreach run`: one controller run against a replay script.

use outreach::driver::ReplayLauncher;
use outreach::{AuthSettings, ControllerConfig, SessionController, SqliteStore};
use outreach_protocol::SearchCriteria;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use crate::output::RunData;
use crate::settings::{Overrides, Settings};

pub async fn execute(args: RunArgs, overrides: &Overrides) -> Result<RunData> {
	let settings = Settings::load(overrides)?;

	let mut limits = settings.limits.clone();
	if let Some(max_profiles) = args.max_profiles {
		limits.max_profiles_per_run = max_profiles;
	}
	limits.validate()?;

	let criteria = criteria_for(&args, &settings.default_criteria);
	if criteria.is_unfiltered() {
		warn!(target = "outreach", "no search filters set, results will be broad");
	}

	let launcher = ReplayLauncher::from_path(&args.replay)?;
	let store = SqliteStore::open(&settings.database)?;
	info!(
		target = "outreach",
		replay = %args.replay.display(),
		database = %settings.database.display(),
		"starting run"
	);

	let controller = SessionController::new(
		launcher,
		store,
		ControllerConfig {
			limits: limits.clone(),
			auth: AuthSettings::default(),
			credentials: settings.credentials.clone(),
			credential_file: Some(settings.credentials_file.clone()),
			..ControllerConfig::default()
		},
	);

	let handle = controller.start(criteria.clone())?;
	let stopper = controller.clone();
	let interrupt = tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			warn!(target = "outreach", "interrupt received, stopping at the next candidate");
			stopper.stop();
		}
	});

	let report = handle.join().await;
	interrupt.abort();
	controller.close().await?;

	if !report.is_completed() {
		return Err(CliError::RunFailed(Box::new(report)));
	}

	Ok(RunData {
		status: report.outcome.to_string(),
		criteria,
		limits,
		report,
	})
}

/// Flags win over the settings file defaults, field by field.
fn criteria_for(args: &RunArgs, defaults: &SearchCriteria) -> SearchCriteria {
	let mut criteria = defaults.clone();
	if let Some(sector) = &args.sector {
		criteria = criteria.with_sector(sector.as_str());
	}
	if let Some(job_title) = &args.job_title {
		criteria = criteria.with_job_title(job_title.as_str());
	}
	if let Some(location) = &args.location {
		criteria = criteria.with_location(location.as_str());
	}
	if args.degree.is_some() {
		criteria = criteria.with_connection_degree(args.degree);
	}
	criteria
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use outreach_protocol::ConnectionDegree;

	use super::*;

	fn args() -> RunArgs {
		RunArgs {
			replay: PathBuf::from("script.json"),
			sector: None,
			job_title: Some("Founder".into()),
			location: None,
			degree: None,
			max_profiles: None,
		}
	}

	#[test]
	fn flags_override_defaults_per_field() {
		let defaults = SearchCriteria::default()
			.with_sector("Retail")
			.with_job_title("Buyer")
			.with_connection_degree(Some(ConnectionDegree::Second));
		let criteria = criteria_for(&args(), &defaults);
		assert_eq!(criteria.sector.as_deref(), Some("Retail"));
		assert_eq!(criteria.job_title.as_deref(), Some("Founder"));
		assert_eq!(criteria.connection_degree, Some(ConnectionDegree::Second));
	}
}
