//! CLI error type and its mapping onto result envelope codes.

use outreach::{FailureKind, OutreachError, RunOutcome, RunReport, StoreError};
use thiserror::Error;

use crate::output::ErrorCode;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("Invalid settings: {0}")]
	Settings(String),

	#[error(transparent)]
	Outreach(#[from] OutreachError),

	#[error(transparent)]
	Store(#[from] StoreError),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Run finished with status {}", .0.outcome)]
	RunFailed(Box<RunReport>),

	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;

impl CliError {
	pub fn code(&self) -> ErrorCode {
		match self {
			CliError::Settings(_) => ErrorCode::InvalidInput,
			CliError::Outreach(OutreachError::Config(_)) => ErrorCode::InvalidInput,
			CliError::Outreach(OutreachError::AlreadyRunning) => ErrorCode::SessionError,
			CliError::Outreach(OutreachError::Auth(_)) => ErrorCode::AuthError,
			CliError::Outreach(OutreachError::Store(_)) | CliError::Store(_) => ErrorCode::StoreError,
			CliError::Outreach(OutreachError::Io(_)) | CliError::Io(_) => ErrorCode::IoError,
			CliError::Outreach(OutreachError::Json(_)) | CliError::Json(_) => ErrorCode::InvalidInput,
			CliError::RunFailed(report) => match &report.outcome {
				RunOutcome::Failed(FailureKind::Auth(_)) => ErrorCode::AuthError,
				RunOutcome::Failed(FailureKind::Search(_)) => ErrorCode::SearchFailed,
				_ => ErrorCode::InternalError,
			},
			_ => ErrorCode::InternalError,
		}
	}

	pub fn details(&self) -> Option<serde_json::Value> {
		match self {
			CliError::RunFailed(report) => serde_json::to_value(report).ok(),
			_ => None,
		}
	}
}
