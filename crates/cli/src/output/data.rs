use std::path::PathBuf;

use outreach::{Limits, QuotaStatus, RunReport};
use outreach_protocol::{InvitationRecord, SearchCriteria, SessionRecord};
use serde::Serialize;

/// Result data for the run command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunData {
	pub status: String,
	pub criteria: SearchCriteria,
	pub limits: Limits,
	#[serde(flatten)]
	pub report: RunReport,
}

/// Result data for the sessions command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionsData {
	pub count: usize,
	pub sessions: Vec<SessionRecord>,
}

/// Result data for the invitations command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationsData {
	pub count: usize,
	pub invitations: Vec<InvitationRecord>,
}

/// Result data for the quota command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaData {
	#[serde(flatten)]
	pub status: QuotaStatus,
	pub remaining: u64,
	pub can_dispatch: bool,
	pub total_invitations: u64,
	pub accepted_invitations: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub acceptance_rate: Option<f64>,
}

/// One cookie line of `auth show`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieSummary {
	pub name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub domain: Option<String>,
	pub expires: String,
}

/// Result data for `auth show`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthShowData {
	pub path: PathBuf,
	pub present: bool,
	pub cookies: Vec<CookieSummary>,
	pub origins: usize,
}

/// Result data for `auth clear`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthClearData {
	pub path: PathBuf,
	pub removed: bool,
}
