//! Persisted invitation and session records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::candidate::CandidateInfo;
use crate::criteria::SearchCriteria;

/// Store-assigned identifier of a session record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Invitation about to be recorded after a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvitation {
	pub profile_id: String,
	pub name: String,
	pub profile_url: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub company: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub location: Option<String>,
	pub sent_at: DateTime<Utc>,
	pub criteria: SearchCriteria,
}

impl NewInvitation {
	pub fn from_candidate(candidate: CandidateInfo, criteria: &SearchCriteria, sent_at: DateTime<Utc>) -> Self {
		Self {
			profile_id: candidate.profile_id,
			name: candidate.name,
			profile_url: candidate.profile_url,
			title: candidate.title,
			company: candidate.company,
			location: candidate.location,
			sent_at,
			criteria: criteria.clone(),
		}
	}
}

/// A recorded invitation. `accepted` is maintained outside the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationRecord {
	pub id: i64,
	pub profile_id: String,
	pub name: String,
	pub profile_url: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub company: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub location: Option<String>,
	pub sent_at: DateTime<Utc>,
	#[serde(default)]
	pub accepted: bool,
	pub criteria: SearchCriteria,
}

impl InvitationRecord {
	pub fn from_new(id: i64, new: NewInvitation) -> Self {
		Self {
			id,
			profile_id: new.profile_id,
			name: new.name,
			profile_url: new.profile_url,
			title: new.title,
			company: new.company,
			location: new.location,
			sent_at: new.sent_at,
			accepted: false,
			criteria: new.criteria,
		}
	}
}

/// Summary of one controller run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
	pub id: SessionId,
	pub started_at: DateTime<Utc>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ended_at: Option<DateTime<Utc>>,
	pub profiles_visited: u64,
	pub invitations_sent: u64,
	pub criteria: SearchCriteria,
	/// Last time the owning run touched the record. An open record whose
	/// activity is older than the controller's lease is treated as orphaned.
	pub last_active_at: DateTime<Utc>,
}

impl SessionRecord {
	pub fn is_open(&self) -> bool {
		self.ended_at.is_none()
	}
}

/// Additive update applied to an open session record. Closed records
/// accept only a repeated close, which leaves the first end time in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionUpdate {
	pub profiles_visited_delta: u64,
	pub invitations_sent_delta: u64,
	/// When set, closes the record with this end timestamp.
	pub close_at: Option<DateTime<Utc>>,
}

impl SessionUpdate {
	pub fn visited() -> Self {
		Self {
			profiles_visited_delta: 1,
			..Self::default()
		}
	}

	pub fn sent() -> Self {
		Self {
			invitations_sent_delta: 1,
			..Self::default()
		}
	}

	pub fn close(at: DateTime<Utc>) -> Self {
		Self {
			close_at: Some(at),
			..Self::default()
		}
	}

	pub fn has_deltas(&self) -> bool {
		self.profiles_visited_delta > 0 || self.invitations_sent_delta > 0
	}
}

/// Lifetime invitation totals, used for acceptance-rate reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationTotals {
	pub total: u64,
	pub accepted: u64,
}

impl InvitationTotals {
	/// Accepted share in percent, `None` when nothing has been sent.
	pub fn acceptance_rate(&self) -> Option<f64> {
		(self.total > 0).then(|| self.accepted as f64 * 100.0 / self.total as f64)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn acceptance_rate_handles_empty_totals() {
		assert_eq!(InvitationTotals::default().acceptance_rate(), None);
		let totals = InvitationTotals { total: 8, accepted: 2 };
		assert_eq!(totals.acceptance_rate(), Some(25.0));
	}

	#[test]
	fn new_invitation_keeps_candidate_fields() {
		let candidate = CandidateInfo {
			profile_id: "jane-doe-42".into(),
			name: "Jane Doe".into(),
			profile_url: "https://www.example.com/in/jane-doe-42".into(),
			title: Some("CTO".into()),
			company: None,
			location: Some("Lyon".into()),
		};
		let criteria = SearchCriteria::default().with_job_title("CTO");
		let new = NewInvitation::from_candidate(candidate, &criteria, Utc::now());
		let record = InvitationRecord::from_new(7, new);
		assert_eq!(record.id, 7);
		assert_eq!(record.profile_id, "jane-doe-42");
		assert!(!record.accepted);
		assert_eq!(record.criteria.job_title.as_deref(), Some("CTO"));
	}
}
