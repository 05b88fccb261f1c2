//! In-process store for tests and rehearsal runs.

use chrono::{DateTime, Utc};
use outreach_protocol::{InvitationRecord, InvitationTotals, NewInvitation, SearchCriteria, SessionId, SessionRecord, SessionUpdate};
use parking_lot::Mutex;

use super::{OutreachStore, StoreResult};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct Tables {
	invitations: Vec<InvitationRecord>,
	sessions: Vec<SessionRecord>,
}

/// [`OutreachStore`] backed by vectors behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
	tables: Mutex<Tables>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the acceptance flag. The controller never calls this.
	pub fn mark_accepted(&self, profile_id: &str) -> bool {
		let mut tables = self.tables.lock();
		match tables.invitations.iter_mut().find(|r| r.profile_id == profile_id) {
			Some(record) => {
				record.accepted = true;
				true
			}
			None => false,
		}
	}
}

impl OutreachStore for MemoryStore {
	fn insert_invitation(&self, invitation: NewInvitation) -> StoreResult<InvitationRecord> {
		let mut tables = self.tables.lock();
		if tables.invitations.iter().any(|r| r.profile_id == invitation.profile_id) {
			return Err(StoreError::DuplicateProfile {
				profile_id: invitation.profile_id,
			});
		}
		let record = InvitationRecord::from_new(tables.invitations.len() as i64 + 1, invitation);
		tables.invitations.push(record.clone());
		Ok(record)
	}

	fn count_invitations_since(&self, since: DateTime<Utc>) -> StoreResult<u64> {
		Ok(self.tables.lock().invitations.iter().filter(|r| r.sent_at >= since).count() as u64)
	}

	fn create_session(&self, criteria: &SearchCriteria, started_at: DateTime<Utc>) -> StoreResult<SessionId> {
		let mut tables = self.tables.lock();
		let id = SessionId(tables.sessions.len() as i64 + 1);
		tables.sessions.push(SessionRecord {
			id,
			started_at,
			ended_at: None,
			profiles_visited: 0,
			invitations_sent: 0,
			criteria: criteria.clone(),
			last_active_at: started_at,
		});
		Ok(id)
	}

	fn update_session(&self, id: SessionId, update: SessionUpdate) -> StoreResult<()> {
		let mut tables = self.tables.lock();
		let session = tables.sessions.iter_mut().find(|s| s.id == id).ok_or(StoreError::SessionNotFound(id))?;
		if !session.is_open() {
			return if update.has_deltas() { Err(StoreError::SessionClosed(id)) } else { Ok(()) };
		}
		session.profiles_visited += update.profiles_visited_delta;
		session.invitations_sent += update.invitations_sent_delta;
		session.last_active_at = update.close_at.unwrap_or_else(Utc::now);
		session.ended_at = update.close_at;
		Ok(())
	}

	fn get_session(&self, id: SessionId) -> StoreResult<Option<SessionRecord>> {
		Ok(self.tables.lock().sessions.iter().find(|s| s.id == id).cloned())
	}

	fn list_recent_sessions(&self, limit: usize) -> StoreResult<Vec<SessionRecord>> {
		let mut sessions = self.tables.lock().sessions.clone();
		sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.id.cmp(&a.id)));
		sessions.truncate(limit);
		Ok(sessions)
	}

	fn list_recent_invitations(&self, limit: usize) -> StoreResult<Vec<InvitationRecord>> {
		let mut invitations = self.tables.lock().invitations.clone();
		invitations.sort_by(|a, b| b.sent_at.cmp(&a.sent_at).then(b.id.cmp(&a.id)));
		invitations.truncate(limit);
		Ok(invitations)
	}

	fn close_stale_sessions(&self, idle_before: DateTime<Utc>) -> StoreResult<usize> {
		let mut tables = self.tables.lock();
		let mut closed = 0;
		for session in tables.sessions.iter_mut().filter(|s| s.is_open() && s.last_active_at < idle_before) {
			session.ended_at = Some(session.last_active_at);
			closed += 1;
		}
		Ok(closed)
	}

	fn invitation_totals(&self) -> StoreResult<InvitationTotals> {
		let tables = self.tables.lock();
		Ok(InvitationTotals {
			total: tables.invitations.len() as u64,
			accepted: tables.invitations.iter().filter(|r| r.accepted).count() as u64,
		})
	}
}
