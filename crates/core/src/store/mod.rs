//! Narrow persistence contract consumed by the controller.
//!
//! Each call is an independent short operation; no transaction spans more than
//! one call, so concurrent readers see a consistent snapshot per call.

use chrono::{DateTime, Utc};
use outreach_protocol::{InvitationRecord, InvitationTotals, NewInvitation, SearchCriteria, SessionId, SessionRecord, SessionUpdate};

use crate::error::StoreError;

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Invitation and session-statistics persistence.
pub trait OutreachStore: Send + Sync + 'static {
	/// Records an invitation. Fails with [`StoreError::DuplicateProfile`] when
	/// the profile already has one; the stored count is then unchanged.
	fn insert_invitation(&self, invitation: NewInvitation) -> StoreResult<InvitationRecord>;

	/// Counts invitations sent at or after `since`.
	fn count_invitations_since(&self, since: DateTime<Utc>) -> StoreResult<u64>;

	fn create_session(&self, criteria: &SearchCriteria, started_at: DateTime<Utc>) -> StoreResult<SessionId>;

	/// Applies additive counter deltas, refreshes the activity time and
	/// optionally closes the session. Deltas against a closed session fail
	/// with [`StoreError::SessionClosed`]; a repeated close is a no-op.
	fn update_session(&self, id: SessionId, update: SessionUpdate) -> StoreResult<()>;

	fn get_session(&self, id: SessionId) -> StoreResult<Option<SessionRecord>>;

	/// Most recent first.
	fn list_recent_sessions(&self, limit: usize) -> StoreResult<Vec<SessionRecord>>;

	/// Most recent first.
	fn list_recent_invitations(&self, limit: usize) -> StoreResult<Vec<InvitationRecord>>;

	/// Closes open sessions whose last activity is before `idle_before`, ending
	/// each at its last activity. Returns how many were closed.
	fn close_stale_sessions(&self, idle_before: DateTime<Utc>) -> StoreResult<usize>;

	fn invitation_totals(&self) -> StoreResult<InvitationTotals>;
}

impl<T: OutreachStore + ?Sized> OutreachStore for std::sync::Arc<T> {
	fn insert_invitation(&self, invitation: NewInvitation) -> StoreResult<InvitationRecord> {
		(**self).insert_invitation(invitation)
	}

	fn count_invitations_since(&self, since: DateTime<Utc>) -> StoreResult<u64> {
		(**self).count_invitations_since(since)
	}

	fn create_session(&self, criteria: &SearchCriteria, started_at: DateTime<Utc>) -> StoreResult<SessionId> {
		(**self).create_session(criteria, started_at)
	}

	fn update_session(&self, id: SessionId, update: SessionUpdate) -> StoreResult<()> {
		(**self).update_session(id, update)
	}

	fn get_session(&self, id: SessionId) -> StoreResult<Option<SessionRecord>> {
		(**self).get_session(id)
	}

	fn list_recent_sessions(&self, limit: usize) -> StoreResult<Vec<SessionRecord>> {
		(**self).list_recent_sessions(limit)
	}

	fn list_recent_invitations(&self, limit: usize) -> StoreResult<Vec<InvitationRecord>> {
		(**self).list_recent_invitations(limit)
	}

	fn close_stale_sessions(&self, idle_before: DateTime<Utc>) -> StoreResult<usize> {
		(**self).close_stale_sessions(idle_before)
	}

	fn invitation_totals(&self) -> StoreResult<InvitationTotals> {
		(**self).invitation_totals()
	}
}
