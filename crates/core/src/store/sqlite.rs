//! SQLite-backed store.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so that textual
//! comparison matches chronological order.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use outreach_protocol::{
	ConnectionDegree, InvitationRecord, InvitationTotals, NewInvitation, SearchCriteria, SessionId, SessionRecord, SessionUpdate,
};
use parking_lot::Mutex;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, ffi, params};
use tracing::debug;

use super::{OutreachStore, StoreResult};
use crate::error::StoreError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS profile_invitations (
	id INTEGER PRIMARY KEY AUTOINCREMENT,
	profile_id TEXT NOT NULL UNIQUE,
	profile_name TEXT NOT NULL,
	profile_title TEXT,
	profile_company TEXT,
	profile_location TEXT,
	profile_url TEXT NOT NULL,
	invitation_sent_at TEXT NOT NULL,
	accepted INTEGER NOT NULL DEFAULT 0,
	sector TEXT,
	job_title TEXT,
	search_location TEXT,
	connection_level TEXT
);
CREATE INDEX IF NOT EXISTS idx_profile_invitations_sent_at ON profile_invitations (invitation_sent_at);
CREATE TABLE IF NOT EXISTS session_stats (
	id INTEGER PRIMARY KEY AUTOINCREMENT,
	start_time TEXT NOT NULL,
	end_time TEXT,
	profiles_visited INTEGER NOT NULL DEFAULT 0,
	invitations_sent INTEGER NOT NULL DEFAULT 0,
	sector TEXT,
	job_title TEXT,
	location TEXT,
	connection_level TEXT,
	last_active TEXT NOT NULL
);
";

const INVITATION_COLUMNS: &str = "id, profile_id, profile_name, profile_title, profile_company, profile_location, profile_url, \
	invitation_sent_at, accepted, sector, job_title, search_location, connection_level";

const SESSION_COLUMNS: &str =
	"id, start_time, end_time, profiles_visited, invitations_sent, sector, job_title, location, connection_level, last_active";

/// [`OutreachStore`] over a single SQLite connection.
pub struct SqliteStore {
	conn: Mutex<Connection>,
}

impl SqliteStore {
	pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
		let path = path.as_ref();
		if let Some(parent) = path.parent() {
			if !parent.as_os_str().is_empty() && !parent.exists() {
				std::fs::create_dir_all(parent).map_err(|e| StoreError::Backend(format!("Failed to create {}: {e}", parent.display())))?;
			}
		}
		debug!(target = "outreach.store", path = %path.display(), "opening sqlite store");
		Self::bootstrap(Connection::open(path)?)
	}

	pub fn in_memory() -> StoreResult<Self> {
		Self::bootstrap(Connection::open_in_memory()?)
	}

	fn bootstrap(conn: Connection) -> StoreResult<Self> {
		conn.execute_batch(SCHEMA)?;
		Ok(Self { conn: Mutex::new(conn) })
	}

	/// Sets the acceptance flag. The controller never calls this.
	pub fn mark_accepted(&self, profile_id: &str) -> StoreResult<bool> {
		let changed = self
			.conn
			.lock()
			.execute("UPDATE profile_invitations SET accepted = 1 WHERE profile_id = ?1", params![profile_id])?;
		Ok(changed > 0)
	}
}

impl OutreachStore for SqliteStore {
	fn insert_invitation(&self, invitation: NewInvitation) -> StoreResult<InvitationRecord> {
		let conn = self.conn.lock();
		let degree = invitation.criteria.connection_degree.map(ConnectionDegree::as_str);
		let result = conn.execute(
			"INSERT INTO profile_invitations (profile_id, profile_name, profile_title, profile_company, profile_location, profile_url, \
			 invitation_sent_at, sector, job_title, search_location, connection_level) \
			 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
			params![
				invitation.profile_id,
				invitation.name,
				invitation.title,
				invitation.company,
				invitation.location,
				invitation.profile_url,
				format_ts(invitation.sent_at),
				invitation.criteria.sector,
				invitation.criteria.job_title,
				invitation.criteria.location,
				degree,
			],
		);

		match result {
			Ok(_) => Ok(InvitationRecord::from_new(conn.last_insert_rowid(), invitation)),
			Err(rusqlite::Error::SqliteFailure(err, _)) if is_unique_violation(&err) => Err(StoreError::DuplicateProfile {
				profile_id: invitation.profile_id,
			}),
			Err(err) => Err(err.into()),
		}
	}

	fn count_invitations_since(&self, since: DateTime<Utc>) -> StoreResult<u64> {
		let count: i64 = self.conn.lock().query_row(
			"SELECT COUNT(*) FROM profile_invitations WHERE invitation_sent_at >= ?1",
			params![format_ts(since)],
			|row| row.get(0),
		)?;
		Ok(count.max(0) as u64)
	}

	fn create_session(&self, criteria: &SearchCriteria, started_at: DateTime<Utc>) -> StoreResult<SessionId> {
		let conn = self.conn.lock();
		conn.execute(
			"INSERT INTO session_stats (start_time, sector, job_title, location, connection_level, last_active) VALUES (?1, ?2, ?3, ?4, ?5, ?1)",
			params![
				format_ts(started_at),
				criteria.sector,
				criteria.job_title,
				criteria.location,
				criteria.connection_degree.map(ConnectionDegree::as_str),
			],
		)?;
		Ok(SessionId(conn.last_insert_rowid()))
	}

	fn update_session(&self, id: SessionId, update: SessionUpdate) -> StoreResult<()> {
		let conn = self.conn.lock();
		let touched_at = update.close_at.unwrap_or_else(Utc::now);
		let changed = conn.execute(
			"UPDATE session_stats SET profiles_visited = profiles_visited + ?1, invitations_sent = invitations_sent + ?2, \
			 last_active = CASE WHEN end_time IS NULL THEN ?5 ELSE last_active END, \
			 end_time = COALESCE(end_time, ?3) \
			 WHERE id = ?4 AND (end_time IS NULL OR (?1 = 0 AND ?2 = 0))",
			params![
				update.profiles_visited_delta as i64,
				update.invitations_sent_delta as i64,
				update.close_at.map(format_ts),
				id.0,
				format_ts(touched_at),
			],
		)?;
		if changed > 0 {
			return Ok(());
		}

		let closed: Option<bool> = conn
			.query_row("SELECT end_time IS NOT NULL FROM session_stats WHERE id = ?1", params![id.0], |row| row.get(0))
			.optional()?;
		match closed {
			Some(true) => Err(StoreError::SessionClosed(id)),
			_ => Err(StoreError::SessionNotFound(id)),
		}
	}

	fn get_session(&self, id: SessionId) -> StoreResult<Option<SessionRecord>> {
		let conn = self.conn.lock();
		let sql = format!("SELECT {SESSION_COLUMNS} FROM session_stats WHERE id = ?1");
		Ok(conn.query_row(&sql, params![id.0], map_session_row).optional()?)
	}

	fn list_recent_sessions(&self, limit: usize) -> StoreResult<Vec<SessionRecord>> {
		let conn = self.conn.lock();
		let sql = format!("SELECT {SESSION_COLUMNS} FROM session_stats ORDER BY start_time DESC, id DESC LIMIT ?1");
		let mut stmt = conn.prepare(&sql)?;
		let rows = stmt.query_map(params![limit as i64], map_session_row)?;
		Ok(rows.collect::<Result<Vec<_>, _>>()?)
	}

	fn list_recent_invitations(&self, limit: usize) -> StoreResult<Vec<InvitationRecord>> {
		let conn = self.conn.lock();
		let sql = format!("SELECT {INVITATION_COLUMNS} FROM profile_invitations ORDER BY invitation_sent_at DESC, id DESC LIMIT ?1");
		let mut stmt = conn.prepare(&sql)?;
		let rows = stmt.query_map(params![limit as i64], map_invitation_row)?;
		Ok(rows.collect::<Result<Vec<_>, _>>()?)
	}

	fn close_stale_sessions(&self, idle_before: DateTime<Utc>) -> StoreResult<usize> {
		let closed = self.conn.lock().execute(
			"UPDATE session_stats SET end_time = last_active WHERE end_time IS NULL AND last_active < ?1",
			params![format_ts(idle_before)],
		)?;
		Ok(closed)
	}

	fn invitation_totals(&self) -> StoreResult<InvitationTotals> {
		let (total, accepted): (i64, i64) = self.conn.lock().query_row(
			"SELECT COUNT(*), COALESCE(SUM(accepted), 0) FROM profile_invitations",
			[],
			|row| Ok((row.get(0)?, row.get(1)?)),
		)?;
		Ok(InvitationTotals {
			total: total.max(0) as u64,
			accepted: accepted.max(0) as u64,
		})
	}
}

fn is_unique_violation(err: &ffi::Error) -> bool {
	err.code == ErrorCode::ConstraintViolation && err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
}

fn format_ts(ts: DateTime<Utc>) -> String {
	ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(raw)
		.map(|ts| ts.with_timezone(&Utc))
		.map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

fn parse_degree(raw: Option<String>) -> Option<ConnectionDegree> {
	raw.and_then(|value| value.parse().ok())
}

fn map_invitation_row(row: &Row<'_>) -> rusqlite::Result<InvitationRecord> {
	let sent_at: String = row.get(7)?;
	Ok(InvitationRecord {
		id: row.get(0)?,
		profile_id: row.get(1)?,
		name: row.get(2)?,
		title: row.get(3)?,
		company: row.get(4)?,
		location: row.get(5)?,
		profile_url: row.get(6)?,
		sent_at: parse_ts(7, &sent_at)?,
		accepted: row.get::<_, i64>(8)? != 0,
		criteria: SearchCriteria {
			sector: row.get(9)?,
			job_title: row.get(10)?,
			location: row.get(11)?,
			connection_degree: parse_degree(row.get(12)?),
		},
	})
}

fn map_session_row(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
	let started_at: String = row.get(1)?;
	let ended_at: Option<String> = row.get(2)?;
	let last_active: String = row.get(9)?;
	Ok(SessionRecord {
		id: SessionId(row.get(0)?),
		started_at: parse_ts(1, &started_at)?,
		ended_at: ended_at.as_deref().map(|raw| parse_ts(2, raw)).transpose()?,
		profiles_visited: row.get::<_, i64>(3)?.max(0) as u64,
		invitations_sent: row.get::<_, i64>(4)?.max(0) as u64,
		criteria: SearchCriteria {
			sector: row.get(5)?,
			job_title: row.get(6)?,
			location: row.get(7)?,
			connection_degree: parse_degree(row.get(8)?),
		},
		last_active_at: parse_ts(9, &last_active)?,
	})
}

#[cfg(test)]
mod tests {
	use chrono::Duration;
	use tempfile::TempDir;

	use super::*;

	fn invitation(profile_id: &str, sent_at: DateTime<Utc>) -> NewInvitation {
		NewInvitation {
			profile_id: profile_id.into(),
			name: "Jane Doe".into(),
			profile_url: format!("https://www.example.com/in/{profile_id}"),
			title: Some("Engineer".into()),
			company: None,
			location: Some("Paris".into()),
			sent_at,
			criteria: SearchCriteria::default()
				.with_sector("Software")
				.with_connection_degree(Some(ConnectionDegree::Second)),
		}
	}

	#[test]
	fn unique_constraint_maps_to_duplicate() {
		let store = SqliteStore::in_memory().unwrap();
		let now = Utc::now();
		let first = store.insert_invitation(invitation("jane", now)).unwrap();
		assert_eq!(first.id, 1);

		let err = store.insert_invitation(invitation("jane", now)).unwrap_err();
		assert!(err.is_duplicate(), "unexpected error: {err}");
		assert_eq!(store.count_invitations_since(now - Duration::days(1)).unwrap(), 1);
	}

	#[test]
	fn invitation_round_trips_through_rows() {
		let store = SqliteStore::in_memory().unwrap();
		let now = Utc::now();
		store.insert_invitation(invitation("jane", now)).unwrap();

		let listed = store.list_recent_invitations(10).unwrap();
		assert_eq!(listed.len(), 1);
		let record = &listed[0];
		assert_eq!(record.profile_id, "jane");
		assert_eq!(record.title.as_deref(), Some("Engineer"));
		assert_eq!(record.criteria.connection_degree, Some(ConnectionDegree::Second));
		assert_eq!(record.sent_at.timestamp_micros(), now.timestamp_micros());
	}

	#[test]
	fn count_since_respects_window_start() {
		let store = SqliteStore::in_memory().unwrap();
		let now = Utc::now();
		store.insert_invitation(invitation("a", now - Duration::days(8))).unwrap();
		store.insert_invitation(invitation("b", now - Duration::hours(30))).unwrap();
		store.insert_invitation(invitation("c", now)).unwrap();

		assert_eq!(store.count_invitations_since(now - Duration::days(1)).unwrap(), 1);
		assert_eq!(store.count_invitations_since(now - Duration::days(7)).unwrap(), 2);
	}

	#[test]
	fn sessions_accumulate_and_close() {
		let store = SqliteStore::in_memory().unwrap();
		let criteria = SearchCriteria::default().with_location("Lyon");
		let id = store.create_session(&criteria, Utc::now()).unwrap();
		store.update_session(id, SessionUpdate::visited()).unwrap();
		store.update_session(id, SessionUpdate::sent()).unwrap();

		let open = store.get_session(id).unwrap().unwrap();
		assert!(open.is_open());
		assert_eq!((open.profiles_visited, open.invitations_sent), (1, 1));

		store.update_session(id, SessionUpdate::close(Utc::now())).unwrap();
		let closed = store.get_session(id).unwrap().unwrap();
		assert!(!closed.is_open());
		assert_eq!(closed.criteria.location.as_deref(), Some("Lyon"));

		let err = store.update_session(SessionId(99), SessionUpdate::visited()).unwrap_err();
		assert!(matches!(err, StoreError::SessionNotFound(SessionId(99))));
	}

	#[test]
	fn only_idle_sessions_are_closed_as_stale() {
		let store = SqliteStore::in_memory().unwrap();
		let now = Utc::now();
		let an_hour_ago = now - Duration::hours(1);
		let closed = store.create_session(&SearchCriteria::default(), an_hour_ago).unwrap();
		let crashed = store.create_session(&SearchCriteria::default(), an_hour_ago).unwrap();
		let live = store.create_session(&SearchCriteria::default(), an_hour_ago).unwrap();
		store.update_session(closed, SessionUpdate::close(an_hour_ago)).unwrap();
		store.update_session(live, SessionUpdate::visited()).unwrap();

		assert_eq!(store.close_stale_sessions(now - Duration::minutes(15)).unwrap(), 1);
		let crashed = store.get_session(crashed).unwrap().unwrap();
		assert_eq!(crashed.ended_at.map(|at| at.timestamp_micros()), Some(an_hour_ago.timestamp_micros()));
		assert!(store.get_session(live).unwrap().unwrap().is_open());
		assert_eq!(store.close_stale_sessions(now - Duration::minutes(15)).unwrap(), 0);
	}

	#[test]
	fn closed_session_rejects_deltas_and_keeps_first_end_time() {
		let store = SqliteStore::in_memory().unwrap();
		let id = store.create_session(&SearchCriteria::default(), Utc::now()).unwrap();
		store.update_session(id, SessionUpdate::visited()).unwrap();
		let first_close = Utc::now();
		store.update_session(id, SessionUpdate::close(first_close)).unwrap();

		let err = store.update_session(id, SessionUpdate::sent()).unwrap_err();
		assert!(matches!(err, StoreError::SessionClosed(closed) if closed == id));
		store.update_session(id, SessionUpdate::close(first_close + Duration::minutes(5))).unwrap();

		let session = store.get_session(id).unwrap().unwrap();
		assert_eq!(session.ended_at.map(|at| at.timestamp_micros()), Some(first_close.timestamp_micros()));
		assert_eq!((session.profiles_visited, session.invitations_sent), (1, 0));
		assert!(matches!(
			store.update_session(SessionId(42), SessionUpdate::close(first_close)),
			Err(StoreError::SessionNotFound(SessionId(42)))
		));
	}

	#[test]
	fn file_store_persists_across_reopen() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("nested").join("outreach.db");
		{
			let store = SqliteStore::open(&path).unwrap();
			store.insert_invitation(invitation("jane", Utc::now())).unwrap();
			assert!(store.mark_accepted("jane").unwrap());
		}
		let store = SqliteStore::open(&path).unwrap();
		assert_eq!(store.invitation_totals().unwrap(), InvitationTotals { total: 1, accepted: 1 });
	}
}
