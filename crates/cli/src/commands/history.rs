//! `outreach sessions` and `outreach invitations`.

use outreach::{OutreachStore, SqliteStore};

use crate::error::Result;
use crate::output::{InvitationsData, SessionsData};
use crate::settings::{Overrides, Settings};

pub fn sessions(limit: usize, overrides: &Overrides) -> Result<SessionsData> {
	let settings = Settings::load(overrides)?;
	let store = SqliteStore::open(&settings.database)?;
	let sessions = store.list_recent_sessions(limit)?;
	Ok(SessionsData {
		count: sessions.len(),
		sessions,
	})
}

pub fn invitations(limit: usize, overrides: &Overrides) -> Result<InvitationsData> {
	let settings = Settings::load(overrides)?;
	let store = SqliteStore::open(&settings.database)?;
	let invitations = store.list_recent_invitations(limit)?;
	Ok(InvitationsData {
		count: invitations.len(),
		invitations,
	})
}
