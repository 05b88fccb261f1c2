//! `outreach quota`: current window usage and acceptance totals.

use outreach::{OutreachStore, QuotaTracker, SqliteStore};

use crate::error::Result;
use crate::output::QuotaData;
use crate::settings::{Overrides, Settings};

pub fn execute(overrides: &Overrides) -> Result<QuotaData> {
	let settings = Settings::load(overrides)?;
	let store = SqliteStore::open(&settings.database)?;

	let status = QuotaTracker::new(&store, &settings.limits).check()?;
	let totals = store.invitation_totals()?;

	Ok(QuotaData {
		status,
		remaining: status.remaining(),
		can_dispatch: status.can_dispatch(),
		total_invitations: totals.total,
		accepted_invitations: totals.accepted,
		acceptance_rate: totals.acceptance_rate(),
	})
}
