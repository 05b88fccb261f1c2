//! Day and week dispatch quotas computed from persisted history.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::Limits;
use crate::store::{OutreachStore, StoreResult};

/// Which window bounded a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaWindow {
	Day,
	Week,
}

impl fmt::Display for QuotaWindow {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			QuotaWindow::Day => f.write_str("day"),
			QuotaWindow::Week => f.write_str("week"),
		}
	}
}

/// Snapshot of both windows at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatus {
	pub daily: u64,
	pub weekly: u64,
	pub max_per_day: u32,
	pub max_per_week: u32,
}

impl QuotaStatus {
	/// The exhausted window, day taking precedence.
	pub fn exhausted(&self) -> Option<QuotaWindow> {
		if self.daily >= u64::from(self.max_per_day) {
			Some(QuotaWindow::Day)
		} else if self.weekly >= u64::from(self.max_per_week) {
			Some(QuotaWindow::Week)
		} else {
			None
		}
	}

	pub fn can_dispatch(&self) -> bool {
		self.exhausted().is_none()
	}

	/// Dispatches still allowed by the tighter window.
	pub fn remaining(&self) -> u64 {
		let day = u64::from(self.max_per_day).saturating_sub(self.daily);
		let week = u64::from(self.max_per_week).saturating_sub(self.weekly);
		day.min(week)
	}
}

/// Start of the current UTC day and of the Monday-anchored UTC week.
pub fn window_starts(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
	let day_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
	let days_since_monday = i64::from(now.weekday().num_days_from_monday());
	let week_start = day_start - Duration::days(days_since_monday);
	(day_start, week_start)
}

/// Reads quota usage from the store on every call; nothing is cached.
pub struct QuotaTracker<'a, S: OutreachStore> {
	store: &'a S,
	max_per_day: u32,
	max_per_week: u32,
}

impl<'a, S: OutreachStore> QuotaTracker<'a, S> {
	pub fn new(store: &'a S, limits: &Limits) -> Self {
		Self {
			store,
			max_per_day: limits.max_per_day,
			max_per_week: limits.max_per_week,
		}
	}

	pub fn daily_count(&self) -> StoreResult<u64> {
		let (day_start, _) = window_starts(Utc::now());
		self.store.count_invitations_since(day_start)
	}

	pub fn weekly_count(&self) -> StoreResult<u64> {
		let (_, week_start) = window_starts(Utc::now());
		self.store.count_invitations_since(week_start)
	}

	pub fn check(&self) -> StoreResult<QuotaStatus> {
		self.check_at(Utc::now())
	}

	pub fn check_at(&self, now: DateTime<Utc>) -> StoreResult<QuotaStatus> {
		let (day_start, week_start) = window_starts(now);
		let status = QuotaStatus {
			daily: self.store.count_invitations_since(day_start)?,
			weekly: self.store.count_invitations_since(week_start)?,
			max_per_day: self.max_per_day,
			max_per_week: self.max_per_week,
		};
		debug!(
			target = "outreach.quota",
			daily = status.daily,
			weekly = status.weekly,
			max_per_day = status.max_per_day,
			max_per_week = status.max_per_week,
			"quota checked"
		);
		Ok(status)
	}

	pub fn can_dispatch(&self) -> StoreResult<bool> {
		Ok(self.check()?.can_dispatch())
	}
}
