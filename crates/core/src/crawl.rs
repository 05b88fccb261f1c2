//! Quota-bounded crawl over paginated search results.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use outreach_protocol::{CandidateRef, NewInvitation, ResultPage, SearchCriteria, SessionId, SessionUpdate};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Limits;
use crate::driver::{ActionOutcome, PageDriver};
use crate::error::{CrawlError, StoreError};
use crate::flag::RunFlag;
use crate::pacing::Pacer;
use crate::quota::{QuotaTracker, QuotaWindow};
use crate::store::OutreachStore;

/// Why the loop ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum StopReason {
	/// No further results page.
	Exhausted,
	QuotaReached { window: QuotaWindow },
	VisitCeiling,
	/// The run flag was cleared.
	Stopped,
	/// A results page after the first failed to load.
	PageLoadFailed,
}

impl std::fmt::Display for StopReason {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			StopReason::Exhausted => f.write_str("no more results"),
			StopReason::QuotaReached { window } => write!(f, "{window} quota reached"),
			StopReason::VisitCeiling => f.write_str("visit ceiling reached"),
			StopReason::Stopped => f.write_str("stopped"),
			StopReason::PageLoadFailed => f.write_str("page load failed"),
		}
	}
}

/// Live counters shared with status readers.
#[derive(Debug, Default)]
pub struct Progress {
	visited: AtomicU64,
	sent: AtomicU64,
}

impl Progress {
	pub fn visited(&self) -> u64 {
		self.visited.load(Ordering::SeqCst)
	}

	pub fn sent(&self) -> u64 {
		self.sent.load(Ordering::SeqCst)
	}

	pub(crate) fn reset(&self) {
		self.visited.store(0, Ordering::SeqCst);
		self.sent.store(0, Ordering::SeqCst);
	}

	fn record_visit(&self) -> u64 {
		self.visited.fetch_add(1, Ordering::SeqCst) + 1
	}

	fn record_sent(&self) -> u64 {
		self.sent.fetch_add(1, Ordering::SeqCst) + 1
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlSummary {
	pub profiles_visited: u64,
	pub invitations_sent: u64,
	pub pages: u32,
	pub stop_reason: StopReason,
}

/// One crawl over an authenticated context.
pub struct Crawl<'a, D: PageDriver, S: OutreachStore> {
	pub driver: &'a mut D,
	pub store: &'a S,
	pub flag: &'a RunFlag,
	pub progress: &'a Progress,
	pub session_id: SessionId,
	pub criteria: &'a SearchCriteria,
	pub limits: &'a Limits,
	pub pacer: Pacer,
}

enum Step {
	Continue,
	Stop(StopReason),
}

impl<D: PageDriver, S: OutreachStore> Crawl<'_, D, S> {
	/// Searches, then crawls until results, quota, visit ceiling or the run
	/// flag end it.
	pub async fn run(mut self) -> Result<CrawlSummary, CrawlError> {
		let first = self.search().await?;
		self.crawl_from(first).await
	}

	/// Loads the first results page. Failure or an empty page is a search
	/// failure.
	pub async fn search(&mut self) -> Result<ResultPage, CrawlError> {
		match self.driver.load_results_page(self.criteria, 0).await {
			Ok(Some(page)) => {
				info!(target = "outreach.crawl", candidates = page.candidates.len(), "search results loaded");
				Ok(page)
			}
			Ok(None) => {
				warn!(target = "outreach.crawl", "search returned no results");
				Err(CrawlError::NoResults)
			}
			Err(err) => {
				warn!(target = "outreach.crawl", error = %err, "search failed");
				Err(CrawlError::Search(err))
			}
		}
	}

	/// Crawls from an already loaded page. Store errors other than duplicates
	/// propagate.
	pub async fn crawl_from(mut self, first: ResultPage) -> Result<CrawlSummary, CrawlError> {
		let mut page = first;
		let mut pages = 1;
		let stop_reason = loop {
			if let Step::Stop(reason) = self.crawl_page(&page).await? {
				break reason;
			}
			if !self.flag.is_running() {
				break StopReason::Stopped;
			}

			match self.driver.has_next_page(&page).await {
				Ok(true) => {}
				Ok(false) => break StopReason::Exhausted,
				Err(err) => {
					warn!(target = "outreach.crawl", page = page.index, error = %err, "failed to detect next page");
					break StopReason::PageLoadFailed;
				}
			}

			let next_index = page.index + 1;
			match self.driver.load_results_page(self.criteria, next_index).await {
				Ok(Some(next)) => {
					debug!(target = "outreach.crawl", page = next_index, candidates = next.candidates.len(), "next page loaded");
					page = next;
					pages += 1;
				}
				Ok(None) => break StopReason::Exhausted,
				Err(err) => {
					warn!(target = "outreach.crawl", page = next_index, error = %err, "page load failed");
					break StopReason::PageLoadFailed;
				}
			}
		};

		let summary = CrawlSummary {
			profiles_visited: self.progress.visited(),
			invitations_sent: self.progress.sent(),
			pages,
			stop_reason,
		};
		info!(
			target = "outreach.crawl",
			visited = summary.profiles_visited,
			sent = summary.invitations_sent,
			pages = summary.pages,
			reason = %summary.stop_reason,
			"crawl finished"
		);
		Ok(summary)
	}

	async fn crawl_page(&mut self, page: &ResultPage) -> Result<Step, CrawlError> {
		let quota = QuotaTracker::new(self.store, self.limits);

		for candidate in &page.candidates {
			if !self.flag.is_running() {
				return Ok(Step::Stop(StopReason::Stopped));
			}

			let visited = self.progress.record_visit();
			self.store.update_session(self.session_id, SessionUpdate::visited())?;

			let status = quota.check()?;
			if let Some(window) = status.exhausted() {
				info!(
					target = "outreach.quota",
					%window,
					daily = status.daily,
					weekly = status.weekly,
					"quota reached, stopping"
				);
				return Ok(Step::Stop(StopReason::QuotaReached { window }));
			}

			self.visit(candidate).await?;

			if visited >= u64::from(self.limits.max_profiles_per_run) {
				info!(target = "outreach.crawl", visited, "visit ceiling reached");
				return Ok(Step::Stop(StopReason::VisitCeiling));
			}

			if !self.flag.is_running() {
				return Ok(Step::Stop(StopReason::Stopped));
			}
			self.pacer.pause().await;
			if !self.flag.is_running() {
				return Ok(Step::Stop(StopReason::Stopped));
			}
		}

		Ok(Step::Continue)
	}

	/// Extracts, acts on and records one candidate. Driver errors skip it.
	async fn visit(&mut self, candidate: &CandidateRef) -> Result<(), StoreError> {
		let info = match self.driver.extract_candidate(candidate).await {
			Ok(Some(info)) => info,
			Ok(None) => {
				debug!(target = "outreach.crawl", page = candidate.page, slot = candidate.slot, "unreadable candidate, skipping");
				return Ok(());
			}
			Err(err) => {
				warn!(target = "outreach.crawl", page = candidate.page, slot = candidate.slot, error = %err, "candidate extraction failed");
				return Ok(());
			}
		};

		let confirmed = match self.driver.attempt_action(candidate).await {
			Ok(ActionOutcome::Dispatched { confirmed }) => confirmed,
			Ok(ActionOutcome::AlreadyPendingOrConnected) => {
				debug!(target = "outreach.crawl", profile_id = %info.profile_id, "already pending or connected");
				return Ok(());
			}
			Ok(ActionOutcome::NoActionAvailable) => {
				debug!(target = "outreach.crawl", profile_id = %info.profile_id, "no connect action available");
				return Ok(());
			}
			Err(err) => {
				warn!(target = "outreach.crawl", profile_id = %info.profile_id, error = %err, "connect action failed");
				return Ok(());
			}
		};

		if !confirmed {
			warn!(target = "outreach.crawl", profile_id = %info.profile_id, "no confirmation seen, counting as sent");
		}

		let profile_id = info.profile_id.clone();
		match self.store.insert_invitation(NewInvitation::from_candidate(info, self.criteria, Utc::now())) {
			Ok(_) => {
				let sent = self.progress.record_sent();
				self.store.update_session(self.session_id, SessionUpdate::sent())?;
				info!(target = "outreach.crawl", %profile_id, sent, "invitation sent");
				Ok(())
			}
			Err(err) if err.is_duplicate() => {
				info!(target = "outreach.store", %profile_id, "invitation already recorded");
				Ok(())
			}
			Err(err) => Err(err),
		}
	}
}
