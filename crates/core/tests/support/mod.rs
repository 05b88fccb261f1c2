//! Shared fixtures for controller integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use outreach::driver::replay::{ReplayCandidate, ReplayDriver, ReplayPage};
use outreach::driver::{DriverResult, ReplayLauncher, ReplayScript};
use outreach::protocol::{
	CandidateInfo, CandidateRef, InvitationRecord, InvitationTotals, NewInvitation, ResultPage, SearchCriteria, SessionId, SessionRecord, SessionUpdate, StorageState,
};
use outreach::store::StoreResult;
use outreach::{ActionOutcome, AuthSettings, ControllerConfig, Launcher, Limits, LoginCredentials, MemoryStore, OutreachStore, PageDriver, RunFlag, StoreError};

pub fn fast_limits() -> Limits {
	Limits {
		min_wait: Duration::from_millis(1),
		max_wait: Duration::from_millis(2),
		..Limits::default()
	}
}

pub fn fast_auth() -> AuthSettings {
	AuthSettings {
		landmark_timeout: Duration::from_millis(30),
		poll_interval: Duration::from_millis(5),
	}
}

pub fn config(limits: Limits) -> ControllerConfig {
	ControllerConfig {
		limits,
		auth: fast_auth(),
		..ControllerConfig::default()
	}
}

pub fn credentials() -> LoginCredentials {
	LoginCredentials::from_parts(Some("operator@example.com".into()), Some("hunter2".into())).expect("valid credentials")
}

pub fn criteria() -> SearchCriteria {
	SearchCriteria::default().with_sector("Software").with_job_title("CTO")
}

/// `pages` pages of `per_page` actionable candidates on a signed-in context.
pub fn actionable_script(pages: usize, per_page: usize) -> ReplayScript {
	let mut script = ReplayScript {
		signed_in: true,
		..ReplayScript::default()
	};
	for page in 0..pages {
		let candidates = (0..per_page).map(|slot| ReplayCandidate::connect(&format!("p{page}-c{slot}"))).collect();
		script = script.with_page(ReplayPage::new(candidates));
	}
	script
}

pub fn seed_invitation(store: &impl OutreachStore, profile_id: &str, sent_at: DateTime<Utc>) {
	store
		.insert_invitation(NewInvitation {
			profile_id: profile_id.into(),
			name: profile_id.into(),
			profile_url: format!("https://www.linkedin.com/in/{profile_id}/"),
			title: None,
			company: None,
			location: None,
			sent_at,
			criteria: SearchCriteria::default(),
		})
		.expect("seed invitation");
}

/// Assertions shared by every run that opened a session.
pub fn assert_single_closed_session(store: &impl OutreachStore, id: SessionId) -> SessionRecord {
	let sessions = store.list_recent_sessions(100).expect("list sessions");
	assert_eq!(sessions.iter().filter(|s| s.is_open()).count(), 0, "open sessions left: {sessions:?}");
	let session = store.get_session(id).expect("get session").expect("session exists");
	assert!(session.ended_at.is_some());
	session
}

/// Replay launcher with fault injection.
pub struct FaultLauncher {
	inner: ReplayLauncher,
	stop_after_dispatches: Option<usize>,
	panic_on_extract: Option<(u32, u32)>,
	auth_delay: Option<Duration>,
	flag: Arc<OnceLock<RunFlag>>,
	page_loads: Arc<AtomicUsize>,
}

impl FaultLauncher {
	pub fn new(script: ReplayScript) -> Self {
		Self {
			inner: ReplayLauncher::new(script),
			stop_after_dispatches: None,
			panic_on_extract: None,
			auth_delay: None,
			flag: Arc::new(OnceLock::new()),
			page_loads: Arc::new(AtomicUsize::new(0)),
		}
	}

	/// Every authentication check takes `delay`.
	pub fn auth_delay(mut self, delay: Duration) -> Self {
		self.auth_delay = Some(delay);
		self
	}

	/// Results pages requested so far, across launches.
	pub fn page_loads(&self) -> usize {
		self.page_loads.load(Ordering::SeqCst)
	}

	/// Clears the run flag once `count` dispatches were reported.
	pub fn stop_after_dispatches(mut self, count: usize) -> Self {
		self.stop_after_dispatches = Some(count);
		self
	}

	pub fn panic_on_extract(mut self, page: u32, slot: u32) -> Self {
		self.panic_on_extract = Some((page, slot));
		self
	}

	pub fn flag_slot(&self) -> Arc<OnceLock<RunFlag>> {
		Arc::clone(&self.flag)
	}

	pub fn launches(&self) -> usize {
		self.inner.launches()
	}
}

#[async_trait]
impl Launcher for FaultLauncher {
	type Driver = FaultDriver;

	async fn launch(&self) -> DriverResult<FaultDriver> {
		Ok(FaultDriver {
			inner: self.inner.launch().await?,
			stop_after_dispatches: self.stop_after_dispatches,
			panic_on_extract: self.panic_on_extract,
			auth_delay: self.auth_delay,
			dispatches: AtomicUsize::new(0),
			flag: Arc::clone(&self.flag),
			page_loads: Arc::clone(&self.page_loads),
		})
	}
}

pub struct FaultDriver {
	inner: ReplayDriver,
	stop_after_dispatches: Option<usize>,
	panic_on_extract: Option<(u32, u32)>,
	auth_delay: Option<Duration>,
	dispatches: AtomicUsize,
	flag: Arc<OnceLock<RunFlag>>,
	page_loads: Arc<AtomicUsize>,
}

#[async_trait]
impl PageDriver for FaultDriver {
	async fn is_authenticated(&mut self) -> DriverResult<bool> {
		if let Some(delay) = self.auth_delay {
			tokio::time::sleep(delay).await;
		}
		self.inner.is_authenticated().await
	}

	async fn restore_session(&mut self, state: &StorageState) -> DriverResult<()> {
		self.inner.restore_session(state).await
	}

	async fn submit_credentials(&mut self, credentials: &LoginCredentials) -> DriverResult<()> {
		self.inner.submit_credentials(credentials).await
	}

	async fn export_session(&mut self) -> DriverResult<StorageState> {
		self.inner.export_session().await
	}

	async fn load_results_page(&mut self, criteria: &SearchCriteria, page_index: u32) -> DriverResult<Option<ResultPage>> {
		self.page_loads.fetch_add(1, Ordering::SeqCst);
		self.inner.load_results_page(criteria, page_index).await
	}

	async fn extract_candidate(&mut self, candidate: &CandidateRef) -> DriverResult<Option<CandidateInfo>> {
		if self.panic_on_extract == Some((candidate.page, candidate.slot)) {
			panic!("extraction blew up at {}:{}", candidate.page, candidate.slot);
		}
		self.inner.extract_candidate(candidate).await
	}

	async fn attempt_action(&mut self, candidate: &CandidateRef) -> DriverResult<ActionOutcome> {
		let outcome = self.inner.attempt_action(candidate).await?;
		if matches!(outcome, ActionOutcome::Dispatched { .. }) {
			let count = self.dispatches.fetch_add(1, Ordering::SeqCst) + 1;
			if self.stop_after_dispatches == Some(count) {
				if let Some(flag) = self.flag.get() {
					flag.clear();
				}
			}
		}
		Ok(outcome)
	}

	async fn has_next_page(&mut self, page: &ResultPage) -> DriverResult<bool> {
		self.inner.has_next_page(page).await
	}

	async fn close(&mut self) -> DriverResult<()> {
		self.inner.close().await
	}
}

/// Memory store whose invitation inserts fail with a backend error.
#[derive(Default)]
pub struct BrokenInserts(pub MemoryStore);

impl OutreachStore for BrokenInserts {
	fn insert_invitation(&self, _invitation: NewInvitation) -> StoreResult<InvitationRecord> {
		Err(StoreError::Backend("disk full".into()))
	}

	fn count_invitations_since(&self, since: DateTime<Utc>) -> StoreResult<u64> {
		self.0.count_invitations_since(since)
	}

	fn create_session(&self, criteria: &SearchCriteria, started_at: DateTime<Utc>) -> StoreResult<SessionId> {
		self.0.create_session(criteria, started_at)
	}

	fn update_session(&self, id: SessionId, update: SessionUpdate) -> StoreResult<()> {
		self.0.update_session(id, update)
	}

	fn get_session(&self, id: SessionId) -> StoreResult<Option<SessionRecord>> {
		self.0.get_session(id)
	}

	fn list_recent_sessions(&self, limit: usize) -> StoreResult<Vec<SessionRecord>> {
		self.0.list_recent_sessions(limit)
	}

	fn list_recent_invitations(&self, limit: usize) -> StoreResult<Vec<InvitationRecord>> {
		self.0.list_recent_invitations(limit)
	}

	fn close_stale_sessions(&self, idle_before: DateTime<Utc>) -> StoreResult<usize> {
		self.0.close_stale_sessions(idle_before)
	}

	fn invitation_totals(&self) -> StoreResult<InvitationTotals> {
		self.0.invitation_totals()
	}
}
