//! Session lifecycle: start, stop and close a crawl-and-dispatch run.
//!
//! A controller owns one browsing context and at most one active run. Each run
//! authenticates, opens a session record, searches and crawls, and closes the
//! session record exactly once on every path, panics and cancellation included.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use outreach_protocol::{SearchCriteria, SessionId, SessionUpdate};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::auth::Authenticator;
use crate::config::{AuthSettings, Limits, LoginCredentials};
use crate::crawl::{Crawl, Progress, StopReason};
use crate::credentials::CredentialStore;
use crate::driver::{Launcher, PageDriver};
use crate::error::{CrawlError, OutreachError, Result};
use crate::flag::RunFlag;
use crate::pacing::Pacer;
use crate::store::OutreachStore;

/// Lifecycle phase of the current or last run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunState {
	Idle,
	Authenticating,
	Searching,
	Crawling,
	Stopping,
	Completed,
	Failed,
}

impl RunState {
	pub fn is_active(self) -> bool {
		matches!(self, RunState::Authenticating | RunState::Searching | RunState::Crawling | RunState::Stopping)
	}
}

impl fmt::Display for RunState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			RunState::Idle => "idle",
			RunState::Authenticating => "authenticating",
			RunState::Searching => "searching",
			RunState::Crawling => "crawling",
			RunState::Stopping => "stopping",
			RunState::Completed => "completed",
			RunState::Failed => "failed",
		};
		f.write_str(name)
	}
}

/// Why a run failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
	Auth(String),
	Search(String),
	Internal(String),
}

impl FailureKind {
	pub fn message(&self) -> &str {
		match self {
			FailureKind::Auth(msg) | FailureKind::Search(msg) | FailureKind::Internal(msg) => msg,
		}
	}
}

/// Terminal status of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status", content = "detail")]
pub enum RunOutcome {
	Completed(StopReason),
	Failed(FailureKind),
}

impl fmt::Display for RunOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RunOutcome::Completed(_) => f.write_str("Completed"),
			RunOutcome::Failed(FailureKind::Auth(_)) => f.write_str("Failed: auth"),
			RunOutcome::Failed(FailureKind::Search(_)) => f.write_str("Failed: search"),
			RunOutcome::Failed(FailureKind::Internal(_)) => f.write_str("Failed: internal"),
		}
	}
}

/// Final counts and status of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
	pub session_id: Option<SessionId>,
	pub profiles_visited: u64,
	pub invitations_sent: u64,
	pub outcome: RunOutcome,
}

impl RunReport {
	pub fn is_completed(&self) -> bool {
		matches!(self.outcome, RunOutcome::Completed(_))
	}
}

/// Point-in-time view of a controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatus {
	pub state: RunState,
	pub running: bool,
	pub session_id: Option<SessionId>,
	pub profiles_visited: u64,
	pub invitations_sent: u64,
}

/// Run state shared with handles and control surfaces.
#[derive(Debug)]
struct Shared {
	flag: RunFlag,
	active: AtomicBool,
	state: RwLock<RunState>,
	session_id: RwLock<Option<SessionId>>,
	progress: Progress,
}

impl Shared {
	fn new() -> Self {
		Self {
			flag: RunFlag::new(),
			active: AtomicBool::new(false),
			state: RwLock::new(RunState::Idle),
			session_id: RwLock::new(None),
			progress: Progress::default(),
		}
	}

	fn set_state(&self, next: RunState) {
		let mut state = self.state.write();
		if *state != next {
			debug!(target = "outreach.session", from = %*state, to = %next, "run state");
			*state = next;
		}
	}

	/// Moves an active run to `next` unless a stop was requested meanwhile.
	fn advance(&self, next: RunState) {
		let mut state = self.state.write();
		if *state != RunState::Stopping && *state != next {
			debug!(target = "outreach.session", from = %*state, to = %next, "run state");
			*state = next;
		}
	}

	fn request_stop(&self) {
		let was_running = self.flag.clear();
		let mut state = self.state.write();
		if was_running && state.is_active() {
			*state = RunState::Stopping;
			info!(target = "outreach.session", "stop requested");
		}
	}

	fn status(&self) -> RunStatus {
		RunStatus {
			state: *self.state.read(),
			running: self.active.load(Ordering::SeqCst),
			session_id: *self.session_id.read(),
			profiles_visited: self.progress.visited(),
			invitations_sent: self.progress.sent(),
		}
	}

	fn report(&self, outcome: RunOutcome) -> RunReport {
		RunReport {
			session_id: *self.session_id.read(),
			profiles_visited: self.progress.visited(),
			invitations_sent: self.progress.sent(),
			outcome,
		}
	}
}

/// Open sessions idle for longer than this belong to a run that is gone.
pub const DEFAULT_SESSION_LEASE: Duration = Duration::from_secs(15 * 60);

/// Construction-time settings for a [`SessionController`].
#[derive(Debug, Clone)]
pub struct ControllerConfig {
	pub limits: Limits,
	pub auth: AuthSettings,
	pub credentials: Option<LoginCredentials>,
	/// Where the authenticated storage state is cached between runs.
	pub credential_file: Option<PathBuf>,
	/// Idle time after which another run's open session is closed as orphaned.
	/// Must exceed `limits.max_wait`.
	pub session_lease: Duration,
}

impl Default for ControllerConfig {
	fn default() -> Self {
		Self {
			limits: Limits::default(),
			auth: AuthSettings::default(),
			credentials: None,
			credential_file: None,
			session_lease: DEFAULT_SESSION_LEASE,
		}
	}
}

struct Inner<L: Launcher, S: OutreachStore> {
	launcher: L,
	store: S,
	limits: RwLock<Limits>,
	auth: AuthSettings,
	credentials: Option<LoginCredentials>,
	credential_store: Option<CredentialStore>,
	session_lease: Duration,
	driver: tokio::sync::Mutex<Option<L::Driver>>,
	shared: Arc<Shared>,
}

/// Owns the browsing context and drives runs against it.
pub struct SessionController<L: Launcher, S: OutreachStore> {
	inner: Arc<Inner<L, S>>,
}

impl<L: Launcher, S: OutreachStore> Clone for SessionController<L, S> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<L: Launcher, S: OutreachStore> SessionController<L, S> {
	pub fn new(launcher: L, store: S, config: ControllerConfig) -> Self {
		Self {
			inner: Arc::new(Inner {
				launcher,
				store,
				limits: RwLock::new(config.limits),
				auth: config.auth,
				credentials: config.credentials,
				credential_store: config.credential_file.map(CredentialStore::new),
				session_lease: config.session_lease,
				driver: tokio::sync::Mutex::new(None),
				shared: Arc::new(Shared::new()),
			}),
		}
	}

	pub fn store(&self) -> &S {
		&self.inner.store
	}

	pub fn launcher(&self) -> &L {
		&self.inner.launcher
	}

	pub fn limits(&self) -> Limits {
		self.inner.limits.read().clone()
	}

	/// Replaces the limits used by the next run.
	pub fn set_limits(&self, limits: Limits) -> Result<()> {
		limits.validate()?;
		*self.inner.limits.write() = limits;
		Ok(())
	}

	/// Starts a run on the tokio runtime.
	pub fn start(&self, criteria: SearchCriteria) -> Result<RunHandle> {
		let run = self.begin()?;
		let task = tokio::spawn(run.execute(criteria));
		Ok(RunHandle {
			shared: Arc::clone(&self.inner.shared),
			task,
		})
	}

	/// Runs to completion on the current task. Dropping the future ends the
	/// run as failed and closes its session record.
	pub async fn run(&self, criteria: SearchCriteria) -> Result<RunReport> {
		let run = self.begin()?;
		Ok(run.execute(criteria).await)
	}

	/// Requests a cooperative stop. Idempotent.
	pub fn stop(&self) {
		self.inner.shared.request_stop();
	}

	/// Stops any run, waits for it to release the browsing context, then
	/// closes the context. The next run launches a fresh one.
	pub async fn close(&self) -> Result<()> {
		self.inner.shared.request_stop();
		let mut driver = self.inner.driver.lock().await;
		if let Some(mut context) = driver.take() {
			context.close().await?;
			info!(target = "outreach.session", "browsing context closed");
		}
		Ok(())
	}

	pub fn status(&self) -> RunStatus {
		self.inner.shared.status()
	}

	pub fn run_flag(&self) -> RunFlag {
		self.inner.shared.flag.clone()
	}

	fn begin(&self) -> Result<ActiveRun<L, S>> {
		let limits = self.limits();
		limits.validate()?;
		if self.inner.session_lease <= limits.max_wait {
			return Err(OutreachError::Config(format!(
				"session lease ({:?}) must exceed max_wait ({:?})",
				self.inner.session_lease, limits.max_wait
			)));
		}

		let shared = &self.inner.shared;
		if shared.active.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
			return Err(OutreachError::AlreadyRunning);
		}

		shared.progress.reset();
		*shared.session_id.write() = None;
		shared.set_state(RunState::Authenticating);
		shared.flag.raise();
		Ok(ActiveRun {
			inner: Arc::clone(&self.inner),
			limits,
			finished: false,
		})
	}
}

/// An admitted run. Dropping it unfinished (a cancelled `run` future or an
/// aborted task) still closes the session record and frees the controller.
struct ActiveRun<L: Launcher, S: OutreachStore> {
	inner: Arc<Inner<L, S>>,
	limits: Limits,
	finished: bool,
}

impl<L: Launcher, S: OutreachStore> ActiveRun<L, S> {
	async fn execute(mut self, criteria: SearchCriteria) -> RunReport {
		let outcome = match AssertUnwindSafe(self.inner.run_body(&criteria, &self.limits)).catch_unwind().await {
			Ok(outcome) => outcome,
			Err(payload) => {
				let message = panic_message(payload.as_ref());
				error!(target = "outreach.session", panic = %message, "run panicked");
				RunOutcome::Failed(FailureKind::Internal(message))
			}
		};
		self.finished = true;
		self.inner.finish(outcome)
	}
}

impl<L: Launcher, S: OutreachStore> Drop for ActiveRun<L, S> {
	fn drop(&mut self) {
		if !self.finished {
			warn!(target = "outreach.session", "run dropped before completion");
			self.inner.finish(RunOutcome::Failed(FailureKind::Internal("run cancelled".into())));
		}
	}
}

impl<L: Launcher, S: OutreachStore> Inner<L, S> {
	/// Closes the session record and releases the controller.
	fn finish(&self, outcome: RunOutcome) -> RunReport {
		let shared = &self.shared;
		let session_id = *shared.session_id.read();
		let outcome = match session_id {
			Some(id) => match self.store.update_session(id, SessionUpdate::close(Utc::now())) {
				Ok(()) => outcome,
				Err(err) => {
					error!(target = "outreach.store", session_id = %id, error = %err, "failed to close session record");
					match outcome {
						RunOutcome::Completed(_) => RunOutcome::Failed(FailureKind::Internal(err.to_string())),
						failed => failed,
					}
				}
			},
			None => outcome,
		};

		let report = shared.report(outcome);
		shared.set_state(if report.is_completed() { RunState::Completed } else { RunState::Failed });
		shared.flag.clear();
		shared.active.store(false, Ordering::SeqCst);

		info!(
			target = "outreach.session",
			session_id = ?report.session_id,
			visited = report.profiles_visited,
			sent = report.invitations_sent,
			outcome = %report.outcome,
			"run finished"
		);
		report
	}

	async fn run_body(&self, criteria: &SearchCriteria, limits: &Limits) -> RunOutcome {
		let shared = &self.shared;
		let mut guard = self.driver.lock().await;
		if guard.is_none() {
			match self.launcher.launch().await {
				Ok(driver) => *guard = Some(driver),
				Err(err) => {
					error!(target = "outreach.session", error = %err, "failed to launch browsing context");
					return RunOutcome::Failed(FailureKind::Internal(err.to_string()));
				}
			}
		}
		let Some(driver) = guard.as_mut() else {
			return RunOutcome::Failed(FailureKind::Internal("browsing context unavailable".into()));
		};

		let authenticator = Authenticator::new(self.credential_store.as_ref(), self.credentials.as_ref(), self.auth);
		let authenticated = authenticator.authenticate(driver).await;
		if !shared.flag.is_running() {
			info!(target = "outreach.session", "stopped during authentication");
			return RunOutcome::Completed(StopReason::Stopped);
		}
		if let Err(err) = authenticated {
			warn!(target = "outreach.auth", error = %err, "authentication failed");
			return RunOutcome::Failed(FailureKind::Auth(err.to_string()));
		}

		let session_id = match self.open_session(criteria) {
			Ok(id) => id,
			Err(err) => return RunOutcome::Failed(FailureKind::Internal(err.to_string())),
		};
		*shared.session_id.write() = Some(session_id);
		info!(target = "outreach.session", %session_id, "session opened");

		shared.advance(RunState::Searching);
		let mut crawl = Crawl {
			driver,
			store: &self.store,
			flag: &shared.flag,
			progress: &shared.progress,
			session_id,
			criteria,
			limits,
			pacer: Pacer::new(limits.wait_bounds()),
		};

		if !shared.flag.is_running() {
			return RunOutcome::Completed(StopReason::Stopped);
		}
		let first = match crawl.search().await {
			Ok(page) => page,
			Err(err) => return crawl_failure(err),
		};

		shared.advance(RunState::Crawling);
		match crawl.crawl_from(first).await {
			Ok(summary) => RunOutcome::Completed(summary.stop_reason),
			Err(err) => crawl_failure(err),
		}
	}

	/// Closes sessions whose runs stopped touching them, then opens ours. Open
	/// sessions of live runs, in this process or another, are left alone.
	fn open_session(&self, criteria: &SearchCriteria) -> Result<SessionId> {
		let now = Utc::now();
		let lease = chrono::Duration::from_std(self.session_lease).map_err(|err| OutreachError::Config(format!("session lease: {err}")))?;
		let idle_before = now.checked_sub_signed(lease).unwrap_or(DateTime::<Utc>::MIN_UTC);
		let orphaned = self.store.close_stale_sessions(idle_before)?;
		if orphaned > 0 {
			warn!(target = "outreach.store", orphaned, "closed sessions left open by an earlier run");
		}
		Ok(self.store.create_session(criteria, now)?)
	}
}

fn crawl_failure(err: CrawlError) -> RunOutcome {
	if err.is_search_failure() {
		RunOutcome::Failed(FailureKind::Search(err.to_string()))
	} else {
		error!(target = "outreach.session", error = %err, "run aborted");
		RunOutcome::Failed(FailureKind::Internal(err.to_string()))
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(msg) = payload.downcast_ref::<&str>() {
		(*msg).to_string()
	} else if let Some(msg) = payload.downcast_ref::<String>() {
		msg.clone()
	} else {
		"run panicked".to_string()
	}
}

/// Handle to a spawned run.
#[derive(Debug)]
pub struct RunHandle {
	shared: Arc<Shared>,
	task: JoinHandle<RunReport>,
}

impl RunHandle {
	pub fn stop(&self) {
		self.shared.request_stop();
	}

	pub fn status(&self) -> RunStatus {
		self.shared.status()
	}

	pub fn run_flag(&self) -> RunFlag {
		self.shared.flag.clone()
	}

	pub fn is_finished(&self) -> bool {
		self.task.is_finished()
	}

	/// Waits for the run to finish.
	pub async fn join(self) -> RunReport {
		match self.task.await {
			Ok(report) => report,
			Err(err) => {
				error!(target = "outreach.session", error = %err, "run task did not complete");
				self.shared.report(RunOutcome::Failed(FailureKind::Internal(err.to_string())))
			}
		}
	}
}
