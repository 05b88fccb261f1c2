//! Scripted driver that plays back recorded result pages.
//!
//! Used for rehearsal runs and tests: every page, candidate and action outcome
//! comes from a JSON script instead of a live browsing context.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use outreach_protocol::{CandidateInfo, CandidateRef, Cookie, ResultPage, SearchCriteria, StorageState};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ActionOutcome, DriverResult, Launcher, PageDriver};
use crate::config::LoginCredentials;
use crate::error::{DriverError, Result};
use crate::search::{PEOPLE_SEARCH_URL, canonical_profile_url, profile_id_from_url, search_url};

/// Recorded search session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplayScript {
	/// Context shows the authenticated landmark from the start.
	pub signed_in: bool,
	/// A restored storage state authenticates the context.
	pub accept_cached_session: bool,
	/// Submitted credentials authenticate the context.
	pub accept_credentials: bool,
	pub pages: Vec<ReplayPage>,
}

impl Default for ReplayScript {
	fn default() -> Self {
		Self {
			signed_in: false,
			accept_cached_session: true,
			accept_credentials: true,
			pages: Vec::new(),
		}
	}
}

impl ReplayScript {
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
		let content = std::fs::read_to_string(path)?;
		Ok(serde_json::from_str(&content)?)
	}

	pub fn with_page(mut self, page: ReplayPage) -> Self {
		self.pages.push(page);
		self
	}
}

/// One recorded results page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplayPage {
	pub candidates: Vec<ReplayCandidate>,
	/// Loading this page fails with a navigation error carrying this message.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl ReplayPage {
	pub fn new(candidates: Vec<ReplayCandidate>) -> Self {
		Self { candidates, error: None }
	}

	pub fn failing(message: impl Into<String>) -> Self {
		Self {
			candidates: Vec::new(),
			error: Some(message.into()),
		}
	}
}

/// What the connect control does for a candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayAction {
	#[default]
	Connect,
	Pending,
	None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayCandidate {
	pub name: String,
	pub profile_url: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub company: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub location: Option<String>,
	#[serde(default)]
	pub action: ReplayAction,
	#[serde(default = "confirmed_default")]
	pub confirmed: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub extract_error: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub action_error: Option<String>,
}

fn confirmed_default() -> bool {
	true
}

impl ReplayCandidate {
	/// Actionable candidate whose profile id is `id`.
	pub fn connect(id: &str) -> Self {
		Self {
			name: id.replace('-', " "),
			profile_url: format!("https://www.linkedin.com/in/{id}/?miniProfileUrn=replay"),
			title: None,
			company: None,
			location: None,
			action: ReplayAction::Connect,
			confirmed: true,
			extract_error: None,
			action_error: None,
		}
	}

	pub fn with_action(mut self, action: ReplayAction) -> Self {
		self.action = action;
		self
	}
}

/// [`PageDriver`] over a [`ReplayScript`].
#[derive(Debug)]
pub struct ReplayDriver {
	script: Arc<ReplayScript>,
	authenticated: bool,
	closed: bool,
}

impl ReplayDriver {
	pub fn new(script: Arc<ReplayScript>) -> Self {
		let authenticated = script.signed_in;
		Self {
			script,
			authenticated,
			closed: false,
		}
	}

	fn ensure_open(&self) -> DriverResult<()> {
		if self.closed { Err(DriverError::Closed) } else { Ok(()) }
	}

	fn candidate(&self, candidate: &CandidateRef) -> DriverResult<&ReplayCandidate> {
		self.script
			.pages
			.get(candidate.page as usize)
			.and_then(|page| page.candidates.get(candidate.slot as usize))
			.ok_or_else(|| DriverError::ElementNotFound(format!("result {}:{}", candidate.page, candidate.slot)))
	}
}

#[async_trait]
impl PageDriver for ReplayDriver {
	async fn is_authenticated(&mut self) -> DriverResult<bool> {
		self.ensure_open()?;
		Ok(self.authenticated)
	}

	async fn restore_session(&mut self, state: &StorageState) -> DriverResult<()> {
		self.ensure_open()?;
		debug!(target = "outreach.auth", cookies = state.cookies.len(), "replay: restoring session");
		if self.script.accept_cached_session {
			self.authenticated = true;
		}
		Ok(())
	}

	async fn submit_credentials(&mut self, credentials: &LoginCredentials) -> DriverResult<()> {
		self.ensure_open()?;
		debug!(target = "outreach.auth", email = %credentials.email, "replay: submitting credentials");
		if self.script.accept_credentials {
			self.authenticated = true;
		}
		Ok(())
	}

	async fn export_session(&mut self) -> DriverResult<StorageState> {
		self.ensure_open()?;
		Ok(StorageState {
			cookies: vec![Cookie {
				name: "li_at".into(),
				value: "replay".into(),
				domain: Some(".linkedin.com".into()),
				path: Some("/".into()),
				expires: None,
				http_only: true,
				secure: true,
				same_site: None,
			}],
			origins: Vec::new(),
		})
	}

	async fn load_results_page(&mut self, criteria: &SearchCriteria, page_index: u32) -> DriverResult<Option<ResultPage>> {
		self.ensure_open()?;
		let url = format!("{}&page={}", search_url(PEOPLE_SEARCH_URL, criteria), page_index + 1);
		debug!(target = "outreach.crawl", %url, "replay: loading results page");

		let Some(page) = self.script.pages.get(page_index as usize) else {
			return Ok(None);
		};
		if let Some(message) = &page.error {
			return Err(DriverError::Navigation {
				url,
				message: message.clone(),
			});
		}
		if page.candidates.is_empty() {
			return Ok(None);
		}

		Ok(Some(ResultPage {
			index: page_index,
			candidates: (0..page.candidates.len() as u32).map(|slot| CandidateRef::new(page_index, slot)).collect(),
		}))
	}

	async fn extract_candidate(&mut self, candidate: &CandidateRef) -> DriverResult<Option<CandidateInfo>> {
		self.ensure_open()?;
		let entry = self.candidate(candidate)?;
		if let Some(message) = &entry.extract_error {
			return Err(DriverError::ElementNotFound(message.clone()));
		}

		let profile_url = canonical_profile_url(&entry.profile_url);
		let Some(profile_id) = profile_id_from_url(&profile_url) else {
			return Ok(None);
		};

		Ok(Some(CandidateInfo {
			profile_id,
			name: entry.name.trim().to_string(),
			profile_url,
			title: entry.title.clone(),
			company: entry.company.clone(),
			location: entry.location.clone(),
		}))
	}

	async fn attempt_action(&mut self, candidate: &CandidateRef) -> DriverResult<ActionOutcome> {
		self.ensure_open()?;
		let entry = self.candidate(candidate)?;
		if let Some(message) = &entry.action_error {
			return Err(DriverError::Other(anyhow::anyhow!("{message}")));
		}
		Ok(match entry.action {
			ReplayAction::Connect => ActionOutcome::Dispatched {
				confirmed: entry.confirmed,
			},
			ReplayAction::Pending => ActionOutcome::AlreadyPendingOrConnected,
			ReplayAction::None => ActionOutcome::NoActionAvailable,
		})
	}

	async fn has_next_page(&mut self, page: &ResultPage) -> DriverResult<bool> {
		self.ensure_open()?;
		Ok((page.index as usize + 1) < self.script.pages.len())
	}

	async fn close(&mut self) -> DriverResult<()> {
		self.closed = true;
		Ok(())
	}
}

/// Hands out a fresh [`ReplayDriver`] per launch and counts launches.
#[derive(Debug)]
pub struct ReplayLauncher {
	script: Arc<ReplayScript>,
	launches: AtomicUsize,
}

impl ReplayLauncher {
	pub fn new(script: ReplayScript) -> Self {
		Self {
			script: Arc::new(script),
			launches: AtomicUsize::new(0),
		}
	}

	pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
		Ok(Self::new(ReplayScript::from_path(path)?))
	}

	pub fn script(&self) -> &ReplayScript {
		&self.script
	}

	pub fn launches(&self) -> usize {
		self.launches.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl Launcher for ReplayLauncher {
	type Driver = ReplayDriver;

	async fn launch(&self) -> DriverResult<ReplayDriver> {
		let count = self.launches.fetch_add(1, Ordering::SeqCst) + 1;
		debug!(target = "outreach.session", launches = count, "replay: launching context");
		Ok(ReplayDriver::new(Arc::clone(&self.script)))
	}
}
