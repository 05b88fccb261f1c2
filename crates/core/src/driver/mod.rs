//! Page-extraction seam between the controller and a browsing context.
//!
//! The controller only speaks in these operations. How a results page is
//! loaded or a connect control is found belongs to the implementation.

use async_trait::async_trait;
use outreach_protocol::{CandidateInfo, CandidateRef, ResultPage, SearchCriteria, StorageState};
use serde::{Deserialize, Serialize};

use crate::config::LoginCredentials;
use crate::error::DriverError;

pub mod replay;

pub use replay::{ReplayLauncher, ReplayScript};

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Result of trying to dispatch the connect action on one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ActionOutcome {
	/// The action was submitted. `confirmed` is false when no confirmation
	/// appeared within the driver's bounded wait.
	Dispatched { confirmed: bool },
	/// An invitation is already pending or the profile is already connected.
	AlreadyPendingOrConnected,
	/// The candidate offers no connect control.
	NoActionAvailable,
}

/// One live browsing context.
#[async_trait]
pub trait PageDriver: Send + 'static {
	/// Single immediate check for the authenticated landmark.
	async fn is_authenticated(&mut self) -> DriverResult<bool>;

	/// Injects a previously exported storage state.
	async fn restore_session(&mut self, state: &StorageState) -> DriverResult<()>;

	async fn submit_credentials(&mut self, credentials: &LoginCredentials) -> DriverResult<()>;

	async fn export_session(&mut self) -> DriverResult<StorageState>;

	/// Loads results page `page_index`. `Ok(None)` means the search returned
	/// nothing for that page.
	async fn load_results_page(&mut self, criteria: &SearchCriteria, page_index: u32) -> DriverResult<Option<ResultPage>>;

	/// Reads identifying data. `Ok(None)` when the entry cannot be read.
	async fn extract_candidate(&mut self, candidate: &CandidateRef) -> DriverResult<Option<CandidateInfo>>;

	async fn attempt_action(&mut self, candidate: &CandidateRef) -> DriverResult<ActionOutcome>;

	async fn has_next_page(&mut self, page: &ResultPage) -> DriverResult<bool>;

	/// Releases the context. Further calls may fail with [`DriverError::Closed`].
	async fn close(&mut self) -> DriverResult<()>;
}

/// Produces fresh browsing contexts.
#[async_trait]
pub trait Launcher: Send + Sync + 'static {
	type Driver: PageDriver;

	async fn launch(&self) -> DriverResult<Self::Driver>;
}
