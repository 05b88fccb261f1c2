//! Error types for the outreach controller.

use outreach_protocol::SessionId;
use thiserror::Error;

/// Top-level error for controller operations.
#[derive(Debug, Error)]
pub enum OutreachError {
	#[error("Invalid configuration: {0}")]
	Config(String),

	#[error("A run is already active on this controller")]
	AlreadyRunning,

	#[error(transparent)]
	Store(#[from] StoreError),

	#[error(transparent)]
	Driver(#[from] DriverError),

	#[error(transparent)]
	Auth(#[from] AuthError),

	#[error(transparent)]
	Crawl(#[from] CrawlError),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OutreachError>;

/// Failures reported by a store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
	/// The profile already has a recorded invitation.
	#[error("Profile {profile_id} was already contacted")]
	DuplicateProfile { profile_id: String },

	#[error("Session {0} not found")]
	SessionNotFound(SessionId),

	/// Counter updates against a session that was already closed.
	#[error("Session {0} is already closed")]
	SessionClosed(SessionId),

	#[error("Store backend error: {0}")]
	Backend(String),

	#[error("SQLite error: {0}")]
	Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
	pub fn is_duplicate(&self) -> bool {
		matches!(self, StoreError::DuplicateProfile { .. })
	}
}

/// Failures reported by the page-extraction layer.
#[derive(Debug, Error)]
pub enum DriverError {
	#[error("Navigation to {url} failed: {message}")]
	Navigation { url: String, message: String },

	#[error("Timeout after {ms}ms waiting for: {condition}")]
	Timeout { ms: u64, condition: String },

	#[error("Element not found: {0}")]
	ElementNotFound(String),

	#[error("Browsing context is closed")]
	Closed,

	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

/// Terminal authentication failures.
#[derive(Debug, Error)]
pub enum AuthError {
	#[error("No cached session and no login credentials configured")]
	MissingCredentials,

	#[error("Authenticated landmark not detected after {waited_ms}ms")]
	LandmarkNotDetected { waited_ms: u64 },

	#[error("Login failed: {0}")]
	Driver(#[source] DriverError),
}

/// Failures that end the crawl loop early.
#[derive(Debug, Error)]
pub enum CrawlError {
	#[error("Search returned no results")]
	NoResults,

	#[error("Search failed: {0}")]
	Search(#[source] DriverError),

	#[error(transparent)]
	Store(#[from] StoreError),
}

impl CrawlError {
	/// True when the first results page never loaded.
	pub fn is_search_failure(&self) -> bool {
		matches!(self, CrawlError::NoResults | CrawlError::Search(_))
	}
}
