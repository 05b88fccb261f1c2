//! Quota-bounded outreach session controller.
//!
//! Authenticates a browsing context, runs a paginated people search and
//! dispatches connect actions one at a time, bounded by day and week quotas
//! and paced with randomized delays. Persistence and page extraction sit
//! behind the [`store::OutreachStore`] and [`driver::PageDriver`] traits.

pub mod auth;
pub mod config;
pub mod controller;
pub mod crawl;
pub mod credentials;
pub mod driver;
pub mod error;
pub mod flag;
pub mod pacing;
pub mod quota;
pub mod search;
pub mod store;

pub use auth::{AuthOutcome, Authenticator};
pub use config::{AuthSettings, Limits, LoginCredentials, WaitBounds};
pub use controller::{ControllerConfig, DEFAULT_SESSION_LEASE, FailureKind, RunHandle, RunOutcome, RunReport, RunState, RunStatus, SessionController};
pub use crawl::{CrawlSummary, StopReason};
pub use credentials::CredentialStore;
pub use driver::{ActionOutcome, Launcher, PageDriver};
pub use error::{AuthError, CrawlError, DriverError, OutreachError, Result, StoreError};
pub use flag::RunFlag;
pub use pacing::Pacer;
pub use quota::{QuotaStatus, QuotaTracker, QuotaWindow};
pub use store::{MemoryStore, OutreachStore, SqliteStore};

pub use outreach_protocol as protocol;
