//! Session establishment: reuse a live context, restore a cached session, or
//! log in with credentials.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{AuthSettings, LoginCredentials};
use crate::credentials::CredentialStore;
use crate::driver::PageDriver;
use crate::error::{AuthError, DriverError};

/// How the context ended up authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
	AlreadyActive,
	CachedSession,
	Credentials,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthState {
	Unauthenticated,
	TryingCachedSession,
	TryingCredentials,
	Authenticated,
	Failed,
}

impl fmt::Display for AuthState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			AuthState::Unauthenticated => "unauthenticated",
			AuthState::TryingCachedSession => "trying-cached-session",
			AuthState::TryingCredentials => "trying-credentials",
			AuthState::Authenticated => "authenticated",
			AuthState::Failed => "failed",
		};
		f.write_str(name)
	}
}

/// Drives one authentication attempt against a browsing context.
pub struct Authenticator<'a> {
	credential_store: Option<&'a CredentialStore>,
	credentials: Option<&'a LoginCredentials>,
	settings: AuthSettings,
	state: AuthState,
}

impl<'a> Authenticator<'a> {
	pub fn new(credential_store: Option<&'a CredentialStore>, credentials: Option<&'a LoginCredentials>, settings: AuthSettings) -> Self {
		Self {
			credential_store,
			credentials,
			settings,
			state: AuthState::Unauthenticated,
		}
	}

	fn transition(&mut self, next: AuthState) {
		debug!(target = "outreach.auth", from = %self.state, to = %next, "auth state");
		self.state = next;
	}

	pub async fn authenticate<D: PageDriver>(mut self, driver: &mut D) -> Result<AuthOutcome, AuthError> {
		if driver.is_authenticated().await.map_err(AuthError::Driver)? {
			self.transition(AuthState::Authenticated);
			info!(target = "outreach.auth", "context already authenticated");
			return Ok(AuthOutcome::AlreadyActive);
		}

		self.transition(AuthState::TryingCachedSession);
		if self.try_cached_session(driver).await {
			self.transition(AuthState::Authenticated);
			info!(target = "outreach.auth", "restored cached session");
			return Ok(AuthOutcome::CachedSession);
		}

		self.transition(AuthState::TryingCredentials);
		let Some(credentials) = self.credentials else {
			self.transition(AuthState::Failed);
			warn!(target = "outreach.auth", "no usable cached session and no credentials configured");
			return Err(AuthError::MissingCredentials);
		};

		if let Err(err) = driver.submit_credentials(credentials).await {
			self.transition(AuthState::Failed);
			return Err(AuthError::Driver(err));
		}

		if let Err(err) = self.wait_for_landmark(driver).await {
			self.transition(AuthState::Failed);
			return Err(err);
		}

		self.transition(AuthState::Authenticated);
		info!(target = "outreach.auth", email = %credentials.email, "logged in with credentials");
		self.persist_session(driver).await;
		Ok(AuthOutcome::Credentials)
	}

	/// Restores the cached state when one exists. Any failure falls back.
	async fn try_cached_session<D: PageDriver>(&self, driver: &mut D) -> bool {
		let Some(store) = self.credential_store else {
			return false;
		};

		let state = match store.load() {
			Ok(Some(state)) => state,
			Ok(None) => return false,
			Err(err) => {
				warn!(target = "outreach.auth", error = %err, "failed to read cached session");
				return false;
			}
		};

		if let Err(err) = driver.restore_session(&state).await {
			warn!(target = "outreach.auth", error = %err, "failed to restore cached session");
			return false;
		}

		match self.wait_for_landmark(driver).await {
			Ok(()) => true,
			Err(err) => {
				warn!(target = "outreach.auth", error = %err, "cached session rejected");
				false
			}
		}
	}

	/// Polls for the landmark until `landmark_timeout` elapses.
	async fn wait_for_landmark<D: PageDriver>(&self, driver: &mut D) -> Result<(), AuthError> {
		let started = Instant::now();
		let deadline = started + self.settings.landmark_timeout;
		let interval = self.settings.poll_interval.max(Duration::from_millis(1));

		loop {
			match driver.is_authenticated().await {
				Ok(true) => return Ok(()),
				Ok(false) => {}
				Err(DriverError::Closed) => return Err(AuthError::Driver(DriverError::Closed)),
				Err(err) => debug!(target = "outreach.auth", error = %err, "landmark check failed"),
			}

			let now = Instant::now();
			if now >= deadline {
				return Err(AuthError::LandmarkNotDetected {
					waited_ms: now.duration_since(started).as_millis() as u64,
				});
			}
			tokio::time::sleep(interval.min(deadline - now)).await;
		}
	}

	async fn persist_session<D: PageDriver>(&self, driver: &mut D) {
		let Some(store) = self.credential_store else {
			return;
		};

		let state = match driver.export_session().await {
			Ok(state) => state,
			Err(err) => {
				warn!(target = "outreach.auth", error = %err, "failed to export session state");
				return;
			}
		};

		if let Err(err) = store.save(&state) {
			warn!(target = "outreach.auth", path = %store.path().display(), error = %err, "failed to persist session state");
		}
	}
}
