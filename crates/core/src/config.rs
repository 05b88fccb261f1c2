//! Values the controller consumes: quota limits, pacing bounds, auth waits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OutreachError, Result};

pub const DEFAULT_MAX_PER_DAY: u32 = 20;
pub const DEFAULT_MAX_PER_WEEK: u32 = 100;
pub const DEFAULT_MIN_WAIT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_PROFILES_PER_RUN: u32 = 100;

/// Inclusive bounds for randomized pacing delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitBounds {
	pub min: Duration,
	pub max: Duration,
}

impl WaitBounds {
	pub fn new(min: Duration, max: Duration) -> Self {
		Self { min, max }
	}

	pub fn from_secs(min: u64, max: u64) -> Self {
		Self::new(Duration::from_secs(min), Duration::from_secs(max))
	}
}

/// Quota and pacing limits for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
	pub max_per_day: u32,
	pub max_per_week: u32,
	#[serde(with = "duration_secs")]
	pub min_wait: Duration,
	#[serde(with = "duration_secs")]
	pub max_wait: Duration,
	pub max_profiles_per_run: u32,
}

impl Default for Limits {
	fn default() -> Self {
		Self {
			max_per_day: DEFAULT_MAX_PER_DAY,
			max_per_week: DEFAULT_MAX_PER_WEEK,
			min_wait: DEFAULT_MIN_WAIT,
			max_wait: DEFAULT_MAX_WAIT,
			max_profiles_per_run: DEFAULT_MAX_PROFILES_PER_RUN,
		}
	}
}

impl Limits {
	pub fn wait_bounds(&self) -> WaitBounds {
		WaitBounds::new(self.min_wait, self.max_wait)
	}

	/// Rejects values the controller cannot run with.
	pub fn validate(&self) -> Result<()> {
		if self.max_per_day == 0 {
			return Err(OutreachError::Config("max_per_day must be positive".into()));
		}
		if self.max_per_week == 0 {
			return Err(OutreachError::Config("max_per_week must be positive".into()));
		}
		if self.max_profiles_per_run == 0 {
			return Err(OutreachError::Config("max_profiles_per_run must be positive".into()));
		}
		if self.min_wait.is_zero() {
			return Err(OutreachError::Config("min_wait must be positive".into()));
		}
		if self.min_wait > self.max_wait {
			return Err(OutreachError::Config(format!(
				"min_wait ({:?}) exceeds max_wait ({:?})",
				self.min_wait, self.max_wait
			)));
		}
		Ok(())
	}
}

/// Bounded wait used when polling for the authenticated landmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthSettings {
	pub landmark_timeout: Duration,
	pub poll_interval: Duration,
}

impl Default for AuthSettings {
	fn default() -> Self {
		Self {
			landmark_timeout: Duration::from_secs(10),
			poll_interval: Duration::from_millis(500),
		}
	}
}

/// Email and password for interactive login.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
	pub email: String,
	pub password: String,
}

impl LoginCredentials {
	/// Returns credentials only when both parts are non-empty.
	pub fn from_parts(email: Option<String>, password: Option<String>) -> Option<Self> {
		match (email, password) {
			(Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => Some(Self {
				email: email.trim().to_string(),
				password,
			}),
			_ => None,
		}
	}
}

impl std::fmt::Debug for LoginCredentials {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LoginCredentials").field("email", &self.email).field("password", &"***").finish()
	}
}

mod duration_secs {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_f64(value.as_secs_f64())
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		let secs = f64::deserialize(deserializer)?;
		Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
	}
}
