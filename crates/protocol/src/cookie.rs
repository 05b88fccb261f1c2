//! Browser storage state: cookies plus per-origin local storage.
//!
//! The shape matches the storage-state files browsers export, so a state
//! captured after an interactive login can be injected into a fresh context.

use serde::{Deserialize, Serialize};

/// Cookie `SameSite` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
	Strict,
	Lax,
	None,
}

/// A single browser cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
	pub name: String,
	pub value: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub domain: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
	/// Unix timestamp in seconds; negative means a session cookie.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires: Option<f64>,
	#[serde(default)]
	pub http_only: bool,
	#[serde(default)]
	pub secure: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub same_site: Option<SameSite>,
}

impl Cookie {
	/// Returns true when the cookie carries an expiry earlier than `now_secs`.
	pub fn is_expired_at(&self, now_secs: f64) -> bool {
		self.expires.is_some_and(|ts| ts >= 0.0 && ts < now_secs)
	}
}

/// One local-storage entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
	pub name: String,
	pub value: String,
}

/// Local storage captured for one origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginState {
	pub origin: String,
	#[serde(default)]
	pub local_storage: Vec<StorageEntry>,
}

/// Serialized authenticated browsing state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageState {
	#[serde(default)]
	pub cookies: Vec<Cookie>,
	#[serde(default)]
	pub origins: Vec<OriginState>,
}

impl StorageState {
	pub fn is_empty(&self) -> bool {
		self.cookies.is_empty() && self.origins.is_empty()
	}

	/// Number of cookies that have not expired at `now_secs`.
	pub fn live_cookie_count(&self, now_secs: f64) -> usize {
		self.cookies.iter().filter(|c| !c.is_expired_at(now_secs)).count()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_exported_storage_state() {
		let state: StorageState = serde_json::from_str(
			r#"{
  "cookies": [
    {
      "name": "li_at",
      "value": "token",
      "domain": ".example.com",
      "path": "/",
      "expires": -1.0,
      "httpOnly": true,
      "secure": true,
      "sameSite": "Lax"
    }
  ],
  "origins": [{ "origin": "https://www.example.com", "localStorage": [{ "name": "k", "value": "v" }] }]
}"#,
		)
		.unwrap();

		assert_eq!(state.cookies.len(), 1);
		assert_eq!(state.cookies[0].same_site, Some(SameSite::Lax));
		assert!(state.cookies[0].http_only);
		assert_eq!(state.origins[0].local_storage[0].name, "k");
	}

	#[test]
	fn session_cookies_never_expire() {
		let cookie = Cookie {
			name: "a".into(),
			value: "b".into(),
			domain: None,
			path: None,
			expires: Some(-1.0),
			http_only: false,
			secure: false,
			same_site: None,
		};
		assert!(!cookie.is_expired_at(1e12));

		let stale = Cookie { expires: Some(100.0), ..cookie };
		assert!(stale.is_expired_at(200.0));
		assert!(!stale.is_expired_at(50.0));
	}

	#[test]
	fn empty_state_is_empty() {
		assert!(StorageState::default().is_empty());
		assert_eq!(StorageState::default().live_cookie_count(0.0), 0);
	}
}
