//! Persisted browsing-session state reused across runs.
//!
//! A single JSON storage-state file. Absence is not an error: it only means the
//! next run falls back to interactive login.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use outreach_protocol::StorageState;
use tracing::{debug, warn};

use crate::error::Result;

/// Repository for the cached storage-state file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
	path: PathBuf,
}

impl CredentialStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Loads the cached state. Missing, empty and unreadable files yield `None`.
	pub fn load(&self) -> Result<Option<StorageState>> {
		let content = match fs::read_to_string(&self.path) {
			Ok(content) => content,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
				debug!(target = "outreach.auth", path = %self.path.display(), "no cached session file");
				return Ok(None);
			}
			Err(err) => return Err(err.into()),
		};

		if content.trim().is_empty() {
			return Ok(None);
		}

		match serde_json::from_str::<StorageState>(&content) {
			Ok(state) if state.is_empty() => Ok(None),
			Ok(state) => Ok(Some(state)),
			Err(err) => {
				warn!(
					target = "outreach.auth",
					path = %self.path.display(),
					error = %err,
					"ignoring unreadable cached session file"
				);
				Ok(None)
			}
		}
	}

	/// Overwrites the cached state atomically (temp file, fsync, rename).
	pub fn save(&self, state: &StorageState) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() && !parent.exists() {
				fs::create_dir_all(parent)?;
			}
		}

		let json = serde_json::to_string_pretty(state)?;
		let tmp_path = self.temp_path();
		{
			let mut tmp = File::create(&tmp_path)?;
			tmp.write_all(json.as_bytes())?;
			tmp.sync_all()?;
		}

		if let Err(err) = fs::rename(&tmp_path, &self.path) {
			let _ = fs::remove_file(&tmp_path);
			return Err(err.into());
		}

		debug!(
			target = "outreach.auth",
			path = %self.path.display(),
			cookies = state.cookies.len(),
			"saved session state"
		);
		Ok(())
	}

	/// Removes the cached state. Returns whether a file was removed.
	pub fn clear(&self) -> Result<bool> {
		match fs::remove_file(&self.path) {
			Ok(()) => Ok(true),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
			Err(err) => Err(err.into()),
		}
	}

	fn temp_path(&self) -> PathBuf {
		let name = self.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "session".to_string());
		self.path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
	}
}

#[cfg(test)]
mod tests {
	use outreach_protocol::Cookie;
	use tempfile::TempDir;

	use super::*;

	fn state(value: &str) -> StorageState {
		StorageState {
			cookies: vec![Cookie {
				name: "li_at".into(),
				value: value.into(),
				domain: Some(".example.com".into()),
				path: Some("/".into()),
				expires: Some(-1.0),
				http_only: true,
				secure: true,
				same_site: None,
			}],
			origins: Vec::new(),
		}
	}

	#[test]
	fn missing_file_is_not_an_error() {
		let temp = TempDir::new().unwrap();
		let store = CredentialStore::new(temp.path().join("session.json"));
		assert!(store.load().unwrap().is_none());
		assert!(!store.clear().unwrap());
	}

	#[test]
	fn save_overwrites_and_leaves_no_temp_files() {
		let temp = TempDir::new().unwrap();
		let store = CredentialStore::new(temp.path().join("auth").join("session.json"));

		store.save(&state("first")).unwrap();
		store.save(&state("second")).unwrap();

		let loaded = store.load().unwrap().unwrap();
		assert_eq!(loaded.cookies[0].value, "second");

		let entries: Vec<_> = fs::read_dir(temp.path().join("auth")).unwrap().map(|e| e.unwrap().file_name()).collect();
		assert_eq!(entries.len(), 1, "unexpected files: {entries:?}");
	}

	#[test]
	fn corrupt_file_falls_back_to_none() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("session.json");
		fs::write(&path, "not json").unwrap();
		assert!(CredentialStore::new(&path).load().unwrap().is_none());

		fs::write(&path, "   ").unwrap();
		assert!(CredentialStore::new(&path).load().unwrap().is_none());
	}

	#[test]
	fn clear_removes_saved_state() {
		let temp = TempDir::new().unwrap();
		let store = CredentialStore::new(temp.path().join("session.json"));
		store.save(&state("v")).unwrap();
		assert!(store.clear().unwrap());
		assert!(store.load().unwrap().is_none());
	}
}
