//! Cached login session inspection.

use chrono::Utc;
use outreach::CredentialStore;

use crate::error::Result;
use crate::output::{AuthClearData, AuthShowData, CookieSummary};
use crate::settings::{Overrides, Settings};

pub fn show(overrides: &Overrides) -> Result<AuthShowData> {
	let settings = Settings::load(overrides)?;
	let store = CredentialStore::new(&settings.credentials_file);
	let now = Utc::now().timestamp();

	let Some(state) = store.load()? else {
		return Ok(AuthShowData {
			path: settings.credentials_file,
			present: false,
			cookies: Vec::new(),
			origins: 0,
		});
	};

	let cookies = state
		.cookies
		.iter()
		.map(|cookie| CookieSummary {
			name: cookie.name.clone(),
			domain: cookie.domain.clone(),
			expires: format_expiry(cookie.expires, now),
		})
		.collect();

	Ok(AuthShowData {
		path: settings.credentials_file,
		present: true,
		cookies,
		origins: state.origins.len(),
	})
}

pub fn clear(overrides: &Overrides) -> Result<AuthClearData> {
	let settings = Settings::load(overrides)?;
	let removed = CredentialStore::new(&settings.credentials_file).clear()?;
	Ok(AuthClearData {
		path: settings.credentials_file,
		removed,
	})
}

fn format_expiry(expires: Option<f64>, now: i64) -> String {
	let ts = match expires {
		None => return "session".into(),
		Some(ts) if ts < 0.0 => return "session".into(),
		Some(ts) => ts as i64,
	};

	if ts < now {
		return "expired".into();
	}

	match ts - now {
		d if d < 3600 => format!("{}m", d / 60),
		d if d < 86400 => format!("{}h", d / 3600),
		d => format!("{}d", d / 86400),
	}
}
