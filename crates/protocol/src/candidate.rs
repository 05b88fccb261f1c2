//! Search-result candidates as seen by the crawl loop.

use serde::{Deserialize, Serialize};

/// Opaque handle to one entry on a results page.
///
/// The page-extraction layer decides what the handle means (an element index,
/// a locator string); the controller only passes it back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateRef {
	pub page: u32,
	pub slot: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub locator: Option<String>,
}

impl CandidateRef {
	pub fn new(page: u32, slot: u32) -> Self {
		Self { page, slot, locator: None }
	}
}

/// One loaded results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPage {
	pub index: u32,
	pub candidates: Vec<CandidateRef>,
}

/// Identifying data read from a candidate entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateInfo {
	pub profile_id: String,
	pub name: String,
	pub profile_url: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub company: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub location: Option<String>,
}
