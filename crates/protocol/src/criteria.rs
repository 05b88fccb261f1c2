//! Search criteria for a controller run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Network distance filter applied to a people search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionDegree {
	#[serde(rename = "2nd")]
	Second,
	#[serde(rename = "3rd")]
	Third,
}

impl ConnectionDegree {
	pub fn as_str(self) -> &'static str {
		match self {
			ConnectionDegree::Second => "2nd",
			ConnectionDegree::Third => "3rd",
		}
	}
}

impl fmt::Display for ConnectionDegree {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ConnectionDegree {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"2nd" | "2" | "second" => Ok(ConnectionDegree::Second),
			"3rd" | "3" | "third" => Ok(ConnectionDegree::Third),
			_ => Err(format!("unknown connection degree: {s}")),
		}
	}
}

/// Filters for one search. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sector: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub job_title: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub location: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub connection_degree: Option<ConnectionDegree>,
}

impl SearchCriteria {
	pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
		self.sector = non_blank(sector.into());
		self
	}

	pub fn with_job_title(mut self, job_title: impl Into<String>) -> Self {
		self.job_title = non_blank(job_title.into());
		self
	}

	pub fn with_location(mut self, location: impl Into<String>) -> Self {
		self.location = non_blank(location.into());
		self
	}

	pub fn with_connection_degree(mut self, degree: Option<ConnectionDegree>) -> Self {
		self.connection_degree = degree;
		self
	}

	/// True when no filter at all is set. Such a search is allowed but broad.
	pub fn is_unfiltered(&self) -> bool {
		self.sector.is_none() && self.job_title.is_none() && self.location.is_none() && self.connection_degree.is_none()
	}
}

fn non_blank(value: String) -> Option<String> {
	let trimmed = value.trim();
	if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn degree_parses_common_spellings() {
		assert_eq!("2nd".parse::<ConnectionDegree>().unwrap(), ConnectionDegree::Second);
		assert_eq!(" 3RD ".parse::<ConnectionDegree>().unwrap(), ConnectionDegree::Third);
		assert!("1st".parse::<ConnectionDegree>().is_err());
	}

	#[test]
	fn blank_builder_values_are_dropped() {
		let criteria = SearchCriteria::default().with_sector("  ").with_job_title(" CTO ");
		assert_eq!(criteria.sector, None);
		assert_eq!(criteria.job_title.as_deref(), Some("CTO"));
		assert!(!criteria.is_unfiltered());
		assert!(SearchCriteria::default().is_unfiltered());
	}

	#[test]
	fn degree_serializes_as_ordinal() {
		let criteria = SearchCriteria::default().with_connection_degree(Some(ConnectionDegree::Second));
		let json = serde_json::to_value(&criteria).unwrap();
		assert_eq!(json["connectionDegree"], "2nd");
		assert!(json.get("sector").is_none());
	}
}
