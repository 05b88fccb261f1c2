//! People-search URL construction and profile URL helpers.

use std::sync::LazyLock;

use outreach_protocol::{ConnectionDegree, SearchCriteria};
use regex::Regex;
use url::Url;
use url::form_urlencoded::byte_serialize;

/// People-search endpoint of the target platform.
pub const PEOPLE_SEARCH_URL: &str = "https://www.linkedin.com/search/results/people/";

static PROFILE_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/in/([^/?#]+)/?").expect("profile id pattern is valid"));

/// Builds a faceted people-search URL for `criteria`.
///
/// Facet values are wrapped as single-element JSON arrays (`["value"]`) and
/// percent-encoded. Origin and sort parameters are always appended.
pub fn search_url(base: &str, criteria: &SearchCriteria) -> String {
	let mut params = Vec::new();

	if let Some(sector) = &criteria.sector {
		params.push(format!("industry={}", facet(sector)));
	}
	if let Some(job_title) = &criteria.job_title {
		params.push(format!("title={}", facet(job_title)));
	}
	if let Some(location) = &criteria.location {
		params.push(format!("geoUrn={}", facet(location)));
	}
	if let Some(degree) = criteria.connection_degree {
		let code = match degree {
			ConnectionDegree::Second => "S",
			ConnectionDegree::Third => "O",
		};
		params.push(format!("network={}", facet(code)));
	}

	params.push("origin=FACETED_SEARCH".to_string());
	params.push("sortBy=RELEVANCE".to_string());

	format!("{base}?{}", params.join("&"))
}

fn facet(value: &str) -> String {
	let json = format!("[\"{}\"]", value.replace('\\', "\\\\").replace('"', "\\\""));
	byte_serialize(json.as_bytes()).collect()
}

/// Extracts the profile identifier from a `/in/<id>/` URL.
pub fn profile_id_from_url(url: &str) -> Option<String> {
	PROFILE_ID.captures(url).and_then(|caps| caps.get(1)).map(|m| m.as_str().to_string())
}

/// Drops query string and fragment. Unparsable input is cut at the first `?`.
pub fn canonical_profile_url(raw: &str) -> String {
	match Url::parse(raw) {
		Ok(mut url) => {
			url.set_query(None);
			url.set_fragment(None);
			url.to_string()
		}
		Err(_) => raw.split(['?', '#']).next().unwrap_or(raw).to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const BASE: &str = "https://www.example.com/search/results/people/";

	#[test]
	fn unfiltered_search_keeps_default_parameters() {
		assert_eq!(
			search_url(BASE, &SearchCriteria::default()),
			format!("{BASE}?origin=FACETED_SEARCH&sortBy=RELEVANCE")
		);
	}

	#[test]
	fn facets_are_json_wrapped_and_encoded() {
		let criteria = SearchCriteria::default()
			.with_sector("Software")
			.with_job_title("Head of Sales")
			.with_connection_degree(Some(ConnectionDegree::Second));
		let url = search_url(BASE, &criteria);
		assert!(url.contains("industry=%5B%22Software%22%5D"), "{url}");
		assert!(url.contains("title=%5B%22Head+of+Sales%22%5D"), "{url}");
		assert!(url.contains("network=%5B%22S%22%5D"), "{url}");
		assert!(url.ends_with("origin=FACETED_SEARCH&sortBy=RELEVANCE"));
	}

	#[test]
	fn third_degree_maps_to_out_of_network() {
		let criteria = SearchCriteria::default().with_connection_degree(Some(ConnectionDegree::Third));
		assert!(search_url(BASE, &criteria).contains("network=%5B%22O%22%5D"));
	}

	#[test]
	fn profile_id_is_taken_from_in_segment() {
		assert_eq!(profile_id_from_url("https://www.example.com/in/jane-doe-1234/").as_deref(), Some("jane-doe-1234"));
		assert_eq!(profile_id_from_url("https://www.example.com/in/jdoe?miniProfile=1").as_deref(), Some("jdoe"));
		assert_eq!(profile_id_from_url("https://www.example.com/company/acme/"), None);
	}

	#[test]
	fn canonical_url_strips_tracking() {
		assert_eq!(
			canonical_profile_url("https://www.example.com/in/jdoe/?miniProfileUrn=abc#top"),
			"https://www.example.com/in/jdoe/"
		);
		assert_eq!(canonical_profile_url("/in/jdoe?x=1"), "/in/jdoe");
	}
}
