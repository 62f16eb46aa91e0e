use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Matches the place identifier embedded in a maps result link:
/// a `!1s` marker followed by two hex tokens joined by a colon.
static PLACE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!1s(0x[0-9a-f]+:0x[0-9a-f]+)").expect("place id regex"));

/// URL template used to re-visit a place directly by identifier
const PLACE_URL_TEMPLATE: &str = "https://www.google.com/maps/place/data=!4m2!3m1!1s";

/// An opaque reference to a place detail page, discovered by the search phase
///
/// The raw string usually embeds a place identifier that can be recovered
/// with [`extract_place_id`]; links whose identifier cannot be parsed are
/// still valid work items and are identified by the raw string itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateLink(pub String);

impl CandidateLink {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw link string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extracts the embedded place identifier, if present
    pub fn place_id(&self) -> Option<String> {
        extract_place_id(&self.0)
    }

    /// Identity used for queue deduplication: the embedded identifier when
    /// it can be parsed, the raw string otherwise
    pub fn identity(&self) -> String {
        self.place_id().unwrap_or_else(|| self.0.clone())
    }
}

impl std::fmt::Display for CandidateLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CandidateLink {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for CandidateLink {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

/// Extracts a place identifier from an opaque link string
///
/// Returns `None` when the link carries no parseable identifier. This is a
/// pure function so identity handling stays testable without any fetch
/// state.
pub fn extract_place_id(link: &str) -> Option<String> {
    PLACE_ID_RE
        .captures(link)
        .map(|caps| caps[1].to_string())
}

/// Builds a direct detail-page URL for a known place identifier
///
/// Used by the reconciliation recovery flow, which has identifiers but no
/// surviving links.
pub fn place_url_for_id(place_id: &str) -> String {
    format!("{}{}", PLACE_URL_TEMPLATE, place_id)
}
