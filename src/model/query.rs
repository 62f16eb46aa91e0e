use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static TRAILING_ZIP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"near\s+(\d{5})$").expect("zip regex"));

static LEADING_CUISINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\s+restaurants\s+near").expect("cuisine regex"));

/// A single search issued during the discovery phase
///
/// Identity is the normalized query text; the geographic and cuisine tags
/// are descriptive metadata carried through to the failure log so a failed
/// search can be re-issued with full context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Full query text, e.g. "Thai restaurants near 11229"
    pub query: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Query category tag, e.g. "city" or "cuisine_zip"
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
}

impl SearchQuery {
    /// Creates a query carrying only its text
    pub fn from_text(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            zip_code: None,
            city: None,
            state: None,
            kind: None,
            cuisine: None,
        }
    }

    /// Normalized identity used by the completed-search set
    pub fn identity(&self) -> String {
        self.query.trim().to_string()
    }
}

/// Reconstructs a [`SearchQuery`] from a bare query string
///
/// Recovery inputs are plain strings like "Chinese restaurants near 11229";
/// the trailing zip and leading cuisine are recovered by pattern match so
/// the replayed query carries the same tags the original run would have.
pub fn parse_query_string(text: &str) -> SearchQuery {
    let text = text.trim();
    let zip_code = TRAILING_ZIP_RE
        .captures(text)
        .map(|caps| caps[1].to_string());
    let cuisine = LEADING_CUISINE_RE
        .captures(text)
        .map(|caps| caps[1].to_string());

    SearchQuery {
        query: text.to_string(),
        zip_code,
        city: None,
        state: None,
        kind: cuisine.as_ref().map(|_| "cuisine_zip".to_string()),
        cuisine,
    }
}
