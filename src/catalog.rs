//! Catalog search and normalization.
//!
//! Talks to the Google Books volumes API and flattens its loosely-shaped
//! responses into [`BookRecord`]s. Every field of the raw payload may be
//! absent at any level, so [`normalize`] is total: it fills documented
//! defaults and never fails.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Default Google Books volumes endpoint.
const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/books/v1";

/// Results requested per search.
const MAX_RESULTS: u32 = 20;

/// Bound on every catalog call; the provider has no latency guarantees.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the catalog provider.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog request timed out")]
    Timeout,

    #[error("Catalog unreachable: {0}")]
    Unreachable(reqwest::Error),

    #[error("Catalog returned status {0}")]
    Status(StatusCode),
}

impl CatalogError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CatalogError::Timeout | CatalogError::Unreachable(_) => true,
            CatalogError::Status(status) => status.is_server_error(),
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CatalogError::Timeout
        } else {
            CatalogError::Unreachable(err)
        }
    }
}

/// A normalized catalog book, ready to be added to a shelf.
///
/// All fields carry serde defaults so a caller adding a book by hand can
/// supply as little as a title and external id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookRecord {
    /// Catalog-provider identifier. Foreign; not unique within our store.
    pub external_id: String,

    /// Book title.
    pub title: String,

    /// Authors, never empty once shelved.
    pub authors: Vec<String>,

    /// Cover image URL, always https when present.
    pub thumbnail: Option<String>,

    /// Description text.
    pub description: String,

    /// Publication date as the provider gives it (often just a year).
    pub published_date: String,

    /// Page count, 0 when unknown.
    pub page_count: u32,
}

/// Raw volume as returned by the catalog. All fields optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVolume {
    #[serde(default)]
    pub id: String,

    #[serde(default, rename = "volumeInfo")]
    pub volume_info: RawVolumeInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVolumeInfo {
    pub title: Option<String>,

    pub authors: Option<Vec<String>>,

    pub description: Option<String>,

    #[serde(rename = "publishedDate")]
    pub published_date: Option<String>,

    #[serde(rename = "pageCount")]
    pub page_count: Option<u32>,

    #[serde(rename = "imageLinks")]
    pub image_links: Option<RawImageLinks>,

    #[serde(default, rename = "industryIdentifiers")]
    pub industry_identifiers: Vec<RawIdentifier>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawImageLinks {
    pub thumbnail: Option<String>,

    #[serde(rename = "smallThumbnail")]
    pub small_thumbnail: Option<String>,

    pub medium: Option<String>,

    pub large: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawIdentifier {
    #[serde(default, rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub identifier: String,
}

#[derive(Debug, Default, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<RawVolume>,
}

/// Normalize a raw catalog volume into a [`BookRecord`].
///
/// Pure and total: missing fields fall back to documented defaults,
/// malformed nesting never causes an error.
pub fn normalize(raw: &RawVolume) -> BookRecord {
    let info = &raw.volume_info;

    let authors = match &info.authors {
        Some(authors) if !authors.is_empty() => authors.clone(),
        _ => vec!["Unknown Author".to_string()],
    };

    BookRecord {
        external_id: raw.id.clone(),
        title: info
            .title
            .clone()
            .unwrap_or_else(|| "No Title".to_string()),
        authors,
        thumbnail: resolve_thumbnail(info),
        description: info
            .description
            .clone()
            .unwrap_or_else(|| "No description available.".to_string()),
        published_date: info.published_date.clone().unwrap_or_default(),
        page_count: info.page_count.unwrap_or(0),
    }
}

/// Pick a cover URL: provider image links in priority order, then an
/// Open Library cover keyed by ISBN, then none.
fn resolve_thumbnail(info: &RawVolumeInfo) -> Option<String> {
    if let Some(links) = &info.image_links {
        let url = links
            .thumbnail
            .as_deref()
            .or(links.small_thumbnail.as_deref())
            .or(links.medium.as_deref())
            .or(links.large.as_deref());

        if let Some(url) = url {
            return Some(force_https(url));
        }
    }

    isbn_of(info).map(|isbn| format!("https://covers.openlibrary.org/b/isbn/{isbn}-L.jpg"))
}

/// ISBN-13 preferred, ISBN-10 as fallback.
fn isbn_of(info: &RawVolumeInfo) -> Option<&str> {
    let by_kind = |kind: &str| {
        info.industry_identifiers
            .iter()
            .find(|id| id.kind == kind)
            .map(|id| id.identifier.as_str())
    };

    by_kind("ISBN_13").or_else(|| by_kind("ISBN_10"))
}

/// Rewrite `http://` covers to `https://` to avoid mixed content.
fn force_https(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

/// Client for the external book catalog.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    /// Create a client against the default catalog endpoint.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client against a specific endpoint (used by tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        // Static settings; a builder failure here is a programming error,
        // and falling back to an unbounded client would lose the timeout.
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("catalog HTTP client construction cannot fail");

        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Full-text search of the catalog. Best effort, unauthenticated.
    pub async fn search(&self, query: &str) -> Result<Vec<BookRecord>, CatalogError> {
        let url = format!(
            "{}/volumes?q={}&maxResults={}",
            self.base_url,
            urlencoding::encode(query),
            MAX_RESULTS
        );

        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(CatalogError::Status(response.status()));
        }

        let data: VolumesResponse = response.json().await?;

        debug!(query = %query, results = data.items.len(), "Catalog search completed");

        Ok(data.items.iter().map(normalize).collect())
    }
}

impl Default for CatalogClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_from_json(json: serde_json::Value) -> RawVolume {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn normalize_is_total_on_empty_input() {
        let record = normalize(&RawVolume::default());

        assert_eq!(record.external_id, "");
        assert_eq!(record.title, "No Title");
        assert_eq!(record.authors, vec!["Unknown Author".to_string()]);
        assert_eq!(record.description, "No description available.");
        assert_eq!(record.published_date, "");
        assert_eq!(record.page_count, 0);
        assert!(record.thumbnail.is_none());
    }

    #[test]
    fn normalize_keeps_provided_fields() {
        let raw = raw_from_json(serde_json::json!({
            "id": "x1",
            "volumeInfo": {
                "title": "Dune",
                "authors": ["Frank Herbert"],
                "description": "Desert planet.",
                "publishedDate": "1965",
                "pageCount": 412,
            }
        }));

        let record = normalize(&raw);

        assert_eq!(record.external_id, "x1");
        assert_eq!(record.title, "Dune");
        assert_eq!(record.authors, vec!["Frank Herbert".to_string()]);
        assert_eq!(record.published_date, "1965");
        assert_eq!(record.page_count, 412);
    }

    #[test]
    fn empty_author_list_gets_placeholder() {
        let raw = raw_from_json(serde_json::json!({
            "volumeInfo": { "authors": [] }
        }));

        assert_eq!(normalize(&raw).authors, vec!["Unknown Author".to_string()]);
    }

    #[test]
    fn thumbnail_priority_prefers_thumbnail_then_small() {
        let raw = raw_from_json(serde_json::json!({
            "volumeInfo": {
                "imageLinks": {
                    "smallThumbnail": "https://img/small.jpg",
                    "thumbnail": "https://img/thumb.jpg",
                    "large": "https://img/large.jpg",
                }
            }
        }));
        assert_eq!(
            normalize(&raw).thumbnail.as_deref(),
            Some("https://img/thumb.jpg")
        );

        let raw = raw_from_json(serde_json::json!({
            "volumeInfo": {
                "imageLinks": { "medium": "https://img/medium.jpg" }
            }
        }));
        assert_eq!(
            normalize(&raw).thumbnail.as_deref(),
            Some("https://img/medium.jpg")
        );
    }

    #[test]
    fn http_thumbnail_rewritten_to_https() {
        let raw = raw_from_json(serde_json::json!({
            "volumeInfo": {
                "imageLinks": { "thumbnail": "http://img/thumb.jpg" }
            }
        }));

        assert_eq!(
            normalize(&raw).thumbnail.as_deref(),
            Some("https://img/thumb.jpg")
        );
    }

    #[test]
    fn isbn_fallback_prefers_isbn13() {
        let raw = raw_from_json(serde_json::json!({
            "volumeInfo": {
                "industryIdentifiers": [
                    { "type": "ISBN_10", "identifier": "0441013597" },
                    { "type": "ISBN_13", "identifier": "9780441013593" },
                ]
            }
        }));

        assert_eq!(
            normalize(&raw).thumbnail.as_deref(),
            Some("https://covers.openlibrary.org/b/isbn/9780441013593-L.jpg")
        );
    }

    #[test]
    fn isbn10_used_when_no_isbn13() {
        let raw = raw_from_json(serde_json::json!({
            "volumeInfo": {
                "industryIdentifiers": [
                    { "type": "ISBN_10", "identifier": "0441013597" },
                ]
            }
        }));

        assert_eq!(
            normalize(&raw).thumbnail.as_deref(),
            Some("https://covers.openlibrary.org/b/isbn/0441013597-L.jpg")
        );
    }

    #[test]
    fn client_construction_with_static_settings_succeeds() {
        let _ = CatalogClient::new();
        let _ = CatalogClient::with_base_url("http://localhost:1");
    }

    #[test]
    fn retryable_classification() {
        assert!(CatalogError::Timeout.is_retryable());
        assert!(CatalogError::Status(StatusCode::BAD_GATEWAY).is_retryable());
        assert!(!CatalogError::Status(StatusCode::BAD_REQUEST).is_retryable());
    }
}
