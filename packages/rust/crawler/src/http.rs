//! HTTP session shared by the catalog, listing and detail fetchers.
//!
//! Requests that fail (non-success status or no response at all) are retried
//! against the same URL with a growing delay and no attempt ceiling.

use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, warn};
use url::Url;

use svedb_shared::{CrawlConfig, Result, SvedbError};

/// Header profile sent to the catalog search API.
const API_HEADERS: &[(&str, &str)] = &[
    (
        "user-agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:139.0) Gecko/20100101 Firefox/139.0",
    ),
    ("accept", "application/json, text/plain, */*"),
    ("accept-language", "en-US,en;q=0.5"),
    ("origin", "https://decklog-en.bushiroad.com"),
    ("referer", "https://decklog-en.bushiroad.com/create?c=6"),
    (
        "cookie",
        "CookieConsent={stamp:%273DYKV73AFO5pbjzWoPswMtCoN6lk1uQ2so6frmuwtakIxpvXO/uRgg==%27%2Cnecessary:true%2Cpreferences:true%2Cstatistics:true%2Cmarketing:true%2Cmethod:%27explicit%27%2Cver:1%2Cutc:1714065861850%2Cregion:%27us-34%27};",
    ),
    ("sec-fetch-dest", "empty"),
    ("sec-fetch-mode", "cors"),
    ("sec-fetch-site", "same-origin"),
    ("pragma", "no-cache"),
    ("cache-control", "no-cache"),
];

/// Header profile sent to the card site (detail pages, listings, images).
const SITE_HEADERS: &[(&str, &str)] = &[
    (
        "user-agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36",
    ),
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    ),
    ("accept-language", "en-US,en;q=0.5"),
    (
        "referer",
        "https://en.shadowverse-evolve.com/cards/searchresults/?expansion=CSD03A&view=image",
    ),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "same-origin"),
    ("sec-fetch-user", "?1"),
    ("pragma", "no-cache"),
    ("cache-control", "no-cache"),
    ("priority", "u=0, i"),
    ("upgrade-insecure-requests", "1"),
];

/// Directory (relative to the site root) holding card images.
const IMAGE_DIR: &str = "wordpress/wp-content/images/cardlist/";

/// Shared HTTP client plus the runtime crawl configuration.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct SiteClient {
    client: Client,
    config: Arc<CrawlConfig>,
    api_headers: HeaderMap,
    site_headers: HeaderMap,
}

impl SiteClient {
    /// Create a new client for the given configuration.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| SvedbError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config: Arc::new(config),
            api_headers: header_map(API_HEADERS)?,
            site_headers: header_map(SITE_HEADERS)?,
        })
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Resolve a path against the site root.
    pub fn site_url(&self, path: &str) -> Result<Url> {
        self.config
            .site_url
            .join(path)
            .map_err(|e| SvedbError::validation(format!("invalid site path '{path}': {e}")))
    }

    /// JSON `POST` to the catalog search API.
    pub(crate) fn api_post(&self, body: String) -> RequestBuilder {
        self.client
            .post(self.config.search_url.clone())
            .headers(self.api_headers.clone())
            .header(CONTENT_TYPE, "application/json;charset=utf-8")
            .body(body)
    }

    /// `GET` against the card site.
    pub(crate) fn site_get(&self, url: Url) -> RequestBuilder {
        self.client.get(url).headers(self.site_headers.clone())
    }

    /// Send the request produced by `build` until the upstream answers with a
    /// success status.
    ///
    /// Never gives up: a persistently failing upstream stalls the caller.
    pub(crate) async fn send_with_retry<F>(&self, what: &str, build: F) -> Response
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt: u32 = 0;
        loop {
            match build().send().await {
                Ok(response) if response.status().is_success() => {
                    if attempt > 0 {
                        debug!(what, attempt, "request recovered");
                    }
                    return response;
                }
                Ok(response) => {
                    warn!(what, status = %response.status(), attempt, "non-success response, retrying");
                }
                Err(e) => {
                    warn!(what, error = %e, attempt, "request failed, retrying");
                }
            }
            tokio::time::sleep(self.config.retry.delay(attempt)).await;
            attempt = attempt.saturating_add(1);
        }
    }

    /// Fetch a card image by its path under the image directory.
    ///
    /// A single attempt: a non-success status yields `Ok(None)`.
    pub async fn fetch_image(&self, img_path: &str) -> Result<Option<Vec<u8>>> {
        let url = self.site_url(IMAGE_DIR)?.join(img_path).map_err(|e| {
            SvedbError::validation(format!("invalid image path '{img_path}': {e}"))
        })?;

        let response = self
            .site_get(url.clone())
            .send()
            .await
            .map_err(|e| SvedbError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            debug!(%url, %status, "image not available");
            return Ok(None);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SvedbError::Network(format!("{url}: body read failed: {e}")))?;
        Ok(Some(bytes.to_vec()))
    }
}

fn header_map(pairs: &[(&str, &str)]) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| SvedbError::config(format!("invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| SvedbError::config(format!("invalid value for header '{name}': {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}
