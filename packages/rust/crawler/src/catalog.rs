//! Paginated retrieval of one catalog segment from the search API.

use serde::Serialize;
use tracing::{debug, info, instrument};

use svedb_shared::{RawRecord, RecordSet, Result, SvedbError};

use crate::http::SiteClient;

/// `deck_param1` value excluding unreleased cards.
const RELEASED_ONLY: &str = "N";

/// Request body for one page of the search API.
#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    param: SearchParam<'a>,
    page: u32,
}

/// Search filters. Every filter except the segment is sent as `null`.
#[derive(Debug, Default, Serialize)]
struct SearchParam<'a> {
    deck_type: Option<&'a str>,
    class_name: Option<&'a str>,
    keyword: Option<&'a str>,
    keyword_type: Option<Vec<&'a str>>,
    expansion: Option<&'a str>,
    cost: Option<Vec<&'a str>>,
    card_kind: Option<Vec<&'a str>>,
    format: Option<&'a str>,
    rare: Option<Vec<&'a str>>,
    power_from: Option<&'a str>,
    power_to: Option<&'a str>,
    hp_from: Option<&'a str>,
    hp_to: Option<&'a str>,
    #[serde(rename = "type")]
    type_: Option<&'a str>,
    ability: Option<&'a str>,
    limit_nt: Option<&'a str>,
    parallel: Option<&'a str>,
    deck_param1: Option<&'a str>,
    deck_param2: Option<&'a str>,
}

impl<'a> SearchRequest<'a> {
    fn new(segment: &'a str, page: u32) -> Self {
        Self {
            param: SearchParam {
                expansion: Some(segment),
                deck_param1: Some(RELEASED_ONLY),
                ..SearchParam::default()
            },
            page,
        }
    }
}

/// Per-segment counters reported after a successful fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentSummary {
    pub segment: String,
    /// Non-empty pages retrieved.
    pub pages: u32,
    /// Records returned across all pages.
    pub records_seen: usize,
    /// Records that were new to the result set.
    pub records_added: usize,
}

/// Walks the search API page by page for one segment.
#[derive(Debug, Clone)]
pub struct CatalogFetcher {
    site: SiteClient,
}

impl CatalogFetcher {
    pub fn new(site: SiteClient) -> Self {
        Self { site }
    }

    /// Fetch every page of `segment` into `records`, stopping at the first
    /// empty page.
    ///
    /// A page whose body cannot be read or decoded fails the segment; records
    /// merged from earlier pages stay in `records`.
    #[instrument(skip(self, records), fields(segment = %segment))]
    pub async fn fetch_segment(
        &self,
        segment: &str,
        records: &mut RecordSet,
    ) -> Result<SegmentSummary> {
        let mut summary = SegmentSummary {
            segment: segment.to_string(),
            ..SegmentSummary::default()
        };

        let mut page: u32 = 1;
        loop {
            if page > 1 {
                tokio::time::sleep(self.site.config().page_delay).await;
            }

            let batch = self.fetch_page(segment, page).await?;
            if batch.is_empty() {
                break;
            }

            summary.pages = page;
            summary.records_seen += batch.len();
            summary.records_added += records.extend_dedup(batch);
            debug!(page, total = records.len(), "page merged");
            page += 1;
        }

        records.sort();
        info!(
            pages = summary.pages,
            seen = summary.records_seen,
            added = summary.records_added,
            "segment fetched"
        );
        Ok(summary)
    }

    /// Fetch and decode a single page. An empty list marks the end.
    pub async fn fetch_page(&self, segment: &str, page: u32) -> Result<Vec<RawRecord>> {
        let failed = |message: String| SvedbError::PageFailed {
            segment: segment.to_string(),
            page,
            message,
        };

        let body = serde_json::to_string(&SearchRequest::new(segment, page))
            .map_err(|e| failed(format!("failed to encode request: {e}")))?;

        let what = format!("{segment} page {page}");
        let response = self
            .site
            .send_with_retry(&what, || self.site.api_post(body.clone()))
            .await;

        let text = response
            .text()
            .await
            .map_err(|e| failed(format!("failed to read body: {e}")))?;

        let batch: Option<Vec<RawRecord>> =
            serde_json::from_str(&text).map_err(|e| failed(format!("invalid JSON: {e}")))?;
        Ok(batch.unwrap_or_default())
    }
}
