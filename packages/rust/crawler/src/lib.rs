//! Fetching and scraping against the card catalog upstreams.
//!
//! This crate provides:
//! - [`SiteClient`]: shared HTTP session with header profiles and unbounded retry
//! - [`CatalogFetcher`]: paginated search API retrieval for one segment
//! - [`TokenLister`]: token records scraped from the site's text listing
//! - [`DetailScraper`]: per-record detail page enrichment
//! - [`extractors`]: interchangeable detail page extraction strategies

pub mod catalog;
pub mod detail;
pub mod extractors;
pub mod http;
pub mod listing;

pub use catalog::{CatalogFetcher, SegmentSummary};
pub use detail::{DetailScraper, STATUS_MARKER, scrape_detail};
pub use extractors::{
    DetailExtractor, ExtractedDetail, Face, PatternExtractor, RawFace, StructuralExtractor,
    extractor_for,
};
pub use http::SiteClient;
pub use listing::{TokenLister, parse_listing_page};

#[cfg(test)]
pub(crate) mod test_support {
    use std::time::Duration;

    use svedb_shared::{CrawlConfig, ExtractionStrategy, RetryPolicy};
    use url::Url;

    /// Crawl config pointed at a mock server, with near-zero pacing.
    pub fn test_config(base: &str) -> CrawlConfig {
        let site_url = Url::parse(base).unwrap();
        CrawlConfig {
            search_url: site_url.join("/system/app/api/search/6").unwrap(),
            site_url,
            asset_base_url: "https://img.example.org".into(),
            page_delay: Duration::from_millis(1),
            retry: RetryPolicy {
                base: Duration::from_millis(1),
                step: Duration::from_millis(1),
            },
            jitter_ms: (0, 0),
            token_pages: 2,
            strategy: ExtractionStrategy::Structural,
        }
    }

    pub fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }
}
