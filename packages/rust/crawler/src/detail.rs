//! Per-record detail page scraping.

use tracing::{debug, instrument};
use url::Url;

use svedb_shared::{
    FaceMetadata, MetadataTable, RawRecord, RecordMetadata, Result, SvedbError, parse_stat,
};
use svedb_text::normalize_icon_text;

use crate::extractors::{DetailExtractor, RawFace, extractor_for};
use crate::http::SiteClient;

/// Present only on pages that describe a real card.
pub const STATUS_MARKER: &str = r#"<div class="status">"#;

const DETAIL_PATH: &str = "cards/";

/// Fetches detail pages and records their metadata.
pub struct DetailScraper {
    site: SiteClient,
    extractor: Box<dyn DetailExtractor>,
}

impl DetailScraper {
    /// Scraper using the extractor selected by the configured strategy.
    pub fn new(site: SiteClient) -> Self {
        let extractor = extractor_for(site.config().strategy);
        Self::with_extractor(site, extractor)
    }

    pub fn with_extractor(site: SiteClient, extractor: Box<dyn DetailExtractor>) -> Self {
        Self { site, extractor }
    }

    pub fn extractor_name(&self) -> &str {
        self.extractor.name()
    }

    /// Detail page URL for a record identifier.
    pub fn detail_url(&self, id: &str) -> Result<Url> {
        let mut url = self.site.site_url(DETAIL_PATH)?;
        url.query_pairs_mut()
            .append_pair("cardno", id)
            .append_pair("view", "image");
        Ok(url)
    }

    /// Fetch the record's detail page and insert its metadata into `table`.
    ///
    /// Returns the entry held by the table, which is the existing one when the
    /// identifier was already enriched.
    #[instrument(skip_all, fields(record = %record.id))]
    pub async fn enrich(&self, record: &RawRecord, table: &MetadataTable) -> Result<RecordMetadata> {
        if let Some(existing) = table.get(&record.id) {
            debug!("already enriched");
            return Ok(existing);
        }

        let url = self.detail_url(&record.id)?;
        let response = self
            .site
            .send_with_retry(&record.id, || self.site.site_get(url.clone()))
            .await;

        let body = response
            .text()
            .await
            .map_err(|e| SvedbError::Network(format!("{url}: failed to read body: {e}")))?;

        let metadata = scrape_detail(self.extractor.as_ref(), &body, record);
        Ok(table.insert_if_absent(&record.id, metadata))
    }
}

/// Turn a detail page body into metadata for `record`.
///
/// A page without the status block yields empty metadata. The secondary face
/// is read only for double-sided records, and the page's class is kept only
/// when the record itself has no affiliation.
pub fn scrape_detail(
    extractor: &dyn DetailExtractor,
    body: &str,
    record: &RawRecord,
) -> RecordMetadata {
    if !body.contains(STATUS_MARKER) {
        debug!(record = %record.id, "no status block");
        return RecordMetadata::empty();
    }

    let detail = extractor.extract(body, record.is_double_sided());

    let affiliation = if record.affiliation.trim().is_empty() {
        detail.affiliation
    } else {
        None
    };

    RecordMetadata {
        primary: Some(face_metadata(detail.primary)),
        secondary: detail.secondary.map(face_metadata),
        affiliation,
    }
}

fn face_metadata(raw: RawFace) -> FaceMetadata {
    FaceMetadata {
        attack: parse_stat(&raw.attack),
        defense: parse_stat(&raw.defense),
        description: normalize_icon_text(&raw.description_html),
        trait_text: raw.trait_text.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::{PatternExtractor, StructuralExtractor};
    use crate::test_support::{load_fixture, test_config};
    use svedb_shared::{FaceParams, UNKNOWN_STAT};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record(id: &str, affiliation: &str, double_sided: bool) -> RawRecord {
        RawRecord {
            id: id.into(),
            affiliation: affiliation.into(),
            faces: FaceParams {
                double_sided,
                ..FaceParams::default()
            },
            ..RawRecord::default()
        }
    }

    #[test]
    fn single_face_metadata() {
        let body = load_fixture("detail_single.html");
        let meta = scrape_detail(&StructuralExtractor, &body, &record("BP01-001EN", "Forestcraft", false));

        let primary = meta.primary.expect("primary face");
        assert_eq!(primary.attack, 3);
        assert_eq!(primary.defense, 4);
        assert_eq!(primary.trait_text, "Elf / Warrior");
        assert_eq!(
            primary.description,
            "[Fanfare]: Put a Fairy into play. [Evolve]: Pay (3) to draw a card."
        );
        assert!(meta.secondary.is_none());
        assert!(meta.affiliation.is_none());
    }

    #[test]
    fn double_sided_metadata() {
        let body = load_fixture("detail_double.html");
        let meta = scrape_detail(&PatternExtractor, &body, &record("BP08-SL03EN", "", true));

        assert_eq!(meta.primary.as_ref().unwrap().description, "[Last Words]: Flip this card.");
        let back = meta.secondary.expect("secondary face");
        assert_eq!(back.attack, 5);
        assert_eq!(back.trait_text, "Pirate / Captain");
        assert_eq!(
            back.description,
            "[Quick]\nGive an allied follower +2 Attack until the end of the turn."
        );
        assert_eq!(meta.affiliation.as_deref(), Some("Swordcraft"));
    }

    #[test]
    fn missing_status_block_yields_empty() {
        let body = load_fixture("detail_no_status.html");
        let meta = scrape_detail(&StructuralExtractor, &body, &record("PR-999EN", "", false));
        assert_eq!(meta, RecordMetadata::empty());
    }

    #[test]
    fn non_numeric_stat_is_unknown() {
        let body = load_fixture("detail_single.html").replace("Attack</span>3", "Attack</span>-");
        let meta = scrape_detail(&StructuralExtractor, &body, &record("BP01-001EN", "Forestcraft", false));
        let primary = meta.primary.unwrap();
        assert_eq!(primary.attack, UNKNOWN_STAT);
        assert_eq!(primary.defense, 4);
    }

    #[tokio::test]
    async fn enrich_fetches_once_per_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cards/"))
            .and(query_param("cardno", "BP01-001EN"))
            .and(query_param("view", "image"))
            .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("detail_single.html")))
            .expect(1)
            .mount(&server)
            .await;

        let scraper = DetailScraper::new(SiteClient::new(test_config(&server.uri())).unwrap());
        assert_eq!(scraper.extractor_name(), "structural");

        let table = MetadataTable::new();
        let rec = record("BP01-001EN", "Forestcraft", false);
        let first = scraper.enrich(&rec, &table).await.unwrap();
        let second = scraper.enrich(&rec, &table).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(table.len(), 1);
        assert!(table.get("BP01-001EN").unwrap().has_status());
    }

    #[tokio::test]
    async fn enrich_retries_unavailable_detail_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cards/"))
            .and(query_param("cardno", "BP01-001EN"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cards/"))
            .and(query_param("cardno", "BP01-001EN"))
            .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("detail_single.html")))
            .expect(1)
            .mount(&server)
            .await;

        let scraper = DetailScraper::new(SiteClient::new(test_config(&server.uri())).unwrap());
        let table = MetadataTable::new();
        let meta = scraper
            .enrich(&record("BP01-001EN", "Forestcraft", false), &table)
            .await
            .unwrap();

        assert_eq!(meta.primary.unwrap().attack, 3);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }
}
