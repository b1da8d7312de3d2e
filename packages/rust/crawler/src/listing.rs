//! Token cards, which the search API does not return, scraped from the
//! site's paginated text listing.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

use svedb_shared::{
    CostParams, FaceParams, IMAGE_EXTENSION, RawRecord, Result, SvedbError, TOKEN_SEGMENT,
    UNKNOWN_STAT, parse_stat,
};

use crate::extractors::{inner_text, own_text};
use crate::http::SiteClient;

/// Marks the start of each item in a listing page.
const ITEM_DELIMITER: &str = r#"<li class="ex-item">"#;

const LISTING_PATH: &str = "cards/searchresults_ex";

/// Fixed query filtering the listing down to tokens, text view.
const LISTING_QUERY: &[(&str, &str)] = &[
    ("card_name", ""),
    ("format[0]", "all"),
    ("class[0]", "all"),
    ("title", ""),
    ("expansion_name", ""),
    ("cost[0]", "all"),
    ("card_kind[0]", "Token"),
    ("rare[0]", "all"),
    ("power_from", ""),
    ("power_to", ""),
    ("hp_from", ""),
    ("hp_to", ""),
    ("type", ""),
    ("ability", ""),
    ("keyword", ""),
    ("view", "text"),
];

static ID_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a > div:nth-of-type(2) > p:nth-of-type(1)").expect("valid selector")
});
static NAME_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a > div:nth-of-type(2) > p:nth-of-type(2)").expect("valid selector")
});
static KIND_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a > div:nth-of-type(2) > div:nth-of-type(1) > span:nth-of-type(1)")
        .expect("valid selector")
});
static COST_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a > div:nth-of-type(2) > div:nth-of-type(1) > span:nth-of-type(4)")
        .expect("valid selector")
});

/// Walks the token listing pages.
#[derive(Debug, Clone)]
pub struct TokenLister {
    site: SiteClient,
}

impl TokenLister {
    pub fn new(site: SiteClient) -> Self {
        Self { site }
    }

    /// Fetch every configured listing page and collect the token records
    /// in page order.
    #[instrument(skip(self), fields(pages = self.site.config().token_pages))]
    pub async fn fetch_all(&self) -> Result<Vec<RawRecord>> {
        let mut tokens = Vec::new();

        for page in 1..=self.site.config().token_pages {
            if page > 1 {
                tokio::time::sleep(self.site.config().page_delay).await;
            }

            let url = self.listing_url(page)?;
            let what = format!("{TOKEN_SEGMENT} page {page}");
            let response = self
                .site
                .send_with_retry(&what, || self.site.site_get(url.clone()))
                .await;

            let html = response.text().await.map_err(|e| SvedbError::PageFailed {
                segment: TOKEN_SEGMENT.to_string(),
                page,
                message: format!("failed to read body: {e}"),
            })?;

            let found = parse_listing_page(&html);
            debug!(page, found = found.len(), "listing page parsed");
            tokens.extend(found);
        }

        info!(tokens = tokens.len(), "token listing complete");
        Ok(tokens)
    }

    /// Listing URL for `page`, stamped with the current time to bypass caches.
    fn listing_url(&self, page: u32) -> Result<Url> {
        let mut url = self.site.site_url(LISTING_PATH)?;
        url.query_pairs_mut()
            .extend_pairs(LISTING_QUERY)
            .append_pair("page", &page.to_string())
            .append_pair("t", &chrono::Utc::now().timestamp_millis().to_string());
        Ok(url)
    }
}

/// Parse every token item on one listing page.
///
/// Items that do not open with an anchor (placeholders, the page preamble)
/// are skipped, as are items without an identifier.
pub fn parse_listing_page(html: &str) -> Vec<RawRecord> {
    html.split(ITEM_DELIMITER)
        .filter(|item| item.starts_with("<a"))
        .filter_map(parse_listing_item)
        .collect()
}

fn parse_listing_item(fragment: &str) -> Option<RawRecord> {
    let doc = Html::parse_fragment(fragment);
    let text = |sel: &Selector| doc.select(sel).next().map(inner_text).unwrap_or_default();

    let id = text(&ID_SEL);
    if id.is_empty() {
        return None;
    }

    let cost = doc
        .select(&COST_SEL)
        .next()
        .map(|el| parse_stat(&own_text(el)))
        .unwrap_or(UNKNOWN_STAT);

    let segment = id.split('-').next().unwrap_or_default();
    let img = format!("{segment}/{id}.{IMAGE_EXTENSION}");

    Some(RawRecord {
        name: text(&NAME_SEL),
        kind: text(&KIND_SEL),
        img,
        max: UNKNOWN_STAT,
        g_param: CostParams { g0: cost },
        faces: FaceParams::default(),
        id,
        ..RawRecord::default()
    })
}
