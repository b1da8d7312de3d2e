//! End-to-end extraction run: segments → catalog fetch → enrichment → mirroring.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{info, instrument, warn};

use svedb_crawler::{CatalogFetcher, DetailScraper, SegmentSummary, SiteClient, TokenLister};
use svedb_shared::{
    CrawlConfig, MetadataTable, RawRecord, RecordSet, Result, Segment, SegmentRegistry,
    TOKEN_SEGMENT,
};
use svedb_storage::AssetStore;

use crate::export::{ExportRecord, export_all};
use crate::mirror::{AssetMirror, MirrorOutcome};

/// A segment whose fetch was abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentFailure {
    pub segment: String,
    pub error: String,
}

/// Result of [`CatalogAggregator::run`].
#[derive(Debug)]
pub struct CatalogRun {
    /// Deduplicated records, sorted by identifier.
    pub records: Vec<RawRecord>,
    /// Scraped metadata, one entry per enriched identifier.
    pub metadata: MetadataTable,
    /// Segments fetched to completion.
    pub segments: Vec<SegmentSummary>,
    /// Segments abandoned part way.
    pub failed_segments: Vec<SegmentFailure>,
    /// Images uploaded to the asset store.
    pub uploads: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

impl CatalogRun {
    /// Assemble the output document.
    pub fn export(&self, asset_base_url: &str) -> Vec<ExportRecord> {
        export_all(&self.records, &self.metadata, asset_base_url)
    }
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a segment has been fetched to completion.
    fn segment_fetched(&self, summary: &SegmentSummary);
    /// Called after each record has been enriched (and mirrored).
    fn record_enriched(&self, id: &str, current: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, run: &CatalogRun);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn segment_fetched(&self, _summary: &SegmentSummary) {}
    fn record_enriched(&self, _id: &str, _current: usize, _total: usize) {}
    fn done(&self, _run: &CatalogRun) {}
}

/// Orchestrates fetching, enrichment and mirroring across segments.
pub struct CatalogAggregator {
    site: SiteClient,
    registry: SegmentRegistry,
    store: Option<Arc<dyn AssetStore>>,
}

impl CatalogAggregator {
    pub fn new(config: CrawlConfig, registry: SegmentRegistry) -> Result<Self> {
        Ok(Self {
            site: SiteClient::new(config)?,
            registry,
            store: None,
        })
    }

    /// Mirror every record's images into `store` during enrichment.
    pub fn with_asset_store(mut self, store: Arc<dyn AssetStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Run the full extraction for a segment request (`BP01;SD02`, `all`).
    ///
    /// 1. Resolve the request against the registry
    /// 2. Fetch each segment in turn; a failing segment is logged and skipped
    /// 3. Enrich every record from its detail page, with jitter between records
    /// 4. Mirror images, when an asset store is configured
    #[instrument(skip_all, fields(request = %request))]
    pub async fn run(&self, request: &str, progress: &dyn ProgressReporter) -> Result<CatalogRun> {
        let start = Instant::now();
        let segments = self.registry.resolve(request)?;
        info!(segments = segments.len(), "starting extraction");

        // --- Phase 1: Catalog ---
        progress.phase("Fetching catalog");
        let fetcher = CatalogFetcher::new(self.site.clone());
        let mut records = RecordSet::new();
        let mut summaries = Vec::new();
        let mut failed_segments = Vec::new();

        for segment in &segments {
            let outcome = match segment {
                Segment::Catalog(code) => fetcher.fetch_segment(code, &mut records).await,
                Segment::Tokens => self.fetch_tokens(&mut records).await,
            };

            match outcome {
                Ok(summary) => {
                    progress.segment_fetched(&summary);
                    summaries.push(summary);
                }
                Err(e) => {
                    warn!(segment = %segment, error = %e, "segment abandoned");
                    failed_segments.push(SegmentFailure {
                        segment: segment.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        records.sort();
        let records = records.into_vec();
        info!(records = records.len(), failed = failed_segments.len(), "catalog fetched");

        // --- Phase 2: Mirror index ---
        let mirror = match &self.store {
            Some(store) => {
                progress.phase("Listing mirrored assets");
                Some(AssetMirror::open(self.site.clone(), Arc::clone(store)).await)
            }
            None => None,
        };

        // --- Phase 3: Enrichment ---
        progress.phase("Enriching records");
        let scraper = DetailScraper::new(self.site.clone());
        let metadata = MetadataTable::new();
        let total = records.len();
        let mut uploads = 0;

        for (i, record) in records.iter().enumerate() {
            self.jitter().await;

            if let Err(e) = scraper.enrich(record, &metadata).await {
                warn!(record = %record.id, error = %e, "enrichment failed");
            }

            if let Some(mirror) = &mirror {
                if let MirrorOutcome::Uploaded { files } = mirror.mirror(record).await {
                    uploads += files;
                }
            }

            progress.record_enriched(&record.id, i + 1, total);
        }

        let run = CatalogRun {
            records,
            metadata,
            segments: summaries,
            failed_segments,
            uploads,
            elapsed: start.elapsed(),
        };

        info!(
            records = run.records.len(),
            enriched = run.metadata.len(),
            uploads = run.uploads,
            elapsed_ms = run.elapsed.as_millis() as u64,
            "extraction complete"
        );
        progress.done(&run);
        Ok(run)
    }

    /// Fetch the token listing into `records`.
    async fn fetch_tokens(&self, records: &mut RecordSet) -> Result<SegmentSummary> {
        let tokens = TokenLister::new(self.site.clone()).fetch_all().await?;
        let records_seen = tokens.len();
        let records_added = records.extend_dedup(tokens);
        records.sort();

        Ok(SegmentSummary {
            segment: TOKEN_SEGMENT.to_string(),
            pages: self.site.config().token_pages,
            records_seen,
            records_added,
        })
    }

    /// Random pause between detail page requests.
    async fn jitter(&self) {
        let delay = jitter_delay(self.site.config().jitter_ms);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Pick a pause within `bounds`, in either order.
fn jitter_delay((a, b): (u64, u64)) -> Duration {
    let (lo, hi) = (a.min(b), a.max(b));
    if hi == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(lo..=hi))
}
