//! Extraction run orchestration for svedb.
//!
//! This crate ties together catalog fetching, detail enrichment, asset
//! mirroring and export assembly into one run ([`CatalogAggregator::run`]).

pub mod export;
pub mod mirror;
pub mod pipeline;

pub use export::{ExportRecord, clean_kind, export_all, export_record, write_export};
pub use mirror::{AssetMirror, MirrorOutcome, list_existing};
pub use pipeline::{
    CatalogAggregator, CatalogRun, ProgressReporter, SegmentFailure, SilentProgress,
};
pub use svedb_crawler::SegmentSummary;
