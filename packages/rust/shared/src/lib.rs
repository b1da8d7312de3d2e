//! Shared types, error model, and configuration for svedb.
//!
//! This crate is the foundation depended on by all other svedb crates.
//! It provides:
//! - [`SvedbError`], the unified error type
//! - Domain types ([`RawRecord`], [`RecordSet`], [`RecordMetadata`], [`MetadataTable`])
//! - The segment registry ([`SegmentRegistry`])
//! - Configuration ([`AppConfig`], [`CrawlConfig`], config loading)

pub mod config;
pub mod error;
pub mod segments;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlConfig, EndpointsConfig, ExtractConfig, ExtractionStrategy, MirrorConfig,
    MirrorCredentials, PacingConfig, RetryPolicy, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{Result, SvedbError};
pub use segments::{SUPPORTED_SEGMENTS, Segment, SegmentRegistry, TOKEN_SEGMENT};
pub use types::{
    CostParams, FaceMetadata, FaceParams, IMAGE_EXTENSION, MetadataTable, MirroredAssetIndex,
    RawRecord, RecordMetadata, RecordSet, UNKNOWN_STAT, parse_stat,
};
