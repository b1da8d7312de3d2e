//! Core domain types for the card catalog.

use std::collections::HashSet;

use dashmap::DashMap;
use serde::{Deserialize, Deserializer, Serialize};

/// File extension of mirrored card images.
pub const IMAGE_EXTENSION: &str = "png";

/// Value recorded for a numeric field that is absent or not an integer.
pub const UNKNOWN_STAT: i32 = -1;

/// Parse a scraped numeric field, yielding [`UNKNOWN_STAT`] when it is
/// empty or not an integer.
pub fn parse_stat(text: &str) -> i32 {
    text.trim().parse().unwrap_or(UNKNOWN_STAT)
}

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// RawRecord
// ---------------------------------------------------------------------------

/// A card as returned by one page of the catalog search API.
///
/// Identity is the identifier alone: two records with the same `id` compare
/// equal and hash alike whatever their other fields hold.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    /// `<segment>-<localnum>`, e.g. `BP01-001EN`.
    #[serde(rename = "card_number", default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "card_kind", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rare: String,
    /// Image path relative to the site's card image directory.
    #[serde(default, deserialize_with = "null_as_default")]
    pub img: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub affiliation: String,
    #[serde(rename = "trait", default, deserialize_with = "null_as_default")]
    pub trait_text: String,
    /// Copies allowed per deck.
    #[serde(default, deserialize_with = "null_as_default")]
    pub max: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub g_param: CostParams,
    #[serde(rename = "custom_param", default, deserialize_with = "null_as_default")]
    pub faces: FaceParams,
}

/// Numeric cost parameters; `g0` is the play cost.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostParams {
    #[serde(default, deserialize_with = "null_as_default")]
    pub g0: i32,
}

/// Double-sided flag and secondary-face overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaceParams {
    #[serde(rename = "is_bothsides", default, deserialize_with = "null_as_default")]
    pub double_sided: bool,
    #[serde(rename = "rev_name", default)]
    pub alt_name: Option<String>,
    /// e.g. `BP08/BP08-SL03_URAEN.png`
    #[serde(rename = "rev_img", default)]
    pub alt_img: Option<String>,
}

impl RawRecord {
    /// Segment code: the identifier up to the first `-`.
    pub fn segment(&self) -> &str {
        self.id.split('-').next().unwrap_or_default()
    }

    /// Local number: the identifier's second `-`-separated part.
    pub fn local_number(&self) -> &str {
        self.id.split('-').nth(1).unwrap_or_default()
    }

    pub fn is_double_sided(&self) -> bool {
        self.faces.double_sided
    }

    /// Play cost.
    pub fn cost(&self) -> i32 {
        self.g_param.g0
    }

    /// Secondary image path, if the record carries a non-blank one.
    pub fn alt_image_path(&self) -> Option<&str> {
        self.faces
            .alt_img
            .as_deref()
            .filter(|path| !path.trim().is_empty())
    }

    /// File name of the secondary image (`BP08-SL03_URAEN.png`).
    pub fn alt_image_file(&self) -> Option<&str> {
        let suffix = format!(".{IMAGE_EXTENSION}");
        self.alt_image_path()?
            .split('/')
            .find(|part| part.contains(suffix.as_str()))
    }

    /// Secondary image file name without its extension.
    pub fn alt_image_stem(&self) -> Option<String> {
        let suffix = format!(".{IMAGE_EXTENSION}");
        self.alt_image_file().map(|file| file.replace(suffix.as_str(), ""))
    }
}

impl PartialEq for RawRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RawRecord {}

impl std::hash::Hash for RawRecord {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for RawRecord {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RawRecord {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

// ---------------------------------------------------------------------------
// RecordSet
// ---------------------------------------------------------------------------

/// Run-scoped ordered collection of records, unique by identifier.
///
/// The first record seen for an identifier is kept; later duplicates are dropped.
#[derive(Debug, Default)]
pub struct RecordSet {
    records: Vec<RawRecord>,
    seen: HashSet<String>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page of records, dropping identifiers already present.
    /// Returns how many records were actually added.
    pub fn extend_dedup(&mut self, page: impl IntoIterator<Item = RawRecord>) -> usize {
        let before = self.records.len();
        for record in page {
            if self.seen.insert(record.id.clone()) {
                self.records.push(record);
            }
        }
        self.records.len() - before
    }

    /// Sort by identifier, lexicographically ascending.
    pub fn sort(&mut self) {
        self.records.sort();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RawRecord> {
        self.records.iter()
    }

    pub fn into_vec(self) -> Vec<RawRecord> {
        self.records
    }
}

// ---------------------------------------------------------------------------
// RecordMetadata
// ---------------------------------------------------------------------------

/// Attributes scraped from one face of a detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceMetadata {
    /// Attack, or [`UNKNOWN_STAT`].
    pub attack: i32,
    /// Defense, or [`UNKNOWN_STAT`].
    pub defense: i32,
    /// Normalized plain-text ability block.
    pub description: String,
    pub trait_text: String,
}

/// Scraped secondary attributes for one record.
///
/// `primary` is `None` when the detail page has no status block (e.g. spell
/// or amulet cards); `secondary` is only filled for double-sided records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub primary: Option<FaceMetadata>,
    pub secondary: Option<FaceMetadata>,
    /// Class read from the page, captured only when the record's own is blank.
    pub affiliation: Option<String>,
}

impl RecordMetadata {
    /// Entry stored for pages without structured fields.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_status(&self) -> bool {
        self.primary.is_some()
    }
}

/// Concurrency-safe metadata store keyed by identifier.
///
/// Writes are first-write-wins: inserting for an identifier that already has
/// an entry leaves the existing entry untouched.
#[derive(Debug, Default)]
pub struct MetadataTable {
    entries: DashMap<String, RecordMetadata>,
}

impl MetadataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `metadata` unless `id` already has an entry.
    /// Returns the entry now held for `id`.
    pub fn insert_if_absent(&self, id: &str, metadata: RecordMetadata) -> RecordMetadata {
        self.entries
            .entry(id.to_string())
            .or_insert(metadata)
            .value()
            .clone()
    }

    pub fn get(&self, id: &str) -> Option<RecordMetadata> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// MirroredAssetIndex
// ---------------------------------------------------------------------------

/// Snapshot of the keys already present in the asset store at run start,
/// with the image extension stripped.
#[derive(Debug, Clone, Default)]
pub struct MirroredAssetIndex {
    keys: Vec<String>,
    lowered: Vec<String>,
}

impl MirroredAssetIndex {
    /// Build the index from raw object keys (`BP01-001EN.png`).
    pub fn from_keys(keys: impl IntoIterator<Item = String>) -> Self {
        let suffix = format!(".{IMAGE_EXTENSION}");
        let keys: Vec<String> = keys
            .into_iter()
            .map(|key| match key.strip_suffix(suffix.as_str()) {
                Some(stem) => stem.to_string(),
                None => key,
            })
            .collect();
        let lowered = keys.iter().map(|key| key.to_lowercase()).collect();
        Self { keys, lowered }
    }

    /// True when some key contains `id`, ignoring case.
    pub fn covers(&self, id: &str) -> bool {
        let needle = id.to_lowercase();
        self.lowered.iter().any(|key| key.contains(&needle))
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
