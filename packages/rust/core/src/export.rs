//! Final output shape: one flat record per card, joining the catalog record
//! with its scraped metadata.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use svedb_shared::{MetadataTable, RawRecord, RecordMetadata, Result, SvedbError, UNKNOWN_STAT};

/// Separators the catalog puts inside kind strings (`Token・Follower`).
const KIND_SEPARATORS: &[&str] = &["\u{30FB}", " \\ "];

/// One card in the output document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    #[serde(rename = "cardId")]
    pub id: String,
    pub card_set: String,
    pub card_number: String,
    pub kind: String,
    pub class: String,
    #[serde(rename = "trait")]
    pub trait_text: String,
    pub name: String,
    pub img_url: String,
    pub cost: i32,
    pub description: String,
    #[serde(rename = "atk")]
    pub attack: i32,
    #[serde(rename = "def")]
    pub defense: i32,
    pub limited_to_count: i32,
    pub double_sided: bool,
    pub alt_img_url: String,
    pub alt_name: String,
    #[serde(rename = "altAtk")]
    pub alt_attack: i32,
    #[serde(rename = "altDef")]
    pub alt_defense: i32,
    pub alt_description: String,
    pub alt_trait: String,
}

/// Strip separator characters from a catalog kind string.
pub fn clean_kind(kind: &str) -> String {
    KIND_SEPARATORS
        .iter()
        .fold(kind.to_string(), |acc, sep| acc.replace(sep, ""))
}

/// Join `record` with its metadata.
///
/// Without metadata (or without a status block) numeric fields are -1 and
/// the record's own trait is kept.
/// A blank affiliation is filled from the class scraped off the detail page.
pub fn export_record(
    record: &RawRecord,
    metadata: Option<&RecordMetadata>,
    asset_base_url: &str,
) -> ExportRecord {
    let base = asset_base_url.trim_end_matches('/');
    let primary = metadata.and_then(|m| m.primary.as_ref());
    let secondary = metadata.and_then(|m| m.secondary.as_ref());

    let class = if record.affiliation.trim().is_empty() {
        metadata
            .and_then(|m| m.affiliation.clone())
            .unwrap_or_default()
    } else {
        record.affiliation.clone()
    };

    let alt_img_url = record
        .alt_image_stem()
        .map(|stem| format!("{base}/{stem}"))
        .unwrap_or_default();

    let alt_name = record
        .faces
        .alt_name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_default()
        .to_string();

    ExportRecord {
        id: record.id.clone(),
        card_set: record.segment().to_string(),
        card_number: record.local_number().to_string(),
        kind: clean_kind(&record.kind),
        class,
        trait_text: primary
            .map(|face| face.trait_text.clone())
            .unwrap_or_else(|| record.trait_text.clone()),
        name: record.name.clone(),
        img_url: format!("{base}/{}", record.id),
        cost: record.cost(),
        description: primary.map(|f| f.description.clone()).unwrap_or_default(),
        attack: primary.map_or(UNKNOWN_STAT, |f| f.attack),
        defense: primary.map_or(UNKNOWN_STAT, |f| f.defense),
        limited_to_count: record.max,
        double_sided: record.is_double_sided(),
        alt_img_url,
        alt_name,
        alt_attack: secondary.map_or(UNKNOWN_STAT, |f| f.attack),
        alt_defense: secondary.map_or(UNKNOWN_STAT, |f| f.defense),
        alt_description: secondary.map(|f| f.description.clone()).unwrap_or_default(),
        alt_trait: secondary.map(|f| f.trait_text.clone()).unwrap_or_default(),
    }
}

/// Export every record in order, looking each one up in `metadata`.
pub fn export_all(
    records: &[RawRecord],
    metadata: &MetadataTable,
    asset_base_url: &str,
) -> Vec<ExportRecord> {
    records
        .iter()
        .map(|record| export_record(record, metadata.get(&record.id).as_ref(), asset_base_url))
        .collect()
}

/// Write the export as a pretty-printed JSON array.
pub fn write_export(path: &Path, records: &[ExportRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(records)
        .map_err(|e| SvedbError::parse(format!("failed to serialize export: {e}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SvedbError::io(parent, e))?;
    }
    std::fs::write(path, json).map_err(|e| SvedbError::io(path, e))?;

    info!(path = %path.display(), records = records.len(), "export written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use svedb_shared::{CostParams, FaceMetadata, FaceParams};

    const BASE: &str = "https://evolvecdb.org/img";

    fn follower() -> RawRecord {
        RawRecord {
            id: "BP08-SL03EN".into(),
            name: "Deckhand Recruit".into(),
            kind: "Follower \\ Evolved".into(),
            rare: "SL".into(),
            img: "BP08/BP08-SL03EN.png".into(),
            affiliation: "Swordcraft".into(),
            trait_text: "Pirate".into(),
            max: 3,
            g_param: CostParams { g0: 1 },
            faces: FaceParams {
                double_sided: true,
                alt_name: Some("Captain of the Tide".into()),
                alt_img: Some("BP08/BP08-SL03_URAEN.png".into()),
            },
        }
    }

    fn face(attack: i32, defense: i32, description: &str, trait_text: &str) -> FaceMetadata {
        FaceMetadata {
            attack,
            defense,
            description: description.into(),
            trait_text: trait_text.into(),
        }
    }

    #[test]
    fn joins_record_and_metadata() {
        let meta = RecordMetadata {
            primary: Some(face(2, 2, "[Last Words]: Flip this card.", "Pirate")),
            secondary: Some(face(5, 5, "[Quick]\nBuff.", "Pirate / Captain")),
            affiliation: None,
        };
        let out = export_record(&follower(), Some(&meta), BASE);

        assert_eq!(out.card_set, "BP08");
        assert_eq!(out.card_number, "SL03EN");
        assert_eq!(out.kind, "FollowerEvolved");
        assert_eq!(out.img_url, "https://evolvecdb.org/img/BP08-SL03EN");
        assert_eq!(out.alt_img_url, "https://evolvecdb.org/img/BP08-SL03_URAEN");
        assert_eq!(out.alt_name, "Captain of the Tide");
        assert_eq!((out.attack, out.defense), (2, 2));
        assert_eq!((out.alt_attack, out.alt_defense), (5, 5));
        assert_eq!(out.alt_trait, "Pirate / Captain");
        assert_eq!(out.limited_to_count, 3);
        assert!(out.double_sided);
    }

    #[test]
    fn missing_metadata_uses_sentinels() {
        let mut record = follower();
        record.faces = FaceParams::default();
        let out = export_record(&record, Some(&RecordMetadata::empty()), BASE);

        assert_eq!((out.attack, out.defense), (UNKNOWN_STAT, UNKNOWN_STAT));
        assert_eq!((out.alt_attack, out.alt_defense), (UNKNOWN_STAT, UNKNOWN_STAT));
        assert_eq!(out.trait_text, "Pirate");
        assert_eq!(out.description, "");
        assert_eq!(out.alt_img_url, "");
        assert_eq!(out.alt_name, "");
    }

    #[test]
    fn blank_affiliation_falls_back_to_page_class() {
        let mut record = follower();
        record.affiliation = " ".into();
        let meta = RecordMetadata {
            primary: Some(face(1, 1, "", "")),
            secondary: None,
            affiliation: Some("Neutral".into()),
        };
        assert_eq!(export_record(&record, Some(&meta), BASE).class, "Neutral");
    }

    #[test]
    fn token_kind_is_cleaned() {
        assert_eq!(clean_kind("Token\u{30FB}Follower"), "TokenFollower");
        assert_eq!(clean_kind("Spell"), "Spell");
    }

    #[test]
    fn json_field_names() {
        let out = export_record(&follower(), None, "https://img.example.org/");
        let value = serde_json::to_value(&out).unwrap();
        let object = value.as_object().unwrap();

        for field in [
            "cardId", "cardSet", "cardNumber", "kind", "class", "trait", "name", "imgUrl",
            "cost", "description", "atk", "def", "limitedToCount", "doubleSided", "altImgUrl",
            "altName", "altAtk", "altDef", "altDescription", "altTrait",
        ] {
            assert!(object.contains_key(field), "missing {field}");
        }
        assert_eq!(object.len(), 20);
        assert_eq!(value["imgUrl"], "https://img.example.org/BP08-SL03EN");
    }

    #[test]
    fn export_all_keeps_order() {
        let table = MetadataTable::new();
        let mut second = follower();
        second.id = "BP08-SL04EN".into();
        let records = vec![follower(), second];

        let out = export_all(&records, &table, BASE);
        let ids: Vec<&str> = out.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["BP08-SL03EN", "BP08-SL04EN"]);
    }
}
