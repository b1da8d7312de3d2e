//! Detail page extractors.
//!
//! Two interchangeable strategies read the same fields from a detail page:
//! [`StructuralExtractor`] walks a fixed element path, [`PatternExtractor`]
//! matches textual patterns against the raw markup.

mod pattern;
mod structural;

use scraper::ElementRef;
use scraper::node::Node;

use svedb_shared::ExtractionStrategy;

pub use pattern::PatternExtractor;
pub use structural::StructuralExtractor;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Which face of a card a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Primary,
    Secondary,
}

impl Face {
    /// Position of the face among the page's face blocks.
    pub fn index(self) -> usize {
        match self {
            Face::Primary => 0,
            Face::Secondary => 1,
        }
    }
}

/// Unparsed values for one face, as found on the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFace {
    pub attack: String,
    pub defense: String,
    pub trait_text: String,
    /// Inner markup of the description, icons included.
    pub description_html: String,
}

/// Everything an extractor reads from one detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedDetail {
    pub primary: RawFace,
    /// Present only when the record was marked double-sided.
    pub secondary: Option<RawFace>,
    /// Class shown on the primary face, when non-blank.
    pub affiliation: Option<String>,
}

/// Reads face values out of a detail page body.
///
/// Missing elements yield empty strings rather than errors.
pub trait DetailExtractor: Send + Sync {
    fn extract(&self, body: &str, double_sided: bool) -> ExtractedDetail;

    /// Human-readable extractor name for tracing.
    fn name(&self) -> &str;
}

/// Build the extractor for a configured strategy.
pub fn extractor_for(strategy: ExtractionStrategy) -> Box<dyn DetailExtractor> {
    match strategy {
        ExtractionStrategy::Structural => Box::new(StructuralExtractor),
        ExtractionStrategy::Pattern => Box::new(PatternExtractor),
    }
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

/// First non-blank text node directly under `el`, trimmed.
///
/// Skips text inside child elements, so a labelled value such as
/// `<span><span>Attack</span>3</span>` yields `3`.
pub(crate) fn own_text(el: ElementRef<'_>) -> String {
    el.children()
        .filter_map(|child| match child.value() {
            Node::Text(text) => Some(text.trim()),
            _ => None,
        })
        .find(|text| !text.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// All descendant text of `el`, trimmed.
pub(crate) fn inner_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn own_text_skips_labels() {
        let doc = Html::parse_fragment(
            r#"<span id="v"> <span class="heading">Attack</span> 3 </span>"#,
        );
        let sel = Selector::parse("#v").unwrap();
        assert_eq!(own_text(doc.select(&sel).next().unwrap()), "3");
    }

    #[test]
    fn inner_text_flattens() {
        let doc = Html::parse_fragment(r#"<dd id="v"> Elf / <b>Warrior</b> </dd>"#);
        let sel = Selector::parse("#v").unwrap();
        assert_eq!(inner_text(doc.select(&sel).next().unwrap()), "Elf / Warrior");
    }

    #[test]
    fn strategy_selects_extractor() {
        assert_eq!(extractor_for(ExtractionStrategy::Structural).name(), "structural");
        assert_eq!(extractor_for(ExtractionStrategy::Pattern).name(), "pattern");
    }
}
