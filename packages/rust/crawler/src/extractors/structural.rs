//! Extraction by fixed element path.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::{DetailExtractor, ExtractedDetail, Face, RawFace, inner_text, own_text};

/// From `<body>` to the container of the face blocks.
const FACES_ROOT: &str = "body > div:nth-of-type(1) > div:nth-of-type(3) > div > div \
     > div:nth-of-type(2) > div:nth-of-type(2) > div:nth-of-type(1)";

/// From a face block to its data panel.
const FACE_DATA: &str = "div:nth-of-type(2) > div";

// Field paths below the data panel.
const ATTACK: &str = "div:nth-of-type(2) > span:nth-of-type(2)";
const DEFENSE: &str = "div:nth-of-type(2) > span:nth-of-type(3)";
const AFFILIATION: &str = "div:nth-of-type(1) > dl:nth-of-type(2) > dd";
const TRAIT: &str = "div:nth-of-type(1) > dl:nth-of-type(4) > dd";
const DESCRIPTION: &str = "div:nth-of-type(3) > p";

impl Face {
    /// Step selecting this face's block under [`FACES_ROOT`].
    fn block_step(self) -> &'static str {
        match self {
            Face::Primary => "div",
            Face::Secondary => "div:nth-of-type(2)",
        }
    }
}

/// Compiled field selectors for one face.
struct FaceSelectors {
    attack: Selector,
    defense: Selector,
    affiliation: Selector,
    trait_text: Selector,
    description: Selector,
}

impl FaceSelectors {
    fn compile(face: Face) -> Self {
        let field = |path: &str| {
            let full = format!("{FACES_ROOT} > {} > {FACE_DATA} > {path}", face.block_step());
            Selector::parse(&full).expect("valid selector")
        };
        Self {
            attack: field(ATTACK),
            defense: field(DEFENSE),
            affiliation: field(AFFILIATION),
            trait_text: field(TRAIT),
            description: field(DESCRIPTION),
        }
    }
}

static PRIMARY: LazyLock<FaceSelectors> = LazyLock::new(|| FaceSelectors::compile(Face::Primary));
static SECONDARY: LazyLock<FaceSelectors> =
    LazyLock::new(|| FaceSelectors::compile(Face::Secondary));

fn selectors(face: Face) -> &'static FaceSelectors {
    match face {
        Face::Primary => &PRIMARY,
        Face::Secondary => &SECONDARY,
    }
}

/// First match in document order.
fn first<'a>(doc: &'a Html, selector: &Selector) -> Option<ElementRef<'a>> {
    doc.select(selector).next()
}

/// Reads face values by walking the page's element tree.
pub struct StructuralExtractor;

impl StructuralExtractor {
    fn face(doc: &Html, face: Face) -> RawFace {
        let sel = selectors(face);

        RawFace {
            attack: first(doc, &sel.attack).map(own_text).unwrap_or_default(),
            defense: first(doc, &sel.defense).map(own_text).unwrap_or_default(),
            trait_text: first(doc, &sel.trait_text)
                .map(inner_text)
                .unwrap_or_default(),
            description_html: first(doc, &sel.description)
                .map(|el| el.inner_html().trim().to_string())
                .unwrap_or_default(),
        }
    }
}

impl DetailExtractor for StructuralExtractor {
    fn extract(&self, body: &str, double_sided: bool) -> ExtractedDetail {
        let doc = Html::parse_document(body);

        let affiliation = first(&doc, &selectors(Face::Primary).affiliation)
            .map(inner_text)
            .filter(|text| !text.is_empty());

        ExtractedDetail {
            primary: Self::face(&doc, Face::Primary),
            secondary: double_sided.then(|| Self::face(&doc, Face::Secondary)),
            affiliation,
        }
    }

    fn name(&self) -> &str {
        "structural"
    }
}
