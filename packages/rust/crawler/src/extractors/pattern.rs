//! Extraction by textual pattern over the raw markup.
//!
//! Each face block repeats the same labelled fields, so the N-th match of a
//! field's pattern belongs to the N-th face.

use std::sync::LazyLock;

use regex::Regex;

use super::{DetailExtractor, ExtractedDetail, Face, RawFace};

static ATTACK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<span class="heading heading-Power">[^<]*</span>\s*([^<]*)"#)
        .expect("valid regex")
});

static DEFENSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<span class="heading heading-Hp">[^<]*</span>\s*([^<]*)"#).expect("valid regex")
});

static TRAIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<dt>Trait</dt>\s*<dd>(.*?)</dd>").expect("valid regex"));

static CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<dt>Class</dt>\s*<dd>(.*?)</dd>").expect("valid regex"));

static DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<div class="text">\s*<p[^>]*>(.*?)</p>"#).expect("valid regex")
});

/// Group 1 of the `n`-th match, trimmed; empty when there are fewer matches.
fn nth_capture(re: &Regex, body: &str, n: usize) -> String {
    re.captures_iter(body)
        .nth(n)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Reads face values with regular expressions, without building a DOM.
pub struct PatternExtractor;

impl PatternExtractor {
    fn face(body: &str, face: Face) -> RawFace {
        let n = face.index();
        RawFace {
            attack: nth_capture(&ATTACK_RE, body, n),
            defense: nth_capture(&DEFENSE_RE, body, n),
            trait_text: nth_capture(&TRAIT_RE, body, n),
            description_html: nth_capture(&DESCRIPTION_RE, body, n),
        }
    }
}

impl DetailExtractor for PatternExtractor {
    fn extract(&self, body: &str, double_sided: bool) -> ExtractedDetail {
        let affiliation = Some(nth_capture(&CLASS_RE, body, Face::Primary.index()))
            .filter(|text| !text.is_empty());

        ExtractedDetail {
            primary: Self::face(body, Face::Primary),
            secondary: double_sided.then(|| Self::face(body, Face::Secondary)),
            affiliation,
        }
    }

    fn name(&self) -> &str {
        "pattern"
    }
}
