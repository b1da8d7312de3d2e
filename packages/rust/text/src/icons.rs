//! Inline icon images and the plain-text token each one stands for.
//!
//! Icons are identified by the file name in their `src` attribute, so the
//! lookup does not depend on attribute order or on how the markup was
//! serialized.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Directory every icon image is served from.
pub const ICON_DIR: &str = "/wordpress/wp-content/images/texticon/";

/// `(file name, token)` pairs.
pub const ICON_TOKENS: &[(&str, &str)] = &[
    // Classes
    ("icon_elf.png", "Forestcraft"),
    ("icon_royal.png", "Swordcraft"),
    ("icon_nightmare.png", "Abysscraft"),
    ("icon_dragon.png", "Dragoncraft"),
    ("icon_bishop.png", "Havencraft"),
    ("icon_neutral.png", "Neutral"),
    // Costs
    ("icon_cost00.png", "(0)"),
    ("icon_cost01.png", "(1)"),
    ("icon_cost02.png", "(2)"),
    ("icon_cost03.png", "(3)"),
    ("icon_cost04.png", "(4)"),
    ("icon_cost05.png", "(5)"),
    ("icon_cost06.png", "(6)"),
    ("icon_cost07.png", "(7)"),
    ("icon_cost08.png", "(8)"),
    ("icon_cost09.png", "(9)"),
    ("icon_cost10.png", "(10)"),
    // Keywords
    ("icon_quick.png", "[Quick]\n"),
    ("icon_fanfare.png", "[Fanfare]"),
    ("icon_evolve.png", "[Evolve]"),
    ("icon_hp.png", "Defense "),
    ("icon_power.png", "Attack "),
    ("icon_act.png", "[Action]"),
    ("icon_stand.png", "[Engage]"),
    ("icon_lastword.png", "[Last Words]"),
    ("icon_carrot.png", "[Serve]"),
    ("icon_q.png", "[Quick]"),
    // Not printed on any released card yet
    ("icon_ride.png", "[Ride]"),
];

static IMG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img\b[^>]*?\bsrc="([^"]+)"[^>]*>"#).expect("valid regex"));

fn token_for(src: &str) -> Option<&'static str> {
    let file = src.strip_prefix(ICON_DIR)?;
    ICON_TOKENS
        .iter()
        .find(|(name, _)| *name == file)
        .map(|(_, token)| *token)
}

/// Replace every known icon image with its token. Unknown images are left
/// as they are.
pub(crate) fn substitute_icons(markup: &str) -> String {
    IMG_RE
        .replace_all(markup, |caps: &Captures<'_>| match token_for(&caps[1]) {
            Some(token) => token.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
