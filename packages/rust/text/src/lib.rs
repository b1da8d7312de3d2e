//! Plain-text normalization of card ability markup.
//!
//! Card descriptions embed icons as `<img>` tags. [`normalize_icon_text`]
//! swaps each known icon for a text token, strips whatever markup is left,
//! collapses repeated spaces, and trims. Applying it twice gives the same
//! result as applying it once.

mod cleanup;
mod icons;

pub use icons::{ICON_DIR, ICON_TOKENS};

/// Convert ability markup into plain text.
pub fn normalize_icon_text(markup: &str) -> String {
    let substituted = icons::substitute_icons(markup);
    cleanup::run_pipeline(&substituted)
}
