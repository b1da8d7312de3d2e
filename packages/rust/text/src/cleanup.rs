//! Post-substitution cleanup passes.
//!
//! Each pass is a function `&str -> String` applied in sequence.

use std::sync::LazyLock;

use regex::Regex;

/// Run the cleanup passes on icon-substituted text.
pub(crate) fn run_pipeline(text: &str) -> String {
    let mut result = strip_tags(text);
    result = collapse_spaces(&result);
    result.trim().to_string()
}

/// Remove any remaining angle-bracket spans (within a single line).
fn strip_tags(text: &str) -> String {
    static TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<.*?>").expect("valid regex"));

    TAG_RE.replace_all(text, "").into_owned()
}

/// Collapse every run of two or more spaces into one.
fn collapse_spaces(text: &str) -> String {
    static SPACES_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r" {2,}").expect("valid regex"));

    SPACES_RE.replace_all(text, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_nested_and_adjacent_tags() {
        assert_eq!(strip_tags("<b>Bold</b> <i>it</i>"), "Bold it");
        assert_eq!(strip_tags("a<br>b"), "ab");
    }

    #[test]
    fn tag_spans_do_not_cross_lines() {
        assert_eq!(strip_tags("1 <\n2 >"), "1 <\n2 >");
    }

    #[test]
    fn collapses_long_runs() {
        assert_eq!(collapse_spaces("a    b  c d"), "a b c d");
    }

    #[test]
    fn pipeline_trims_after_collapsing() {
        assert_eq!(run_pipeline("  <p>x</p>  y  "), "x y");
    }
}
