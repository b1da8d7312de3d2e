//! Supported catalog segments and resolution of a user's segment request.

use crate::error::{Result, SvedbError};

/// Pseudo-segment for token cards, fetched from the site listing rather than
/// the search API.
pub const TOKEN_SEGMENT: &str = "TOKEN";

/// Codes accepted by the catalog search API.
pub const SUPPORTED_SEGMENTS: &[&str] = &[
    "BP01", "BP02", "BP03", "BP04", "BP05", "BP06", "BP07", "BP08", "BP09", "BP10", "BP11",
    "SD01", "SD02", "SD03", "SD04", "SD05", "SD06", "CP01", "CP02", "CP03", "CSD01", "CSD02A",
    "CSD02B", "CSD02C", "CSD03A", "CSD03B", "PR", "GFB01", "GFD01", "GFD02", "SS02",
];

/// A unit of catalog retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Paged through the search API.
    Catalog(String),
    /// Token cards from the site listing.
    Tokens,
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Catalog(code) => f.write_str(code),
            Self::Tokens => f.write_str(TOKEN_SEGMENT),
        }
    }
}

/// Registry of segment codes a run may request.
#[derive(Debug, Clone)]
pub struct SegmentRegistry {
    codes: Vec<String>,
}

impl Default for SegmentRegistry {
    fn default() -> Self {
        Self::new(SUPPORTED_SEGMENTS.iter().copied())
    }
}

impl SegmentRegistry {
    /// Build a registry from codes; codes are upper-cased and deduplicated.
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for code in codes {
            let code = code.as_ref().trim().to_uppercase();
            if !code.is_empty() && !out.contains(&code) {
                out.push(code);
            }
        }
        Self { codes: out }
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn contains(&self, code: &str) -> bool {
        let code = code.trim().to_uppercase();
        self.codes.iter().any(|c| *c == code)
    }

    /// Resolve a request such as `"bp01;BP02"` or `"all"`.
    ///
    /// `all` (or `A`) expands to every registered code plus the token
    /// pseudo-segment. Otherwise codes are split on `;` or `,`, matched
    /// case-insensitively, and unknown codes are dropped. Fails when nothing
    /// requested is supported.
    pub fn resolve(&self, request: &str) -> Result<Vec<Segment>> {
        let trimmed = request.trim();
        if trimmed.eq_ignore_ascii_case("all") || trimmed == "A" {
            let mut all: Vec<Segment> = self.codes.iter().cloned().map(Segment::Catalog).collect();
            all.push(Segment::Tokens);
            return Ok(all);
        }

        let mut resolved: Vec<Segment> = Vec::new();
        for part in trimmed.split([';', ',']) {
            let code = part.trim().to_uppercase();
            let segment = if code == TOKEN_SEGMENT {
                Segment::Tokens
            } else if self.contains(&code) {
                Segment::Catalog(code)
            } else {
                if !code.is_empty() {
                    tracing::warn!(segment = %code, "unsupported segment, skipping");
                }
                continue;
            };
            if !resolved.contains(&segment) {
                resolved.push(segment);
            }
        }

        if resolved.is_empty() {
            return Err(SvedbError::UnsupportedSegment {
                requested: request.to_string(),
            });
        }
        Ok(resolved)
    }
}
