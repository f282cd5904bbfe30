//! Projection of raw vector matches into [`SearchResult`]s.

use crate::models::{SearchResult, VectorMatch};

pub const UNKNOWN_FILENAME: &str = "Unknown";
pub const NO_TEXT: &str = "No text available";

/// Map matches to results, keeping rank order.
///
/// Never fails and never drops a match: a missing or non-string `filename`
/// or `text` is replaced with a placeholder.
pub fn project(matches: &[VectorMatch]) -> Vec<SearchResult> {
    matches
        .iter()
        .map(|m| SearchResult {
            filename: metadata_str(m, "filename").unwrap_or(UNKNOWN_FILENAME).to_string(),
            text: metadata_str(m, "text").unwrap_or(NO_TEXT).to_string(),
            score: m.score,
        })
        .collect()
}

fn metadata_str<'a>(m: &'a VectorMatch, key: &str) -> Option<&'a str> {
    m.metadata.get(key).and_then(|v| v.as_str())
}
