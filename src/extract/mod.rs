pub mod context;
pub mod dedup;
pub mod markers;
pub mod references;

use serde::Serialize;

use crate::analysis::Analysis;

pub use context::DEFAULT_CONTEXT_RADIUS;

/// Which family of marker shapes produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerFamily {
    AuthorYear,
    Numeric,
}

/// A raw marker hit: the matched text and its half-open byte span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationMatch {
    pub marker: String,
    pub start: usize,
    pub end: usize,
    pub family: MarkerFamily,
    /// Name of the pattern that produced the hit.
    pub pattern: &'static str,
}

impl CitationMatch {
    pub fn span(&self) -> (usize, usize) {
        (self.start, self.end)
    }
}

/// One citation occurrence together with the prose around it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitationRecord {
    pub marker: String,
    pub context: String,
    pub span: (usize, usize),
    pub family: MarkerFamily,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
}

impl CitationRecord {
    fn from_match(text: &str, m: CitationMatch, radius: usize) -> Self {
        let context = context::context_window(text, m.start, m.end, radius).to_string();
        Self {
            span: m.span(),
            marker: m.marker,
            context,
            family: m.family,
            analysis: None,
        }
    }
}

/// Find every citation marker in `text`, collapse duplicate spans, and pair
/// each survivor with its context window. Records come back in document
/// order.
pub fn extract_citations(text: &str, radius: usize) -> Vec<CitationRecord> {
    let mut matches = dedup::dedup_matches(markers::find_markers(text));
    matches.sort_by_key(|m| (m.start, m.end));

    tracing::debug!("Retained {} citation markers", matches.len());

    matches
        .into_iter()
        .map(|m| CitationRecord::from_match(text, m, radius))
        .collect()
}
