use std::sync::LazyLock;

use regex::Regex;

use super::{CitationMatch, MarkerFamily};

/// A single marker rule. Lower `precedence` wins when two rules hit the
/// same span.
#[derive(Debug)]
pub struct MarkerPattern {
    pub name: &'static str,
    pub family: MarkerFamily,
    pub precedence: u8,
    regex: Regex,
}

impl MarkerPattern {
    fn new(name: &'static str, family: MarkerFamily, precedence: u8, pattern: &str) -> Self {
        Self {
            name,
            family,
            precedence,
            regex: Regex::new(pattern).unwrap(),
        }
    }

    /// Every non-overlapping occurrence of this rule in `text`.
    pub fn find_all(&self, text: &str) -> Vec<CitationMatch> {
        self.regex
            .find_iter(text)
            .map(|m| CitationMatch {
                marker: m.as_str().to_string(),
                start: m.start(),
                end: m.end(),
                family: self.family,
                pattern: self.name,
            })
            .collect()
    }
}

// Surname tokens joined by commas, "and" or "&".
const AUTHORS: &str = r"\p{L}[\p{L}'\-]*(?:(?:\s*,\s*|\s+and\s+|\s*&\s*)\p{L}[\p{L}'\-]*)*";
const ET_AL: &str = r"\s+et\s+al\.?";
// 2019, 2019a, "2019, 2020b"
const YEARS: &str = r"\d{4}[a-z]?(?:\s*,\s*\d{4}[a-z]?)*";
const NUMBER_OR_RANGE: &str = r"\d+(?:\s*[-–]\s*\d+)?";

static MARKER_PATTERNS: LazyLock<Vec<MarkerPattern>> = LazyLock::new(|| {
    let pair = format!(r"{AUTHORS}(?:{ET_AL})?\s*,\s*{YEARS}");

    let mut patterns = vec![
        MarkerPattern::new(
            "author_year_multi",
            MarkerFamily::AuthorYear,
            0,
            &format!(r"\({pair}(?:\s*;\s*{pair})+\)"),
        ),
        MarkerPattern::new(
            "author_year_et_al",
            MarkerFamily::AuthorYear,
            1,
            &format!(r"\({AUTHORS}{ET_AL}\s*,\s*{YEARS}\)"),
        ),
        MarkerPattern::new(
            "author_year",
            MarkerFamily::AuthorYear,
            2,
            &format!(r"\({pair}\)"),
        ),
        MarkerPattern::new(
            "numeric_bracket_list",
            MarkerFamily::Numeric,
            3,
            &format!(r"\[{NUMBER_OR_RANGE}(?:\s*,\s*{NUMBER_OR_RANGE})*\]"),
        ),
        MarkerPattern::new(
            "numeric_bracket_single",
            MarkerFamily::Numeric,
            4,
            r"\[\d+\]",
        ),
        MarkerPattern::new(
            "numeric_paren",
            MarkerFamily::Numeric,
            5,
            r"\(\d+\)",
        ),
    ];
    patterns.sort_by_key(|p| p.precedence);
    patterns
});

/// The marker rules in evaluation order.
pub fn marker_patterns() -> &'static [MarkerPattern] {
    &MARKER_PATTERNS
}

/// Run every rule over the full text, most specific first. Hits from
/// different rules may share a span; see [`super::dedup::dedup_matches`].
pub fn find_markers(text: &str) -> Vec<CitationMatch> {
    marker_patterns()
        .iter()
        .flat_map(|p| p.find_all(text))
        .collect()
}
