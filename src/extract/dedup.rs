use std::collections::HashSet;

use super::CitationMatch;

/// Keep one match per distinct `(start, end)` span. Input order is the
/// priority order, so the first match seen for a span is the one kept.
pub fn dedup_matches(matches: Vec<CitationMatch>) -> Vec<CitationMatch> {
    let mut seen: HashSet<(usize, usize)> = HashSet::with_capacity(matches.len());
    matches
        .into_iter()
        .filter(|m| {
            let first = seen.insert(m.span());
            if !first {
                tracing::trace!("Dropping {} from {}: span already matched", m.marker, m.pattern);
            }
            first
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::markers::find_markers;
    use crate::extract::MarkerFamily;

    fn hit(marker: &str, start: usize, pattern: &'static str) -> CitationMatch {
        CitationMatch {
            marker: marker.to_string(),
            start,
            end: start + marker.len(),
            family: MarkerFamily::Numeric,
            pattern,
        }
    }

    #[test]
    fn test_first_seen_wins() {
        let deduped = dedup_matches(vec![
            hit("[1]", 10, "numeric_bracket_list"),
            hit("[1]", 10, "numeric_bracket_single"),
        ]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].pattern, "numeric_bracket_list");
    }

    #[test]
    fn test_overlapping_distinct_spans_kept() {
        let deduped = dedup_matches(vec![hit("[1,2]", 0, "a"), hit("[1", 0, "b")]);
        assert_eq!(deduped.len(), 2);
    }

    #[test]
    fn test_idempotent() {
        let text = "Work [1] and [1,2] and (Smith et al., 2019) and (4) again [1].";
        let once = dedup_matches(find_markers(text));
        let twice = dedup_matches(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_bracket_single_collapses_to_one() {
        let deduped = dedup_matches(find_markers("[1]"));
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].marker, "[1]");
    }

    #[test]
    fn test_author_year_wins_shared_span() {
        let deduped = dedup_matches(find_markers("(Smith et al., 2019)"));
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].pattern, "author_year_et_al");
        assert_eq!(deduped[0].family, MarkerFamily::AuthorYear);
    }
}
