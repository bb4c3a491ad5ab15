use std::sync::LazyLock;

use regex::Regex;

const HEADINGS: &str = r"references|bibliography|works\s+cited|literature\s+cited";

/// Heading rules, tried in order. The first rule with any hit wins and its
/// first occurrence marks the start of the section.
static HEADING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let numbered = r"(?:\d+|[IVXLC]+)\.?[ \t]+";
    vec![
        // Heading alone on its line: "References"
        Regex::new(&format!(r"(?im)^[ \t]*(?:{HEADINGS})[ \t]*:?[ \t]*\r?$")).unwrap(),
        // Numbered heading: "7. References", "VII References"
        Regex::new(&format!(r"(?im)^[ \t]*{numbered}(?:{HEADINGS})[ \t]*:?[ \t]*\r?$")).unwrap(),
        // Lenient: heading at line start with text following on the same line
        // (two-column layouts).
        Regex::new(&format!(r"(?im)^[ \t]*(?:{numbered})?(?:{HEADINGS})\s")).unwrap(),
    ]
});

/// A short line of Capitalized Words, taken as the next section heading.
/// Allows a section number or letter on either side: "8 Appendix",
/// "A Proofs", "Appendix A".
static SECTION_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:(?:\d+(?:\.\d+)*|[A-Z](?:\.\d+)*)\.?[ \t]+)?\p{Lu}\p{Ll}+(?:[ \t]+\p{Lu}\p{Ll}+){0,4}(?:[ \t]+(?:[A-Z]|[IVX]+|\d+))?[ \t]*\r?$",
    )
    .unwrap()
});

/// `[12]` or `12.` at the start of a line.
static ENTRY_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(?:\[(\d+)\]|(\d+)\.)\s+").unwrap());

/// Locate the references section: everything after the first heading of the
/// first matching heading rule, cut at the next section heading.
pub fn find_references_section(text: &str) -> Option<&str> {
    let heading = HEADING_PATTERNS.iter().find_map(|re| re.find(text))?;
    let rest = &text[heading.end()..];

    let end = SECTION_END
        .find_iter(rest)
        .find(|m| !continues_entries(&rest[m.end()..]))
        .map_or(rest.len(), |m| m.start());
    Some(&rest[..end])
}

/// True when `text` opens with a later reference entry (`[2]`, `3.` ...).
/// A heading-like line right before one is a wrapped venue line such as
/// "Nature Communications", not a new section.
fn continues_entries(text: &str) -> bool {
    let Some(caps) = ENTRY_MARKER.captures(text.trim_start()) else {
        return false;
    };
    if caps.get(0).is_some_and(|m| m.start() != 0) {
        return false;
    }
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|n| n.as_str().parse::<u32>().ok())
        .is_some_and(|n| n > 1)
}

/// Split the references section into individual entries, in document
/// order. A document without a recognizable section yields no entries.
pub fn split_references(text: &str) -> Vec<String> {
    let Some(section) = find_references_section(text) else {
        tracing::debug!("No references section found");
        return Vec::new();
    };

    let entries: Vec<String> = ENTRY_MARKER
        .split(section)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect();

    tracing::debug!("Split references section into {} entries", entries.len());
    entries
}
