use std::ops::Range;

/// Default context radius, in characters.
pub const DEFAULT_CONTEXT_RADIUS: usize = 100;

/// Byte range of the context window around `text[start..end]`.
///
/// The window is centered on the marker and holds at most `2 * radius`
/// characters including the marker itself, clipped to the document. A
/// marker longer than the whole budget is returned on its own.
pub fn context_range(text: &str, start: usize, end: usize, radius: usize) -> Range<usize> {
    let marker_chars = text[start..end].chars().count();
    let pad = radius.saturating_sub(marker_chars.div_ceil(2));

    let from = text[..start]
        .char_indices()
        .rev()
        .take(pad)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(start);
    let to = text[end..]
        .char_indices()
        .nth(pad)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());

    from..to
}

/// The context window around `text[start..end]`, verbatim.
pub fn context_window(text: &str, start: usize, end: usize, radius: usize) -> &str {
    &text[context_range(text, start, end, radius)]
}
