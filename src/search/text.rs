use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use unicode_segmentation::UnicodeSegmentation;

static BLOCK_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)<\s*/?\s*(?:p|div|br|hr|li|ul|ol|h[1-6]|blockquote|pre|table|tr|td|th|section|article|header|footer)\b[^>]*>",
    )
    .expect("valid block tag regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

const ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    // last, so `&amp;lt;` decodes to `&lt;` and not `<`
    ("&amp;", "&"),
];

/// Plain text of a rich-text note body.
///
/// Block-level tags and `<br>` separate words; inline tags such as `<b>`
/// vanish without a trace, so `mil<b>k</b>` reads as `milk`.
pub fn strip_html(html: &str) -> String {
    let blocks_split = BLOCK_TAG_RE.replace_all(html, " ");
    let mut text = TAG_RE.replace_all(&blocks_split, "").into_owned();
    for (entity, plain) in ENTITIES {
        if text.contains(entity) {
            text = text.replace(entity, plain);
        }
    }
    SPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Cuts `text` to at most `max` graphemes, ending with `…` when shortened.
pub fn truncate_graphemes(text: &str, max: usize) -> String {
    let mut graphemes = text.grapheme_indices(true);
    match graphemes.nth(max) {
        None => text.to_string(),
        Some(_) if max == 0 => String::new(),
        Some(_) => {
            let cut = text
                .grapheme_indices(true)
                .nth(max - 1)
                .map(|(idx, _)| idx)
                .unwrap_or(0);
            format!("{}…", text[..cut].trim_end())
        }
    }
}

/// Case-insensitive substring test against an already lowercased needle.
pub(crate) fn contains_folded(haystack: &str, folded_needle: &str) -> bool {
    haystack.to_lowercase().contains(folded_needle)
}

/// Regex that marks every occurrence of any of `terms`, longest first.
pub fn highlight_regex<S: AsRef<str>>(terms: &[S]) -> Option<Regex> {
    let mut unique: Vec<&str> = Vec::new();
    let mut seen = HashSet::new();
    for term in terms {
        let term = term.as_ref().trim();
        if term.is_empty() {
            continue;
        }
        if seen.insert(term.to_lowercase()) {
            unique.push(term);
        }
    }
    if unique.is_empty() {
        return None;
    }
    unique.sort_by(|a, b| b.len().cmp(&a.len()));
    let pattern = unique
        .into_iter()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_decodes_entities() {
        let html = "<h1>Trip&nbsp;plan</h1><p>Pack <b>boots</b> &amp; socks</p>";
        assert_eq!(strip_html(html), "Trip plan Pack boots & socks");
        assert_eq!(strip_html("a &amp;lt; b"), "a &lt; b");
        assert_eq!(strip_html("plain"), "plain");
    }

    #[test]
    fn inline_markup_inside_a_word_keeps_the_word_whole() {
        assert_eq!(strip_html("<p>Buy mil<b>k</b> today</p>"), "Buy milk today");
        assert_eq!(strip_html("<p>one</p><p>two</p>"), "one two");
        assert_eq!(strip_html("line<br/>break<BR>again"), "line break again");
        assert_eq!(strip_html("<li>eggs</li><li>flour</li>"), "eggs flour");
        assert_eq!(strip_html("<span class=\"x\">un</span>done"), "undone");
    }

    #[test]
    fn truncation_counts_graphemes() {
        assert_eq!(truncate_graphemes("short", 80), "short");
        assert_eq!(truncate_graphemes("abcdef", 4), "abc…");
        assert_eq!(truncate_graphemes("e\u{301}e\u{301}e\u{301}", 2), "e\u{301}…");
        assert_eq!(truncate_graphemes("abc", 3), "abc");
    }

    #[test]
    fn highlight_prefers_longer_terms() {
        let regex = highlight_regex(&["not", "note"]).expect("regex");
        let matches: Vec<_> = regex.find_iter("Notebook").map(|m| m.as_str()).collect();
        assert_eq!(matches, vec!["Note"]);
        assert!(highlight_regex(&["  "]).is_none());
    }
}
