//! Small text helpers shared by the signal and product extractors.

use scraper::ElementRef;

use crate::error::StrategyError;

/// Parse a count that may carry thousands separators, e.g. `"2,914"`.
pub(crate) fn parse_count(raw: &str) -> Result<u64, StrategyError> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    cleaned
        .trim()
        .parse::<u64>()
        .map_err(|source| StrategyError::Count {
            raw: raw.to_string(),
            source,
        })
}

/// All descendant text of `el`, each fragment trimmed, joined by single
/// spaces.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text held directly by `el`, ignoring anything inside child elements.
pub(crate) fn own_text(el: ElementRef<'_>) -> String {
    el.children()
        .filter_map(|node| node.value().as_text())
        .map(|t| t.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `true` if the element's `class` attribute matches `pattern`.
pub(crate) fn class_matches(el: ElementRef<'_>, pattern: &regex::Regex) -> bool {
    el.value()
        .attr("class")
        .is_some_and(|class| pattern.is_match(class))
}

/// First `max` characters of `s`, never splitting a character.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
