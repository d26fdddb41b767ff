//! Individual product listings from a category page.

use std::collections::HashMap;
use std::sync::LazyLock;

use catwatch_core::{Category, ProductRecord, ProductState};
use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::text::{class_matches, element_text, truncate_chars};

const MAX_NAME_CHARS: usize = 100;
const UNKNOWN_NAME: &str = "Unknown Product";
const UNKNOWN_PRICE: &str = "N/A";
const MEN_KEYWORDS: [&str; 6] = ["men", "man", "mens", "men's", "male", "boy"];

static CARD_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)product|goods-item|S-product").expect("valid regex"));
static TITLE_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)title|name").expect("valid regex"));
static PRICE_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)price").expect("valid regex"));
static PRODUCT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-p-(\d+)").expect("valid regex"));

static CARD_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article, div").expect("valid selector"));
static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));
static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2, h3, div").expect("valid selector"));
static PRICE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span, div").expect("valid selector"));

/// Pulls product cards out of category-page markup and files them under
/// [`Category::Men`] or [`Category::Women`].
#[derive(Debug, Clone)]
pub struct ProductExtractor {
    /// Scheme + host prepended to relative product links.
    origin: String,
}

struct Candidate<'a> {
    card: ElementRef<'a>,
    category: Category,
    record: ProductRecord,
    /// How many of title and price were found on the card.
    completeness: u8,
}

impl ProductExtractor {
    #[must_use]
    pub fn new(origin: &str) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_string(),
        }
    }

    /// Extract every product card in `html`, stamping each with
    /// `detected_at`.
    ///
    /// Cards without a link or without a `-p-<id>` URL are skipped. When
    /// several nested containers resolve to the same id, the one with the
    /// most complete title/price wins, ties going to the innermost.
    #[must_use]
    pub fn extract(&self, html: &str, detected_at: DateTime<Utc>) -> ProductState {
        let document = Html::parse_document(html);
        let mut candidates: Vec<Candidate<'_>> = Vec::new();
        let mut by_id: HashMap<String, usize> = HashMap::new();
        let mut scanned = 0usize;

        for card in document
            .select(&CARD_SEL)
            .filter(|el| class_matches(*el, &CARD_CLASS_RE))
        {
            scanned += 1;
            let Some(candidate) = self.parse_card(card, detected_at) else {
                continue;
            };

            match by_id.get(&candidate.record.id) {
                Some(&idx) => {
                    let existing = &candidates[idx];
                    let outer = existing.card.id();
                    let nested = card.ancestors().any(|a| a.id() == outer);
                    if candidate.completeness > existing.completeness
                        || (candidate.completeness == existing.completeness && nested)
                    {
                        candidates[idx] = candidate;
                    }
                }
                None => {
                    by_id.insert(candidate.record.id.clone(), candidates.len());
                    candidates.push(candidate);
                }
            }
        }

        let mut state = ProductState {
            timestamp: Some(detected_at),
            ..ProductState::default()
        };
        for candidate in candidates {
            state
                .category_mut(candidate.category)
                .push(candidate.record);
        }

        tracing::info!(
            scanned,
            men = state.men.len(),
            women = state.women.len(),
            "extracted product listings"
        );
        if !state.women.is_empty() {
            tracing::warn!(
                count = state.women.len(),
                "products without a men keyword were filed under women"
            );
        }

        state
    }

    fn parse_card<'a>(
        &self,
        card: ElementRef<'a>,
        detected_at: DateTime<Utc>,
    ) -> Option<Candidate<'a>> {
        let href = card.select(&LINK_SEL).next()?.value().attr("href")?.trim();
        let url = self.absolutize(href);
        let id = PRODUCT_ID_RE.captures(&url)?[1].to_string();

        let name = card
            .select(&TITLE_SEL)
            .find(|el| class_matches(*el, &TITLE_CLASS_RE))
            .map(element_text)
            .filter(|s| !s.is_empty());

        let price = card
            .select(&PRICE_SEL)
            .find(|el| class_matches(*el, &PRICE_CLASS_RE))
            .map(element_text)
            .filter(|s| !s.is_empty());

        let completeness = u8::from(name.is_some()) + u8::from(price.is_some());
        let name = name.unwrap_or_else(|| UNKNOWN_NAME.to_string());

        Some(Candidate {
            card,
            category: classify(&element_text(card)),
            record: ProductRecord {
                id,
                name: truncate_chars(&name, MAX_NAME_CHARS),
                url,
                price: price.unwrap_or_else(|| UNKNOWN_PRICE.to_string()),
                detected_at,
            },
            completeness,
        })
    }

    fn absolutize(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if let Some(rest) = href.strip_prefix("//") {
            format!("https://{rest}")
        } else if href.starts_with('/') {
            format!("{}{href}", self.origin)
        } else {
            format!("{}/{href}", self.origin)
        }
    }
}

/// Men if any word of the card's text is a men keyword, otherwise women.
///
/// Matching is per word, so `"women"` never counts as `"men"`.
fn classify(text: &str) -> Category {
    let lower = text.to_lowercase().replace('\u{2019}', "'");
    let is_men = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|word| word.trim_matches('\''))
        .any(|word| MEN_KEYWORDS.contains(&word));

    if is_men {
        Category::Men
    } else {
        Category::Women
    }
}

#[cfg(test)]
#[path = "products_test.rs"]
mod tests;
