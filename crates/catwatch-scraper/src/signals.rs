//! Count extraction from a category page.
//!
//! Page structure is not under our control, so extraction is a cascade of
//! independent heuristics. Each strategy looks at the page and returns the
//! signals it found; results are merged in order with last-write-wins, and a
//! strategy that fails is logged and skipped without affecting the others.

use std::sync::LazyLock;

use catwatch_core::SignalMap;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::error::StrategyError;
use crate::text::{class_matches, own_text, parse_count};

/// A count with optional thousands separators. Comma-grouped numbers are
/// tried first so `"2,914"` is never read as `"914"`.
const COUNT: &str = r"(\d{1,3}(?:,\d{3})+|\d+)";

static INITIAL_STATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)window\.__INITIAL_STATE__\s*=\s*(\{.+?\});").expect("valid regex")
});
static TOTAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b{COUNT}\s*(?:products|items)\b")).expect("valid regex")
});
static WOMEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\bWomen[^\d]*\({COUNT}\)")).expect("valid regex")
});
static MEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)\bMen[^\d]*\({COUNT}\)")).expect("valid regex"));
static FILTER_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(Women|Men)\s*\({COUNT}\)")).expect("valid regex"));
static PRODUCT_CARD_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)product|item").expect("valid regex"));

static JSON_LD_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid selector")
});
static FILTER_LABEL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("label, div, span").expect("valid selector"));
static PRODUCT_CARD_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article, div").expect("valid selector"));

/// Raw markup plus its parsed DOM, built once and shared by every strategy.
pub(crate) struct Page<'a> {
    raw: &'a str,
    document: Html,
}

impl<'a> Page<'a> {
    pub(crate) fn parse(raw: &'a str) -> Self {
        Self {
            raw,
            document: Html::parse_document(raw),
        }
    }
}

/// One extraction heuristic. Receives the signals merged so far, read-only,
/// for strategies that only apply as a fallback.
type Strategy = fn(&Page<'_>, &SignalMap) -> Result<SignalMap, StrategyError>;

/// Ordered strategy cascade turning page markup into a [`SignalMap`].
pub struct SignalExtractor {
    strategies: Vec<(&'static str, Strategy)>,
}

impl Default for SignalExtractor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SignalExtractor {
    /// Builds the cascade. `count_visible_products` enables the final
    /// fallback that counts product cards when no total was found.
    #[must_use]
    pub fn new(count_visible_products: bool) -> Self {
        let mut strategies: Vec<(&'static str, Strategy)> = vec![
            ("initial_state", initial_state_total as Strategy),
            ("text_total", text_total as Strategy),
            ("text_gender", text_gender_counts as Strategy),
            ("json_ld", json_ld_total as Strategy),
            ("filter_labels", filter_label_counts as Strategy),
        ];
        if count_visible_products {
            strategies.push(("visible_products", visible_product_count as Strategy));
        }
        Self { strategies }
    }

    /// Run every strategy over `html` and merge the results.
    ///
    /// Returns `None` when no strategy produced a signal; never returns an
    /// empty map.
    #[must_use]
    pub fn extract(&self, html: &str) -> Option<SignalMap> {
        let page = Page::parse(html);
        let mut signals = SignalMap::new();

        for (name, strategy) in &self.strategies {
            match strategy(&page, &signals) {
                Ok(found) => {
                    if !found.is_empty() {
                        tracing::debug!(strategy = *name, ?found, "extraction strategy matched");
                    }
                    signals.extend(found);
                }
                Err(e) => {
                    tracing::debug!(strategy = *name, error = %e, "extraction strategy failed; continuing");
                }
            }
        }

        if signals.is_empty() {
            None
        } else {
            Some(signals)
        }
    }
}

fn single(key: &str, value: u64) -> SignalMap {
    SignalMap::from([(key.to_string(), value)])
}

/// `window.__INITIAL_STATE__ = {...};` with a `products` array.
fn initial_state_total(page: &Page<'_>, _: &SignalMap) -> Result<SignalMap, StrategyError> {
    let Some(cap) = INITIAL_STATE_RE.captures(page.raw) else {
        return Ok(SignalMap::new());
    };
    let state: Value = serde_json::from_str(&cap[1])?;
    Ok(state
        .get("products")
        .and_then(Value::as_array)
        .map(|products| single("total", products.len() as u64))
        .unwrap_or_default())
}

/// `"2,914 products"` / `"48 items"` anywhere in the markup.
fn text_total(page: &Page<'_>, _: &SignalMap) -> Result<SignalMap, StrategyError> {
    match TOTAL_RE.captures(page.raw) {
        Some(cap) => Ok(single("total", parse_count(&cap[1])?)),
        None => Ok(SignalMap::new()),
    }
}

/// `"Women (2,914)"` / `"Men (7)"` anywhere in the markup.
fn text_gender_counts(page: &Page<'_>, _: &SignalMap) -> Result<SignalMap, StrategyError> {
    let mut found = SignalMap::new();
    if let Some(cap) = WOMEN_RE.captures(page.raw) {
        found.insert("women".to_string(), parse_count(&cap[1])?);
    }
    if let Some(cap) = MEN_RE.captures(page.raw) {
        found.insert("men".to_string(), parse_count(&cap[1])?);
    }
    Ok(found)
}

/// `numberOfItems` on a top-level JSON-LD object. Later blocks win.
fn json_ld_total(page: &Page<'_>, _: &SignalMap) -> Result<SignalMap, StrategyError> {
    let mut total = None;

    for script in page.document.select(&JSON_LD_SEL) {
        let body: String = script.text().collect();
        let value: Value = match serde_json::from_str(body.trim()) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed JSON-LD block");
                continue;
            }
        };

        let Some(items) = value.as_object().and_then(|obj| obj.get("numberOfItems")) else {
            continue;
        };

        let count = match items {
            Value::Number(n) => whole_number(n),
            Value::String(s) => parse_count(s).ok(),
            _ => None,
        };
        match count {
            Some(count) => total = Some(count),
            None => tracing::debug!(%items, "ignoring non-integer numberOfItems"),
        }
    }

    Ok(total.map(|t| single("total", t)).unwrap_or_default())
}

/// `250` or `250.0`; negative or fractional values yield `None`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn whole_number(n: &serde_json::Number) -> Option<u64> {
    n.as_u64().or_else(|| {
        n.as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
            .map(|f| f as u64)
    })
}

/// Filter controls whose own text reads exactly like `"Women (12)"`.
fn filter_label_counts(page: &Page<'_>, _: &SignalMap) -> Result<SignalMap, StrategyError> {
    let mut found = SignalMap::new();

    for el in page.document.select(&FILTER_LABEL_SEL) {
        let text = own_text(el);
        for cap in FILTER_LABEL_RE.captures_iter(&text) {
            let key = if &cap[1] == "Women" { "women" } else { "men" };
            found.insert(key.to_string(), parse_count(&cap[2])?);
        }
    }

    Ok(found)
}

/// Number of product-card-looking elements, only when no total is known.
fn visible_product_count(page: &Page<'_>, so_far: &SignalMap) -> Result<SignalMap, StrategyError> {
    if so_far.get("total").is_some_and(|t| *t > 0) {
        return Ok(SignalMap::new());
    }

    let count = page
        .document
        .select(&PRODUCT_CARD_SEL)
        .filter(|el| class_matches(*el, &PRODUCT_CARD_CLASS_RE))
        .count() as u64;

    if count == 0 {
        Ok(SignalMap::new())
    } else {
        Ok(single("visible_products", count))
    }
}

#[cfg(test)]
#[path = "signals_test.rs"]
mod tests;
