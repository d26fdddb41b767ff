//! Rendering of alert bodies.

use std::borrow::Cow;

use catwatch_core::{Delta, ProductRecord, SignalMap};
use chrono::{DateTime, SecondsFormat, Utc};

/// Bodies longer than this many characters are truncated before sending.
/// The WhatsApp transport itself rejects anything above 1600.
pub const MAX_BODY_CHARS: usize = 1500;

/// Signal keys in the order they appear in a counts alert.
const DISPLAY_ORDER: [&str; 4] = ["total", "women", "men", "visible_products"];

/// Render the counts alert.
///
/// Every known key present in `counts` gets a line; keys that appear in
/// `delta` carry a signed change suffix.
#[must_use]
pub fn format_counts_message(
    counts: &SignalMap,
    delta: Option<&Delta>,
    url: &str,
    timestamp: DateTime<Utc>,
) -> String {
    let mut message = String::from("📊 *Shein Stock Update Alert*\n\n");

    for key in DISPLAY_ORDER {
        let Some(&value) = counts.get(key) else {
            continue;
        };
        message.push_str(&format!("{}: {}", label(key), group_thousands(value)));
        if let Some(change) = delta.and_then(|d| d.get(key)) {
            let sign = if change.diff > 0 { "+" } else { "-" };
            message.push_str(&format!(
                " ({sign}{})",
                group_thousands(change.diff.unsigned_abs())
            ));
        }
        message.push('\n');
    }

    message.push_str(&format!(
        "\n🕐 Timestamp: {}\n",
        timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    message.push_str(&format!("🔗 Source: {url}"));
    message
}

/// Render the new-products alert, listing at most `max_items` products.
#[must_use]
pub fn format_products_message(
    products: &[&ProductRecord],
    max_items: usize,
    now: DateTime<Utc>,
) -> String {
    let mut message = String::from("🆕 *New Men's Products on Shein!*\n\n");

    for (i, product) in products.iter().take(max_items).enumerate() {
        message.push_str(&format!(
            "{}. {}\n   💰 {}\n   🔗 {}\n\n",
            i + 1,
            product.name,
            product.price,
            product.url
        ));
    }

    if products.len() > max_items {
        message.push_str(&format!(
            "... and {} more new products!\n\n",
            products.len() - max_items
        ));
    }

    message.push_str(&format!("🕐 {}", now.format("%Y-%m-%d %H:%M:%S UTC")));
    message
}

/// Body for `catwatch test-alert`.
#[must_use]
pub fn format_test_message(now: DateTime<Utc>) -> String {
    format!(
        "📊 *Shein Monitor Test*\n\n\
         This is a test alert from your Shein monitor.\n\n\
         If you receive this, WhatsApp alerts are working! ✅\n\n\
         Timestamp: {}",
        now.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Cut `body` to [`MAX_BODY_CHARS`] characters plus `"..."` when it is
/// longer than that. Shorter bodies are returned unchanged.
#[must_use]
pub fn truncate_body(body: &str) -> Cow<'_, str> {
    match body.char_indices().nth(MAX_BODY_CHARS) {
        Some((cut, _)) => {
            tracing::debug!(
                chars = body.chars().count(),
                limit = MAX_BODY_CHARS,
                "alert body truncated"
            );
            Cow::Owned(format!("{}...", &body[..cut]))
        }
        None => Cow::Borrowed(body),
    }
}

/// `visible_products` becomes `Visible products`.
fn label(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `2914` becomes `2,914`.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
#[path = "format_test.rs"]
mod tests;
