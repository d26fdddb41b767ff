use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bucket a listed product is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Men,
    Women,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Men => write!(f, "men"),
            Category::Women => write!(f, "women"),
        }
    }
}

/// A single product card scraped from the category page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Numeric id taken from the `-p-<id>` URL suffix, kept as a string.
    pub id: String,
    /// Display name, at most 100 characters.
    pub name: String,
    /// Absolute product URL.
    pub url: String,
    /// Price text as rendered, or `"N/A"`.
    pub price: String,
    pub detected_at: DateTime<Utc>,
}

/// The persisted product-tracker record.
///
/// `timestamp` is `None` only for the empty baseline used before the first
/// successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductState {
    #[serde(default)]
    pub men: Vec<ProductRecord>,
    #[serde(default)]
    pub women: Vec<ProductRecord>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ProductState {
    #[must_use]
    pub fn category(&self, category: Category) -> &[ProductRecord] {
        match category {
            Category::Men => &self.men,
            Category::Women => &self.women,
        }
    }

    pub fn category_mut(&mut self, category: Category) -> &mut Vec<ProductRecord> {
        match category {
            Category::Men => &mut self.men,
            Category::Women => &mut self.women,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.men.is_empty() && self.women.is_empty()
    }
}
