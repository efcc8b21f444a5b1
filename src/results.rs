use serde::{Deserialize, Serialize};
use std::fmt;

/// Absolute URL identifying one discovered catalog item.
///
/// Equality is exact string equality: two spellings of the same page are
/// two different references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemReference(String);

impl ItemReference {
    /// Create a reference from anything URL-shaped
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// The reference as a plain string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the reference and take the string out
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ItemReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One extracted product row.
///
/// Every field is always populated: fields whose extraction rules all
/// missed carry their sentinel values instead, so rows keep a stable
/// schema. A page without a title never becomes a record at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Item code, `#`-prefixed, or empty when the page did not show one
    pub upc: String,

    /// First breadcrumb below the site root, or "Uncategorized"
    pub category: String,

    /// Product display name
    pub title: String,

    /// In-store aisle/location text, or empty
    pub location: String,

    /// Formatted dollar price, or "Price not available"
    pub price: String,

    /// Primary product image source, or "No image available"
    pub image_url: String,

    /// The reference this record was extracted from
    pub reference: ItemReference,
}

/// Aggregate result of a run, returned even when the run was cut short.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlOutcome {
    /// Every unique reference in discovery order
    pub references: Vec<ItemReference>,

    /// Extracted records in visit order
    pub records: Vec<ProductRecord>,

    /// Why the run ended before covering all categories, if it did
    pub aborted: Option<String>,
}
