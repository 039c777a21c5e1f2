/// Persisted crawl progress types
///
/// A `CrawlState` is owned by exactly one query identity; items keep discovery order.
use crate::query::QueryIdentity;
use serde::{Deserialize, Serialize};

/// One business record captured from the result list
///
/// Any field may be missing on a given listing; the export column layout does not change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlItem {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub website: Option<String>,

    #[serde(default, alias = "opening_hours")]
    pub hours: Option<String>,
}

impl CrawlItem {
    /// Creates an item with only a name set
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Returns the fields in export column order, missing values as empty strings
    pub fn fields(&self) -> [&str; 5] {
        [
            self.name.as_deref().unwrap_or(""),
            self.phone.as_deref().unwrap_or(""),
            self.address.as_deref().unwrap_or(""),
            self.website.as_deref().unwrap_or(""),
            self.hours.as_deref().unwrap_or(""),
        ]
    }
}

/// Durable progress record for a single query
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlState {
    /// Storage key of the owning query
    pub identity: QueryIdentity,

    /// Query text as originally submitted
    pub raw_query: String,

    /// Captured items in discovery order
    pub items: Vec<CrawlItem>,

    /// Position cursor into the source result list
    ///
    /// This counts source positions consumed, including listings the extractor
    /// rejected, so it may exceed `items.len()`.
    pub processed_count: u64,

    /// Best-known total at the last checkpoint; may be stale
    pub total_estimate: Option<u64>,

    /// Whether the source result list was exhausted
    pub completed: bool,

    /// RFC 3339 timestamp of the last checkpoint
    pub updated_at: String,
}

impl CrawlState {
    /// Number of items captured so far
    pub fn captured(&self) -> usize {
        self.items.len()
    }

    /// Query text to show for this state, falling back to the identity
    pub fn display_query(&self) -> &str {
        if self.raw_query.trim().is_empty() {
            self.identity.as_str()
        } else {
            &self.raw_query
        }
    }

    /// Formats the cursor as `position/total` (or `position/?` when unknown)
    pub fn progress_label(&self) -> String {
        match self.total_estimate {
            Some(total) => format!("{}/{}", self.processed_count, total),
            None => format!("{}/?", self.processed_count),
        }
    }
}
