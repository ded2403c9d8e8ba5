//! Collector output types.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use url::Url;

use super::plan::Category;

/// The unique URLs discovered for one category in one collector pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Category the URLs were collected for.
    pub category: Category,

    /// Unique URLs in discovery order.
    pub urls: IndexSet<Url>,
}

impl Finding {
    /// Create an empty finding for a category.
    pub fn new(category: Category) -> Self {
        Self {
            category,
            urls: IndexSet::new(),
        }
    }

    /// Add a URL; returns false if it was already present.
    pub fn insert(&mut self, url: Url) -> bool {
        self.urls.insert(url)
    }
}

/// Result of one collector pass, with counters for budget accounting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectOutcome {
    /// Per-category findings.
    pub findings: Vec<Finding>,

    /// Search calls issued during this pass.
    pub calls_made: u32,

    /// Unique URLs discovered this pass (within-pass dedup).
    pub urls_found: usize,

    /// URLs never seen in any earlier pass of this run. Zero fresh URLs
    /// for two consecutive passes trips the no-progress breaker.
    pub fresh_urls: usize,
}

impl CollectOutcome {
    /// The finding for a category, if the pass produced one.
    pub fn finding(&self, category: Category) -> Option<&Finding> {
        self.findings.iter().find(|f| f.category == category)
    }
}
