//! Page scraping capability.
//!
//! Not consumed by the orchestrator core directly — simpler collaborators
//! (offline seeding, spot checks) scrape single pages through this trait.
//! It ships here because it is part of the capability contract the
//! surrounding system implements once and injects everywhere.

use async_trait::async_trait;

use crate::error::ScrapeError;

/// A scraped page: markdown content plus optional structured fields the
/// scraper was able to lift directly (e.g. schema.org product data).
#[derive(Debug, Clone)]
pub struct ScrapedPage {
    /// URL the page was fetched from.
    pub url: String,

    /// Page content as markdown.
    pub markdown: String,

    /// Structured fields extracted by the scraper itself, if any.
    pub structured: Option<serde_json::Value>,
}

impl ScrapedPage {
    /// Create a new scraped page.
    pub fn new(url: impl Into<String>, markdown: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            markdown: markdown.into(),
            structured: None,
        }
    }

    /// Attach structured fields.
    pub fn with_structured(mut self, structured: serde_json::Value) -> Self {
        self.structured = Some(structured);
        self
    }
}

/// Single-page scraping capability.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Scrape one URL into markdown plus optional structured fields.
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ScrapeError>;
}
