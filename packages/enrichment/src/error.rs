//! Typed errors for the enrichment library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.
//!
//! The taxonomy separates two very different failure classes:
//!
//! - **Critical** failures (auth/billing on the search provider) abort the
//!   run. They are threaded through the loop as an explicit `Result`, never
//!   caught-and-swallowed across frames.
//! - **Transient** failures (rate limits, flaky providers, malformed
//!   extractions) degrade a single iteration. The affected category is
//!   retried on the next pass while it remains unresolved.
//!
//! Budget exhaustion and no-progress are *loop exits*, not errors; they are
//! reported through the record's warnings, not through this module.

use thiserror::Error;

/// Errors reported by a [`Searcher`](crate::traits::Searcher) capability.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Provider rejected our credentials. Unrecoverable for this run.
    #[error("search auth failure: {0}")]
    AuthFailure(String),

    /// Provider account is out of quota/funds. Unrecoverable for this run.
    #[error("search billing failure: {0}")]
    BillingFailure(String),

    /// Provider asked us to slow down. One fixed backoff, then retry.
    #[error("search rate limited")]
    RateLimited,

    /// Any other provider-side failure. Logged and skipped.
    #[error("search provider error: {0}")]
    Provider(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SearchError {
    /// Build a provider error from a plain message.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into().into())
    }

    /// Whether this failure must abort the run.
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::AuthFailure(_) | Self::BillingFailure(_))
    }
}

/// Errors reported by a [`FieldExtractor`](crate::traits::FieldExtractor)
/// capability. All of these are transient from the orchestrator's point of
/// view: the category simply gets no update this iteration.
#[derive(Debug, Error)]
pub enum ExtractorError {
    /// Extraction backend failed.
    #[error("extract provider error: {0}")]
    Provider(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The partial object did not match the requested schema.
    #[error("extract response did not match schema: {0}")]
    Schema(#[from] serde_json::Error),
}

impl ExtractorError {
    /// Build a provider error from a plain message.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into().into())
    }
}

/// Errors reported by a [`Scraper`](crate::traits::Scraper) capability.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Invalid URL format.
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Scraping backend failed.
    #[error("scrape provider error: {0}")]
    Provider(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Top-level library error.
///
/// The orchestrator only ever surfaces `CriticalProvider`; everything else
/// is degraded into warnings on the record.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// A search provider failure that cannot be recovered within the run
    /// (auth or billing). Ends the run with status `Failed`.
    #[error("critical provider failure: {0}")]
    CriticalProvider(#[source] SearchError),
}

/// Result type alias for enrichment operations.
pub type Result<T> = std::result::Result<T, EnrichError>;

/// Result type alias for search capability calls.
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Result type alias for extraction capability calls.
pub type ExtractorResult<T> = std::result::Result<T, ExtractorError>;
