//! Web search capability.
//!
//! Abstracts over search providers (Tavily, SerpAPI, Google Custom Search,
//! etc.). The provider is expected to bound its own call latency; the
//! orchestrator only checks the run-level time budget at iteration
//! boundaries.
//!
//! Providers must map their failure modes onto [`SearchError`]: auth and
//! billing failures abort the whole run, rate limits trigger a single
//! backoff, anything else is skipped for the iteration.

use async_trait::async_trait;
use url::Url;

use crate::error::SearchResult;

/// A discovered URL from web search with optional metadata.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// The discovered URL.
    pub url: Url,

    /// Title of the page (if available from search results).
    pub title: Option<String>,
}

impl SearchHit {
    /// Create a new hit from a URL.
    pub fn new(url: Url) -> Self {
        Self { url, title: None }
    }

    /// Create from a URL string. Returns `None` if the URL does not parse.
    pub fn from_url(url: &str) -> Option<Self> {
        Url::parse(url).ok().map(Self::new)
    }

    /// Add a title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// What kind of results the caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    /// Regular web pages.
    Web,

    /// Image results (used by the image-candidate category).
    Images,
}

/// Options for a single search call.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum results to return.
    pub limit: usize,

    /// BCP-47 locale hint (e.g. "de-DE"). Providers may ignore it.
    pub locale: Option<String>,

    /// Result kind requested.
    pub result_kind: ResultKind,
}

impl SearchOptions {
    /// Options for a web search with the given limit.
    pub fn web(limit: usize) -> Self {
        Self {
            limit,
            locale: None,
            result_kind: ResultKind::Web,
        }
    }

    /// Options for an image search with the given limit.
    pub fn images(limit: usize) -> Self {
        Self {
            limit,
            locale: None,
            result_kind: ResultKind::Images,
        }
    }

    /// Set the locale hint.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }
}

/// Web search capability.
///
/// # Implementations
///
/// - Provider clients (outside this crate)
/// - [`NoopSearcher`](crate::searchers::NoopSearcher) - when no provider is configured
/// - [`RateLimitedSearcher`](crate::searchers::RateLimitedSearcher) - quota decorator
/// - [`MockSearcher`](crate::testing::MockSearcher) - for testing
#[async_trait]
pub trait Searcher: Send + Sync {
    /// Search the web for URLs relevant to the query.
    async fn search(&self, query: &str, options: &SearchOptions) -> SearchResult<Vec<SearchHit>>;
}
