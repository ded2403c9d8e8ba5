//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that drive the research loop
//! without making real search or extraction calls. Mocks are configured
//! with builder methods keyed on substrings of the query/instruction, track
//! every call for assertions, and can inject scripted failures for each
//! branch of the error taxonomy.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use url::Url;

use crate::error::{ExtractorResult, ScrapeError, SearchError, SearchResult};
use crate::traits::extractor::FieldExtractor;
use crate::traits::scraper::{ScrapedPage, Scraper};
use crate::traits::searcher::{SearchHit, SearchOptions, Searcher};

/// A mock searcher with substring-matched canned results.
///
/// Scripted failures are consumed first, one per call, which makes it easy
/// to exercise the rate-limit and critical-failure paths. Clones share
/// state, so a clone kept outside the orchestrator can assert on calls
/// after the run.
#[derive(Default, Clone)]
pub struct MockSearcher {
    /// (query substring, hits) pairs checked in insertion order.
    matchers: Arc<RwLock<Vec<(String, Vec<SearchHit>)>>>,

    /// Hits returned when no matcher applies.
    default_hits: Arc<RwLock<Vec<SearchHit>>>,

    /// Failures returned before any matching, one per call.
    failures: Arc<RwLock<VecDeque<SearchError>>>,

    /// When set, every unmatched call fabricates one fresh URL under this
    /// prefix (useful for driving budget exhaustion in tests).
    generate_prefix: Arc<RwLock<Option<String>>>,

    /// Queries received, in order.
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockSearcher {
    /// Create a mock that returns nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return these hits for queries containing `matcher`.
    pub fn with_results(self, matcher: &str, hits: Vec<SearchHit>) -> Self {
        self.matchers
            .write()
            .unwrap()
            .push((matcher.to_string(), hits));
        self
    }

    /// Return hits built from URL strings for queries containing `matcher`.
    pub fn with_hits(self, matcher: &str, urls: &[&str]) -> Self {
        let hits = urls.iter().filter_map(|u| SearchHit::from_url(u)).collect();
        self.with_results(matcher, hits)
    }

    /// Return these URLs for any query without a specific matcher.
    pub fn with_default_hits(self, urls: &[&str]) -> Self {
        *self.default_hits.write().unwrap() =
            urls.iter().filter_map(|u| SearchHit::from_url(u)).collect();
        self
    }

    /// Queue a failure for the next call.
    pub fn with_failure(self, error: SearchError) -> Self {
        self.failures.write().unwrap().push_back(error);
        self
    }

    /// Fabricate one fresh URL per unmatched call, numbered under
    /// `prefix` (e.g. `https://gen.example/`).
    pub fn with_generated_hits(self, prefix: &str) -> Self {
        *self.generate_prefix.write().unwrap() = Some(prefix.to_string());
        self
    }

    /// All queries received so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl Searcher for MockSearcher {
    async fn search(&self, query: &str, options: &SearchOptions) -> SearchResult<Vec<SearchHit>> {
        self.calls.write().unwrap().push(query.to_string());

        if let Some(error) = self.failures.write().unwrap().pop_front() {
            return Err(error);
        }

        let matchers = self.matchers.read().unwrap();
        let matched = matchers
            .iter()
            .find(|(matcher, _)| query.contains(matcher.as_str()))
            .map(|(_, hits)| hits.clone());

        let mut hits: Vec<SearchHit> = match matched {
            Some(hits) => hits,
            None => {
                if let Some(prefix) = self.generate_prefix.read().unwrap().as_ref() {
                    let n = self.calls.read().unwrap().len();
                    SearchHit::from_url(&format!("{prefix}{n}"))
                        .into_iter()
                        .collect()
                } else {
                    self.default_hits.read().unwrap().clone()
                }
            }
        };

        hits.truncate(options.limit);
        Ok(hits)
    }
}

/// Record of one call made to [`MockFieldExtractor`].
#[derive(Debug, Clone)]
pub struct MockExtractCall {
    /// The instruction the orchestrator sent.
    pub instruction: String,

    /// The URLs offered for extraction.
    pub urls: Vec<String>,
}

/// A mock field extractor with substring-matched canned partial objects.
/// Clones share state.
#[derive(Default, Clone)]
pub struct MockFieldExtractor {
    /// (instruction substring, partial object) pairs.
    responses: Arc<RwLock<Vec<(String, serde_json::Value)>>>,

    /// (instruction substring, error message) pairs, checked first.
    failures: Arc<RwLock<Vec<(String, String)>>>,

    /// Calls received, in order.
    calls: Arc<RwLock<Vec<MockExtractCall>>>,
}

impl MockFieldExtractor {
    /// Create a mock that returns empty partial objects.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return this partial object for instructions containing `matcher`.
    pub fn with_response(self, matcher: &str, value: serde_json::Value) -> Self {
        self.responses
            .write()
            .unwrap()
            .push((matcher.to_string(), value));
        self
    }

    /// Fail for instructions containing `matcher`.
    pub fn with_failure(self, matcher: &str, message: &str) -> Self {
        self.failures
            .write()
            .unwrap()
            .push((matcher.to_string(), message.to_string()));
        self
    }

    /// All calls received so far.
    pub fn calls(&self) -> Vec<MockExtractCall> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl FieldExtractor for MockFieldExtractor {
    async fn extract(
        &self,
        urls: &[Url],
        instruction: &str,
        _schema: serde_json::Value,
    ) -> ExtractorResult<serde_json::Value> {
        self.calls.write().unwrap().push(MockExtractCall {
            instruction: instruction.to_string(),
            urls: urls.iter().map(|u| u.to_string()).collect(),
        });

        if let Some((_, message)) = self
            .failures
            .read()
            .unwrap()
            .iter()
            .find(|(matcher, _)| instruction.contains(matcher.as_str()))
        {
            return Err(crate::error::ExtractorError::provider(message.clone()));
        }

        Ok(self
            .responses
            .read()
            .unwrap()
            .iter()
            .find(|(matcher, _)| instruction.contains(matcher.as_str()))
            .map(|(_, value)| value.clone())
            .unwrap_or_else(|| serde_json::json!({})))
    }
}

/// A mock scraper with canned pages by URL.
#[derive(Default)]
pub struct MockScraper {
    pages: Arc<RwLock<HashMap<String, ScrapedPage>>>,
}

impl MockScraper {
    /// Create an empty mock scraper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return this page for the given URL.
    pub fn with_page(self, page: ScrapedPage) -> Self {
        self.pages.write().unwrap().insert(page.url.clone(), page);
        self
    }
}

#[async_trait]
impl Scraper for MockScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ScrapeError> {
        self.pages
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| ScrapeError::Provider(format!("no page for {url}").into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_searcher_matches_substrings() {
        let searcher = MockSearcher::new()
            .with_hits("compatible", &["https://a.example/1"])
            .with_default_hits(&["https://fallback.example/x"]);

        let hits = searcher
            .search("W1331X compatible printers", &SearchOptions::web(5))
            .await
            .unwrap();
        assert_eq!(hits[0].url.as_str(), "https://a.example/1");

        let fallback = searcher
            .search("something else", &SearchOptions::web(5))
            .await
            .unwrap();
        assert_eq!(fallback[0].url.as_str(), "https://fallback.example/x");

        assert_eq!(searcher.calls().len(), 2);
    }

    #[tokio::test]
    async fn mock_searcher_respects_limit() {
        let searcher = MockSearcher::new().with_hits(
            "q",
            &["https://a.example/1", "https://a.example/2", "https://a.example/3"],
        );
        let hits = searcher.search("q", &SearchOptions::web(2)).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn mock_searcher_consumes_failures_first() {
        let searcher = MockSearcher::new()
            .with_failure(SearchError::RateLimited)
            .with_hits("q", &["https://a.example/1"]);

        assert!(matches!(
            searcher.search("q", &SearchOptions::web(5)).await,
            Err(SearchError::RateLimited)
        ));
        assert!(searcher.search("q", &SearchOptions::web(5)).await.is_ok());
    }

    #[tokio::test]
    async fn mock_extractor_tracks_calls() {
        let extractor = MockFieldExtractor::new()
            .with_response("packaging", serde_json::json!({ "weight_g": 1.0 }));

        let urls = vec![Url::parse("https://icecat.biz/p/1").unwrap()];
        let value = extractor
            .extract(&urls, "find packaging data", serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(value["weight_g"], 1.0);

        let calls = extractor.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].urls, vec!["https://icecat.biz/p/1".to_string()]);
    }

    #[tokio::test]
    async fn mock_scraper_serves_pages() {
        let scraper = MockScraper::new()
            .with_page(ScrapedPage::new("https://a.example/1", "# Product"));

        let page = scraper.scrape("https://a.example/1").await.unwrap();
        assert_eq!(page.markdown, "# Product");
        assert!(scraper.scrape("https://missing.example").await.is_err());
    }
}
