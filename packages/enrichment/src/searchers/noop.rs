//! No-op searcher for testing or when no provider is configured.

use async_trait::async_trait;

use crate::error::SearchResult;
use crate::traits::searcher::{SearchHit, SearchOptions, Searcher};

/// Returns no results and logs a warning on every call.
pub struct NoopSearcher;

#[async_trait]
impl Searcher for NoopSearcher {
    async fn search(&self, query: &str, _options: &SearchOptions) -> SearchResult<Vec<SearchHit>> {
        tracing::warn!(query, "NoopSearcher: search called but no provider configured");
        Ok(vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_returns_empty() {
        let results = NoopSearcher
            .search("anything", &SearchOptions::web(5))
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
