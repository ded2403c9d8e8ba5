//! Rate-limited searcher wrapper.
//!
//! Wraps any Searcher implementation with rate limiting using the governor
//! crate. This smooths request pacing *below* the provider's limit; the
//! collector still handles the provider's own rate-limit responses with a
//! backoff.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::SearchResult;
use crate::traits::searcher::{SearchHit, SearchOptions, Searcher};

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A searcher wrapper that enforces a local request rate.
pub struct RateLimitedSearcher<S: Searcher> {
    inner: S,
    limiter: Arc<DefaultRateLimiter>,
}

impl<S: Searcher> RateLimitedSearcher<S> {
    /// Create a new rate-limited searcher.
    ///
    /// # Arguments
    /// * `searcher` - The underlying searcher to wrap
    /// * `requests_per_second` - Maximum requests per second
    pub fn new(searcher: S, requests_per_second: u32) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(requests_per_second).expect("requests_per_second must be > 0"),
        );
        Self {
            inner: searcher,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Create with the conservative default of one request per second.
    pub fn conservative(searcher: S) -> Self {
        Self {
            inner: searcher,
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(nonzero!(1u32)))),
        }
    }

    /// Create with burst support.
    pub fn with_burst(searcher: S, requests_per_second: u32, burst: u32) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(requests_per_second).expect("requests_per_second must be > 0"),
        )
        .allow_burst(NonZeroU32::new(burst).expect("burst must be > 0"));

        Self {
            inner: searcher,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    async fn wait_for_permit(&self) {
        self.limiter.until_ready().await;
    }
}

#[async_trait]
impl<S: Searcher> Searcher for RateLimitedSearcher<S> {
    async fn search(&self, query: &str, options: &SearchOptions) -> SearchResult<Vec<SearchHit>> {
        self.wait_for_permit().await;
        self.inner.search(query, options).await
    }
}

/// Extension trait for easy rate limiting.
pub trait SearcherExt: Searcher + Sized {
    /// Wrap this searcher with rate limiting.
    fn rate_limited(self, requests_per_second: u32) -> RateLimitedSearcher<Self> {
        RateLimitedSearcher::new(self, requests_per_second)
    }

    /// Wrap with rate limiting and burst support.
    fn rate_limited_with_burst(
        self,
        requests_per_second: u32,
        burst: u32,
    ) -> RateLimitedSearcher<Self> {
        RateLimitedSearcher::with_burst(self, requests_per_second, burst)
    }
}

impl<S: Searcher + Sized> SearcherExt for S {}
