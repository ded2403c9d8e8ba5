//! Search collection.
//!
//! Executes one plan against the search capability, category by category.
//! Categories run sequentially: the provider's rate limit is shared, so
//! fanning out buys nothing and breaks call accounting. The collector never
//! exceeds the remaining call or source budget it is handed.
//!
//! Error policy per query:
//! - auth/billing failure: fatal, the whole run aborts;
//! - rate limit: one fixed backoff, then one retry;
//! - anything else: logged and skipped.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use crate::error::{EnrichError, Result, SearchError};
use crate::traits::searcher::{SearchOptions, Searcher};
use crate::types::finding::{CollectOutcome, Finding};
use crate::types::plan::{Category, ResearchPlan};

/// Remaining headroom for one collector pass.
#[derive(Debug, Clone, Copy)]
pub struct CollectBudget {
    /// 1-based loop iteration; raises the per-category URL limit.
    pub iteration: u32,

    /// Mode's base per-category URL limit.
    pub base_limit: usize,

    /// Search calls still allowed in the run.
    pub remaining_calls: u32,

    /// Fresh URLs still allowed in the run.
    pub remaining_sources: u32,
}

impl CollectBudget {
    /// Adaptive per-category URL limit: the base limit plus one per
    /// completed iteration.
    pub fn category_limit(&self) -> usize {
        self.base_limit + self.iteration.saturating_sub(1) as usize
    }
}

/// Rate-limited batch search executor.
#[derive(Debug, Clone)]
pub struct Collector {
    rate_limit_backoff: Duration,
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector {
    /// Create a collector with the default rate-limit backoff.
    pub fn new() -> Self {
        Self {
            rate_limit_backoff: Duration::from_secs(2),
        }
    }

    /// Override the rate-limit backoff.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.rate_limit_backoff = backoff;
        self
    }

    /// Execute one plan.
    ///
    /// `seen` holds every URL discovered in earlier passes of this run and
    /// is used for fresh-URL accounting (the no-progress breaker) and the
    /// source ceiling.
    pub async fn collect<S: Searcher + ?Sized>(
        &self,
        searcher: &S,
        plan: &ResearchPlan,
        budget: &CollectBudget,
        locale: Option<&str>,
        seen: &HashSet<Url>,
    ) -> Result<CollectOutcome> {
        let limit = budget.category_limit();
        let mut outcome = CollectOutcome::default();
        let mut source_ceiling_hit = false;

        'categories: for slot in &plan.slots {
            if !slot.needed || slot.queries.is_empty() {
                continue;
            }
            let mut finding = Finding::new(slot.category);

            for query in &slot.queries {
                if finding.urls.len() >= limit {
                    break;
                }
                if outcome.calls_made >= budget.remaining_calls {
                    debug!(
                        category = slot.category.as_str(),
                        "call budget exhausted mid-pass"
                    );
                    outcome.findings.push(finding);
                    break 'categories;
                }
                if source_ceiling_hit {
                    break;
                }

                let hits = match self
                    .search_query(
                        searcher,
                        slot.category,
                        query,
                        limit,
                        locale,
                        budget.remaining_calls,
                        &mut outcome,
                    )
                    .await?
                {
                    Some(hits) => hits,
                    None => continue,
                };

                for hit in hits {
                    if finding.urls.len() >= limit {
                        break;
                    }
                    let is_fresh = !seen.contains(&hit.url) && !outcome_contains(&outcome, &hit.url);
                    if is_fresh && outcome.fresh_urls as u32 >= budget.remaining_sources {
                        debug!("source budget exhausted; dropping further fresh URLs");
                        source_ceiling_hit = true;
                        break;
                    }
                    if finding.insert(hit.url.clone()) {
                        outcome.urls_found += 1;
                        if is_fresh {
                            outcome.fresh_urls += 1;
                        }
                    }
                }
            }

            debug!(
                category = finding.category.as_str(),
                urls = finding.urls.len(),
                "category collected"
            );
            outcome.findings.push(finding);
        }

        Ok(outcome)
    }

    /// Issue one query, with a single backoff-then-retry on rate limits.
    /// Returns `Ok(None)` when the query was skipped after a non-critical
    /// failure. Every attempt counts against the call budget, including
    /// the retry after a backoff.
    #[allow(clippy::too_many_arguments)]
    async fn search_query<S: Searcher + ?Sized>(
        &self,
        searcher: &S,
        category: Category,
        query: &str,
        limit: usize,
        locale: Option<&str>,
        remaining_calls: u32,
        outcome: &mut CollectOutcome,
    ) -> Result<Option<Vec<crate::traits::searcher::SearchHit>>> {
        let mut options = match category {
            Category::Images => SearchOptions::images(limit),
            _ => SearchOptions::web(limit),
        };
        if let Some(locale) = locale {
            options = options.with_locale(locale);
        }

        let mut backed_off = false;
        loop {
            if outcome.calls_made >= remaining_calls {
                return Ok(None);
            }
            outcome.calls_made += 1;
            match searcher.search(query, &options).await {
                Ok(hits) => return Ok(Some(hits)),
                Err(err) if err.is_critical() => {
                    warn!(query, error = %err, "critical search failure; aborting run");
                    return Err(EnrichError::CriticalProvider(err));
                }
                Err(SearchError::RateLimited) if !backed_off => {
                    debug!(query, "rate limited; backing off once");
                    backed_off = true;
                    tokio::time::sleep(self.rate_limit_backoff).await;
                }
                Err(err) => {
                    warn!(query, error = %err, "search failed; skipping query");
                    return Ok(None);
                }
            }
        }
    }
}

fn outcome_contains(outcome: &CollectOutcome, url: &Url) -> bool {
    outcome.findings.iter().any(|f| f.urls.contains(url))
}
