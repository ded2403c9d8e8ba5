//! The research loop: Plan → Collect → Extract → Merge → Gate.
//!
//! One iteration fully completes before the next begins, so budget
//! accounting stays exact. The loop exits on the first of:
//!
//! - validation satisfied after a merge (`Done`);
//! - an empty plan (nothing left to ask);
//! - a breached time or call budget, checked before each planning step;
//! - two consecutive collect passes with zero fresh URLs (no progress);
//! - a critical provider failure during collection (`Failed`).
//!
//! Every exit other than validation yields `NeedsReview` — never a silent
//! `Done`. Warnings are derived from whichever categories remain
//! unresolved, plus the exit reason.

use std::collections::HashSet;
use std::time::Instant;

use tracing::{info, warn};
use url::Url;

use crate::traits::extractor::FieldExtractor;
use crate::traits::searcher::Searcher;
use crate::types::config::{DomainPolicy, RunOptions};
use crate::types::identity::QueryIdentity;
use crate::types::plan::Category;
use crate::types::record::{EnrichedRecord, Warning};

use super::collector::{CollectBudget, Collector};
use super::consensus::ConsensusMerger;
use super::extractor::{ExtractPolicy, Extractor};
use super::planner::Planner;
use super::quality::QualityGate;

/// Final status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Validation was satisfied.
    Done,

    /// The loop ended with unresolved categories.
    NeedsReview,

    /// A critical provider failure aborted the run.
    Failed,
}

impl RunStatus {
    /// Status name as used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Done => "done",
            RunStatus::NeedsReview => "needs_review",
            RunStatus::Failed => "failed",
        }
    }
}

/// What a finished run hands back to the caller.
#[derive(Debug)]
pub struct RunOutcome {
    /// The record, immutable from here on.
    pub record: EnrichedRecord,

    /// Ordered human-readable trace. Audit only; never drives control
    /// flow.
    pub logs: Vec<String>,

    /// Final status, mirrored on the record's automation status.
    pub status: RunStatus,
}

/// Append-only trace of a run.
#[derive(Debug, Default)]
struct RunLog {
    entries: Vec<String>,
}

impl RunLog {
    fn push(&mut self, line: impl Into<String>) {
        self.entries.push(line.into());
    }
}

/// The control loop binding planner, collector, extractor, merger, and
/// gate under the run budgets.
pub struct Orchestrator<S, X> {
    searcher: S,
    backend: X,
    planner: Planner,
    collector: Collector,
    extractor: Extractor,
    merger: ConsensusMerger,
    gate: QualityGate,
}

impl<S: Searcher, X: FieldExtractor> Orchestrator<S, X> {
    /// Create an orchestrator with the default domain policy.
    pub fn new(searcher: S, backend: X) -> Self {
        Self::with_policy(searcher, backend, DomainPolicy::default())
    }

    /// Create an orchestrator over a custom domain policy.
    pub fn with_policy(searcher: S, backend: X, policy: DomainPolicy) -> Self {
        Self {
            searcher,
            backend,
            planner: Planner::new(policy.clone()),
            collector: Collector::new(),
            extractor: Extractor::new(policy.clone()),
            merger: ConsensusMerger::new(policy.clone()),
            gate: QualityGate::new(policy),
        }
    }

    /// Replace the collector (e.g. to shorten the rate-limit backoff).
    pub fn with_collector(mut self, collector: Collector) -> Self {
        self.collector = collector;
        self
    }

    /// Research one product.
    pub async fn run(&self, identity: QueryIdentity, options: RunOptions) -> RunOutcome {
        let budgets = options.mode.budgets();
        let mut record =
            EnrichedRecord::seeded(identity, options.mode, options.locale.clone());
        let mut log = RunLog::default();
        let started = Instant::now();
        let mut seen: HashSet<Url> = HashSet::new();
        let mut empty_passes = 0u32;
        let mut exit_warning: Option<Warning> = None;

        info!(
            run_id = %record.run.run_id,
            query = %record.identity.raw_query,
            mode = options.mode.as_str(),
            "research run started"
        );
        log.push(format!(
            "run {} started: \"{}\" (mode {}, budget {} calls / {} ms)",
            record.run.run_id,
            record.identity.raw_query,
            options.mode.as_str(),
            budgets.max_calls,
            budgets.time_ms
        ));

        let extract_policy = ExtractPolicy {
            strict_sources: options.strict_sources,
            strict_packaging: options.mode.strict_packaging_sources(),
        };

        let status = loop {
            // Budget checks happen at iteration boundaries only; provider
            // calls bound their own latency.
            let elapsed_ms = started.elapsed().as_millis() as u64;
            if elapsed_ms >= budgets.time_ms {
                log.push(format!("time budget exhausted after {elapsed_ms} ms"));
                exit_warning = Some(Warning::TimeBudgetExhausted);
                break RunStatus::NeedsReview;
            }
            if record.run.stats.search_calls >= budgets.max_calls {
                log.push(format!(
                    "call budget exhausted after {} calls",
                    record.run.stats.search_calls
                ));
                exit_warning = Some(Warning::CallBudgetExhausted);
                break RunStatus::NeedsReview;
            }

            let iteration = record.run.stats.iterations + 1;
            record.run.stats.iterations = iteration;

            // Plan.
            let missing = record.missing_categories();
            let plan = self.planner.plan(&record, &missing, options.mode);
            if plan.is_empty() {
                log.push(format!("iteration {iteration}: empty plan, stopping"));
                break RunStatus::NeedsReview;
            }
            log.push(format!(
                "iteration {iteration}: planned {} queries for {} categories",
                plan.total_queries(),
                plan.slots.len()
            ));

            // Collect.
            let budget = CollectBudget {
                iteration,
                base_limit: options.mode.base_url_limit(),
                remaining_calls: budgets.max_calls - record.run.stats.search_calls,
                remaining_sources: budgets
                    .max_sources
                    .saturating_sub(record.run.stats.urls_collected),
            };
            let outcome = match self
                .collector
                .collect(
                    &self.searcher,
                    &plan,
                    &budget,
                    options.locale.as_deref(),
                    &seen,
                )
                .await
            {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(error = %err, "run aborted by critical provider failure");
                    log.push(format!("CRITICAL: {err}"));
                    break RunStatus::Failed;
                }
            };
            record.run.stats.search_calls += outcome.calls_made;
            record.run.stats.urls_collected += outcome.fresh_urls as u32;
            for finding in &outcome.findings {
                seen.extend(finding.urls.iter().cloned());
            }
            log.push(format!(
                "iteration {iteration}: {} calls, {} urls ({} fresh)",
                outcome.calls_made, outcome.urls_found, outcome.fresh_urls
            ));

            // No-progress breaker.
            if outcome.fresh_urls == 0 {
                empty_passes += 1;
                if empty_passes >= 2 {
                    log.push("no new sources for two consecutive passes, stopping".to_string());
                    exit_warning = Some(Warning::NoProgress);
                    break RunStatus::NeedsReview;
                }
            } else {
                empty_passes = 0;
            }

            // Extract.
            let extracted = self
                .extractor
                .extract_pass(&self.backend, &outcome.findings, &record, &extract_policy)
                .await;
            record.run.stats.extract_calls += extracted.calls;
            for note in &extracted.notes {
                log.push(format!("iteration {iteration}: {note}"));
            }

            // Merge: single writer, one update at a time.
            for update in extracted.updates {
                self.merger.apply(&mut record, update);
            }
            for note in extracted.compat_exclusions {
                log.push(format!("iteration {iteration}: {note}"));
                self.merger.note_exclusion(&mut record, note);
            }

            // Gate.
            if self.gate.is_validation_satisfied(&record) {
                log.push(format!("iteration {iteration}: validation satisfied"));
                break RunStatus::Done;
            }
        };

        self.finish(&mut record, &mut log, status, exit_warning, started);
        RunOutcome {
            record,
            logs: log.entries,
            status,
        }
    }

    fn finish(
        &self,
        record: &mut EnrichedRecord,
        log: &mut RunLog,
        status: RunStatus,
        exit_warning: Option<Warning>,
        started: Instant,
    ) {
        record.run.stats.elapsed_ms = started.elapsed().as_millis() as u64;

        let mut warnings = Vec::new();
        if let Some(warning) = exit_warning {
            warnings.push(warning);
        }
        if status != RunStatus::Done {
            for category in record.missing_categories() {
                warnings.push(match category {
                    Category::Logistics => Warning::NixNotFound,
                    Category::Compatibility => Warning::CompatibilityUncertain,
                    Category::Related => Warning::RelatedMissing,
                    Category::Images => Warning::ImagesMissing,
                    Category::Faq => Warning::FaqMissing,
                });
            }
            if record.packaging.is_none() {
                record.packaging_not_found = true;
            }
        }
        record.run.warnings = warnings;

        match status {
            RunStatus::Done => record.mark_done(),
            RunStatus::Failed => record.mark_failed(),
            RunStatus::NeedsReview => {}
        }

        for warning in &record.run.warnings {
            log.push(format!("warning: {}", warning.as_str()));
        }
        log.push(format!(
            "run {} finished: {} ({} iterations, {} search calls, {} ms)",
            record.run.run_id,
            status.as_str(),
            record.run.stats.iterations,
            record.run.stats.search_calls,
            record.run.stats.elapsed_ms
        ));
        info!(
            run_id = %record.run.run_id,
            status = status.as_str(),
            iterations = record.run.stats.iterations,
            search_calls = record.run.stats.search_calls,
            "research run finished"
        );
    }
}
