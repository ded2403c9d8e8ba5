//! Iterative Product Research Orchestrator
//!
//! Converts an unstructured product query into a validated, evidence-backed
//! structured record by orchestrating repeated rounds of planning, web
//! search, content extraction, and quality validation — under hard time,
//! call, and source budgets.
//!
//! # Design Philosophy
//!
//! **"Unreliable capabilities, reliable loop"**
//!
//! - Provider clients stay outside; the loop consumes capability traits
//! - Partial results are typed updates, merged field-by-field
//! - Evidence is never discarded — only trust is gated
//! - Every exit is explicit: done, needs_review, or failed; never a
//!   silent success
//!
//! # Usage
//!
//! ```rust,ignore
//! use enrichment::{Orchestrator, QueryIdentity, RunMode, RunOptions};
//!
//! let orchestrator = Orchestrator::new(searcher, field_extractor);
//! let identity = QueryIdentity::new("HP W1331X toner")
//!     .with_brand("HP")
//!     .with_model("W1331X");
//!
//! let outcome = orchestrator
//!     .run(identity, RunOptions::new(RunMode::Standard))
//!     .await;
//!
//! println!("{}: {} printers", outcome.status.as_str(),
//!     outcome.record.compatibility.printers.len());
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Capability abstractions (Searcher, FieldExtractor, Scraper)
//! - [`types`] - Data model (record, plan, findings, budgets, tiers)
//! - [`pipeline`] - Planner, collector, extractor, consensus, gate, loop
//! - [`searchers`] - Rate-limit decorator and no-op searcher
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod pipeline;
pub mod searchers;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{EnrichError, ExtractorError, ScrapeError, SearchError};
pub use traits::{
    extractor::FieldExtractor,
    scraper::{ScrapedPage, Scraper},
    searcher::{ResultKind, SearchHit, SearchOptions, Searcher},
};
pub use types::{
    config::{Budgets, DomainPolicy, RunMode, RunOptions},
    fields::{PackagingFields, PartialUpdate, PrinterListFields},
    finding::{CollectOutcome, Finding},
    identity::QueryIdentity,
    plan::{Category, PlanSlot, ResearchPlan},
    record::{
        AutomationStatus, Compatibility, EnrichedRecord, Evidence, FaqEntry, ImageCandidate,
        Packaging, RelatedItem, RunStats, Warning,
    },
    report::{BlockingIssue, ReadinessReport},
    tier::SourceTier,
};

// Re-export the pipeline components
pub use pipeline::{
    ConsensusMerger, Extractor, Orchestrator, Planner, QualityGate, RunOutcome, RunStatus,
    TierClassifier,
};

// Re-export searcher decorators
pub use searchers::{NoopSearcher, RateLimitedSearcher, SearcherExt};
