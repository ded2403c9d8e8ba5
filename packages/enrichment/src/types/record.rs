//! The enriched record: the structured, evidence-backed output of one run.
//!
//! Mutation discipline:
//! - the record is created empty (seeded from the offline identity) at run
//!   start;
//! - only [`ConsensusMerger`](crate::pipeline::ConsensusMerger) mutates it
//!   inside the loop;
//! - evidence URL sets are unique and append-only;
//! - packaging is written once per run (later confirmations only append
//!   evidence URLs);
//! - the compatibility printer set only grows;
//! - `automation_status` moves `NeedsReview → Done` and never regresses.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::config::{Budgets, RunMode};
use super::identity::QueryIdentity;
use super::plan::Category;

/// How a piece of evidence was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Schema-driven extraction from collected pages.
    SchemaExtraction,

    /// Looked up on a product catalog site.
    CatalogLookup,

    /// Seeded from the offline parse of the input query.
    OfflineSeed,
}

/// One accepted field value with its sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    /// Record field this evidence supports (e.g. "packaging").
    pub field: String,

    /// The accepted value.
    pub value: serde_json::Value,

    /// Ordered unique source URLs.
    pub sources: IndexSet<String>,

    /// Confidence in [0, 1].
    pub confidence: f32,

    /// How the value was obtained.
    pub method: ExtractionMethod,
}

/// Retail packaging data. Written once per run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Packaging {
    pub width_mm: Option<f64>,
    pub height_mm: Option<f64>,
    pub depth_mm: Option<f64>,
    pub weight_g: Option<f64>,

    /// Ordered unique evidence URLs; append-only.
    pub evidence: IndexSet<String>,

    /// Confidence in [0, 1]. Lowered when sourced off-catalog.
    pub confidence: f32,

    /// The data came from outside the catalog allow-list.
    pub off_catalog: bool,
}

impl Packaging {
    /// Whether any dimension or weight field is present.
    pub fn has_any_field(&self) -> bool {
        self.width_mm.is_some()
            || self.height_mm.is_some()
            || self.depth_mm.is_some()
            || self.weight_g.is_some()
    }
}

/// Compatible-printer data. The printer set only grows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Compatibility {
    /// Compatible printer models; grow-only, insertion-ordered.
    pub printers: IndexSet<String>,

    /// Ordered unique evidence URLs; append-only.
    pub evidence: IndexSet<String>,

    /// Whether the evidence set passed the tier consensus rule.
    pub trusted: bool,

    /// Set when the printer list was merged below the consensus threshold.
    pub needs_review: bool,

    /// Notes explaining why evidence was kept but not trusted.
    pub exclusion_notes: Vec<String>,
}

impl Compatibility {
    /// The category previously failed consensus: evidence exists but never
    /// reached the trust threshold. Drives planner trust escalation.
    pub fn consensus_failed(&self) -> bool {
        !self.evidence.is_empty() && !self.trusted
    }
}

/// A related item (other capacity, multipack, series sibling).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RelatedItem {
    /// Display name (e.g. "HP W1331A standard yield").
    pub name: String,

    /// Product page, if known.
    #[serde(default)]
    pub url: Option<String>,
}

/// A candidate product image with validation signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImageCandidate {
    /// Image URL.
    pub url: String,

    /// Pixel width, if reported.
    #[serde(default)]
    pub width: Option<u32>,

    /// Pixel height, if reported.
    #[serde(default)]
    pub height: Option<u32>,

    /// How clean the background is, in [0, 1].
    #[serde(default)]
    pub background_score: f32,

    /// The image shows the retail box rather than the product.
    #[serde(default)]
    pub packaging_shot: bool,

    /// A watermark is visible.
    #[serde(default)]
    pub watermarked: bool,

    /// A reseller logo is overlaid.
    #[serde(default)]
    pub logo_overlay: bool,
}

/// One FAQ entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,

    /// Source URL, if known.
    #[serde(default)]
    pub source: Option<String>,
}

/// Terminal automation state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationStatus {
    /// Default: a human should look before publication.
    NeedsReview,

    /// Validation was satisfied at loop exit.
    Done,

    /// A critical provider failure aborted the run.
    Failed,
}

/// Machine-readable warnings attached to a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Warning {
    /// No packaging data was found.
    NixNotFound,

    /// Compatibility is missing or below the consensus threshold.
    CompatibilityUncertain,

    /// No related items were found.
    RelatedMissing,

    /// No FAQ entries were found.
    FaqMissing,

    /// No image candidates were found.
    ImagesMissing,

    /// The time budget ended the loop.
    TimeBudgetExhausted,

    /// The call budget ended the loop.
    CallBudgetExhausted,

    /// Two consecutive passes found nothing new.
    NoProgress,
}

impl Warning {
    /// Warning name as it appears in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Warning::NixNotFound => "NIX_NOT_FOUND",
            Warning::CompatibilityUncertain => "COMPATIBILITY_UNCERTAIN",
            Warning::RelatedMissing => "RELATED_MISSING",
            Warning::FaqMissing => "FAQ_MISSING",
            Warning::ImagesMissing => "IMAGES_MISSING",
            Warning::TimeBudgetExhausted => "TIME_BUDGET_EXHAUSTED",
            Warning::CallBudgetExhausted => "CALL_BUDGET_EXHAUSTED",
            Warning::NoProgress => "NO_PROGRESS",
        }
    }
}

/// Live counters for one run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Completed loop iterations.
    pub iterations: u32,

    /// Search calls issued.
    pub search_calls: u32,

    /// Extraction calls issued.
    pub extract_calls: u32,

    /// Unique URLs collected across the run.
    pub urls_collected: u32,

    /// Wall-clock duration at exit.
    pub elapsed_ms: u64,
}

/// Run-scoped metadata carried on the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Run identifier.
    pub run_id: Uuid,

    /// Effort mode the run was started with.
    pub mode: RunMode,

    /// The immutable budget triple.
    pub budgets: Budgets,

    /// Locale hint, if any.
    pub locale: Option<String>,

    /// Start time.
    pub started_at: DateTime<Utc>,

    /// Live counters.
    pub stats: RunStats,

    /// Warnings explaining unresolved categories and early exits.
    pub warnings: Vec<Warning>,
}

/// The structured, evidence-backed output built for one input query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedRecord {
    /// Identity the run was seeded with.
    pub identity: QueryIdentity,

    /// Packaging data; `None` until accepted once.
    pub packaging: Option<Packaging>,

    /// Set when the run concluded packaging data is not findable.
    pub packaging_not_found: bool,

    /// Compatible-printer data.
    pub compatibility: Compatibility,

    /// Related items; written once.
    pub related: Vec<RelatedItem>,

    /// Image candidates; accumulate across iterations, unique by URL.
    pub images: Vec<ImageCandidate>,

    /// FAQ entries; written once.
    pub faq: Vec<FaqEntry>,

    /// Field-level evidence ledger; append-only.
    pub evidence: Vec<Evidence>,

    /// Run metadata.
    pub run: RunMetadata,

    // Private: transitions are `mark_done` / `mark_failed` only, so Done
    // can never regress.
    automation_status: AutomationStatus,
}

impl EnrichedRecord {
    /// Create an empty record seeded from the offline identity.
    pub fn seeded(identity: QueryIdentity, mode: RunMode, locale: Option<String>) -> Self {
        Self {
            identity,
            packaging: None,
            packaging_not_found: false,
            compatibility: Compatibility::default(),
            related: Vec::new(),
            images: Vec::new(),
            faq: Vec::new(),
            evidence: Vec::new(),
            run: RunMetadata {
                run_id: Uuid::new_v4(),
                mode,
                budgets: mode.budgets(),
                locale,
                started_at: Utc::now(),
                stats: RunStats::default(),
                warnings: Vec::new(),
            },
            automation_status: AutomationStatus::NeedsReview,
        }
    }

    /// Current automation status.
    pub fn automation_status(&self) -> AutomationStatus {
        self.automation_status
    }

    /// Transition `NeedsReview → Done`. A `Done` or `Failed` record is
    /// left unchanged.
    pub(crate) fn mark_done(&mut self) {
        if self.automation_status == AutomationStatus::NeedsReview {
            self.automation_status = AutomationStatus::Done;
        }
    }

    /// Transition `NeedsReview → Failed`. A `Done` record never regresses.
    pub(crate) fn mark_failed(&mut self) {
        if self.automation_status == AutomationStatus::NeedsReview {
            self.automation_status = AutomationStatus::Failed;
        }
    }

    /// Categories still unresolved on this record, in planning order.
    ///
    /// Compatibility counts as unresolved while its evidence has not
    /// reached the consensus threshold, so the planner keeps escalating.
    pub fn missing_categories(&self) -> BTreeSet<Category> {
        let mut missing = BTreeSet::new();
        if self.packaging.is_none() {
            missing.insert(Category::Logistics);
        }
        if self.compatibility.printers.is_empty() || !self.compatibility.trusted {
            missing.insert(Category::Compatibility);
        }
        if self.related.is_empty() {
            missing.insert(Category::Related);
        }
        if self.images.is_empty() {
            missing.insert(Category::Images);
        }
        if self.faq.is_empty() {
            missing.insert(Category::Faq);
        }
        missing
    }

    /// Append to the field-level evidence ledger.
    pub(crate) fn push_evidence(&mut self, evidence: Evidence) {
        self.evidence.push(evidence);
    }

    /// Every evidence URL on the record (packaging + compatibility),
    /// in append order, unique.
    pub fn all_evidence_urls(&self) -> IndexSet<String> {
        let mut urls = IndexSet::new();
        if let Some(packaging) = &self.packaging {
            urls.extend(packaging.evidence.iter().cloned());
        }
        urls.extend(self.compatibility.evidence.iter().cloned());
        urls
    }
}
