//! Data types for the research loop.

pub mod config;
pub mod fields;
pub mod finding;
pub mod identity;
pub mod plan;
pub mod record;
pub mod report;
pub mod tier;

pub use config::{Budgets, DomainPolicy, RunMode, RunOptions};
pub use fields::{
    FaqFields, ImageFields, PackagingFields, PartialUpdate, PrinterListFields, RelatedFields,
};
pub use finding::{CollectOutcome, Finding};
pub use identity::QueryIdentity;
pub use plan::{Category, PlanSlot, ResearchPlan};
pub use record::{
    AutomationStatus, Compatibility, EnrichedRecord, Evidence, ExtractionMethod, FaqEntry,
    ImageCandidate, Packaging, RelatedItem, RunMetadata, RunStats, Warning,
};
pub use report::{BlockingIssue, ReadinessReport};
pub use tier::SourceTier;
