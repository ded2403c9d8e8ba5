//! Capability trait abstractions.
//!
//! The orchestrator consumes unreliable, rate-limited network capabilities
//! through these traits. Concrete provider clients (Tavily, Firecrawl,
//! LLM backends, ...) live outside this crate; tests use the mocks in
//! [`crate::testing`].

pub mod extractor;
pub mod scraper;
pub mod searcher;

pub use extractor::FieldExtractor;
pub use scraper::{ScrapedPage, Scraper};
pub use searcher::{ResultKind, SearchHit, SearchOptions, Searcher};
