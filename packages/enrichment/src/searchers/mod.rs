//! Searcher implementations and decorators.
//!
//! Concrete provider clients live outside this crate; what ships here are
//! the pieces every deployment needs regardless of provider: a rate-limit
//! decorator and a no-op fallback for unconfigured environments.

pub mod noop;
pub mod rate_limited;

pub use noop::NoopSearcher;
pub use rate_limited::{RateLimitedSearcher, SearcherExt};
