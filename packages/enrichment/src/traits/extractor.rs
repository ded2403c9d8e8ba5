//! Structured field extraction capability.
//!
//! Given a bounded set of URLs, an instruction, and a JSON schema, the
//! backend returns a partial object conforming to the schema. Backends are
//! typically LLM-powered (fetch pages, extract fields), but the orchestrator
//! only cares about the contract: partial object or failure.

use async_trait::async_trait;
use url::Url;

use crate::error::ExtractorResult;

/// Schema-driven extraction capability.
///
/// The returned value is a *partial* object: absent fields mean "not
/// reported on these pages", never "empty". Callers parse the value into
/// typed partial structs and merge field-by-field.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    /// Extract a partial object matching `schema` from the given pages.
    async fn extract(
        &self,
        urls: &[Url],
        instruction: &str,
        schema: serde_json::Value,
    ) -> ExtractorResult<serde_json::Value>;
}
