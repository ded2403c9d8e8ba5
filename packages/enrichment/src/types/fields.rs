//! Schema-bearing partial structs and the tagged merge union.
//!
//! Each `*Fields` struct doubles as the JSON schema handed to the
//! [`FieldExtractor`](crate::traits::FieldExtractor) (via `schemars`) and
//! the typed parse target for its response. Absent fields mean "not
//! reported", never "empty".
//!
//! [`PartialUpdate`] is the only way extraction results reach the record:
//! a tagged union merged field-by-field by the consensus merger, so the
//! append/union invariants hold exactly.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::record::{FaqEntry, ImageCandidate, RelatedItem};

/// Build the JSON schema for a partial struct.
pub fn schema_of<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::gen::SchemaGenerator::default().into_root_schema_for::<T>();
    serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({}))
}

/// Packaging dimensions (mm) and weight (g).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PackagingFields {
    #[serde(default)]
    pub width_mm: Option<f64>,
    #[serde(default)]
    pub height_mm: Option<f64>,
    #[serde(default)]
    pub depth_mm: Option<f64>,
    #[serde(default)]
    pub weight_g: Option<f64>,
}

impl PackagingFields {
    /// Whether the extraction actually reported anything.
    pub fn has_any(&self) -> bool {
        self.width_mm.is_some()
            || self.height_mm.is_some()
            || self.depth_mm.is_some()
            || self.weight_g.is_some()
    }
}

/// Compatible printer models.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PrinterListFields {
    #[serde(default)]
    pub printers: Vec<String>,
}

/// Related items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RelatedFields {
    #[serde(default)]
    pub items: Vec<RelatedItem>,
}

/// Image candidates with validation signals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImageFields {
    #[serde(default)]
    pub images: Vec<ImageCandidate>,
}

/// FAQ entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FaqFields {
    #[serde(default)]
    pub entries: Vec<FaqEntry>,
}

/// One extraction result waiting to be merged into the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartialUpdate {
    /// Packaging fields with their evidence.
    Packaging {
        fields: PackagingFields,
        sources: Vec<String>,
        confidence: f32,
        /// Sourced outside the catalog allow-list (fallback path).
        off_catalog: bool,
    },

    /// New compatible printers with their evidence.
    Compatibility {
        printers: Vec<String>,
        sources: Vec<String>,
    },

    /// Related items (write-once).
    Related {
        items: Vec<RelatedItem>,
        sources: Vec<String>,
    },

    /// Image candidates (accumulate).
    Images { candidates: Vec<ImageCandidate> },

    /// FAQ entries (write-once).
    Faq {
        entries: Vec<FaqEntry>,
        sources: Vec<String>,
    },
}
