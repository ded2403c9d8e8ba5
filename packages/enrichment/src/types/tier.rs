//! Source trust tiers.

use serde::{Deserialize, Serialize};

/// Trust class of an evidence source, derived from domain/brand matching
/// against the configured [`DomainPolicy`](super::config::DomainPolicy).
///
/// Tiers gate the compatibility consensus rule: one tier-A URL, or two
/// distinct tier-B domains, make an evidence set trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTier {
    /// Tier A: the manufacturer's own domain.
    Oem,

    /// Tier B: a recognized retailer.
    Retailer,

    /// Tier C: marketplace or forum.
    Marketplace,

    /// No classification matched.
    Unknown,
}

impl SourceTier {
    /// Tier name as used in logs and notes.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTier::Oem => "oem",
            SourceTier::Retailer => "retailer",
            SourceTier::Marketplace => "marketplace",
            SourceTier::Unknown => "unknown",
        }
    }
}
