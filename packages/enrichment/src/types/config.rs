//! Run configuration: modes, budgets, and the domain policy.
//!
//! All of these are plain configuration values. Components receive them at
//! construction time (no process-wide state) and never mutate them during a
//! run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How much effort a run is allowed to spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Quick pass: small budgets, first-hit sourcing.
    Fast,

    /// Default: balanced budgets.
    Standard,

    /// Thorough: large budgets plus strict packaging sourcing (packaging
    /// evidence must come from the catalog allow-list).
    Exhaustive,
}

impl RunMode {
    /// The budget triple for this mode. Immutable within a run.
    pub fn budgets(&self) -> Budgets {
        match self {
            RunMode::Fast => Budgets {
                time_ms: 90_000,
                max_calls: 12,
                max_sources: 20,
            },
            RunMode::Standard => Budgets {
                time_ms: 240_000,
                max_calls: 32,
                max_sources: 60,
            },
            RunMode::Exhaustive => Budgets {
                time_ms: 600_000,
                max_calls: 64,
                max_sources: 150,
            },
        }
    }

    /// Maximum queries the planner emits per category.
    pub fn per_category_queries(&self) -> usize {
        match self {
            RunMode::Fast => 2,
            RunMode::Standard => 3,
            RunMode::Exhaustive => 4,
        }
    }

    /// Base per-category URL limit for the collector (grows with the
    /// iteration number).
    pub fn base_url_limit(&self) -> usize {
        match self {
            RunMode::Fast => 3,
            RunMode::Standard => 5,
            RunMode::Exhaustive => 8,
        }
    }

    /// Whether packaging evidence must come from the catalog allow-list.
    pub fn strict_packaging_sources(&self) -> bool {
        matches!(self, RunMode::Exhaustive)
    }

    /// Mode name as used in logs and run metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Fast => "fast",
            RunMode::Standard => "standard",
            RunMode::Exhaustive => "exhaustive",
        }
    }
}

/// Per-run ceilings. Checked at iteration boundaries (time, calls) and
/// during collection (sources).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budgets {
    /// Wall-clock ceiling in milliseconds.
    pub time_ms: u64,

    /// Maximum search calls across all categories and iterations.
    pub max_calls: u32,

    /// Maximum unique URLs collected across the run.
    pub max_sources: u32,
}

/// Options for a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    /// Effort mode, selecting the budget triple.
    pub mode: RunMode,

    /// BCP-47 locale hint threaded into search calls.
    pub locale: Option<String>,

    /// Restrict compatibility extraction to allow-listed / OEM domains.
    pub strict_sources: bool,
}

impl RunOptions {
    /// Create options for the given mode.
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            locale: None,
            strict_sources: false,
        }
    }

    /// Set the locale hint.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Enable strict compatibility sourcing.
    pub fn strict(mut self) -> Self {
        self.strict_sources = true;
        self
    }
}

/// Domain allow-lists shared by the planner, the extractor filters, and the
/// tier classifier.
///
/// Configuration only; inject one instance per run context. The defaults
/// cover the printer-consumables market this library was built for, but any
/// of the lists can be replaced wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainPolicy {
    /// OEM domains keyed by lowercase brand (tier A).
    pub oem_domains: BTreeMap<String, Vec<String>>,

    /// Recognized retailer domains (tier B).
    pub retailer_domains: Vec<String>,

    /// Product catalog domains accepted as packaging sources.
    pub catalog_domains: Vec<String>,

    /// Host substrings marking marketplaces and forums (tier C).
    pub marketplace_markers: Vec<String>,
}

impl Default for DomainPolicy {
    fn default() -> Self {
        let mut oem_domains = BTreeMap::new();
        for (brand, domains) in [
            ("hp", vec!["hp.com"]),
            ("canon", vec!["canon.com", "usa.canon.com"]),
            ("brother", vec!["brother.com", "brother-usa.com"]),
            ("epson", vec!["epson.com"]),
            ("lexmark", vec!["lexmark.com"]),
            ("kyocera", vec!["kyoceradocumentsolutions.com"]),
            ("xerox", vec!["xerox.com"]),
            ("ricoh", vec!["ricoh.com"]),
        ] {
            oem_domains.insert(
                brand.to_string(),
                domains.into_iter().map(String::from).collect(),
            );
        }

        Self {
            oem_domains,
            retailer_domains: [
                "tonerpartner.com",
                "prindo.de",
                "123inkt.nl",
                "cartridgesave.co.uk",
                "staples.com",
                "officedepot.com",
                "cdw.com",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            catalog_domains: ["icecat.biz", "open.icecat.biz", "gs1.org"]
                .into_iter()
                .map(String::from)
                .collect(),
            marketplace_markers: [
                "amazon.", "ebay.", "aliexpress", "alibaba", "rakuten", "allegro", "forum",
                "reddit.", "community.", "stackexchange",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl DomainPolicy {
    /// OEM domains for a lowercase brand, if configured.
    pub fn oem_domains_for(&self, brand_lower: &str) -> &[String] {
        self.oem_domains
            .get(brand_lower)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Iterate every configured OEM domain regardless of brand.
    pub fn all_oem_domains(&self) -> impl Iterator<Item = &str> {
        self.oem_domains
            .values()
            .flat_map(|domains| domains.iter().map(String::as_str))
    }
}
