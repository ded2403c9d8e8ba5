//! Source tier classification and consensus merging.
//!
//! The classifier is a pure function over configuration: URL + brand hint
//! in, trust tier out. The merger is the single writer of the record inside
//! the research loop; every partial update funnels through
//! [`ConsensusMerger::apply`] so the append/union invariants hold exactly.
//!
//! Trust rule for compatibility evidence: a set of source URLs is trusted
//! iff it contains at least one tier-A (OEM) URL, or URLs from at least two
//! distinct tier-B (retailer) registrable domains. Evidence below the
//! threshold is merged anyway and flagged `needs_review` — evidence is
//! never discarded, only the trust boolean is gated.

use std::collections::BTreeSet;

use tracing::debug;
use url::Url;

use crate::types::config::DomainPolicy;
use crate::types::fields::PartialUpdate;
use crate::types::record::{EnrichedRecord, Evidence, ExtractionMethod, Packaging};
use crate::types::tier::SourceTier;

/// Second-level suffixes that make a three-label registrable domain
/// (e.g. "cartridgesave.co.uk").
const SECOND_LEVEL_SUFFIXES: [&str; 6] = ["co", "com", "org", "net", "ac", "gov"];

/// The registrable domain of a host: the last two labels, or three when
/// the host uses a second-level country suffix. "www." is stripped first.
pub fn registrable_domain(host: &str) -> String {
    let host = host.strip_prefix("www.").unwrap_or(host);
    let labels: Vec<&str> = host.split('.').collect();
    let n = labels.len();
    if n <= 2 {
        return host.to_string();
    }
    if labels[n - 1].len() == 2 && SECOND_LEVEL_SUFFIXES.contains(&labels[n - 2]) {
        labels[n - 3..].join(".")
    } else {
        labels[n - 2..].join(".")
    }
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Maps a URL plus brand hint to a trust tier. Pure and deterministic;
/// holds only configuration.
#[derive(Debug, Clone)]
pub struct TierClassifier {
    policy: DomainPolicy,
}

impl TierClassifier {
    /// Create a classifier over the given policy.
    pub fn new(policy: DomainPolicy) -> Self {
        Self { policy }
    }

    /// Classify a URL.
    ///
    /// Order of rules: brand substring in the registrable domain → OEM;
    /// configured OEM domain → OEM; configured retailer domain → retailer;
    /// marketplace/forum marker → marketplace; otherwise unknown.
    pub fn classify(&self, url: &Url, brand: Option<&str>) -> SourceTier {
        let Some(host) = url.host_str() else {
            return SourceTier::Unknown;
        };
        let host = host.to_lowercase();
        let registrable = registrable_domain(&host);

        if let Some(brand) = brand {
            let token = brand.to_lowercase().replace(' ', "");
            if !token.is_empty() && registrable.contains(&token) {
                return SourceTier::Oem;
            }
        }

        if self.policy.all_oem_domains().any(|d| domain_matches(&host, d)) {
            return SourceTier::Oem;
        }

        if self
            .policy
            .retailer_domains
            .iter()
            .any(|d| domain_matches(&host, d))
        {
            return SourceTier::Retailer;
        }

        if self
            .policy
            .marketplace_markers
            .iter()
            .any(|m| host.contains(m.as_str()))
        {
            return SourceTier::Marketplace;
        }

        SourceTier::Unknown
    }

    /// Whether a URL is on the catalog allow-list (packaging sources).
    pub fn is_catalog(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_lowercase();
        self.policy
            .catalog_domains
            .iter()
            .any(|d| domain_matches(&host, d))
    }

    /// Apply the consensus trust rule to a set of evidence URLs.
    pub fn is_trusted<'a>(
        &self,
        urls: impl IntoIterator<Item = &'a str>,
        brand: Option<&str>,
    ) -> bool {
        let mut retailer_domains: BTreeSet<String> = BTreeSet::new();
        for raw in urls {
            let Ok(url) = Url::parse(raw) else {
                continue;
            };
            match self.classify(&url, brand) {
                SourceTier::Oem => return true,
                SourceTier::Retailer => {
                    if let Some(host) = url.host_str() {
                        retailer_domains.insert(registrable_domain(&host.to_lowercase()));
                    }
                }
                _ => {}
            }
        }
        retailer_domains.len() >= 2
    }

    /// The policy this classifier was built over.
    pub fn policy(&self) -> &DomainPolicy {
        &self.policy
    }
}

const CONSENSUS_NOTE: &str =
    "compatibility evidence below consensus threshold (need one OEM source or two distinct retailers)";

/// Single writer of the record inside the loop.
///
/// Reconciles [`PartialUpdate`]s into the accumulated record using tier
/// counts to gate trust and resolve conflicts.
#[derive(Debug, Clone)]
pub struct ConsensusMerger {
    classifier: TierClassifier,
}

impl ConsensusMerger {
    /// Create a merger over the given policy.
    pub fn new(policy: DomainPolicy) -> Self {
        Self {
            classifier: TierClassifier::new(policy),
        }
    }

    /// The classifier used for trust decisions.
    pub fn classifier(&self) -> &TierClassifier {
        &self.classifier
    }

    /// Merge one partial update into the record.
    pub fn apply(&self, record: &mut EnrichedRecord, update: PartialUpdate) {
        match update {
            PartialUpdate::Packaging {
                fields,
                sources,
                confidence,
                off_catalog,
            } => {
                if let Some(existing) = record.packaging.as_mut() {
                    // Write-once: confirmations only add evidence URLs.
                    existing.evidence.extend(sources);
                    debug!("packaging already recorded; appended evidence only");
                } else if fields.has_any() {
                    let evidence: indexmap::IndexSet<String> = sources.iter().cloned().collect();
                    record.packaging = Some(Packaging {
                        width_mm: fields.width_mm,
                        height_mm: fields.height_mm,
                        depth_mm: fields.depth_mm,
                        weight_g: fields.weight_g,
                        evidence: evidence.clone(),
                        confidence,
                        off_catalog,
                    });
                    record.push_evidence(Evidence {
                        field: "packaging".to_string(),
                        value: serde_json::to_value(&fields).unwrap_or_default(),
                        sources: evidence,
                        confidence,
                        method: if off_catalog {
                            ExtractionMethod::SchemaExtraction
                        } else {
                            ExtractionMethod::CatalogLookup
                        },
                    });
                }
            }

            PartialUpdate::Compatibility { printers, sources } => {
                let brand = record.identity.brand_lower();
                let accepted: Vec<String> = printers
                    .into_iter()
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect();

                let compat = &mut record.compatibility;
                let was_trusted = compat.trusted;
                for printer in &accepted {
                    compat.printers.insert(printer.clone());
                }
                for source in &sources {
                    compat.evidence.insert(source.clone());
                }

                // Recompute trust over the union of old and new evidence.
                let trusted = self
                    .classifier
                    .is_trusted(compat.evidence.iter().map(String::as_str), brand.as_deref());

                if trusted {
                    compat.trusted = true;
                    compat.needs_review = false;
                    if !was_trusted {
                        debug!(
                            printers = compat.printers.len(),
                            "compatibility consensus reached; upgraded wholesale"
                        );
                    }
                } else {
                    compat.needs_review = true;
                    if !compat.exclusion_notes.iter().any(|n| n == CONSENSUS_NOTE) {
                        compat.exclusion_notes.push(CONSENSUS_NOTE.to_string());
                    }
                }

                if !accepted.is_empty() {
                    let value = serde_json::to_value(&accepted).unwrap_or_default();
                    record.push_evidence(Evidence {
                        field: "compatibility".to_string(),
                        value,
                        sources: sources.into_iter().collect(),
                        confidence: if trusted { 0.9 } else { 0.5 },
                        method: ExtractionMethod::SchemaExtraction,
                    });
                }
            }

            PartialUpdate::Related { items, sources } => {
                if record.related.is_empty() && !items.is_empty() {
                    let mut seen = BTreeSet::new();
                    record.related = items
                        .into_iter()
                        .filter(|item| seen.insert(item.name.clone()))
                        .collect();
                    record.push_evidence(Evidence {
                        field: "related".to_string(),
                        value: serde_json::Value::from(record.related.len()),
                        sources: sources.into_iter().collect(),
                        confidence: 0.7,
                        method: ExtractionMethod::SchemaExtraction,
                    });
                }
            }

            PartialUpdate::Images { candidates } => {
                for candidate in candidates {
                    if !record.images.iter().any(|i| i.url == candidate.url) {
                        record.images.push(candidate);
                    }
                }
            }

            PartialUpdate::Faq { entries, sources } => {
                if record.faq.is_empty() && !entries.is_empty() {
                    record.faq = entries;
                    record.push_evidence(Evidence {
                        field: "faq".to_string(),
                        value: serde_json::Value::from(record.faq.len()),
                        sources: sources.into_iter().collect(),
                        confidence: 0.7,
                        method: ExtractionMethod::SchemaExtraction,
                    });
                }
            }
        }
    }

    /// Record a compatibility exclusion note (extraction failures keep the
    /// category unresolved but are still worth a visible trace).
    pub fn note_exclusion(&self, record: &mut EnrichedRecord, note: impl Into<String>) {
        let note = note.into();
        if !record
            .compatibility
            .exclusion_notes
            .iter()
            .any(|n| *n == note)
        {
            record.compatibility.exclusion_notes.push(note);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::config::RunMode;
    use crate::types::fields::PackagingFields;
    use crate::types::identity::QueryIdentity;
    use proptest::prelude::*;

    fn classifier() -> TierClassifier {
        TierClassifier::new(DomainPolicy::default())
    }

    fn merger() -> ConsensusMerger {
        ConsensusMerger::new(DomainPolicy::default())
    }

    fn record() -> EnrichedRecord {
        EnrichedRecord::seeded(
            QueryIdentity::new("HP W1331X").with_brand("HP").with_model("W1331X"),
            RunMode::Standard,
            None,
        )
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn registrable_domain_handles_subdomains_and_country_suffixes() {
        assert_eq!(registrable_domain("www.hp.com"), "hp.com");
        assert_eq!(registrable_domain("shop.tonerpartner.com"), "tonerpartner.com");
        assert_eq!(registrable_domain("cartridgesave.co.uk"), "cartridgesave.co.uk");
        assert_eq!(registrable_domain("www.shop.cartridgesave.co.uk"), "cartridgesave.co.uk");
        assert_eq!(registrable_domain("localhost"), "localhost");
    }

    #[test]
    fn classify_tiers() {
        let c = classifier();

        // Brand substring on the registrable domain.
        assert_eq!(
            c.classify(&url("https://www.hp.com/toner"), Some("HP")),
            SourceTier::Oem
        );
        // Configured OEM domain without a brand hint.
        assert_eq!(
            c.classify(&url("https://store.epson.com/ink"), None),
            SourceTier::Oem
        );
        assert_eq!(
            c.classify(&url("https://www.tonerpartner.com/hp"), Some("HP")),
            SourceTier::Retailer
        );
        assert_eq!(
            c.classify(&url("https://www.amazon.de/dp/B0"), Some("HP")),
            SourceTier::Marketplace
        );
        assert_eq!(
            c.classify(&url("https://random-blog.net/review"), Some("HP")),
            SourceTier::Unknown
        );
    }

    #[test]
    fn trust_boundary_exact() {
        let c = classifier();
        let brand = Some("hp");

        // Exactly one tier-B domain: untrusted.
        assert!(!c.is_trusted(["https://www.tonerpartner.com/a"], brand));
        // Two URLs from the same tier-B domain: still one domain.
        assert!(!c.is_trusted(
            [
                "https://www.tonerpartner.com/a",
                "https://shop.tonerpartner.com/b"
            ],
            brand
        ));
        // Two distinct tier-B domains: trusted.
        assert!(c.is_trusted(
            ["https://www.tonerpartner.com/a", "https://www.prindo.de/b"],
            brand
        ));
        // One tier-A URL alone: trusted.
        assert!(c.is_trusted(["https://www.hp.com/printers"], brand));
    }

    #[test]
    fn packaging_is_write_once_but_evidence_appends() {
        let m = merger();
        let mut rec = record();

        m.apply(
            &mut rec,
            PartialUpdate::Packaging {
                fields: PackagingFields {
                    width_mm: Some(110.0),
                    weight_g: Some(940.0),
                    ..Default::default()
                },
                sources: vec!["https://icecat.biz/p/1".to_string()],
                confidence: 0.9,
                off_catalog: false,
            },
        );
        assert_eq!(rec.packaging.as_ref().unwrap().width_mm, Some(110.0));

        // A second packaging update must not change values.
        m.apply(
            &mut rec,
            PartialUpdate::Packaging {
                fields: PackagingFields {
                    width_mm: Some(999.0),
                    ..Default::default()
                },
                sources: vec!["https://gs1.org/p/2".to_string()],
                confidence: 0.9,
                off_catalog: false,
            },
        );
        let packaging = rec.packaging.as_ref().unwrap();
        assert_eq!(packaging.width_mm, Some(110.0));
        assert_eq!(packaging.evidence.len(), 2);
    }

    #[test]
    fn packaging_without_fields_is_rejected() {
        let m = merger();
        let mut rec = record();
        m.apply(
            &mut rec,
            PartialUpdate::Packaging {
                fields: PackagingFields::default(),
                sources: vec!["https://icecat.biz/p/1".to_string()],
                confidence: 0.9,
                off_catalog: false,
            },
        );
        assert!(rec.packaging.is_none());
    }

    #[test]
    fn compatibility_upgrades_wholesale_when_consensus_reached() {
        let m = merger();
        let mut rec = record();

        // First pass: a single retailer. Merged but untrusted.
        m.apply(
            &mut rec,
            PartialUpdate::Compatibility {
                printers: vec!["LaserJet M234dw".to_string()],
                sources: vec!["https://www.tonerpartner.com/a".to_string()],
            },
        );
        assert!(!rec.compatibility.trusted);
        assert!(rec.compatibility.needs_review);
        assert!(!rec.compatibility.exclusion_notes.is_empty());
        assert_eq!(rec.compatibility.printers.len(), 1);

        // Second pass: a second distinct retailer. Union becomes trusted.
        m.apply(
            &mut rec,
            PartialUpdate::Compatibility {
                printers: vec!["LaserJet M234dw".to_string(), "LaserJet M209dw".to_string()],
                sources: vec!["https://www.prindo.de/b".to_string()],
            },
        );
        assert!(rec.compatibility.trusted);
        assert!(!rec.compatibility.needs_review);
        assert_eq!(rec.compatibility.printers.len(), 2);
        assert_eq!(rec.compatibility.evidence.len(), 2);
    }

    #[test]
    fn merging_same_finding_twice_is_idempotent() {
        let m = merger();
        let mut rec = record();
        let update = PartialUpdate::Compatibility {
            printers: vec!["LaserJet M234dw".to_string()],
            sources: vec!["https://www.tonerpartner.com/a".to_string()],
        };

        m.apply(&mut rec, update.clone());
        m.apply(&mut rec, update);

        assert_eq!(rec.compatibility.printers.len(), 1);
        assert_eq!(rec.compatibility.evidence.len(), 1);
        assert_eq!(rec.compatibility.exclusion_notes.len(), 1);
    }

    #[test]
    fn related_and_faq_are_write_once_images_accumulate() {
        use crate::types::record::{FaqEntry, ImageCandidate, RelatedItem};
        let m = merger();
        let mut rec = record();

        m.apply(
            &mut rec,
            PartialUpdate::Related {
                items: vec![RelatedItem {
                    name: "W1331A".to_string(),
                    url: None,
                }],
                sources: vec![],
            },
        );
        m.apply(
            &mut rec,
            PartialUpdate::Related {
                items: vec![RelatedItem {
                    name: "other".to_string(),
                    url: None,
                }],
                sources: vec![],
            },
        );
        assert_eq!(rec.related.len(), 1);
        assert_eq!(rec.related[0].name, "W1331A");

        m.apply(
            &mut rec,
            PartialUpdate::Faq {
                entries: vec![FaqEntry {
                    question: "Yield?".to_string(),
                    answer: "15k pages".to_string(),
                    source: None,
                }],
                sources: vec![],
            },
        );
        assert_eq!(rec.faq.len(), 1);

        let image = |u: &str| ImageCandidate {
            url: u.to_string(),
            width: Some(1200),
            height: Some(1200),
            background_score: 0.9,
            packaging_shot: false,
            watermarked: false,
            logo_overlay: false,
        };
        m.apply(
            &mut rec,
            PartialUpdate::Images {
                candidates: vec![image("https://img.example/1.jpg")],
            },
        );
        m.apply(
            &mut rec,
            PartialUpdate::Images {
                candidates: vec![image("https://img.example/1.jpg"), image("https://img.example/2.jpg")],
            },
        );
        assert_eq!(rec.images.len(), 2);
    }

    proptest! {
        #[test]
        fn brand_in_domain_is_never_unknown(
            brand in "[a-z]{4,8}",
            prefix in "[a-z]{0,4}",
        ) {
            let c = classifier();
            let target = Url::parse(&format!("https://{prefix}{brand}.com/p")).unwrap();
            let tier = c.classify(&target, Some(&brand));
            prop_assert_ne!(tier, SourceTier::Unknown);
            // Determinism: same inputs, same answer.
            prop_assert_eq!(tier, c.classify(&target, Some(&brand)));
        }

        #[test]
        fn merge_is_idempotent_over_arbitrary_findings(
            printers in proptest::collection::vec("[A-Za-z0-9 ]{1,12}", 0..5),
            source_picks in proptest::collection::vec(0usize..4, 0..5),
        ) {
            let urls = [
                "https://www.tonerpartner.com/a",
                "https://www.prindo.de/b",
                "https://www.hp.com/c",
                "https://random.example/d",
            ];
            let sources: Vec<String> =
                source_picks.iter().map(|i| urls[*i].to_string()).collect();

            let m = merger();
            let mut rec = record();
            let update = PartialUpdate::Compatibility {
                printers: printers.clone(),
                sources: sources.clone(),
            };
            m.apply(&mut rec, update.clone());
            let printers_after_one = rec.compatibility.printers.len();
            let evidence_after_one = rec.compatibility.evidence.len();
            let trusted_after_one = rec.compatibility.trusted;

            m.apply(&mut rec, update);
            prop_assert_eq!(rec.compatibility.printers.len(), printers_after_one);
            prop_assert_eq!(rec.compatibility.evidence.len(), evidence_after_one);
            prop_assert_eq!(rec.compatibility.trusted, trusted_after_one);
        }
    }
}
