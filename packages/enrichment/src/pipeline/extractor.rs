//! Schema-driven extraction over collected URLs.
//!
//! Turns one pass of findings into typed [`PartialUpdate`]s. Every category
//! is bounded: a fixed number of URLs goes to the extraction backend, the
//! response is parsed against the category's schema, and anything that
//! fails degrades to "no update this iteration" — the loop retries the
//! category while it stays missing.
//!
//! The three auxiliary categories (related, images, FAQ) are dispatched
//! concurrently; they touch disjoint fields and nothing is written to the
//! record until the merge step.

use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::ExtractorError;
use crate::traits::extractor::FieldExtractor;
use crate::types::config::DomainPolicy;
use crate::types::fields::{
    schema_of, FaqFields, ImageFields, PackagingFields, PartialUpdate, PrinterListFields,
    RelatedFields,
};
use crate::types::finding::Finding;
use crate::types::plan::Category;
use crate::types::record::EnrichedRecord;
use crate::types::tier::SourceTier;

use super::consensus::TierClassifier;

const MAX_LOGISTICS_URLS: usize = 3;
const MAX_COMPAT_URLS: usize = 5;
const MAX_AUX_URLS: usize = 4;

/// Per-pass extraction policy derived from the run options.
#[derive(Debug, Clone, Copy)]
pub struct ExtractPolicy {
    /// Restrict compatibility extraction to allow-listed / OEM domains.
    pub strict_sources: bool,

    /// Packaging evidence must come from the catalog allow-list
    /// (exhaustive mode).
    pub strict_packaging: bool,
}

/// Result of one extraction pass.
#[derive(Debug, Default)]
pub struct ExtractOutcome {
    /// Updates for the merger, in category order.
    pub updates: Vec<PartialUpdate>,

    /// Extraction calls issued.
    pub calls: u32,

    /// Human-readable trace lines for the run log.
    pub notes: Vec<String>,

    /// Compatibility exclusion notes to append to the record.
    pub compat_exclusions: Vec<String>,
}

/// Bounded, schema-driven extractor.
#[derive(Debug, Clone)]
pub struct Extractor {
    classifier: TierClassifier,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(DomainPolicy::default())
    }
}

impl Extractor {
    /// Create an extractor over the given policy.
    pub fn new(policy: DomainPolicy) -> Self {
        Self {
            classifier: TierClassifier::new(policy),
        }
    }

    /// Run one extraction pass over the findings of an iteration.
    pub async fn extract_pass<X: FieldExtractor + ?Sized>(
        &self,
        backend: &X,
        findings: &[Finding],
        record: &EnrichedRecord,
        policy: &ExtractPolicy,
    ) -> ExtractOutcome {
        let mut outcome = ExtractOutcome::default();
        let token = record.identity.search_token().to_string();

        self.extract_logistics(backend, findings, record, policy, &token, &mut outcome)
            .await;
        self.extract_compatibility(backend, findings, record, policy, &token, &mut outcome)
            .await;

        // Auxiliary categories share no record state until merge; run them
        // concurrently.
        let related = self.extract_related(backend, findings, record, &token);
        let images = self.extract_images(backend, findings, &token);
        let faq = self.extract_faq(backend, findings, record, &token);
        let (related, images, faq) = futures::join!(related, images, faq);

        for part in [related, images, faq] {
            outcome.calls += part.calls;
            outcome.notes.extend(part.notes);
            outcome.updates.extend(part.updates);
        }

        outcome
    }

    async fn extract_logistics<X: FieldExtractor + ?Sized>(
        &self,
        backend: &X,
        findings: &[Finding],
        record: &EnrichedRecord,
        policy: &ExtractPolicy,
        token: &str,
        outcome: &mut ExtractOutcome,
    ) {
        let Some(urls) = category_urls(findings, Category::Logistics) else {
            return;
        };
        if record.packaging.is_some() {
            debug!("packaging already recorded; skipping logistics extraction");
            return;
        }

        let catalog: Vec<Url> = urls
            .iter()
            .filter(|u| self.classifier.is_catalog(u))
            .cloned()
            .collect();

        let (mut targets, confidence, off_catalog) = if !catalog.is_empty() {
            (catalog, 0.9, false)
        } else if !policy.strict_packaging && !urls.is_empty() {
            outcome.notes.push(
                "logistics: no catalog source found; falling back to off-catalog pages".to_string(),
            );
            (urls.clone(), 0.5, true)
        } else {
            if !urls.is_empty() {
                outcome.notes.push(
                    "logistics: strict sourcing active and no catalog source found".to_string(),
                );
            }
            return;
        };
        targets.truncate(MAX_LOGISTICS_URLS);

        let instruction = format!(
            "Report the retail packaging dimensions in millimetres and the packaged weight \
             in grams for {token}. Only include values explicitly stated on the page."
        );
        outcome.calls += 1;
        match extract_typed::<PackagingFields, X>(backend, &targets, &instruction).await {
            Ok(fields) if fields.has_any() => {
                outcome.updates.push(PartialUpdate::Packaging {
                    fields,
                    sources: to_strings(&targets),
                    confidence,
                    off_catalog,
                });
            }
            Ok(_) => {
                outcome
                    .notes
                    .push("logistics: pages reported no packaging fields".to_string());
            }
            Err(err) => {
                warn!(error = %err, "logistics extraction failed");
                outcome
                    .notes
                    .push(format!("logistics: extraction failed ({err})"));
            }
        }
    }

    async fn extract_compatibility<X: FieldExtractor + ?Sized>(
        &self,
        backend: &X,
        findings: &[Finding],
        record: &EnrichedRecord,
        policy: &ExtractPolicy,
        token: &str,
        outcome: &mut ExtractOutcome,
    ) {
        let Some(urls) = category_urls(findings, Category::Compatibility) else {
            return;
        };
        if urls.is_empty() {
            return;
        }

        let brand = record.identity.brand_lower();
        let mut targets: Vec<Url> = if policy.strict_sources {
            urls.iter()
                .filter(|u| {
                    matches!(
                        self.classifier.classify(u, brand.as_deref()),
                        SourceTier::Oem | SourceTier::Retailer
                    )
                })
                .cloned()
                .collect()
        } else {
            urls.clone()
        };

        if targets.is_empty() {
            outcome.compat_exclusions.push(format!(
                "all {} compatibility sources excluded by strict sourcing",
                urls.len()
            ));
            return;
        }
        targets.truncate(MAX_COMPAT_URLS);

        let instruction = format!(
            "List every printer model explicitly stated as compatible with {token}. \
             Use the manufacturer's model names verbatim."
        );
        outcome.calls += 1;
        match extract_typed::<PrinterListFields, X>(backend, &targets, &instruction).await {
            Ok(fields) if !fields.printers.is_empty() => {
                outcome.updates.push(PartialUpdate::Compatibility {
                    printers: fields.printers,
                    sources: to_strings(&targets),
                });
            }
            Ok(_) => {
                outcome
                    .notes
                    .push("compatibility: pages reported no printer models".to_string());
            }
            Err(err) => {
                warn!(error = %err, "compatibility extraction failed");
                outcome
                    .compat_exclusions
                    .push(format!("compatibility extraction failed ({err})"));
            }
        }
    }

    async fn extract_related<X: FieldExtractor + ?Sized>(
        &self,
        backend: &X,
        findings: &[Finding],
        record: &EnrichedRecord,
        token: &str,
    ) -> ExtractOutcome {
        let mut part = ExtractOutcome::default();
        let Some(mut urls) = category_urls(findings, Category::Related) else {
            return part;
        };
        if urls.is_empty() || !record.related.is_empty() {
            return part;
        }
        urls.truncate(MAX_AUX_URLS);

        let instruction = format!(
            "List products directly related to {token}: other capacities of the same \
             cartridge, multipacks, and series siblings."
        );
        part.calls += 1;
        match extract_typed::<RelatedFields, X>(backend, &urls, &instruction).await {
            Ok(fields) if !fields.items.is_empty() => {
                part.updates.push(PartialUpdate::Related {
                    items: fields.items,
                    sources: to_strings(&urls),
                });
            }
            Ok(_) => part
                .notes
                .push("related: pages reported no related items".to_string()),
            Err(err) => {
                warn!(error = %err, "related extraction failed");
                part.notes.push(format!("related: extraction failed ({err})"));
            }
        }
        part
    }

    async fn extract_images<X: FieldExtractor + ?Sized>(
        &self,
        backend: &X,
        findings: &[Finding],
        token: &str,
    ) -> ExtractOutcome {
        let mut part = ExtractOutcome::default();
        let Some(mut urls) = category_urls(findings, Category::Images) else {
            return part;
        };
        if urls.is_empty() {
            return part;
        }
        urls.truncate(MAX_AUX_URLS);

        let instruction = format!(
            "Collect product image candidates for {token}. For each image report pixel \
             dimensions if stated, how clean the background is, and whether it shows the \
             retail box, a watermark, or a reseller logo."
        );
        part.calls += 1;
        match extract_typed::<ImageFields, X>(backend, &urls, &instruction).await {
            Ok(fields) if !fields.images.is_empty() => {
                part.updates.push(PartialUpdate::Images {
                    candidates: fields.images,
                });
            }
            Ok(_) => part
                .notes
                .push("images: pages reported no image candidates".to_string()),
            Err(err) => {
                warn!(error = %err, "image extraction failed");
                part.notes.push(format!("images: extraction failed ({err})"));
            }
        }
        part
    }

    async fn extract_faq<X: FieldExtractor + ?Sized>(
        &self,
        backend: &X,
        findings: &[Finding],
        record: &EnrichedRecord,
        token: &str,
    ) -> ExtractOutcome {
        let mut part = ExtractOutcome::default();
        let Some(mut urls) = category_urls(findings, Category::Faq) else {
            return part;
        };
        if urls.is_empty() || !record.faq.is_empty() {
            return part;
        }
        urls.truncate(MAX_AUX_URLS);

        let instruction = format!(
            "Collect frequently asked questions and their answers about {token} \
             (yield, installation, compatibility, storage)."
        );
        part.calls += 1;
        match extract_typed::<FaqFields, X>(backend, &urls, &instruction).await {
            Ok(fields) if !fields.entries.is_empty() => {
                part.updates.push(PartialUpdate::Faq {
                    entries: fields.entries,
                    sources: to_strings(&urls),
                });
            }
            Ok(_) => part
                .notes
                .push("faq: pages reported no FAQ entries".to_string()),
            Err(err) => {
                warn!(error = %err, "faq extraction failed");
                part.notes.push(format!("faq: extraction failed ({err})"));
            }
        }
        part
    }
}

async fn extract_typed<T, X>(
    backend: &X,
    urls: &[Url],
    instruction: &str,
) -> Result<T, ExtractorError>
where
    T: schemars::JsonSchema + DeserializeOwned,
    X: FieldExtractor + ?Sized,
{
    let value = backend.extract(urls, instruction, schema_of::<T>()).await?;
    Ok(serde_json::from_value(value)?)
}

fn category_urls(findings: &[Finding], category: Category) -> Option<Vec<Url>> {
    findings
        .iter()
        .find(|f| f.category == category)
        .map(|f| f.urls.iter().cloned().collect())
}

fn to_strings(urls: &[Url]) -> Vec<String> {
    urls.iter().map(|u| u.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFieldExtractor;
    use crate::types::config::RunMode;
    use crate::types::identity::QueryIdentity;
    use indexmap::IndexSet;

    fn record() -> EnrichedRecord {
        EnrichedRecord::seeded(
            QueryIdentity::new("HP W1331X").with_brand("HP").with_model("W1331X"),
            RunMode::Standard,
            None,
        )
    }

    fn finding(category: Category, urls: &[&str]) -> Finding {
        Finding {
            category,
            urls: urls
                .iter()
                .map(|u| Url::parse(u).unwrap())
                .collect::<IndexSet<_>>(),
        }
    }

    fn lenient() -> ExtractPolicy {
        ExtractPolicy {
            strict_sources: false,
            strict_packaging: false,
        }
    }

    #[tokio::test]
    async fn logistics_prefers_catalog_sources() {
        let backend = MockFieldExtractor::new().with_response(
            "packaging",
            serde_json::json!({ "width_mm": 110.0, "weight_g": 940.0 }),
        );
        let extractor = Extractor::default();
        let findings = vec![finding(
            Category::Logistics,
            &["https://blog.example/review", "https://icecat.biz/p/123"],
        )];

        let outcome = extractor
            .extract_pass(&backend, &findings, &record(), &lenient())
            .await;

        assert_eq!(outcome.calls, 1);
        match &outcome.updates[0] {
            PartialUpdate::Packaging {
                sources,
                off_catalog,
                confidence,
                ..
            } => {
                assert_eq!(sources, &vec!["https://icecat.biz/p/123".to_string()]);
                assert!(!off_catalog);
                assert!((confidence - 0.9).abs() < f32::EPSILON);
            }
            other => panic!("expected packaging update, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn logistics_falls_back_off_catalog_with_lowered_confidence() {
        let backend = MockFieldExtractor::new()
            .with_response("packaging", serde_json::json!({ "weight_g": 940.0 }));
        let extractor = Extractor::default();
        let findings = vec![finding(Category::Logistics, &["https://blog.example/review"])];

        let outcome = extractor
            .extract_pass(&backend, &findings, &record(), &lenient())
            .await;

        match &outcome.updates[0] {
            PartialUpdate::Packaging {
                off_catalog,
                confidence,
                ..
            } => {
                assert!(off_catalog);
                assert!((confidence - 0.5).abs() < f32::EPSILON);
            }
            other => panic!("expected packaging update, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn strict_packaging_skips_off_catalog_sources() {
        let backend = MockFieldExtractor::new()
            .with_response("packaging", serde_json::json!({ "weight_g": 940.0 }));
        let extractor = Extractor::default();
        let findings = vec![finding(Category::Logistics, &["https://blog.example/review"])];
        let strict = ExtractPolicy {
            strict_sources: false,
            strict_packaging: true,
        };

        let outcome = extractor
            .extract_pass(&backend, &findings, &record(), &strict)
            .await;

        assert!(outcome.updates.is_empty());
        assert_eq!(outcome.calls, 0);
        assert!(outcome.notes.iter().any(|n| n.contains("strict sourcing")));
    }

    #[tokio::test]
    async fn logistics_skipped_when_packaging_recorded() {
        let backend = MockFieldExtractor::new()
            .with_response("packaging", serde_json::json!({ "weight_g": 940.0 }));
        let extractor = Extractor::default();
        let mut rec = record();
        rec.packaging = Some(crate::types::record::Packaging {
            weight_g: Some(900.0),
            ..Default::default()
        });
        let findings = vec![finding(Category::Logistics, &["https://icecat.biz/p/1"])];

        let outcome = extractor
            .extract_pass(&backend, &findings, &rec, &lenient())
            .await;
        assert!(outcome.updates.is_empty());
        assert_eq!(outcome.calls, 0);
    }

    #[tokio::test]
    async fn strict_sources_filters_compatibility_urls() {
        let backend = MockFieldExtractor::new().with_response(
            "compatible",
            serde_json::json!({ "printers": ["LaserJet M234dw"] }),
        );
        let extractor = Extractor::default();
        let findings = vec![finding(
            Category::Compatibility,
            &[
                "https://some-forum.example/thread",
                "https://www.tonerpartner.com/hp-w1331x",
            ],
        )];
        let strict = ExtractPolicy {
            strict_sources: true,
            strict_packaging: false,
        };

        let outcome = extractor
            .extract_pass(&backend, &findings, &record(), &strict)
            .await;

        match &outcome.updates[0] {
            PartialUpdate::Compatibility { sources, printers } => {
                assert_eq!(
                    sources,
                    &vec!["https://www.tonerpartner.com/hp-w1331x".to_string()]
                );
                assert_eq!(printers, &vec!["LaserJet M234dw".to_string()]);
            }
            other => panic!("expected compatibility update, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn strict_sources_with_no_acceptable_urls_notes_exclusion() {
        let backend = MockFieldExtractor::new();
        let extractor = Extractor::default();
        let findings = vec![finding(
            Category::Compatibility,
            &["https://some-forum.example/thread"],
        )];
        let strict = ExtractPolicy {
            strict_sources: true,
            strict_packaging: false,
        };

        let outcome = extractor
            .extract_pass(&backend, &findings, &record(), &strict)
            .await;

        assert!(outcome.updates.is_empty());
        assert_eq!(outcome.compat_exclusions.len(), 1);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn extraction_failure_degrades_to_no_update() {
        let backend = MockFieldExtractor::new()
            .with_failure("compatible", "backend down")
            .with_response("packaging", serde_json::json!({ "weight_g": 1.0 }));
        let extractor = Extractor::default();
        let findings = vec![finding(
            Category::Compatibility,
            &["https://www.tonerpartner.com/a"],
        )];

        let outcome = extractor
            .extract_pass(&backend, &findings, &record(), &lenient())
            .await;

        assert!(outcome.updates.is_empty());
        assert!(outcome
            .compat_exclusions
            .iter()
            .any(|n| n.contains("extraction failed")));
    }

    #[tokio::test]
    async fn aux_categories_extract_concurrently_and_respect_write_once() {
        let backend = MockFieldExtractor::new()
            .with_response(
                "related",
                serde_json::json!({ "items": [{ "name": "W1331A" }] }),
            )
            .with_response(
                "image",
                serde_json::json!({ "images": [{ "url": "https://img.example/1.jpg" }] }),
            )
            .with_response(
                "questions",
                serde_json::json!({ "entries": [{ "question": "Yield?", "answer": "15k" }] }),
            );
        let extractor = Extractor::default();
        let findings = vec![
            finding(Category::Related, &["https://a.example/r"]),
            finding(Category::Images, &["https://a.example/i"]),
            finding(Category::Faq, &["https://a.example/f"]),
        ];

        let outcome = extractor
            .extract_pass(&backend, &findings, &record(), &lenient())
            .await;
        assert_eq!(outcome.calls, 3);
        assert_eq!(outcome.updates.len(), 3);

        // FAQ and related are write-once: a record that already has them
        // triggers no further calls.
        let mut rec = record();
        rec.faq.push(crate::types::record::FaqEntry {
            question: "q".into(),
            answer: "a".into(),
            source: None,
        });
        rec.related.push(crate::types::record::RelatedItem {
            name: "x".into(),
            url: None,
        });
        let outcome = extractor
            .extract_pass(&backend, &findings, &rec, &lenient())
            .await;
        assert_eq!(outcome.calls, 1); // images only
    }
}
