//! Quality gating: loop termination and publication readiness.
//!
//! Two separate judgements live here:
//!
//! - [`QualityGate::is_validation_satisfied`] is the loop-termination
//!   check: the minimal "all required categories resolved" predicate.
//! - [`QualityGate::readiness`] is the publication-readiness scorer: a
//!   fixed weighted sum over bounded sub-scores plus a blocking-issue
//!   list. The manual-effort estimate is operator triage information and
//!   gates nothing.

use url::Url;

use crate::types::config::DomainPolicy;
use crate::types::record::{AutomationStatus, EnrichedRecord, ImageCandidate};
use crate::types::report::{BlockingIssue, ReadinessReport};
use crate::types::tier::SourceTier;

use super::consensus::TierClassifier;

const WEIGHT_COMPLETENESS: f32 = 0.4;
const WEIGHT_DATA_QUALITY: f32 = 0.25;
const WEIGHT_MARKET_COMPLIANCE: f32 = 0.15;
const WEIGHT_IMAGES: f32 = 0.1;
const WEIGHT_SOURCES: f32 = 0.1;

const MINUTES_PER_BLOCKING_ISSUE: u32 = 15;
const MINUTES_PER_RECOMMENDATION: u32 = 5;
const MANUAL_EFFORT_CAP: u32 = 120;

/// Validation predicate and readiness scorer.
#[derive(Debug, Clone)]
pub struct QualityGate {
    classifier: TierClassifier,
    publish_threshold: f32,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(DomainPolicy::default())
    }
}

impl QualityGate {
    /// Create a gate over the given policy.
    pub fn new(policy: DomainPolicy) -> Self {
        Self {
            classifier: TierClassifier::new(policy),
            publish_threshold: 0.7,
        }
    }

    /// Override the publish threshold.
    pub fn with_publish_threshold(mut self, threshold: f32) -> Self {
        self.publish_threshold = threshold;
        self
    }

    /// The loop-termination check: packaging present, at least one
    /// compatible printer, at least one FAQ entry, and related items.
    pub fn is_validation_satisfied(&self, record: &EnrichedRecord) -> bool {
        record.packaging.is_some()
            && !record.compatibility.printers.is_empty()
            && !record.faq.is_empty()
            && !record.related.is_empty()
    }

    /// Score publication readiness.
    pub fn readiness(&self, record: &EnrichedRecord) -> ReadinessReport {
        let completeness = self.completeness(record);
        let data_quality = self.data_quality(record);
        let market_compliance = self.market_compliance(record);
        let image_score = self.image_score(record);
        let source_reliability = self.source_reliability(record);

        let overall_score = WEIGHT_COMPLETENESS * completeness
            + WEIGHT_DATA_QUALITY * data_quality
            + WEIGHT_MARKET_COMPLIANCE * market_compliance
            + WEIGHT_IMAGES * image_score
            + WEIGHT_SOURCES * source_reliability;

        let blocking_issues = self.blocking_issues(record);
        let recommendations = self.recommendations(record);
        let manual_effort_min = manual_effort(&blocking_issues, &recommendations, record);
        let publish_ready =
            overall_score >= self.publish_threshold && blocking_issues.is_empty();

        ReadinessReport {
            overall_score,
            completeness,
            data_quality,
            market_compliance,
            image_score,
            source_reliability,
            blocking_issues,
            recommendations,
            publish_ready,
            manual_effort_min,
        }
    }

    /// Fraction of required fields present: brand, model, packaging,
    /// printers, FAQ, related.
    fn completeness(&self, record: &EnrichedRecord) -> f32 {
        let present = [
            record.identity.brand.is_some(),
            record.identity.model.is_some(),
            record.packaging.is_some(),
            !record.compatibility.printers.is_empty(),
            !record.faq.is_empty(),
            !record.related.is_empty(),
        ];
        present.iter().filter(|p| **p).count() as f32 / present.len() as f32
    }

    /// Mean confidence over the populated sections.
    fn data_quality(&self, record: &EnrichedRecord) -> f32 {
        let mut parts = Vec::new();
        if let Some(packaging) = &record.packaging {
            parts.push(packaging.confidence);
        }
        if !record.compatibility.printers.is_empty() {
            parts.push(if record.compatibility.trusted { 0.9 } else { 0.4 });
        }
        if !record.related.is_empty() {
            parts.push(0.7);
        }
        if !record.faq.is_empty() {
            parts.push(0.7);
        }
        if parts.is_empty() {
            0.0
        } else {
            parts.iter().sum::<f32>() / parts.len() as f32
        }
    }

    /// Compatibility must be consensus-trusted for the target market.
    fn market_compliance(&self, record: &EnrichedRecord) -> f32 {
        if record.compatibility.printers.is_empty() {
            0.0
        } else if record.compatibility.trusted {
            1.0
        } else {
            0.4
        }
    }

    /// Best image candidate score; 0 with no candidates.
    fn image_score(&self, record: &EnrichedRecord) -> f32 {
        record
            .images
            .iter()
            .map(score_image)
            .fold(0.0_f32, f32::max)
    }

    /// Mean tier reliability over every evidence URL on the record.
    fn source_reliability(&self, record: &EnrichedRecord) -> f32 {
        let brand = record.identity.brand_lower();
        let urls = record.all_evidence_urls();
        if urls.is_empty() {
            return 0.0;
        }
        let total: f32 = urls
            .iter()
            .map(|raw| match Url::parse(raw) {
                Ok(url) if self.classifier.is_catalog(&url) => 0.9,
                Ok(url) => match self.classifier.classify(&url, brand.as_deref()) {
                    SourceTier::Oem => 1.0,
                    SourceTier::Retailer => 0.8,
                    SourceTier::Marketplace => 0.3,
                    SourceTier::Unknown => 0.1,
                },
                Err(_) => 0.0,
            })
            .sum();
        total / urls.len() as f32
    }

    fn blocking_issues(&self, record: &EnrichedRecord) -> Vec<BlockingIssue> {
        let mut issues = Vec::new();
        let missing = |field: &str| BlockingIssue::MissingRequiredField {
            field: field.to_string(),
        };
        if record.packaging.is_none() {
            issues.push(missing("packaging"));
        }
        if record.compatibility.printers.is_empty() {
            issues.push(missing("compatibility"));
        } else if !record.compatibility.trusted {
            issues.push(BlockingIssue::UnverifiedMarketCompatibility);
        }
        if record.faq.is_empty() {
            issues.push(missing("faq"));
        }
        if record.related.is_empty() {
            issues.push(missing("related"));
        }
        if record.automation_status() == AutomationStatus::Failed {
            issues.push(BlockingIssue::CriticalError {
                detail: "run aborted by provider failure".to_string(),
            });
        }
        issues
    }

    fn recommendations(&self, record: &EnrichedRecord) -> Vec<String> {
        let mut recs = Vec::new();
        if record.images.is_empty() {
            recs.push("collect at least one product image".to_string());
        } else if self.image_score(record) < 0.7 {
            recs.push("provide a larger image on a clean background".to_string());
        }
        if record
            .packaging
            .as_ref()
            .is_some_and(|p| p.off_catalog)
        {
            recs.push("confirm packaging data on a catalog source".to_string());
        }
        if record.compatibility.needs_review {
            recs.push("add an OEM source or a second distinct retailer".to_string());
        }
        recs
    }
}

/// Image validation score: resolution tier plus weighted background
/// cleanliness, minus penalties for box shots, watermarks, and logo
/// overlays. Bounded [0, 1].
fn score_image(candidate: &ImageCandidate) -> f32 {
    let long_edge = candidate.width.max(candidate.height);
    let resolution = match long_edge {
        Some(px) if px >= 1200 => 0.7,
        Some(px) if px >= 600 => 0.5,
        Some(_) => 0.3,
        None => 0.2,
    };
    let mut score = resolution + candidate.background_score * 0.3;
    if candidate.packaging_shot {
        score -= 0.2;
    }
    if candidate.watermarked {
        score -= 0.2;
    }
    if candidate.logo_overlay {
        score -= 0.2;
    }
    score.clamp(0.0, 1.0)
}

/// Operator triage estimate in minutes. Informational only.
fn manual_effort(
    blocking: &[BlockingIssue],
    recommendations: &[String],
    record: &EnrichedRecord,
) -> u32 {
    let mut minutes = MINUTES_PER_BLOCKING_ISSUE * blocking.len() as u32
        + MINUTES_PER_RECOMMENDATION * recommendations.len() as u32;
    if record.compatibility.needs_review {
        minutes += 10;
    }
    if record.images.is_empty() {
        minutes += 5;
    }
    minutes.min(MANUAL_EFFORT_CAP)
}
