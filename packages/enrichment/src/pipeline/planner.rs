//! Query planning.
//!
//! A pure, deterministic function from record state to a search plan. The
//! planner holds only configuration (the domain policy feeding its query
//! templates); the same record and missing set always produce the same
//! plan.

use std::collections::BTreeSet;

use crate::types::config::{DomainPolicy, RunMode};
use crate::types::plan::{Category, PlanSlot, ResearchPlan};
use crate::types::record::EnrichedRecord;

/// Template-driven query planner.
#[derive(Debug, Clone)]
pub struct Planner {
    policy: DomainPolicy,
}

impl Default for Planner {
    fn default() -> Self {
        Self::new(DomainPolicy::default())
    }
}

impl Planner {
    /// Create a planner over the given policy.
    pub fn new(policy: DomainPolicy) -> Self {
        Self { policy }
    }

    /// Build the plan for one iteration.
    ///
    /// Each missing category gets its template queries, truncated to the
    /// mode's per-category cap. Compatibility gets extra OEM/retailer
    /// queries when its evidence previously failed consensus.
    pub fn plan(
        &self,
        record: &EnrichedRecord,
        missing: &BTreeSet<Category>,
        mode: RunMode,
    ) -> ResearchPlan {
        let cap = mode.per_category_queries();
        let token = record.identity.search_token().to_string();
        let brand = record.identity.brand.clone().unwrap_or_default();

        let mut plan = ResearchPlan::new();
        for category in Category::ALL {
            if !missing.contains(&category) {
                continue;
            }
            let mut slot = match category {
                Category::Logistics => {
                    PlanSlot::new(category, self.logistics_queries(&token))
                }
                Category::Compatibility => {
                    let escalate = record.compatibility.consensus_failed();
                    let queries = self.compatibility_queries(&token, &brand, escalate);
                    let slot = PlanSlot::new(category, queries);
                    if escalate {
                        slot.escalated()
                    } else {
                        slot
                    }
                }
                Category::Related => PlanSlot::new(
                    category,
                    vec![
                        format!("\"{token}\" {brand} series related cartridges"),
                        format!("{brand} \"{token}\" high yield standard yield variants"),
                        format!("\"{token}\" multipack bundle"),
                    ],
                ),
                Category::Images => PlanSlot::new(
                    category,
                    vec![
                        format!("\"{token}\" product photo white background"),
                        format!("{brand} \"{token}\" packshot"),
                    ],
                ),
                Category::Faq => PlanSlot::new(
                    category,
                    vec![
                        format!("\"{token}\" frequently asked questions"),
                        format!("\"{token}\" page yield installation troubleshooting"),
                    ],
                ),
            };
            // Escalation queries may exceed the cap by one retailer query;
            // the cap still bounds the ordinary template set.
            let limit = if slot.escalate { cap + 2 } else { cap };
            slot.queries.truncate(limit);
            plan.push(slot);
        }
        plan
    }

    fn logistics_queries(&self, token: &str) -> Vec<String> {
        let mut queries: Vec<String> = self
            .policy
            .catalog_domains
            .iter()
            .take(2)
            .map(|domain| format!("site:{domain} \"{token}\" packaging dimensions weight"))
            .collect();
        queries.push(format!("\"{token}\" package weight grams dimensions mm"));
        queries
    }

    fn compatibility_queries(&self, token: &str, brand: &str, escalate: bool) -> Vec<String> {
        let brand_lower = brand.to_lowercase();
        let oem_domains = self.policy.oem_domains_for(&brand_lower);

        let mut queries = Vec::new();
        if let Some(domain) = oem_domains.first() {
            queries.push(format!("site:{domain} \"{token}\" compatible printers"));
        }
        for retailer in self.policy.retailer_domains.iter().take(2) {
            queries.push(format!("site:{retailer} \"{token}\" compatible"));
        }
        queries.push(format!("\"{token}\" compatible printer models list"));

        if escalate {
            // Trust escalation: push further OEM and retailer queries so
            // the next pass can reach consensus.
            for domain in oem_domains.iter().skip(1) {
                queries.push(format!("site:{domain} \"{token}\" supported models"));
            }
            for retailer in self.policy.retailer_domains.iter().skip(2).take(2) {
                queries.push(format!("site:{retailer} \"{token}\" compatible printers"));
            }
        }
        queries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::config::RunMode;
    use crate::types::identity::QueryIdentity;

    fn record() -> EnrichedRecord {
        EnrichedRecord::seeded(
            QueryIdentity::new("HP W1331X toner")
                .with_brand("HP")
                .with_model("W1331X"),
            RunMode::Fast,
            None,
        )
    }

    fn all_missing() -> BTreeSet<Category> {
        Category::ALL.into_iter().collect()
    }

    #[test]
    fn first_plan_contains_logistics_and_compatibility_queries_with_token() {
        let planner = Planner::default();
        let record = record();
        let plan = planner.plan(&record, &all_missing(), RunMode::Fast);

        let logistics = plan.slot(Category::Logistics).unwrap();
        assert!(!logistics.queries.is_empty());
        assert!(logistics.queries.iter().any(|q| q.contains("W1331X")));

        let compat = plan.slot(Category::Compatibility).unwrap();
        assert!(!compat.queries.is_empty());
        assert!(compat.queries.iter().all(|q| q.contains("W1331X")));
        assert!(!compat.escalate);
    }

    #[test]
    fn plan_is_deterministic() {
        let planner = Planner::default();
        let record = record();
        let missing = all_missing();

        let a = planner.plan(&record, &missing, RunMode::Standard);
        let b = planner.plan(&record, &missing, RunMode::Standard);
        assert_eq!(a, b);
    }

    #[test]
    fn queries_truncate_to_mode_cap() {
        let planner = Planner::default();
        let record = record();
        let plan = planner.plan(&record, &all_missing(), RunMode::Fast);

        for slot in &plan.slots {
            assert!(
                slot.queries.len() <= RunMode::Fast.per_category_queries(),
                "{:?} slot exceeded cap",
                slot.category
            );
        }
    }

    #[test]
    fn resolved_categories_are_not_planned() {
        let planner = Planner::default();
        let record = record();
        let mut missing = all_missing();
        missing.remove(&Category::Faq);

        let plan = planner.plan(&record, &missing, RunMode::Standard);
        assert!(plan.slot(Category::Faq).is_none());
        assert!(plan.slot(Category::Logistics).is_some());
    }

    #[test]
    fn failed_consensus_escalates_compatibility() {
        let planner = Planner::default();
        let mut record = record();
        record
            .compatibility
            .printers
            .insert("LaserJet M234dw".to_string());
        record
            .compatibility
            .evidence
            .insert("https://www.tonerpartner.com/a".to_string());
        // evidence present, trusted = false → consensus failed

        let plan = planner.plan(&record, &all_missing(), RunMode::Fast);
        let slot = plan.slot(Category::Compatibility).unwrap();
        assert!(slot.escalate);

        let baseline = planner.plan(&EnrichedRecord::seeded(
            record.identity.clone(),
            RunMode::Fast,
            None,
        ), &all_missing(), RunMode::Fast);
        let baseline_slot = baseline.slot(Category::Compatibility).unwrap();
        assert!(slot.queries.len() >= baseline_slot.queries.len());
    }

    #[test]
    fn empty_plan_when_nothing_missing() {
        let planner = Planner::default();
        let record = record();
        let plan = planner.plan(&record, &BTreeSet::new(), RunMode::Standard);
        assert!(plan.is_empty());
    }
}
