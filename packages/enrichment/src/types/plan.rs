//! Research plan types.
//!
//! A plan is pure data: the planner builds it, the collector executes it.
//! An empty plan (every slot's query list empty) is the caller's
//! loop-terminating signal.

use serde::{Deserialize, Serialize};

/// The research categories a run tries to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Packaging dimensions and weight.
    Logistics,

    /// Compatible printer models.
    Compatibility,

    /// Related items (other capacities, multipacks, series siblings).
    Related,

    /// Product image candidates.
    Images,

    /// Frequently asked questions.
    Faq,
}

impl Category {
    /// All categories in planning order.
    pub const ALL: [Category; 5] = [
        Category::Logistics,
        Category::Compatibility,
        Category::Related,
        Category::Images,
        Category::Faq,
    ];

    /// Category name as used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Logistics => "logistics",
            Category::Compatibility => "compatibility",
            Category::Related => "related",
            Category::Images => "images",
            Category::Faq => "faq",
        }
    }
}

/// Ordered queries for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSlot {
    /// The category these queries serve.
    pub category: Category,

    /// Ordered search queries.
    pub queries: Vec<String>,

    /// Whether the category is still unresolved on the record.
    pub needed: bool,

    /// Trust escalation: extra OEM/retailer queries were added because the
    /// category previously failed consensus.
    pub escalate: bool,
}

impl PlanSlot {
    /// Create a slot for a needed category.
    pub fn new(category: Category, queries: Vec<String>) -> Self {
        Self {
            category,
            queries,
            needed: true,
            escalate: false,
        }
    }

    /// Mark this slot as trust-escalated.
    pub fn escalated(mut self) -> Self {
        self.escalate = true;
        self
    }
}

/// A category → ordered-query-list plan for one iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchPlan {
    /// Slots in planning order.
    pub slots: Vec<PlanSlot>,
}

impl ResearchPlan {
    /// Create an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a slot.
    pub fn push(&mut self, slot: PlanSlot) {
        self.slots.push(slot);
    }

    /// A plan is empty when every slot's query list is empty. This ends
    /// the research loop.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.queries.is_empty())
    }

    /// Total queries across all slots.
    pub fn total_queries(&self) -> usize {
        self.slots.iter().map(|s| s.queries.len()).sum()
    }

    /// The slot for a category, if planned.
    pub fn slot(&self, category: Category) -> Option<&PlanSlot> {
        self.slots.iter().find(|s| s.category == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_plan_signals_termination() {
        let mut plan = ResearchPlan::new();
        assert!(plan.is_empty());

        plan.push(PlanSlot::new(Category::Logistics, vec![]));
        assert!(plan.is_empty());

        plan.push(PlanSlot::new(
            Category::Compatibility,
            vec!["q".to_string()],
        ));
        assert!(!plan.is_empty());
        assert_eq!(plan.total_queries(), 1);
    }

    #[test]
    fn slot_lookup() {
        let mut plan = ResearchPlan::new();
        plan.push(PlanSlot::new(Category::Faq, vec!["faq q".to_string()]).escalated());

        let slot = plan.slot(Category::Faq).unwrap();
        assert!(slot.escalate);
        assert!(plan.slot(Category::Images).is_none());
    }
}
