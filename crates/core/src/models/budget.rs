use serde::{Deserialize, Serialize};

/// Spending against the budget for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,

    /// Sum of absolute expense amounts in this category
    pub spent: f64,

    /// Matched budget limit, or 0 when the category has none
    pub budget: f64,

    /// Display icon key (see `CategoryService`)
    pub icon: String,

    /// Display color as `#RRGGBB`
    pub color: String,
}

impl CategorySummary {
    /// Share of the budget spent, in percent (rounded).
    /// `None` when the category has no budget.
    pub fn percent_used(&self) -> Option<f64> {
        if self.budget > 0.0 {
            Some((self.spent / self.budget * 100.0).round())
        } else {
            None
        }
    }
}

/// Result of one budget aggregation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetReport {
    /// One entry per category, in order of first appearance
    pub summaries: Vec<CategorySummary>,

    /// Sum of all category budgets
    pub total_budget: f64,

    /// Sum of all category spending
    pub total_spent: f64,

    /// round(total_spent / total_budget × 100); 0 when there is no budget
    pub percent_spent: f64,
}

impl BudgetReport {
    /// Budget left over. Negative when overspent.
    pub fn remaining(&self) -> f64 {
        self.total_budget - self.total_spent
    }

    pub fn is_over_budget(&self) -> bool {
        self.total_spent > self.total_budget
    }

    pub fn summary_for(&self, category: &str) -> Option<&CategorySummary> {
        self.summaries.iter().find(|s| s.category == category)
    }
}
