use serde::{Deserialize, Serialize};

use super::portfolio::{PortfolioSummary, TradingAccount};

/// Income and expenses for one month label ("Jan", "Feb", ...).
///
/// Records from the same month of different years share a label and are
/// merged into a single entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBalance {
    pub month: String,
    pub income: f64,
    /// Absolute value of all expenses in the month
    pub expenses: f64,
    /// Always `income - expenses`
    pub balance: f64,
}

/// Total absolute amount booked against one category (distribution view).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub value: f64,
    pub icon: String,
    pub color: String,
}

/// A row of the "recent transactions" list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentTransaction {
    pub date: String,
    /// Record description, or the category label when there is none
    pub description: String,
    pub category: String,
    pub amount: f64,
}

/// Result of one overview aggregation pass over financial records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverviewReport {
    /// Chronologically ordered monthly balances
    pub balance_history: Vec<MonthlyBalance>,

    /// Absolute totals per category, in order of first appearance
    pub expenses_by_category: Vec<CategoryTotal>,

    /// Most recent records, newest first (at most five)
    pub recent_transactions: Vec<RecentTransaction>,

    /// Total income minus total expenses across all months
    pub total_balance: f64,
}

/// Everything the account overview page shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardOverview {
    pub report: OverviewReport,
    pub portfolio: PortfolioSummary,
    pub trading_account: TradingAccount,
}
