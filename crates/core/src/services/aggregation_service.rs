use chrono::{Datelike, NaiveDateTime};
use std::collections::HashMap;

use crate::errors::CoreError;
use crate::models::budget::{BudgetReport, CategorySummary};
use crate::models::overview::{CategoryTotal, MonthlyBalance, OverviewReport, RecentTransaction};
use crate::models::record::{BudgetLimit, FinancialRecord};
use crate::services::category_service::CategoryService;

/// Number of rows in the recent-transactions list.
pub const RECENT_TRANSACTIONS: usize = 5;

/// Folds flat financial records into the budget and overview reports.
///
/// Pure business logic over already-fetched rows — no I/O. Each call is
/// one aggregation pass; nothing is carried over between passes.
pub struct AggregationService {
    categories: CategoryService,
}

impl AggregationService {
    pub fn new() -> Self {
        Self {
            categories: CategoryService::new(),
        }
    }

    /// Per-category spending against budget limits.
    ///
    /// - Categories appear in order of their first record.
    /// - `spent` only counts expenses (absolute values); income adds nothing.
    /// - Each category takes the limit with the exact same label; if the
    ///   backend sent duplicates, the last one wins. No limit means 0.
    /// - `percent_spent` is 0 when the total budget is 0.
    pub fn aggregate_budget(
        &self,
        records: &[FinancialRecord],
        limits: &[BudgetLimit],
    ) -> BudgetReport {
        let limit_by_category: HashMap<&str, f64> = limits
            .iter()
            .map(|l| (l.category.as_str(), l.limit))
            .collect();

        let mut order: Vec<&str> = Vec::new();
        let mut spent_by_category: HashMap<&str, f64> = HashMap::new();
        for record in records {
            let spent = spent_by_category
                .entry(record.category.as_str())
                .or_insert_with(|| {
                    order.push(record.category.as_str());
                    0.0
                });
            if record.is_expense() {
                *spent += record.amount.abs();
            }
        }

        let summaries: Vec<CategorySummary> = order
            .into_iter()
            .map(|category| {
                let (icon, color) = self.categories.classify(category);
                CategorySummary {
                    category: category.to_string(),
                    spent: spent_by_category.get(category).copied().unwrap_or(0.0),
                    budget: limit_by_category.get(category).copied().unwrap_or(0.0),
                    icon: icon.to_string(),
                    color: color.to_string(),
                }
            })
            .collect();

        let total_budget: f64 = summaries.iter().map(|s| s.budget).sum();
        let total_spent: f64 = summaries.iter().map(|s| s.spent).sum();

        BudgetReport {
            summaries,
            total_budget,
            total_spent,
            percent_spent: percent_of(total_spent, total_budget),
        }
    }

    /// Monthly balances, category distribution and recent transactions.
    ///
    /// Fails with `CoreError::InvalidDate` if any record has a date that
    /// cannot be parsed; the pass produces nothing in that case.
    pub fn aggregate_overview(
        &self,
        records: &[FinancialRecord],
    ) -> Result<OverviewReport, CoreError> {
        let timestamps: Vec<NaiveDateTime> = records
            .iter()
            .map(FinancialRecord::timestamp)
            .collect::<Result<_, _>>()?;

        let balance_history = Self::monthly_balances(records, &timestamps);
        let expenses_by_category = self.category_totals(records);
        let recent_transactions = Self::recent_transactions(records, &timestamps);

        let total_income: f64 = balance_history.iter().map(|m| m.income).sum();
        let total_expenses: f64 = balance_history.iter().map(|m| m.expenses).sum();

        Ok(OverviewReport {
            balance_history,
            expenses_by_category,
            recent_transactions,
            total_balance: total_income - total_expenses,
        })
    }

    /// Group by short month name; order groups by their earliest record
    /// so the series follows the calendar, not arrival order.
    fn monthly_balances(
        records: &[FinancialRecord],
        timestamps: &[NaiveDateTime],
    ) -> Vec<MonthlyBalance> {
        struct MonthAccumulator {
            label: String,
            earliest: NaiveDateTime,
            income: f64,
            expenses: f64,
        }

        let mut months: HashMap<u32, MonthAccumulator> = HashMap::new();
        for (record, ts) in records.iter().zip(timestamps) {
            let acc = months.entry(ts.month()).or_insert_with(|| MonthAccumulator {
                label: ts.format("%b").to_string(),
                earliest: *ts,
                income: 0.0,
                expenses: 0.0,
            });
            acc.earliest = acc.earliest.min(*ts);
            if record.is_income() {
                acc.income += record.amount;
            } else {
                acc.expenses += record.amount.abs();
            }
        }

        let mut ordered: Vec<MonthAccumulator> = months.into_values().collect();
        ordered.sort_by_key(|m| m.earliest);
        ordered
            .into_iter()
            .map(|m| MonthlyBalance {
                month: m.label,
                income: m.income,
                expenses: m.expenses,
                balance: m.income - m.expenses,
            })
            .collect()
    }

    /// Absolute amounts per category regardless of sign.
    fn category_totals(&self, records: &[FinancialRecord]) -> Vec<CategoryTotal> {
        let mut totals: Vec<CategoryTotal> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for record in records {
            let idx = *index.entry(record.category.as_str()).or_insert_with(|| {
                let (icon, color) = self.categories.classify(&record.category);
                totals.push(CategoryTotal {
                    category: record.category.clone(),
                    value: 0.0,
                    icon: icon.to_string(),
                    color: color.to_string(),
                });
                totals.len() - 1
            });
            totals[idx].value += record.amount.abs();
        }
        totals
    }

    /// Newest records first, at most [`RECENT_TRANSACTIONS`].
    fn recent_transactions(
        records: &[FinancialRecord],
        timestamps: &[NaiveDateTime],
    ) -> Vec<RecentTransaction> {
        let mut indices: Vec<usize> = (0..records.len()).collect();
        indices.sort_by(|&a, &b| timestamps[b].cmp(&timestamps[a]));
        indices
            .into_iter()
            .take(RECENT_TRANSACTIONS)
            .map(|i| {
                let record = &records[i];
                RecentTransaction {
                    date: record.date.clone(),
                    description: record
                        .description
                        .clone()
                        .filter(|d| !d.is_empty())
                        .unwrap_or_else(|| record.category.clone()),
                    category: record.category.clone(),
                    amount: record.amount,
                }
            })
            .collect()
    }
}

impl Default for AggregationService {
    fn default() -> Self {
        Self::new()
    }
}

/// round(part / whole × 100), defined as 0 when `whole` is 0.
pub fn percent_of(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    (part / whole * 100.0).round()
}
