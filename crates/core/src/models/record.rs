use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// A single income or expense row as returned by the backend.
///
/// Positive `amount` is income, negative is an expense. The date is kept
/// as the raw backend string and only parsed during an aggregation pass,
/// so that one malformed row fails the pass instead of vanishing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    /// Calendar date (`YYYY-MM-DD`) or full RFC 3339 timestamp
    pub date: String,

    /// Free-text category label (e.g., "Groceries", "Salary")
    pub category: String,

    /// Signed amount: positive = income, negative = expense
    pub amount: f64,

    /// Optional free-text description
    #[serde(default)]
    pub description: Option<String>,
}

impl FinancialRecord {
    pub fn new(date: impl Into<String>, category: impl Into<String>, amount: f64) -> Self {
        Self {
            date: date.into(),
            category: category.into(),
            amount,
            description: None,
        }
    }

    /// Create a record with a description attached.
    pub fn with_description(
        date: impl Into<String>,
        category: impl Into<String>,
        amount: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            category: category.into(),
            amount,
            description: Some(description.into()),
        }
    }

    pub fn is_income(&self) -> bool {
        self.amount > 0.0
    }

    pub fn is_expense(&self) -> bool {
        self.amount < 0.0
    }

    /// Parse the record date into a point in time.
    ///
    /// Accepts plain dates (midnight is assumed), RFC 3339 timestamps
    /// (normalised to UTC) and naive `YYYY-MM-DD[T| ]HH:MM:SS[.f]` stamps.
    pub fn timestamp(&self) -> Result<NaiveDateTime, CoreError> {
        parse_record_date(&self.date)
    }
}

/// Parse a backend date string. See [`FinancialRecord::timestamp`].
pub fn parse_record_date(raw: &str) -> Result<NaiveDateTime, CoreError> {
    let trimmed = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt);
        }
    }

    Err(CoreError::InvalidDate(raw.to_string()))
}

/// Spending limit configured for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLimit {
    pub category: String,

    /// Non-negative limit for the category
    #[serde(rename = "limit_amount")]
    pub limit: f64,
}

impl BudgetLimit {
    pub fn new(category: impl Into<String>, limit: f64) -> Self {
        Self {
            category: category.into(),
            limit,
        }
    }
}
