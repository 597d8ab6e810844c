use serde::{Deserialize, Serialize};

/// A long-term investment holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioHolding {
    pub symbol: String,
    pub shares: f64,
    pub purchase_price: f64,

    /// Latest known price; `None` until the backend has priced the holding
    #[serde(default)]
    pub current_price: Option<f64>,
}

/// An open position in the trading account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingPosition {
    pub symbol: String,
    pub quantity: f64,
    pub market_value: f64,
    pub unrealized_pl: f64,
}

/// Cash and equity of the (single) trading account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradingAccount {
    pub cash: f64,
    pub equity: f64,
}

/// Folded totals over holdings and positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Σ (current_price or 0) × shares over all holdings
    pub total_investment: f64,

    /// Σ unrealized P&L over all positions
    pub total_unrealized_pl: f64,
}
