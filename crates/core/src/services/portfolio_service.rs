use crate::models::portfolio::{PortfolioHolding, PortfolioSummary, TradingPosition};

/// Folds investment holdings and trading positions into headline totals.
///
/// Pure business logic — no I/O, no failure mode.
pub struct PortfolioService;

impl PortfolioService {
    pub fn new() -> Self {
        Self
    }

    /// Total invested value and total unrealized P&L.
    pub fn summarize(
        &self,
        holdings: &[PortfolioHolding],
        positions: &[TradingPosition],
    ) -> PortfolioSummary {
        PortfolioSummary {
            total_investment: self.total_investment(holdings),
            total_unrealized_pl: self.total_unrealized_pl(positions),
        }
    }

    /// Σ current_price × shares. Unpriced holdings contribute nothing.
    pub fn total_investment(&self, holdings: &[PortfolioHolding]) -> f64 {
        holdings
            .iter()
            .map(|h| h.current_price.unwrap_or(0.0) * h.shares)
            .sum()
    }

    pub fn total_unrealized_pl(&self, positions: &[TradingPosition]) -> f64 {
        positions.iter().map(|p| p.unrealized_pl).sum()
    }
}

impl Default for PortfolioService {
    fn default() -> Self {
        Self::new()
    }
}
