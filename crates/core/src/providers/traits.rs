use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::mpsc;

use crate::errors::CoreError;
use crate::models::event::PushEvent;
use crate::models::market::{HistoricalBar, PredictedPrice, RealtimePrice};
use crate::models::portfolio::{PortfolioHolding, TradingAccount, TradingPosition};
use crate::models::record::{BudgetLimit, FinancialRecord};

/// Read/write access to the remote data store.
///
/// Row sets are returned unordered unless a method says otherwise. Any
/// failure is reported as `CoreError` and aborts the caller's load pass.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Human-readable name of this backend (for logs/errors).
    fn name(&self) -> &str;

    /// All income/expense rows.
    async fn fetch_financial_records(&self) -> Result<Vec<FinancialRecord>, CoreError>;

    /// All configured budget limits.
    async fn fetch_budget_limits(&self) -> Result<Vec<BudgetLimit>, CoreError>;

    /// All investment holdings.
    async fn fetch_holdings(&self) -> Result<Vec<PortfolioHolding>, CoreError>;

    /// All open trading positions.
    async fn fetch_positions(&self) -> Result<Vec<TradingPosition>, CoreError>;

    /// The single trading account row. `CoreError::NotFound` if absent.
    async fn fetch_trading_account(&self) -> Result<TradingAccount, CoreError>;

    /// Historical bars for one symbol, ascending by timestamp, at most `limit`.
    async fn fetch_historical_bars(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<HistoricalBar>, CoreError>;

    /// Real-time price rows for the given symbols, newest first.
    async fn fetch_realtime_prices(
        &self,
        symbols: &[String],
    ) -> Result<Vec<RealtimePrice>, CoreError>;

    /// Predicted prices for the given symbols, ascending by timestamp.
    async fn fetch_predictions(
        &self,
        symbols: &[String],
    ) -> Result<Vec<PredictedPrice>, CoreError>;

    /// Insert or replace a real-time price row.
    async fn upsert_realtime_price(&self, price: &RealtimePrice) -> Result<(), CoreError>;
}

/// Server-side procedures invocable by the dashboard.
#[async_trait]
pub trait RemoteProcedures: Send + Sync {
    /// Ask the backend to pull current market prices for `symbols`.
    /// Returns the price per symbol the backend obtained.
    async fn fetch_market_prices(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, f64>, CoreError>;

    /// Ask the backend to compute fresh predictions for `symbols`.
    async fn generate_predictions(&self, symbols: &[String]) -> Result<(), CoreError>;
}

/// Standing subscription to real-time price and prediction changes.
#[async_trait]
pub trait PushFeed: Send + Sync {
    /// Open a subscription. Events arrive on the returned bounded queue
    /// until the connection drops, at which point the queue closes.
    async fn subscribe(&self, capacity: usize) -> Result<mpsc::Receiver<PushEvent>, CoreError>;
}
