use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::mpsc;

use crate::errors::CoreError;
use crate::models::event::PushEvent;
use crate::models::market::{HistoricalBar, MarketSnapshot, PredictedPrice, RealtimePrice};
use crate::models::portfolio::{PortfolioHolding, TradingAccount, TradingPosition};
use crate::models::record::{BudgetLimit, FinancialRecord};

use super::traits::{DataStore, PushFeed, RemoteProcedures};

/// Query names accepted by [`InMemoryBackend::fail_query`].
pub mod queries {
    pub const FINANCIAL_RECORDS: &str = "expenses";
    pub const BUDGET_LIMITS: &str = "budget_alerts";
    pub const HOLDINGS: &str = "portfolio_holdings";
    pub const POSITIONS: &str = "trading_positions";
    pub const TRADING_ACCOUNT: &str = "trading_portfolios";
    pub const HISTORICAL_BARS: &str = "historical_stock_data";
    pub const REALTIME_PRICES: &str = "realtime_stock_prices";
    pub const PREDICTIONS: &str = "predicted_stock_prices";
    pub const FETCH_PRICES: &str = "fetch-stock-prices";
    pub const GENERATE_PREDICTIONS: &str = "generate-stock-predictions";
    pub const SUBSCRIBE: &str = "subscribe";
}

#[derive(Default)]
struct Tables {
    records: Vec<FinancialRecord>,
    limits: Vec<BudgetLimit>,
    holdings: Vec<PortfolioHolding>,
    positions: Vec<TradingPosition>,
    account: Option<TradingAccount>,
    bars: Vec<HistoricalBar>,
    prices: Vec<RealtimePrice>,
    predictions: Vec<PredictedPrice>,
}

/// Process-local backend: tables in memory plus a push channel fed by
/// every write, the way database change triggers would feed it.
///
/// Used by the tests and for running the dashboard offline. Individual
/// queries can be made to fail with [`InMemoryBackend::fail_query`].
#[derive(Default)]
pub struct InMemoryBackend {
    tables: Mutex<Tables>,
    subscribers: Mutex<Vec<mpsc::Sender<PushEvent>>>,
    failing: Mutex<HashSet<String>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Seeding ─────────────────────────────────────────────────────

    pub fn set_financial_records(&self, records: Vec<FinancialRecord>) {
        self.tables().records = records;
    }

    pub fn set_budget_limits(&self, limits: Vec<BudgetLimit>) {
        self.tables().limits = limits;
    }

    pub fn set_holdings(&self, holdings: Vec<PortfolioHolding>) {
        self.tables().holdings = holdings;
    }

    pub fn set_positions(&self, positions: Vec<TradingPosition>) {
        self.tables().positions = positions;
    }

    pub fn set_trading_account(&self, account: Option<TradingAccount>) {
        self.tables().account = account;
    }

    pub fn insert_historical_bars(&self, bars: Vec<HistoricalBar>) {
        self.tables().bars.extend(bars);
    }

    /// Insert a real-time row without notifying subscribers.
    pub fn insert_realtime_price(&self, price: RealtimePrice) {
        self.tables().prices.push(price);
    }

    /// Insert a prediction row without notifying subscribers.
    pub fn insert_prediction(&self, prediction: PredictedPrice) {
        self.tables().predictions.push(prediction);
    }

    // ── Failure injection ───────────────────────────────────────────

    /// Make the named query or procedure (see [`queries`]) fail until cleared.
    pub fn fail_query(&self, query: &str) {
        self.failing().insert(query.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing().clear();
    }

    // ── Push channel ────────────────────────────────────────────────

    /// Deliver an event to every live subscriber. Returns how many
    /// subscribers accepted it; full or closed queues are skipped.
    pub fn publish(&self, event: PushEvent) -> usize {
        let mut subscribers = self.subscribers();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers
            .iter()
            .filter(|tx| tx.try_send(event.clone()).is_ok())
            .count()
    }

    /// Drop every open subscription, as a lost connection would.
    pub fn disconnect_subscribers(&self) {
        self.subscribers().clear();
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    // ── Internals ───────────────────────────────────────────────────

    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn subscribers(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::Sender<PushEvent>>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn failing(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.failing.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self, query: &str) -> Result<(), CoreError> {
        if self.failing().contains(query) {
            return Err(CoreError::fetch(query, "injected failure"));
        }
        Ok(())
    }

    fn check_procedure(&self, procedure: &str) -> Result<(), CoreError> {
        if self.failing().contains(procedure) {
            return Err(CoreError::remote(procedure, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl DataStore for InMemoryBackend {
    fn name(&self) -> &str {
        "InMemory"
    }

    async fn fetch_financial_records(&self) -> Result<Vec<FinancialRecord>, CoreError> {
        self.check(queries::FINANCIAL_RECORDS)?;
        Ok(self.tables().records.clone())
    }

    async fn fetch_budget_limits(&self) -> Result<Vec<BudgetLimit>, CoreError> {
        self.check(queries::BUDGET_LIMITS)?;
        Ok(self.tables().limits.clone())
    }

    async fn fetch_holdings(&self) -> Result<Vec<PortfolioHolding>, CoreError> {
        self.check(queries::HOLDINGS)?;
        Ok(self.tables().holdings.clone())
    }

    async fn fetch_positions(&self) -> Result<Vec<TradingPosition>, CoreError> {
        self.check(queries::POSITIONS)?;
        Ok(self.tables().positions.clone())
    }

    async fn fetch_trading_account(&self) -> Result<TradingAccount, CoreError> {
        self.check(queries::TRADING_ACCOUNT)?;
        self.tables()
            .account
            .clone()
            .ok_or_else(|| CoreError::NotFound(queries::TRADING_ACCOUNT.into()))
    }

    async fn fetch_historical_bars(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<HistoricalBar>, CoreError> {
        self.check(queries::HISTORICAL_BARS)?;
        let mut bars: Vec<HistoricalBar> = self
            .tables()
            .bars
            .iter()
            .filter(|b| b.symbol == symbol)
            .cloned()
            .collect();
        // Most recent `limit` bars, returned oldest first
        bars.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        bars.truncate(limit);
        bars.reverse();
        Ok(bars)
    }

    async fn fetch_realtime_prices(
        &self,
        symbols: &[String],
    ) -> Result<Vec<RealtimePrice>, CoreError> {
        self.check(queries::REALTIME_PRICES)?;
        let mut rows: Vec<RealtimePrice> = self
            .tables()
            .prices
            .iter()
            .filter(|p| symbols.contains(&p.symbol))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(rows)
    }

    async fn fetch_predictions(
        &self,
        symbols: &[String],
    ) -> Result<Vec<PredictedPrice>, CoreError> {
        self.check(queries::PREDICTIONS)?;
        let mut rows: Vec<PredictedPrice> = self
            .tables()
            .predictions
            .iter()
            .filter(|p| symbols.contains(&p.symbol))
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.timestamp);
        Ok(rows)
    }

    async fn upsert_realtime_price(&self, price: &RealtimePrice) -> Result<(), CoreError> {
        self.check(queries::REALTIME_PRICES)?;
        {
            let mut tables = self.tables();
            let existing = tables
                .prices
                .iter_mut()
                .find(|p| p.symbol == price.symbol && p.timestamp == price.timestamp);
            match existing {
                Some(row) => *row = price.clone(),
                None => tables.prices.push(price.clone()),
            }
        }
        self.publish(PushEvent::Price(price.clone()));
        Ok(())
    }
}

#[async_trait]
impl RemoteProcedures for InMemoryBackend {
    async fn fetch_market_prices(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, f64>, CoreError> {
        self.check_procedure(queries::FETCH_PRICES)?;
        let latest = MarketSnapshot::latest_by_symbol(
            self.tables()
                .prices
                .iter()
                .filter(|p| symbols.contains(&p.symbol))
                .cloned()
                .collect(),
        );
        Ok(latest.into_iter().map(|(s, p)| (s, p.price)).collect())
    }

    /// Naive model: tomorrow's price equals the latest known price.
    async fn generate_predictions(&self, symbols: &[String]) -> Result<(), CoreError> {
        self.check_procedure(queries::GENERATE_PREDICTIONS)?;
        let prices = self.fetch_market_prices(symbols).await?;
        let tomorrow = Utc::now() + Duration::days(1);

        let mut generated = Vec::new();
        for symbol in symbols {
            if let Some(price) = prices.get(symbol) {
                generated.push(PredictedPrice::new(symbol.clone(), *price, tomorrow));
            }
        }
        self.tables().predictions.extend(generated.iter().cloned());
        for prediction in generated {
            self.publish(PushEvent::Prediction(prediction));
        }
        Ok(())
    }
}

#[async_trait]
impl PushFeed for InMemoryBackend {
    async fn subscribe(&self, capacity: usize) -> Result<mpsc::Receiver<PushEvent>, CoreError> {
        if self.failing().contains(queries::SUBSCRIBE) {
            return Err(CoreError::Subscription("injected failure".into()));
        }
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.subscribers().push(tx);
        Ok(rx)
    }
}
