pub mod errors;
pub mod models;
pub mod providers;
pub mod services;

use std::sync::Arc;
use tracing::{debug, info, warn};

use errors::CoreError;
use models::{
    budget::BudgetReport,
    overview::DashboardOverview,
    settings::Settings,
    status::LoadState,
};
use providers::{
    memory::InMemoryBackend,
    rest::RestBackend,
    traits::{DataStore, PushFeed, RemoteProcedures},
};
use services::{
    aggregation_service::AggregationService, market_store::LiveMarketStore,
    portfolio_service::PortfolioService,
};

/// Main entry point for the finance dashboard core library.
///
/// Wires a backend to the aggregation services and the live market store,
/// and keeps the loading/error status of each dashboard section. A failed
/// refresh leaves the section's previous data in place.
#[must_use]
pub struct FinanceDashboard {
    source: Arc<dyn DataStore>,
    aggregation_service: AggregationService,
    portfolio_service: PortfolioService,
    budget: LoadState<BudgetReport>,
    overview: LoadState<DashboardOverview>,
    market: LiveMarketStore,
}

impl std::fmt::Debug for FinanceDashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinanceDashboard")
            .field("backend", &self.source.name())
            .field("budget_ready", &self.budget.is_ready())
            .field("overview_ready", &self.overview.is_ready())
            .field("market", &self.market)
            .finish()
    }
}

impl FinanceDashboard {
    /// Connect to the HTTP backend described by `settings`.
    /// Must be called inside a tokio runtime (the push worker is spawned).
    pub fn connect(settings: Settings) -> Result<Self, CoreError> {
        let backend = Arc::new(RestBackend::new(&settings)?);
        info!(backend_url = %backend.base_url(), "connecting finance dashboard");
        Self::with_backend(backend.clone(), backend.clone(), backend, settings)
    }

    /// Run against an in-process backend (tests, offline demos).
    pub fn offline(backend: Arc<InMemoryBackend>, settings: Settings) -> Result<Self, CoreError> {
        Self::with_backend(backend.clone(), backend.clone(), backend, settings)
    }

    /// Build from explicit backend roles.
    pub fn with_backend(
        source: Arc<dyn DataStore>,
        procedures: Arc<dyn RemoteProcedures>,
        feed: Arc<dyn PushFeed>,
        settings: Settings,
    ) -> Result<Self, CoreError> {
        let market = LiveMarketStore::create(source.clone(), procedures, feed, settings)?;
        Ok(Self {
            source,
            aggregation_service: AggregationService::new(),
            portfolio_service: PortfolioService::new(),
            budget: LoadState::new(),
            overview: LoadState::new(),
            market,
        })
    }

    // ── Budget ──────────────────────────────────────────────────────

    /// Fetch records and limits, then recompute the budget report.
    pub async fn refresh_budget(&mut self) -> Result<BudgetReport, CoreError> {
        self.budget.begin();
        debug!("refreshing budget data");

        match self.load_budget().await {
            Ok(report) => {
                info!(
                    categories = report.summaries.len(),
                    total_spent = report.total_spent,
                    "budget data refreshed"
                );
                self.budget.succeed(report.clone());
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, "budget refresh failed");
                self.budget.fail(&e);
                Err(e)
            }
        }
    }

    async fn load_budget(&self) -> Result<BudgetReport, CoreError> {
        let records = self.source.fetch_financial_records().await?;
        let limits = self.source.fetch_budget_limits().await?;
        Ok(self.aggregation_service.aggregate_budget(&records, &limits))
    }

    #[must_use]
    pub fn budget(&self) -> &LoadState<BudgetReport> {
        &self.budget
    }

    // ── Overview ────────────────────────────────────────────────────

    /// Fetch records, holdings, positions and the trading account, then
    /// recompute the overview. Any failing query or unparseable record
    /// date fails the whole pass.
    pub async fn refresh_overview(&mut self) -> Result<DashboardOverview, CoreError> {
        self.overview.begin();
        debug!("refreshing overview data");

        match self.load_overview().await {
            Ok(overview) => {
                info!(
                    months = overview.report.balance_history.len(),
                    total_balance = overview.report.total_balance,
                    "overview data refreshed"
                );
                self.overview.succeed(overview.clone());
                Ok(overview)
            }
            Err(e) => {
                warn!(error = %e, "overview refresh failed");
                self.overview.fail(&e);
                Err(e)
            }
        }
    }

    async fn load_overview(&self) -> Result<DashboardOverview, CoreError> {
        let records = self.source.fetch_financial_records().await?;
        let report = self.aggregation_service.aggregate_overview(&records)?;

        let holdings = self.source.fetch_holdings().await?;
        let positions = self.source.fetch_positions().await?;
        let trading_account = self.source.fetch_trading_account().await?;

        Ok(DashboardOverview {
            report,
            portfolio: self.portfolio_service.summarize(&holdings, &positions),
            trading_account,
        })
    }

    #[must_use]
    pub fn overview(&self) -> &LoadState<DashboardOverview> {
        &self.overview
    }

    // ── Watchlist & live market ─────────────────────────────────────

    /// Replace the watchlist and load its snapshot.
    pub async fn set_watchlist(&self, symbols: Vec<String>) -> Result<(), CoreError> {
        self.market.set_watchlist(symbols).await
    }

    /// Ask the backend for current market prices, then reload the snapshot.
    pub async fn refresh_live_prices(&self) -> Result<usize, CoreError> {
        self.market.refresh_live_prices().await
    }

    /// Ask the backend for new predictions, then reload the snapshot.
    pub async fn generate_predictions(&self) -> Result<(), CoreError> {
        self.market.generate_predictions().await
    }

    /// The live market store, for reads and direct updates.
    #[must_use]
    pub fn market(&self) -> &LiveMarketStore {
        &self.market
    }

    /// Stop background work (push subscription).
    pub fn dispose(&self) {
        self.market.dispose();
    }
}
