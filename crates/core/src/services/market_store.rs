use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::errors::CoreError;
use crate::models::event::{Notification, PushEvent};
use crate::models::market::{
    MarketSnapshot, MarketSymbolState, PredictedPrice, RealtimePrice, SymbolStatus,
};
use crate::models::settings::Settings;
use crate::providers::traits::{DataStore, PushFeed, RemoteProcedures};
use crate::services::push_worker::{PushSink, PushWorker};
use crate::services::simulation::PriceSimulator;

/// Capacity of the notification broadcast channel.
const NOTIFICATION_CAPACITY: usize = 64;

#[derive(Default)]
struct StoreState {
    watchlist: Vec<String>,
    symbols: HashMap<String, MarketSymbolState>,
    /// Snapshot loads and remote procedure calls currently in flight
    in_flight: usize,
    fetch_error: Option<String>,
}

impl StoreState {
    fn is_watched(&self, symbol: &str) -> bool {
        self.watchlist.iter().any(|s| s == symbol)
    }
}

/// State shared between the store handle and its push worker.
struct StoreInner {
    state: RwLock<StoreState>,
    source: Arc<dyn DataStore>,
    procedures: Arc<dyn RemoteProcedures>,
    notifications: broadcast::Sender<Notification>,
    simulator: Mutex<PriceSimulator>,
    settings: Settings,
    disposed: AtomicBool,
}

impl StoreInner {
    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn notify(&self, notification: Notification) {
        // No receivers is fine: nobody is showing toasts right now.
        let _ = self.notifications.send(notification);
    }

    fn apply_price_update(&self, update: RealtimePrice) -> bool {
        if self.disposed.load(Ordering::Acquire) {
            return false;
        }
        let mut state = self.write();
        if !state.is_watched(&update.symbol) {
            debug!(symbol = %update.symbol, "discarding price update for unwatched symbol");
            return false;
        }
        debug!(symbol = %update.symbol, price = update.price, "applying price update");
        let symbol = update.symbol.clone();
        state
            .symbols
            .entry(symbol.clone())
            .or_insert_with(|| MarketSymbolState::loading(symbol))
            .latest = Some(update);
        true
    }

    fn apply_prediction_update(&self, prediction: PredictedPrice) -> bool {
        if self.disposed.load(Ordering::Acquire) {
            return false;
        }
        let mut state = self.write();
        if !state.is_watched(&prediction.symbol) {
            debug!(symbol = %prediction.symbol, "discarding prediction for unwatched symbol");
            return false;
        }
        debug!(
            symbol = %prediction.symbol,
            predicted_price = prediction.predicted_price,
            timestamp = %prediction.timestamp,
            "applying prediction update"
        );
        let symbol = prediction.symbol.clone();
        state
            .symbols
            .entry(symbol.clone())
            .or_insert_with(|| MarketSymbolState::loading(symbol))
            .merge_prediction(prediction);
        true
    }
}

/// Counts one operation as in flight for [`LiveMarketStore::is_loading`]
/// until dropped, including when the operation's future is cancelled.
struct InFlight<'a> {
    inner: &'a StoreInner,
}

impl<'a> InFlight<'a> {
    fn enter(inner: &'a StoreInner) -> Self {
        inner.write().in_flight += 1;
        Self { inner }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.inner.write();
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

impl PushSink for StoreInner {
    fn deliver(&self, event: PushEvent) -> bool {
        match event {
            PushEvent::Price(update) => self.apply_price_update(update),
            PushEvent::Prediction(prediction) => self.apply_prediction_update(prediction),
        }
    }

    fn is_closed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

/// Per-symbol market state for the watchlist, kept current from two
/// independent inputs:
///
/// - **Snapshot loads** (`set_watchlist`, `refresh`, `load_snapshot`)
///   replace a symbol's history, latest price and predictions wholesale.
/// - **Push updates** from the standing subscription replace the latest
///   price unconditionally and merge predictions by timestamp.
///
/// Policy is "last completed write wins". Snapshot results are filtered
/// against the watchlist that is current when the fetch completes, so a
/// slow load for an old watchlist never resurrects a removed symbol.
/// Symbols removed from the watchlist keep their last state as
/// [`SymbolStatus::Dormant`] and ignore pushes.
///
/// Mutations go through one write lock; readers get cloned, consistent
/// snapshots. Call [`LiveMarketStore::dispose`] (or drop the store) to
/// stop the push worker.
pub struct LiveMarketStore {
    inner: Arc<StoreInner>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for LiveMarketStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.read();
        f.debug_struct("LiveMarketStore")
            .field("watchlist", &state.watchlist)
            .field("symbols", &state.symbols.len())
            .field("loading", &(state.in_flight > 0))
            .field("disposed", &self.inner.disposed.load(Ordering::Acquire))
            .finish()
    }
}

impl LiveMarketStore {
    /// Create a store and start its push worker on the current tokio runtime.
    ///
    /// The watchlist starts empty; call [`LiveMarketStore::set_watchlist`]
    /// to begin tracking symbols.
    pub fn create(
        source: Arc<dyn DataStore>,
        procedures: Arc<dyn RemoteProcedures>,
        feed: Arc<dyn PushFeed>,
        settings: Settings,
    ) -> Result<Self, CoreError> {
        let store = Self::detached(source, procedures, settings)?;
        let worker = PushWorker::new(
            feed,
            store.inner.settings.reconnect.clone(),
            store.inner.settings.push_channel_capacity,
        );
        let sink: Arc<dyn PushSink> = store.inner.clone();
        *store.worker_slot() = Some(worker.spawn(sink));
        Ok(store)
    }

    /// Create a store without a push subscription. Updates then only
    /// arrive through snapshot loads and direct `apply_*` calls.
    pub fn detached(
        source: Arc<dyn DataStore>,
        procedures: Arc<dyn RemoteProcedures>,
        settings: Settings,
    ) -> Result<Self, CoreError> {
        settings.validate()?;
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Ok(Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(StoreState::default()),
                source,
                procedures,
                notifications,
                simulator: Mutex::new(PriceSimulator::new()),
                settings,
                disposed: AtomicBool::new(false),
            }),
            worker: Mutex::new(None),
        })
    }

    /// Replace the random source used by [`LiveMarketStore::simulate_realtime_updates`].
    pub fn set_simulator(&self, simulator: PriceSimulator) {
        *self.inner.simulator.lock().unwrap_or_else(|e| e.into_inner()) = simulator;
    }

    /// Stop the push worker. Further async operations fail with
    /// `CoreError::StoreDisposed` and updates are ignored.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(handle) = self.worker_slot().take() {
            handle.abort();
        }
        info!("live market store disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    // ── Watchlist ───────────────────────────────────────────────────

    /// Replace the active watchlist and load a fresh snapshot for it.
    ///
    /// Blank entries and duplicates are dropped; an empty list falls back
    /// to `Settings::default_watchlist`. Newly watched symbols start in
    /// `Loading`, removed ones turn `Dormant`.
    pub async fn set_watchlist(&self, symbols: Vec<String>) -> Result<(), CoreError> {
        self.ensure_active()?;
        let watchlist = self.normalize_watchlist(symbols);
        info!(symbols = ?watchlist, "watchlist updated");

        {
            let mut state = self.inner.write();
            for (symbol, entry) in state.symbols.iter_mut() {
                if !watchlist.contains(symbol) {
                    entry.status = SymbolStatus::Dormant;
                }
            }
            for symbol in &watchlist {
                let entry = state
                    .symbols
                    .entry(symbol.clone())
                    .or_insert_with(|| MarketSymbolState::loading(symbol.clone()));
                if entry.status == SymbolStatus::Dormant {
                    entry.status = SymbolStatus::Loading;
                }
            }
            state.watchlist = watchlist.clone();
        }

        self.load_snapshot(&watchlist).await?;
        Ok(())
    }

    pub fn watchlist(&self) -> Vec<String> {
        self.inner.read().watchlist.clone()
    }

    fn normalize_watchlist(&self, symbols: Vec<String>) -> Vec<String> {
        let mut watchlist: Vec<String> = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let symbol = symbol.trim().to_string();
            if !symbol.is_empty() && !watchlist.contains(&symbol) {
                watchlist.push(symbol);
            }
        }
        if watchlist.is_empty() {
            watchlist = self.inner.settings.default_watchlist.clone();
        }
        watchlist
    }

    // ── Snapshot loads ──────────────────────────────────────────────

    /// Reload the snapshot for the current watchlist.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let watchlist = self.watchlist();
        self.load_snapshot(&watchlist).await?;
        Ok(())
    }

    /// Fetch history, latest prices and predictions for `symbols` and
    /// replace their state wholesale.
    ///
    /// Nothing is written unless every query succeeds. Only symbols still
    /// on the watchlist when the fetch completes are applied; the returned
    /// map holds their new state.
    pub async fn load_snapshot(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, MarketSymbolState>, CoreError> {
        self.ensure_active()?;
        // Declared before `state` below, so it is released after the write lock
        let _loading = InFlight::enter(&self.inner);
        self.inner.write().fetch_error = None;
        debug!(symbols = ?symbols, "fetching market snapshot");

        let fetched = self.fetch_snapshot(symbols).await;

        let mut state = self.inner.write();

        let snapshot = match fetched {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "failed to fetch market snapshot");
                state.fetch_error = Some(e.to_string());
                drop(state);
                self.inner
                    .notify(Notification::error("Error fetching stock data", e.to_string()));
                return Err(e);
            }
        };

        if self.inner.disposed.load(Ordering::Acquire) {
            return Err(CoreError::StoreDisposed);
        }

        let cap = self.inner.settings.history_limit;
        let MarketSnapshot {
            mut historical,
            mut latest,
            mut predictions,
        } = snapshot;
        let mut applied = HashMap::new();

        for symbol in symbols {
            if !state.is_watched(symbol) {
                debug!(symbol = %symbol, "dropping snapshot for symbol no longer watched");
                continue;
            }
            let entry = state
                .symbols
                .entry(symbol.clone())
                .or_insert_with(|| MarketSymbolState::loading(symbol.clone()));
            entry.replace_historical(historical.remove(symbol).unwrap_or_default(), cap);
            entry.latest = latest.remove(symbol);
            entry.replace_predictions(predictions.remove(symbol).unwrap_or_default());
            entry.status = SymbolStatus::Ready;
            debug!(
                symbol = %symbol,
                bars = entry.historical.len(),
                predictions = entry.predictions.len(),
                "snapshot applied"
            );
            applied.insert(symbol.clone(), entry.clone());
        }

        Ok(applied)
    }

    async fn fetch_snapshot(&self, symbols: &[String]) -> Result<MarketSnapshot, CoreError> {
        let source = &self.inner.source;
        let limit = self.inner.settings.history_limit;

        let mut historical = HashMap::new();
        for symbol in symbols {
            let bars = source.fetch_historical_bars(symbol, limit).await?;
            debug!(symbol = %symbol, count = bars.len(), "fetched historical bars");
            historical.insert(symbol.clone(), bars);
        }

        let latest = MarketSnapshot::latest_by_symbol(source.fetch_realtime_prices(symbols).await?);
        let predictions =
            MarketSnapshot::group_predictions(source.fetch_predictions(symbols).await?);

        Ok(MarketSnapshot {
            historical,
            latest,
            predictions,
        })
    }

    // ── Push updates ────────────────────────────────────────────────

    /// Replace the latest price of a watched symbol. No timestamp check:
    /// a push always wins over what is stored. Returns `false` (and
    /// changes nothing) for unwatched symbols.
    pub fn apply_price_update(&self, update: RealtimePrice) -> bool {
        self.inner.apply_price_update(update)
    }

    /// Merge a prediction for a watched symbol, keeping the series sorted
    /// by timestamp. An existing prediction for the same timestamp is
    /// replaced. Returns `false` for unwatched symbols.
    pub fn apply_prediction_update(&self, prediction: PredictedPrice) -> bool {
        self.inner.apply_prediction_update(prediction)
    }

    /// Apply any push event.
    pub fn apply_push(&self, event: PushEvent) -> bool {
        self.inner.deliver(event)
    }

    // ── Remote procedures ───────────────────────────────────────────

    /// Ask the backend to pull current market prices for the watchlist,
    /// then reload the snapshot. Returns how many symbols were priced.
    pub async fn refresh_live_prices(&self) -> Result<usize, CoreError> {
        self.ensure_active()?;
        let _loading = InFlight::enter(&self.inner);
        let watchlist = self.watchlist();
        info!(symbols = ?watchlist, "requesting live price refresh");

        let prices = match self.inner.procedures.fetch_market_prices(&watchlist).await {
            Ok(prices) => prices,
            Err(e) => {
                error!(error = %e, "live price refresh failed");
                self.inner
                    .notify(Notification::error("Error updating stock prices", e.to_string()));
                return Err(e);
            }
        };

        self.inner.notify(Notification::info(
            "Stock prices updated",
            format!(
                "Latest market data has been refreshed for {} stocks",
                prices.len()
            ),
        ));
        self.refresh().await?;
        Ok(prices.len())
    }

    /// Ask the backend to generate predictions for the watchlist, then
    /// reload the snapshot.
    pub async fn generate_predictions(&self) -> Result<(), CoreError> {
        self.ensure_active()?;
        let _loading = InFlight::enter(&self.inner);
        let watchlist = self.watchlist();
        info!(symbols = ?watchlist, "requesting prediction generation");

        if let Err(e) = self.inner.procedures.generate_predictions(&watchlist).await {
            error!(error = %e, "prediction generation failed");
            self.inner
                .notify(Notification::error("Error generating predictions", e.to_string()));
            return Err(e);
        }

        self.inner.notify(Notification::info(
            "Predictions generated",
            "New stock price predictions have been calculated for your watchlist",
        ));
        self.refresh().await
    }

    /// Write one random-walk price per watched symbol to the backend and
    /// reload the snapshot. Stand-in for a real market data feed.
    pub async fn simulate_realtime_updates(&self) -> Result<Vec<RealtimePrice>, CoreError> {
        self.ensure_active()?;
        self.inner.notify(Notification::info(
            "Fetching stock prices",
            "Connecting to market data...",
        ));

        let (watchlist, known) = {
            let state = self.inner.read();
            let known: HashMap<String, f64> = state
                .symbols
                .iter()
                .filter_map(|(s, entry)| entry.current_price().map(|p| (s.clone(), p)))
                .collect();
            (state.watchlist.clone(), known)
        };
        let updates = self
            .inner
            .simulator
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .tick(&watchlist, &known, Utc::now());

        for update in &updates {
            if let Err(e) = self.inner.source.upsert_realtime_price(update).await {
                warn!(symbol = %update.symbol, error = %e, "failed to write simulated price");
                self.inner
                    .notify(Notification::error("Error updating stock prices", e.to_string()));
                return Err(e);
            }
        }

        self.inner.notify(Notification::info(
            "Stock prices updated",
            "Latest market data has been refreshed",
        ));
        self.refresh().await?;
        Ok(updates)
    }

    // ── Reads ───────────────────────────────────────────────────────

    /// Listen for user-facing notifications (toasts).
    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.inner.notifications.subscribe()
    }

    /// Consistent copy of every symbol's state, dormant ones included.
    pub fn snapshot(&self) -> HashMap<String, MarketSymbolState> {
        self.inner.read().symbols.clone()
    }

    pub fn symbol_state(&self, symbol: &str) -> Option<MarketSymbolState> {
        self.inner.read().symbols.get(symbol).cloned()
    }

    pub fn latest_price(&self, symbol: &str) -> Option<RealtimePrice> {
        self.inner
            .read()
            .symbols
            .get(symbol)
            .and_then(|s| s.latest.clone())
    }

    pub fn predictions(&self, symbol: &str) -> Vec<PredictedPrice> {
        self.inner
            .read()
            .symbols
            .get(symbol)
            .map(|s| s.predictions.clone())
            .unwrap_or_default()
    }

    /// True while a snapshot load or a remote procedure call is in flight.
    pub fn is_loading(&self) -> bool {
        self.inner.read().in_flight > 0
    }

    /// Message of the last failed snapshot load, cleared when a new one starts.
    pub fn fetch_error(&self) -> Option<String> {
        self.inner.read().fetch_error.clone()
    }

    // ── Internals ───────────────────────────────────────────────────

    fn ensure_active(&self) -> Result<(), CoreError> {
        if self.inner.disposed.load(Ordering::Acquire) {
            return Err(CoreError::StoreDisposed);
        }
        Ok(())
    }

    fn worker_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.worker.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for LiveMarketStore {
    fn drop(&mut self) {
        self.dispose();
    }
}
