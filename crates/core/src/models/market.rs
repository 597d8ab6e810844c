use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// One OHLCV bar of a symbol's price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalBar {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// A real-time price observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimePrice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub symbol: String,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

impl RealtimePrice {
    pub fn new(symbol: impl Into<String>, price: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: None,
            symbol: symbol.into(),
            price,
            timestamp,
        }
    }
}

/// A model-predicted price for a future point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedPrice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub symbol: String,
    pub predicted_price: f64,
    pub timestamp: DateTime<Utc>,
}

impl PredictedPrice {
    pub fn new(symbol: impl Into<String>, predicted_price: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: None,
            symbol: symbol.into(),
            predicted_price,
            timestamp,
        }
    }
}

/// Lifecycle of a symbol inside the live market store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolStatus {
    /// Watched, waiting for the first snapshot
    Loading,
    /// Watched and populated
    Ready,
    /// Removed from the watchlist; last state is kept but no longer updated
    Dormant,
}

impl std::fmt::Display for SymbolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolStatus::Loading => write!(f, "Loading"),
            SymbolStatus::Ready => write!(f, "Ready"),
            SymbolStatus::Dormant => write!(f, "Dormant"),
        }
    }
}

/// Everything the store knows about one symbol.
///
/// Invariants:
/// - `historical` is ascending by timestamp and never longer than the
///   cap it was loaded with.
/// - `predictions` is strictly ascending by timestamp (one entry per
///   timestamp, last write wins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSymbolState {
    pub symbol: String,
    pub status: SymbolStatus,
    pub historical: Vec<HistoricalBar>,
    pub latest: Option<RealtimePrice>,
    pub predictions: Vec<PredictedPrice>,
}

impl MarketSymbolState {
    /// Fresh state for a symbol that was just added to the watchlist.
    pub fn loading(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            status: SymbolStatus::Loading,
            historical: Vec::new(),
            latest: None,
            predictions: Vec::new(),
        }
    }

    /// Replace the history wholesale. Sorts ascending and, if more than
    /// `cap` bars were supplied, drops the oldest ones.
    pub fn replace_historical(&mut self, mut bars: Vec<HistoricalBar>, cap: usize) {
        bars.sort_by_key(|b| b.timestamp);
        if bars.len() > cap {
            bars.drain(..bars.len() - cap);
        }
        self.historical = bars;
    }

    /// Replace the prediction series wholesale, restoring the
    /// sorted/unique-timestamp invariant.
    pub fn replace_predictions(&mut self, mut predictions: Vec<PredictedPrice>) {
        // Stable sort keeps arrival order within a timestamp, so the
        // dedup below keeps the last one written.
        predictions.sort_by_key(|p| p.timestamp);
        let mut unique: Vec<PredictedPrice> = Vec::with_capacity(predictions.len());
        for p in predictions {
            match unique.last_mut() {
                Some(last) if last.timestamp == p.timestamp => *last = p,
                _ => unique.push(p),
            }
        }
        self.predictions = unique;
    }

    /// Merge a single prediction: replaces an existing entry with the
    /// same timestamp, otherwise inserts at the sorted position (O(log n)).
    pub fn merge_prediction(&mut self, prediction: PredictedPrice) {
        match self
            .predictions
            .binary_search_by_key(&prediction.timestamp, |p| p.timestamp)
        {
            Ok(idx) => self.predictions[idx] = prediction,
            Err(idx) => self.predictions.insert(idx, prediction),
        }
    }

    /// Latest price if one is known.
    pub fn current_price(&self) -> Option<f64> {
        self.latest.as_ref().map(|p| p.price)
    }
}

/// The result of one bulk snapshot fetch, grouped by symbol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketSnapshot {
    pub historical: HashMap<String, Vec<HistoricalBar>>,
    pub latest: HashMap<String, RealtimePrice>,
    pub predictions: HashMap<String, Vec<PredictedPrice>>,
}

impl MarketSnapshot {
    /// Pick the most recent real-time row per symbol.
    /// Ties on timestamp go to the row seen last in `rows`.
    pub fn latest_by_symbol(rows: Vec<RealtimePrice>) -> HashMap<String, RealtimePrice> {
        let mut latest: HashMap<String, RealtimePrice> = HashMap::new();
        for row in rows {
            let newer = latest
                .get(&row.symbol)
                .map_or(true, |current| row.timestamp >= current.timestamp);
            if newer {
                latest.insert(row.symbol.clone(), row);
            }
        }
        latest
    }

    /// Group prediction rows by symbol, preserving row order.
    pub fn group_predictions(rows: Vec<PredictedPrice>) -> HashMap<String, Vec<PredictedPrice>> {
        let mut grouped: HashMap<String, Vec<PredictedPrice>> = HashMap::new();
        for row in rows {
            grouped.entry(row.symbol.clone()).or_default().push(row);
        }
        grouped
    }
}
