use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

use crate::models::market::RealtimePrice;

/// Maximum relative move of one simulated tick (±3%).
pub const PRICE_SWING: f64 = 0.03;

/// Starting price for a symbol with no known quote.
pub fn base_price(symbol: &str) -> f64 {
    match symbol {
        "AAPL" => 174.82,
        "MSFT" => 328.79,
        "NVDA" => 437.53,
        "AMZN" => 132.65,
        "TSLA" => 224.57,
        _ => 100.0,
    }
}

/// Random-walk price generator for demoing the live watchlist without a
/// market data feed.
pub struct PriceSimulator {
    rng: StdRng,
}

impl PriceSimulator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic simulator (tests, reproducible demos).
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Move `current` by a uniform random step within ±[`PRICE_SWING`],
    /// rounded to cents.
    pub fn next_price(&mut self, current: f64) -> f64 {
        let change = self.rng.gen_range(-PRICE_SWING..=PRICE_SWING) * current;
        ((current + change) * 100.0).round() / 100.0
    }

    /// One simulated tick per symbol, starting from the known price or
    /// the symbol's base price.
    pub fn tick(
        &mut self,
        symbols: &[String],
        known: &HashMap<String, f64>,
        now: DateTime<Utc>,
    ) -> Vec<RealtimePrice> {
        symbols
            .iter()
            .map(|symbol| {
                let current = known
                    .get(symbol)
                    .copied()
                    .unwrap_or_else(|| base_price(symbol));
                RealtimePrice::new(symbol.clone(), self.next_price(current), now)
            })
            .collect()
    }
}

impl Default for PriceSimulator {
    fn default() -> Self {
        Self::new()
    }
}
