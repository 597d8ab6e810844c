use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::{sanitize_url_message, CoreError};
use crate::models::event::{
    ChangeEnvelope, PushEvent, PREDICTED_PRICES_TABLE, REALTIME_PRICES_TABLE,
};
use crate::models::market::{HistoricalBar, PredictedPrice, RealtimePrice};
use crate::models::portfolio::{PortfolioHolding, TradingAccount, TradingPosition};
use crate::models::record::{BudgetLimit, FinancialRecord};
use crate::models::settings::Settings;

use super::traits::{DataStore, PushFeed, RemoteProcedures};

const REST_PATH: &str = "rest/v1";
const FUNCTIONS_PATH: &str = "functions/v1";
const CHANGES_PATH: &str = "realtime/v1/changes";

const FETCH_PRICES_FUNCTION: &str = "fetch-stock-prices";
const GENERATE_PREDICTIONS_FUNCTION: &str = "generate-stock-predictions";

/// HTTP backend speaking PostgREST-style table queries.
///
/// - **Tables**: `GET {base}/rest/v1/{table}?select=*&{filters}`
/// - **Functions**: `POST {base}/functions/v1/{name}` with `{"symbols": [..]}`
/// - **Changes**: `GET {base}/realtime/v1/changes`, newline-delimited JSON
///   envelopes `{"table", "type", "record"}` for as long as the connection lives.
///
/// Every request carries the configured key as `apikey` and bearer token.
pub struct RestBackend {
    client: Client,
    /// The change stream outlives any request timeout; only connecting is bounded
    stream_client: Client,
    base_url: String,
    api_key: String,
}

impl RestBackend {
    pub fn new(settings: &Settings) -> Result<Self, CoreError> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;
        let stream_client = Client::builder()
            .connect_timeout(settings.request_timeout())
            .build()?;
        Ok(Self {
            client,
            stream_client,
            base_url: settings.backend_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of a table endpoint.
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/{REST_PATH}/{table}", self.base_url)
    }

    /// URL of a remote function endpoint.
    pub fn function_url(&self, function: &str) -> String {
        format!("{}/{FUNCTIONS_PATH}/{function}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Run a table query and decode the row set.
    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, CoreError> {
        debug!(table, "querying backend table");
        let request = self
            .authorized(self.client.get(self.table_url(table)))
            .query(&[("select", "*")])
            .query(filters);

        let response = request
            .send()
            .await
            .map_err(|e| CoreError::fetch(table, sanitize_url_message(&e.to_string())))?;
        let response = ensure_success(response, table).await?;

        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| CoreError::fetch(table, format!("Failed to decode rows: {e}")))
    }

    /// Invoke a remote function with the watchlist as its body.
    async fn invoke(&self, function: &str, symbols: &[String]) -> Result<Response, CoreError> {
        debug!(function, count = symbols.len(), "invoking remote function");
        let request = self
            .authorized(self.client.post(self.function_url(function)))
            .json(&serde_json::json!({ "symbols": symbols }));

        let response = request
            .send()
            .await
            .map_err(|e| CoreError::remote(function, sanitize_url_message(&e.to_string())))?;
        ensure_success(response, function)
            .await
            .map_err(|e| CoreError::remote(function, e.to_string()))
    }
}

/// Turn a non-2xx response into a `Fetch` error carrying the body.
async fn ensure_success(response: Response, query: &str) -> Result<Response, CoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CoreError::fetch(query, format!("HTTP {status}: {body}")))
}

/// PostgREST `in` filter value: `in.(A,B,C)`.
pub fn in_filter(symbols: &[String]) -> String {
    format!("in.({})", symbols.join(","))
}

/// The one row of a table that must hold exactly one. No rows is
/// `NotFound`; more than one is a `Fetch` error.
pub fn single_row<T>(rows: Vec<T>, table: &str) -> Result<T, CoreError> {
    let count = rows.len();
    let mut rows = rows.into_iter();
    match (rows.next(), count) {
        (Some(row), 1) => Ok(row),
        (None, _) => Err(CoreError::NotFound(table.to_string())),
        _ => Err(CoreError::fetch(
            table,
            format!("expected exactly one row, got {count}"),
        )),
    }
}

/// Decode one line of the change stream.
///
/// Blank lines and `:`-prefixed heartbeats yield `Ok(None)`, as do
/// changes the store has no use for (deletes, unrelated tables).
pub fn parse_change_line(line: &[u8]) -> Result<Option<PushEvent>, CoreError> {
    let trimmed = String::from_utf8_lossy(line);
    let trimmed = trimmed.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return Ok(None);
    }
    let envelope: ChangeEnvelope = serde_json::from_str(trimmed)?;
    envelope.into_push_event()
}

#[derive(Deserialize)]
struct FetchPricesResponse {
    #[serde(default)]
    prices: Option<HashMap<String, f64>>,
}

#[async_trait]
impl DataStore for RestBackend {
    fn name(&self) -> &str {
        "REST"
    }

    async fn fetch_financial_records(&self) -> Result<Vec<FinancialRecord>, CoreError> {
        self.select("expenses", &[]).await
    }

    async fn fetch_budget_limits(&self) -> Result<Vec<BudgetLimit>, CoreError> {
        self.select("budget_alerts", &[]).await
    }

    async fn fetch_holdings(&self) -> Result<Vec<PortfolioHolding>, CoreError> {
        self.select("portfolio_holdings", &[]).await
    }

    async fn fetch_positions(&self) -> Result<Vec<TradingPosition>, CoreError> {
        self.select("trading_positions", &[]).await
    }

    async fn fetch_trading_account(&self) -> Result<TradingAccount, CoreError> {
        let rows: Vec<TradingAccount> = self.select("trading_portfolios", &[]).await?;
        single_row(rows, "trading_portfolios")
    }

    async fn fetch_historical_bars(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<HistoricalBar>, CoreError> {
        // Newest `limit` bars, flipped back to ascending order
        let mut bars: Vec<HistoricalBar> = self
            .select(
                "historical_stock_data",
                &[
                    ("symbol", format!("eq.{symbol}")),
                    ("order", "timestamp.desc".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        bars.reverse();
        Ok(bars)
    }

    async fn fetch_realtime_prices(
        &self,
        symbols: &[String],
    ) -> Result<Vec<RealtimePrice>, CoreError> {
        self.select(
            REALTIME_PRICES_TABLE,
            &[
                ("symbol", in_filter(symbols)),
                ("order", "timestamp.desc".to_string()),
            ],
        )
        .await
    }

    async fn fetch_predictions(
        &self,
        symbols: &[String],
    ) -> Result<Vec<PredictedPrice>, CoreError> {
        self.select(
            PREDICTED_PRICES_TABLE,
            &[
                ("symbol", in_filter(symbols)),
                ("order", "timestamp.asc".to_string()),
            ],
        )
        .await
    }

    async fn upsert_realtime_price(&self, price: &RealtimePrice) -> Result<(), CoreError> {
        let request = self
            .authorized(self.client.post(self.table_url(REALTIME_PRICES_TABLE)))
            .header("Prefer", "resolution=merge-duplicates")
            .json(&[price]);
        let response = request.send().await?;
        ensure_success(response, REALTIME_PRICES_TABLE).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteProcedures for RestBackend {
    async fn fetch_market_prices(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, f64>, CoreError> {
        let response = self.invoke(FETCH_PRICES_FUNCTION, symbols).await?;
        let body: FetchPricesResponse = response
            .json()
            .await
            .map_err(|e| CoreError::remote(FETCH_PRICES_FUNCTION, e.to_string()))?;
        match body.prices {
            Some(prices) => Ok(prices),
            None => {
                warn!("no price data received from {FETCH_PRICES_FUNCTION}");
                Ok(HashMap::new())
            }
        }
    }

    async fn generate_predictions(&self, symbols: &[String]) -> Result<(), CoreError> {
        self.invoke(GENERATE_PREDICTIONS_FUNCTION, symbols).await?;
        Ok(())
    }
}

#[async_trait]
impl PushFeed for RestBackend {
    async fn subscribe(&self, capacity: usize) -> Result<mpsc::Receiver<PushEvent>, CoreError> {
        let url = format!("{}/{CHANGES_PATH}", self.base_url);
        let request = self
            .authorized(self.stream_client.get(url))
            .header("Accept", "application/x-ndjson")
            .query(&[(
                "tables",
                format!("{REALTIME_PRICES_TABLE},{PREDICTED_PRICES_TABLE}"),
            )]);

        let response = request
            .send()
            .await
            .map_err(|e| CoreError::Subscription(sanitize_url_message(&e.to_string())))?;
        let mut response = ensure_success(response, CHANGES_PATH)
            .await
            .map_err(|e| CoreError::Subscription(e.to_string()))?;

        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(async move {
            let mut buffer: Vec<u8> = Vec::new();
            loop {
                match response.chunk().await {
                    Ok(Some(bytes)) => {
                        buffer.extend_from_slice(&bytes);
                        while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                            let line: Vec<u8> = buffer.drain(..=pos).collect();
                            match parse_change_line(&line) {
                                Ok(Some(event)) => {
                                    if tx.send(event).await.is_err() {
                                        // Subscriber went away
                                        return;
                                    }
                                }
                                Ok(None) => {}
                                Err(e) => warn!(error = %e, "skipping malformed change event"),
                            }
                        }
                    }
                    Ok(None) => {
                        debug!("change stream closed by backend");
                        return;
                    }
                    Err(e) => {
                        warn!(error = %sanitize_url_message(&e.to_string()), "change stream failed");
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}
