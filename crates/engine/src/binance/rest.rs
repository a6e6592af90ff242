use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use tracing::debug;

use common::{
    Candle, Credentials, Error, ExchangeClient, Fill, OrderSide, OrderStatus, Pair, Result,
};

const BASE_URL: &str = "https://api.binance.com";

/// Candles requested per poll. Ample lookback for the default 50-period EMA.
const KLINE_LIMIT: usize = 200;

/// Per-request ceiling so a hung exchange call cannot stall the poll loop
/// indefinitely; `stop()` never cancels in-flight requests itself.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// REST API client for the Binance spot exchange.
///
/// The market-data endpoints (klines, ticker) are public; account and order
/// endpoints require credentials and an HMAC-SHA256 signed query string.
pub struct BinanceClient {
    credentials: Option<Credentials>,
    http: Client,
}

impl BinanceClient {
    pub fn new(credentials: Option<Credentials>) -> Self {
        Self {
            credentials,
            http: Client::builder()
                .use_rustls_tls()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    fn timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64
    }

    fn credentials(&self) -> Result<&Credentials> {
        self.credentials
            .as_ref()
            .ok_or_else(|| Error::Config("Binance credentials are not configured".to_string()))
    }

    fn sign(secret: &str, query: &str) -> String {
        type HmacSha256 = Hmac<Sha256>;
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    async fn signed_get(&self, path: &str, params: &str) -> Result<String> {
        let creds = self.credentials()?;
        let ts = Self::timestamp_ms();
        let query = if params.is_empty() {
            format!("timestamp={ts}")
        } else {
            format!("{params}&timestamp={ts}")
        };
        let signature = Self::sign(&creds.api_secret, &query);
        let url = format!("{BASE_URL}{path}?{query}&signature={signature}");

        let resp = self
            .http
            .get(&url)
            .header("X-MBX-APIKEY", &creds.api_key)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Exchange(format!("HTTP {status}: {body}")));
        }
        Ok(body)
    }

    async fn signed_post(&self, path: &str, params: &str) -> Result<String> {
        let creds = self.credentials()?;
        let ts = Self::timestamp_ms();
        let query = format!("{params}&timestamp={ts}");
        let signature = Self::sign(&creds.api_secret, &query);
        let body = format!("{query}&signature={signature}");
        let url = format!("{BASE_URL}{path}");

        let resp = self
            .http
            .post(&url)
            .header("X-MBX-APIKEY", &creds.api_key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Exchange(format!("HTTP {status}: {text}")));
        }
        Ok(text)
    }
}

#[async_trait]
impl ExchangeClient for BinanceClient {
    async fn fetch_candles(&self, pair: &Pair, timeframe: &str) -> Result<Vec<Candle>> {
        let url = format!(
            "{BASE_URL}/api/v3/klines?symbol={}&interval={}&limit={}",
            pair.market(),
            timeframe,
            KLINE_LIMIT
        );
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Exchange(format!("HTTP {status}: {body}")));
        }

        let rows: Vec<serde_json::Value> =
            resp.json().await.map_err(|e| Error::Http(e.to_string()))?;

        debug!(pair = %pair, rows = rows.len(), "Fetched klines");
        rows.iter().map(parse_kline_row).collect()
    }

    async fn ticker_price(&self, pair: &Pair) -> Result<f64> {
        let url = format!(
            "{BASE_URL}/api/v3/ticker/price?symbol={}",
            pair.market()
        );
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let ticker: PriceTicker = resp.json().await.map_err(|e| Error::Http(e.to_string()))?;

        ticker
            .price
            .parse::<f64>()
            .map_err(|e| Error::Exchange(e.to_string()))
    }

    async fn fetch_balances(&self) -> Result<HashMap<String, f64>> {
        let body = self.signed_get("/api/v3/account", "").await?;
        let account: AccountResponse =
            serde_json::from_str(&body).map_err(|e| Error::Exchange(e.to_string()))?;

        let balances = account
            .balances
            .into_iter()
            .filter_map(|b| {
                let free = b.free.parse::<f64>().ok()?;
                (free > 0.0).then(|| (b.asset, free))
            })
            .collect();

        Ok(balances)
    }

    async fn place_market_order(
        &self,
        pair: &Pair,
        side: OrderSide,
        quantity: f64,
    ) -> Result<Fill> {
        let client_order_id = uuid::Uuid::new_v4().to_string();
        let params = format!(
            "symbol={}&side={}&type=MARKET&quantity={}&newClientOrderId={}",
            pair.market(),
            side,
            quantity,
            client_order_id
        );

        debug!(pair = %pair, side = %side, qty = quantity, "Submitting market order");
        let body = self.signed_post("/api/v3/order", &params).await?;

        let resp: OrderResponse =
            serde_json::from_str(&body).map_err(|e| Error::Exchange(e.to_string()))?;

        let fill_price = resp
            .fills
            .first()
            .and_then(|f| f.price.parse::<f64>().ok())
            .unwrap_or(0.0);

        Ok(Fill {
            order_id: resp.client_order_id,
            pair: pair.to_string(),
            side,
            quantity,
            fill_price,
            status: parse_order_status(&resp.status),
            timestamp: Utc::now(),
        })
    }
}

// ─── Response parsing ─────────────────────────────────────────────────────────

/// One kline row is a heterogeneous JSON array:
/// `[open_time_ms, open, high, low, close, volume, close_time_ms, ...]`
/// with all prices encoded as decimal strings.
fn parse_kline_row(row: &serde_json::Value) -> Result<Candle> {
    let decimal = |i: usize| -> Result<f64> {
        row.get(i)
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| Error::Exchange(format!("malformed kline field {i}")))
    };

    let open_time_ms = row
        .get(0)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| Error::Exchange("malformed kline open time".to_string()))?;
    let timestamp = Utc
        .timestamp_millis_opt(open_time_ms)
        .single()
        .ok_or_else(|| Error::Exchange(format!("kline open time out of range: {open_time_ms}")))?;

    Ok(Candle {
        timestamp,
        open: decimal(1)?,
        high: decimal(2)?,
        low: decimal(3)?,
        close: decimal(4)?,
        volume: decimal(5)?,
    })
}

fn parse_order_status(status: &str) -> OrderStatus {
    match status {
        "FILLED" => OrderStatus::Closed,
        "NEW" | "PARTIALLY_FILLED" => OrderStatus::Open,
        _ => OrderStatus::Rejected,
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    client_order_id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    fills: Vec<FillDetail>,
}

#[derive(Deserialize)]
struct FillDetail {
    price: String,
}

#[derive(Deserialize)]
struct AccountResponse {
    balances: Vec<BalanceEntry>,
}

#[derive(Deserialize)]
struct BalanceEntry {
    asset: String,
    free: String,
}

#[derive(Deserialize)]
struct PriceTicker {
    price: String,
}
