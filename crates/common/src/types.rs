use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A trading pair split into its base and quote assets.
///
/// Parsed from the `BASE/QUOTE` notation used in configuration
/// (e.g. "BTC/USDT": BTC is bought and sold, USDT prices and funds it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    pub base: String,
    pub quote: String,
}

impl Pair {
    /// Parse "BASE/QUOTE". Both sides must be non-empty.
    pub fn parse(symbol: &str) -> Result<Self> {
        match symbol.split_once('/') {
            Some((base, quote)) if !base.is_empty() && !quote.is_empty() => Ok(Self {
                base: base.to_string(),
                quote: quote.to_string(),
            }),
            _ => Err(Error::Pair(symbol.to_string())),
        }
    }

    /// The concatenated market symbol the exchange API expects ("BTCUSDT").
    pub fn market(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl std::fmt::Display for Pair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// One OHLCV candle. Immutable once fetched; candle sequences are ordered by
/// strictly increasing timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Trade signal emitted by the detector. "No signal" is `Option::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
        }
    }
}

/// Side of an order on the exchange boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl From<Signal> for OrderSide {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::Buy => OrderSide::Buy,
            Signal::Sell => OrderSide::Sell,
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Lifecycle state of a placed order as reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Closed,
    Rejected,
}

/// Confirmation of an order returned by the exchange (or synthesized in
/// dry-run mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: String,
    pub pair: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub fill_price: f64,
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
}

impl Fill {
    /// Zero-quantity closed fill at the given price. Dry-run mode never
    /// contacts the order endpoint, so this stands in for the confirmation.
    pub fn dry_run(pair: &Pair, side: OrderSide, price: f64) -> Self {
        Self {
            order_id: "dry-run".to_string(),
            pair: pair.to_string(),
            side,
            quantity: 0.0,
            fill_price: price,
            status: OrderStatus::Closed,
            timestamp: Utc::now(),
        }
    }
}

/// One executed trade. The log is append-only and lives in memory; it is
/// created only by the trade executor, never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub timestamp: DateTime<Utc>,
    pub pair: String,
    pub side: Signal,
    pub price: f64,
    pub order_id: String,
}

/// Free balances per asset, or a sentinel recorded when the balance call
/// failed. The sentinel is shown as-is in the status snapshot; readers must
/// not treat it as zero holdings of a real asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Balances {
    Available(HashMap<String, f64>),
    Errored { error: String },
}

impl Default for Balances {
    fn default() -> Self {
        Balances::Available(HashMap::new())
    }
}

impl Balances {
    /// Free quantity of `asset`; 0.0 when the asset is absent or the last
    /// balance fetch failed.
    pub fn free(&self, asset: &str) -> f64 {
        match self {
            Balances::Available(map) => map.get(asset).copied().unwrap_or(0.0),
            Balances::Errored { .. } => 0.0,
        }
    }

    /// Stand-in balances used when no real credentials are configured:
    /// 1000 units of quote to fund buys, nothing of base.
    pub fn simulated(pair: &Pair) -> Self {
        let mut map = HashMap::new();
        map.insert(pair.quote.clone(), 1000.0);
        map.insert(pair.base.clone(), 0.0);
        Balances::Available(map)
    }

    pub fn errored(message: impl Into<String>) -> Self {
        Balances::Errored {
            error: message.into(),
        }
    }
}

/// Advisory snapshot returned by `GET /status`.
#[derive(Debug, Clone, Serialize)]
pub struct BotStatus {
    pub is_running: bool,
    pub symbol: String,
    pub last_signal: Option<Signal>,
    pub balance: Balances,
    pub trades: Vec<Trade>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_parses_base_and_quote() {
        let pair = Pair::parse("BTC/USDT").unwrap();
        assert_eq!(pair.base, "BTC");
        assert_eq!(pair.quote, "USDT");
        assert_eq!(pair.market(), "BTCUSDT");
        assert_eq!(pair.to_string(), "BTC/USDT");
    }

    #[test]
    fn pair_rejects_malformed_symbols() {
        assert!(Pair::parse("BTCUSDT").is_err());
        assert!(Pair::parse("/USDT").is_err());
        assert!(Pair::parse("BTC/").is_err());
    }

    #[test]
    fn balances_free_defaults_to_zero() {
        let balances = Balances::default();
        assert_eq!(balances.free("USDT"), 0.0);

        let errored = Balances::errored("API error");
        assert_eq!(errored.free("USDT"), 0.0);
    }

    #[test]
    fn simulated_balances_fund_the_quote_side() {
        let pair = Pair::parse("BTC/USDT").unwrap();
        let balances = Balances::simulated(&pair);
        assert_eq!(balances.free("USDT"), 1000.0);
        assert_eq!(balances.free("BTC"), 0.0);
    }

    #[test]
    fn balance_sentinel_serializes_as_error_object() {
        let errored = Balances::errored("restricted location");
        let json = serde_json::to_value(&errored).unwrap();
        assert_eq!(json["error"], "restricted location");
    }
}
