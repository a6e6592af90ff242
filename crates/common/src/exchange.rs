use std::collections::HashMap;

use async_trait::async_trait;

use crate::{Candle, Fill, OrderSide, Pair, Result};

/// Abstraction over the exchange connection.
///
/// `BinanceClient` in `crates/engine` implements this for the real spot API;
/// tests substitute their own doubles. The trade executor is the only
/// component that calls `place_market_order`.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Fetch recent candles for a pair, oldest first, strictly increasing
    /// timestamps.
    async fn fetch_candles(&self, pair: &Pair, timeframe: &str) -> Result<Vec<Candle>>;

    /// Latest traded price for a pair.
    async fn ticker_price(&self, pair: &Pair) -> Result<f64>;

    /// Free balance per asset for the configured account.
    async fn fetch_balances(&self) -> Result<HashMap<String, f64>>;

    /// Submit a market order and return the fill confirmation.
    async fn place_market_order(&self, pair: &Pair, side: OrderSide, quantity: f64)
        -> Result<Fill>;
}
