use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use common::{Balances, ExchangeClient, Fill, Pair, Result, Signal, Trade};

use crate::state::SharedState;

/// Minimum free quote balance required to fund a market buy, in quote units.
/// At or below this the signal is skipped, not failed.
const MIN_QUOTE_BALANCE: f64 = 10.0;

/// Free base balance at or below this is dust, not a sellable position.
const DUST_THRESHOLD: f64 = 0.0001;

/// Applies the trade-execution policy for one signal: dry-run synthesis or
/// balance-gated live sizing, order placement, and the trade-log commit.
///
/// This is the ONLY component that calls `ExchangeClient::place_market_order`.
/// It runs on the poll-loop task, which keeps the shared state single-writer.
#[derive(Clone)]
pub struct TradeExecutor {
    client: Arc<dyn ExchangeClient>,
    state: SharedState,
    pair: Pair,
    dry_run: bool,
    has_credentials: bool,
}

impl TradeExecutor {
    pub fn new(
        client: Arc<dyn ExchangeClient>,
        state: SharedState,
        pair: Pair,
        dry_run: bool,
        has_credentials: bool,
    ) -> Self {
        Self {
            client,
            state,
            pair,
            dry_run,
            has_credentials,
        }
    }

    /// Refresh the balance snapshot in the shared state and return it.
    ///
    /// Without credentials the snapshot is simulated; a failed fetch stores
    /// the error sentinel in place of real holdings, so callers gating on
    /// `free()` see zero and skip.
    pub async fn refresh_balances(&self) -> Balances {
        let balances = if self.has_credentials {
            match self.client.fetch_balances().await {
                Ok(map) => Balances::Available(map),
                Err(e) => {
                    error!(error = %e, "Failed to fetch balances");
                    Balances::errored(format!("API error: {e}"))
                }
            }
        } else {
            Balances::simulated(&self.pair)
        };

        self.state.write().await.balances = balances.clone();
        balances
    }

    /// Execute one signal.
    ///
    /// The ticker price is fetched before any sizing decision; a failure
    /// there aborts with no state mutation. Insufficient funds is a logged
    /// skip. The trade log and last-signal are committed only on the
    /// successful path, so a failed or skipped execution leaves the
    /// suppression state untouched.
    pub async fn execute(&self, signal: Signal) -> Result<()> {
        info!(signal = %signal, pair = %self.pair, "Signal detected");
        let price = self.client.ticker_price(&self.pair).await?;

        let fill = if self.dry_run {
            info!(signal = %signal, price, "[DRY RUN] Would execute order");
            Fill::dry_run(&self.pair, signal.into(), price)
        } else {
            match self.execute_live(signal, price).await? {
                Some(fill) => fill,
                None => return Ok(()),
            }
        };

        let trade = Trade {
            timestamp: Utc::now(),
            pair: self.pair.to_string(),
            side: signal,
            price,
            order_id: fill.order_id,
        };

        let mut state = self.state.write().await;
        state.trades.push(trade);
        state.last_signal = Some(signal);
        Ok(())
    }

    /// Live sizing: buys deploy the full free quote balance, sells the full
    /// free base balance. Returns `None` for the insufficient-funds skip.
    async fn execute_live(&self, signal: Signal, price: f64) -> Result<Option<Fill>> {
        let balances = self.refresh_balances().await;

        let quantity = match signal {
            Signal::Buy => {
                let quote_free = balances.free(&self.pair.quote);
                if quote_free <= MIN_QUOTE_BALANCE {
                    warn!(
                        asset = %self.pair.quote,
                        free = quote_free,
                        "Insufficient quote balance for BUY"
                    );
                    return Ok(None);
                }
                quote_free / price
            }
            Signal::Sell => {
                let base_free = balances.free(&self.pair.base);
                if base_free <= DUST_THRESHOLD {
                    warn!(
                        asset = %self.pair.base,
                        free = base_free,
                        "Insufficient base balance for SELL"
                    );
                    return Ok(None);
                }
                base_free
            }
        };

        let fill = self
            .client
            .place_market_order(&self.pair, signal.into(), quantity)
            .await?;

        info!(
            order_id = %fill.order_id,
            qty = fill.quantity,
            price = fill.fill_price,
            "Executed order"
        );
        Ok(Some(fill))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::RwLock;

    use common::{Candle, Error, OrderSide, OrderStatus};

    use crate::state::BotState;

    #[derive(Default)]
    struct StubExchange {
        price: f64,
        balances: HashMap<String, f64>,
        fail_ticker: bool,
        fail_balances: bool,
        fail_orders: bool,
        orders: Mutex<Vec<(OrderSide, f64)>>,
    }

    #[async_trait]
    impl ExchangeClient for StubExchange {
        async fn fetch_candles(&self, _pair: &Pair, _timeframe: &str) -> Result<Vec<Candle>> {
            Ok(Vec::new())
        }

        async fn ticker_price(&self, _pair: &Pair) -> Result<f64> {
            if self.fail_ticker {
                return Err(Error::Http("ticker endpoint down".to_string()));
            }
            Ok(self.price)
        }

        async fn fetch_balances(&self) -> Result<HashMap<String, f64>> {
            if self.fail_balances {
                return Err(Error::Exchange("account endpoint down".to_string()));
            }
            Ok(self.balances.clone())
        }

        async fn place_market_order(
            &self,
            pair: &Pair,
            side: OrderSide,
            quantity: f64,
        ) -> Result<Fill> {
            if self.fail_orders {
                return Err(Error::Exchange("order rejected".to_string()));
            }
            self.orders.lock().unwrap().push((side, quantity));
            Ok(Fill {
                order_id: "ord-1".to_string(),
                pair: pair.to_string(),
                side,
                quantity,
                fill_price: self.price,
                status: OrderStatus::Closed,
                timestamp: Utc::now(),
            })
        }
    }

    fn executor(
        stub: StubExchange,
        dry_run: bool,
        has_credentials: bool,
    ) -> (TradeExecutor, SharedState, Arc<StubExchange>) {
        let client = Arc::new(stub);
        let state: SharedState = Arc::new(RwLock::new(BotState::default()));
        let pair = Pair::parse("BTC/USDT").unwrap();
        let executor = TradeExecutor::new(
            client.clone(),
            state.clone(),
            pair,
            dry_run,
            has_credentials,
        );
        (executor, state, client)
    }

    #[tokio::test]
    async fn dry_run_always_records_a_trade() {
        let stub = StubExchange {
            price: 42_000.0,
            ..Default::default()
        };
        let (executor, state, client) = executor(stub, true, false);

        executor.execute(Signal::Buy).await.unwrap();

        let state = state.read().await;
        assert_eq!(state.trades.len(), 1);
        assert_eq!(state.trades[0].order_id, "dry-run");
        assert_eq!(state.trades[0].price, 42_000.0);
        assert_eq!(state.last_signal, Some(Signal::Buy));
        assert!(client.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dry_run_ignores_balance_contents_entirely() {
        // Even a dead account endpoint cannot stop a dry-run trade
        let stub = StubExchange {
            price: 100.0,
            fail_balances: true,
            ..Default::default()
        };
        let (executor, state, _) = executor(stub, true, true);

        executor.execute(Signal::Sell).await.unwrap();
        assert_eq!(state.read().await.trades.len(), 1);
    }

    #[tokio::test]
    async fn dry_run_fill_is_zero_quantity_and_closed() {
        let pair = Pair::parse("BTC/USDT").unwrap();
        let fill = Fill::dry_run(&pair, OrderSide::Buy, 42_000.0);
        assert_eq!(fill.quantity, 0.0);
        assert_eq!(fill.status, OrderStatus::Closed);
        assert_eq!(fill.fill_price, 42_000.0);
    }

    #[tokio::test]
    async fn live_buy_at_exactly_the_minimum_is_skipped() {
        // The notional guard is a strict `>`: exactly 10 is not enough
        let stub = StubExchange {
            price: 100.0,
            balances: HashMap::from([("USDT".to_string(), 10.0)]),
            ..Default::default()
        };
        let (executor, state, client) = executor(stub, false, true);

        executor.execute(Signal::Buy).await.unwrap();

        assert!(client.orders.lock().unwrap().is_empty());
        let state = state.read().await;
        assert!(state.trades.is_empty());
        assert_eq!(state.last_signal, None);
    }

    #[tokio::test]
    async fn live_buy_deploys_the_full_quote_balance() {
        let stub = StubExchange {
            price: 100.0,
            balances: HashMap::from([("USDT".to_string(), 1000.0)]),
            ..Default::default()
        };
        let (executor, state, client) = executor(stub, false, true);

        executor.execute(Signal::Buy).await.unwrap();

        let orders = client.orders.lock().unwrap();
        assert_eq!(orders.as_slice(), &[(OrderSide::Buy, 10.0)]);

        let state = state.read().await;
        assert_eq!(state.trades.len(), 1);
        assert_eq!(state.trades[0].order_id, "ord-1");
        assert_eq!(state.last_signal, Some(Signal::Buy));
        assert_eq!(state.balances.free("USDT"), 1000.0);
    }

    #[tokio::test]
    async fn live_sell_below_dust_threshold_is_skipped() {
        let stub = StubExchange {
            price: 100.0,
            balances: HashMap::from([("BTC".to_string(), 0.0001)]),
            ..Default::default()
        };
        let (executor, state, client) = executor(stub, false, true);

        executor.execute(Signal::Sell).await.unwrap();

        assert!(client.orders.lock().unwrap().is_empty());
        assert!(state.read().await.trades.is_empty());
    }

    #[tokio::test]
    async fn live_sell_liquidates_the_entire_base_balance() {
        let stub = StubExchange {
            price: 100.0,
            balances: HashMap::from([("BTC".to_string(), 0.5)]),
            ..Default::default()
        };
        let (executor, state, client) = executor(stub, false, true);

        executor.execute(Signal::Sell).await.unwrap();

        let orders = client.orders.lock().unwrap();
        assert_eq!(orders.as_slice(), &[(OrderSide::Sell, 0.5)]);
        assert_eq!(state.read().await.last_signal, Some(Signal::Sell));
    }

    #[tokio::test]
    async fn order_failure_leaves_trade_log_and_last_signal_untouched() {
        let stub = StubExchange {
            price: 100.0,
            balances: HashMap::from([("USDT".to_string(), 1000.0)]),
            fail_orders: true,
            ..Default::default()
        };
        let (executor, state, _) = executor(stub, false, true);

        assert!(executor.execute(Signal::Buy).await.is_err());

        let state = state.read().await;
        assert!(state.trades.is_empty());
        assert_eq!(state.last_signal, None);
    }

    #[tokio::test]
    async fn ticker_failure_aborts_before_any_balance_refresh() {
        let stub = StubExchange {
            fail_ticker: true,
            balances: HashMap::from([("USDT".to_string(), 1000.0)]),
            ..Default::default()
        };
        let (executor, state, client) = executor(stub, false, true);

        assert!(executor.execute(Signal::Buy).await.is_err());

        let state = state.read().await;
        assert!(state.trades.is_empty());
        assert!(client.orders.lock().unwrap().is_empty());
        // Balances were never refreshed, the default empty snapshot remains
        match &state.balances {
            Balances::Available(map) => assert!(map.is_empty()),
            Balances::Errored { .. } => panic!("no balance call should have happened"),
        }
    }

    #[tokio::test]
    async fn balance_fetch_failure_records_the_sentinel_and_skips() {
        let stub = StubExchange {
            price: 100.0,
            fail_balances: true,
            ..Default::default()
        };
        let (executor, state, client) = executor(stub, false, true);

        executor.execute(Signal::Buy).await.unwrap();

        assert!(client.orders.lock().unwrap().is_empty());
        let state = state.read().await;
        assert!(state.trades.is_empty());
        assert!(matches!(state.balances, Balances::Errored { .. }));
    }

    #[tokio::test]
    async fn simulated_balances_when_no_credentials() {
        let stub = StubExchange::default();
        let (executor, state, _) = executor(stub, true, false);

        let balances = executor.refresh_balances().await;
        assert_eq!(balances.free("USDT"), 1000.0);
        assert_eq!(balances.free("BTC"), 0.0);
        assert_eq!(state.read().await.balances.free("USDT"), 1000.0);
    }
}
