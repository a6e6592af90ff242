use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use common::{BotStatus, Config, ExchangeClient, Pair, Result};
use strategy::{IndicatorSeries, SignalDetector};

use crate::executor::TradeExecutor;
use crate::state::{BotState, SharedState};

/// Sleep applied when a poll iteration fails, before the next attempt.
const ERROR_BACKOFF: Duration = Duration::from_secs(10);

/// How long `stop()` waits for the poll loop to exit before aborting it.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns the bot lifecycle: the Stopped/Running flag, the background poll
/// loop, and the shared state the control surface reads.
///
/// Constructed once at startup with its collaborators injected; the HTTP
/// layer holds it behind an `Arc` and only calls `start`/`stop`/`status`.
pub struct BotController {
    cfg: Config,
    client: Arc<dyn ExchangeClient>,
    executor: TradeExecutor,
    running: Arc<AtomicBool>,
    state: SharedState,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl BotController {
    pub fn new(cfg: Config, client: Arc<dyn ExchangeClient>) -> Self {
        let state: SharedState = Arc::new(RwLock::new(BotState::default()));
        let executor = TradeExecutor::new(
            client.clone(),
            state.clone(),
            cfg.pair.clone(),
            cfg.dry_run,
            cfg.has_credentials(),
        );
        Self {
            cfg,
            client,
            executor,
            running: Arc::new(AtomicBool::new(false)),
            state,
            worker: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn dry_run(&self) -> bool {
        self.cfg.dry_run
    }

    /// Start the poll loop. A no-op when already running.
    ///
    /// The first balance snapshot is taken synchronously so `/status` has
    /// data before the first poll tick. Returns the running flag.
    pub async fn start(&self) -> bool {
        if self.running.swap(true, Ordering::SeqCst) {
            info!("Bot already running");
            return true;
        }

        self.executor.refresh_balances().await;

        let poll = PollLoop {
            running: self.running.clone(),
            client: self.client.clone(),
            executor: self.executor.clone(),
            state: self.state.clone(),
            detector: SignalDetector::new(self.cfg.rsi_period, self.cfg.ema_period),
            pair: self.cfg.pair.clone(),
            timeframe: self.cfg.timeframe.clone(),
            poll_interval: self.cfg.poll_interval,
        };
        *self.worker.lock().await = Some(tokio::spawn(poll.run()));

        info!(pair = %self.cfg.pair, dry_run = self.cfg.dry_run, "Bot started");
        true
    }

    /// Stop the poll loop: clear the flag (the loop observes it between
    /// iterations, nothing is interrupted preemptively), then wait a bounded
    /// time for the task to exit. The bot is stopped when this returns even
    /// if the task had to be aborted mid-sleep or mid-call.
    pub async fn stop(&self) -> bool {
        if !self.running.swap(false, Ordering::SeqCst) {
            info!("Bot already stopped");
            return false;
        }

        if let Some(mut handle) = self.worker.lock().await.take() {
            match tokio::time::timeout(STOP_TIMEOUT, &mut handle).await {
                Ok(_) => info!("Bot stopped"),
                Err(_) => {
                    warn!(timeout = ?STOP_TIMEOUT, "Poll loop did not exit in time; aborting task");
                    handle.abort();
                }
            }
        }
        false
    }

    /// Advisory snapshot for the control surface. Readers may observe a
    /// snapshot mid-update; status is informational only.
    pub async fn status(&self) -> BotStatus {
        let state = self.state.read().await;
        BotStatus {
            is_running: self.is_running(),
            symbol: self.cfg.pair.to_string(),
            last_signal: state.last_signal,
            balance: state.balances.clone(),
            trades: state.trades.clone(),
        }
    }
}

/// The background worker: one iteration per tick while the running flag
/// holds. Fetch failures feed the backoff branch; execution failures are
/// logged and the loop keeps its normal cadence. Only `stop()` ends it.
struct PollLoop {
    running: Arc<AtomicBool>,
    client: Arc<dyn ExchangeClient>,
    executor: TradeExecutor,
    state: SharedState,
    detector: SignalDetector,
    pair: Pair,
    timeframe: String,
    poll_interval: Duration,
}

impl PollLoop {
    async fn run(self) {
        info!("Poll loop running");
        while self.running.load(Ordering::SeqCst) {
            match self.poll_once().await {
                Ok(()) => tokio::time::sleep(self.poll_interval).await,
                Err(e) => {
                    error!(error = %e, "Poll iteration failed");
                    tokio::time::sleep(ERROR_BACKOFF).await;
                }
            }
        }
        info!("Poll loop exited");
    }

    async fn poll_once(&self) -> Result<()> {
        self.executor.refresh_balances().await;
        debug!("Checking for signals");

        let candles = self.client.fetch_candles(&self.pair, &self.timeframe).await?;
        if candles.is_empty() {
            return Ok(());
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let series = IndicatorSeries::compute(
            &candles,
            self.detector.rsi_period,
            self.detector.ema_period,
        );

        let Some(signal) = self.detector.detect(&closes, &series) else {
            return Ok(());
        };

        // Re-arm only on a signal change; a crossover condition persisting
        // across polls must not stack orders
        if self.state.read().await.last_signal == Some(signal) {
            debug!(signal = %signal, "Signal unchanged since last trade; suppressed");
            return Ok(());
        }

        if let Err(e) = self.executor.execute(signal).await {
            error!(error = %e, signal = %signal, "Trade execution failed");
        }
        Ok(())
    }
}
