use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use api::AppState;
use common::{Config, ExchangeClient};
use engine::{BinanceClient, BotController};

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    info!(
        pair = %cfg.pair,
        timeframe = %cfg.timeframe,
        dry_run = cfg.dry_run,
        "Pulsebot starting"
    );
    if cfg.dry_run && !cfg.has_credentials() {
        info!("No exchange credentials configured; dry-run is forced");
    }

    // ── Exchange client ───────────────────────────────────────────────────────
    let client: Arc<dyn ExchangeClient> = Arc::new(BinanceClient::new(cfg.credentials.clone()));

    // ── Bot controller ────────────────────────────────────────────────────────
    let api_port = cfg.api_port;
    let api_token = cfg.api_token.clone();
    let controller = Arc::new(BotController::new(cfg, client));

    // ── Control API ───────────────────────────────────────────────────────────
    let api_state = AppState {
        controller: controller.clone(),
        api_token,
    };
    tokio::spawn(api::serve(api_state, api_port));

    // The bot itself stays stopped until POST /start arrives
    info!("Control surface up. Waiting for shutdown signal.");
    tokio::signal::ctrl_c().await.unwrap();
    info!("Shutdown signal received. Stopping bot.");
    controller.stop().await;
}
