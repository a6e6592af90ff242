use std::time::Duration;

use crate::Pair;

/// Placeholder value shipped in example env files. Credentials equal to this
/// are treated as absent, which forces dry-run mode.
const PLACEHOLDER_KEY: &str = "your_api_key_here";

/// Kline intervals accepted by the exchange.
const TIMEFRAMES: &[&str] = &[
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w", "1M",
];

/// Binance API credentials. Only present when both halves are set to
/// something other than the placeholder.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

/// All configuration loaded from environment variables at startup.
/// Every trading knob has the stock default; invalid values cause an
/// immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    // Trading
    pub pair: Pair,
    pub timeframe: String,
    pub rsi_period: usize,
    pub ema_period: usize,
    /// Effective dry-run flag: the DRY_RUN variable, forced to true whenever
    /// no real credentials are configured.
    pub dry_run: bool,
    pub poll_interval: Duration,

    // Exchange credentials
    pub credentials: Option<Credentials>,

    // Control surface
    pub api_port: u16,
    /// Bearer token for the control endpoints. Auth is disabled when unset.
    pub api_token: Option<String>,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on any invalid value.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let symbol = optional_env("SYMBOL").unwrap_or_else(|| "BTC/USDT".to_string());
        let pair = Pair::parse(&symbol)
            .unwrap_or_else(|e| panic!("ERROR: SYMBOL must be BASE/QUOTE: {e}"));

        let timeframe = optional_env("TIMEFRAME").unwrap_or_else(|| "1h".to_string());
        if !TIMEFRAMES.contains(&timeframe.as_str()) {
            panic!("ERROR: TIMEFRAME '{timeframe}' is not a supported kline interval");
        }

        let rsi_period = parsed_env("RSI_PERIOD", 14usize);
        if rsi_period < 2 {
            panic!("ERROR: RSI_PERIOD must be >= 2, got {rsi_period}");
        }
        let ema_period = parsed_env("EMA_PERIOD", 50usize);
        if ema_period < 1 {
            panic!("ERROR: EMA_PERIOD must be >= 1, got {ema_period}");
        }

        let interval_secs = parsed_env("UPDATE_INTERVAL", 60u64);
        if interval_secs == 0 {
            panic!("ERROR: UPDATE_INTERVAL must be at least 1 second");
        }

        let credentials = load_credentials();
        let dry_run = parsed_env("DRY_RUN", true) || credentials.is_none();

        Config {
            pair,
            timeframe,
            rsi_period,
            ema_period,
            dry_run,
            poll_interval: Duration::from_secs(interval_secs),
            credentials,
            api_port: parsed_env("API_PORT", 5000u16),
            api_token: optional_env("API_TOKEN"),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }
}

fn load_credentials() -> Option<Credentials> {
    let api_key = optional_env("BINANCE_API_KEY")?;
    let api_secret = optional_env("BINANCE_API_SECRET")?;
    if api_key == PLACEHOLDER_KEY || api_secret == PLACEHOLDER_KEY {
        return None;
    }
    if api_key.is_empty() || api_secret.is_empty() {
        return None;
    }
    Some(Credentials {
        api_key,
        api_secret,
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("ERROR: environment variable '{key}' has invalid value '{raw}'")),
        Err(_) => default,
    }
}
