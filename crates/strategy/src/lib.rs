pub mod indicators;
pub mod signal;

pub use indicators::{ema_series, rsi_series, IndicatorSeries};
pub use signal::SignalDetector;
