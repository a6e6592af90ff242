pub mod ema;
pub mod rsi;

pub use ema::ema_series;
pub use rsi::rsi_series;

use common::Candle;

/// RSI and EMA readings aligned index-for-index with the candle window that
/// produced them. `None` marks insufficient lookback at that position.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub rsi: Vec<Option<f64>>,
    pub ema: Vec<Option<f64>>,
}

impl IndicatorSeries {
    /// Compute both indicator series over the close prices of `candles`.
    /// Pure; an empty window yields an empty series, a short one simply
    /// carries longer `None` prefixes.
    pub fn compute(candles: &[Candle], rsi_period: usize, ema_period: usize) -> Self {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        Self {
            rsi: rsi_series(&closes, rsi_period),
            ema: ema_series(&closes, ema_period),
        }
    }

    /// Number of rows; always equals the candle window length.
    pub fn len(&self) -> usize {
        self.rsi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rsi.is_empty()
    }
}
