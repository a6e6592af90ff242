use common::Signal;

use crate::indicators::IndicatorSeries;

/// Edge-triggered crossover detector over the last two rows of an indicator
/// series.
///
/// BUY requires an upward RSI crossing of the oversold threshold confirmed by
/// price above trend on the same row. SELL fires on a downward RSI crossing
/// of the overbought threshold OR on price below trend; either alone is
/// enough. The BUY rule is checked first and short-circuits the SELL rule.
#[derive(Debug, Clone)]
pub struct SignalDetector {
    pub rsi_period: usize,
    pub ema_period: usize,
}

impl SignalDetector {
    pub const OVERSOLD: f64 = 30.0;
    pub const OVERBOUGHT: f64 = 70.0;

    pub fn new(rsi_period: usize, ema_period: usize) -> Self {
        Self {
            rsi_period,
            ema_period,
        }
    }

    /// Minimum window length for a decision: the longest lookback plus the
    /// previous row.
    pub fn min_candles(&self) -> usize {
        self.rsi_period.max(self.ema_period) + 1
    }

    /// Classify the last two rows. `closes` must be the price sequence the
    /// series was computed from. Returns `None` when the window is too short
    /// or either of the last two rows is still undefined.
    pub fn detect(&self, closes: &[f64], series: &IndicatorSeries) -> Option<Signal> {
        let n = closes.len();
        if n < self.min_candles() || series.len() != n {
            return None;
        }

        let prev_rsi = series.rsi[n - 2]?;
        let last_rsi = series.rsi[n - 1]?;
        series.ema[n - 2]?;
        let last_ema = series.ema[n - 1]?;
        let last_close = closes[n - 1];

        // Buy when RSI crosses above oversold AND price confirms above trend
        if prev_rsi <= Self::OVERSOLD && last_rsi > Self::OVERSOLD && last_close > last_ema {
            return Some(Signal::Buy);
        }

        // Sell when RSI crosses below overbought OR price falls below trend
        if (prev_rsi >= Self::OVERBOUGHT && last_rsi < Self::OVERBOUGHT) || last_close < last_ema {
            return Some(Signal::Sell);
        }

        None
    }
}
