/// RSI (Relative Strength Index) series over a close-price window.
///
/// Uses Wilder's smoothed moving average (same as TradingView / standard RSI):
/// the first `period` price changes seed the average gain/loss, every later
/// change is smoothed in. Entries `0..period` are `None`; the first defined
/// reading sits at index `period`.
pub fn rsi_series(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    assert!(period >= 2, "RSI period must be >= 2");

    let mut out = vec![None; closes.len()];
    if closes.len() <= period {
        return out;
    }

    // Seed averages over the initial `period` changes
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for w in closes.windows(2).take(period) {
        let change = w[1] - w[0];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss += -change;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = Some(rsi_value(avg_gain, avg_loss));

    // Wilder smoothing over the remaining changes
    for (i, w) in closes.windows(2).enumerate().skip(period) {
        let change = w[1] - w[0];
        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { -change } else { 0.0 };
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
        out[i + 1] = Some(rsi_value(avg_gain, avg_loss));
    }

    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}
