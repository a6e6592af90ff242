/// EMA (Exponential Moving Average) series over a close-price window.
///
/// Smoothing factor `2 / (period + 1)`, seeded with the SMA of the first
/// `period` closes. Entries `0..period-1` are `None`; the seed sits at index
/// `period - 1`.
pub fn ema_series(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    assert!(period >= 1, "EMA period must be >= 1");

    let mut out = vec![None; closes.len()];
    if closes.len() < period {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = closes[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(ema);

    for (i, &price) in closes.iter().enumerate().skip(period) {
        ema = price * k + ema * (1.0 - k);
        out[i] = Some(ema);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_undefined_when_insufficient_data() {
        let prices = vec![100.0, 102.0];
        assert!(ema_series(&prices, 5).iter().all(Option::is_none));
    }

    #[test]
    fn ema_seeds_with_sma_at_period_minus_one() {
        let prices = vec![100.0, 102.0, 104.0, 106.0, 108.0];
        let series = ema_series(&prices, 5);
        assert!(series[..4].iter().all(Option::is_none));
        assert_eq!(series[4], Some(104.0));
    }

    #[test]
    fn ema_follows_the_recurrence_after_the_seed() {
        let prices = vec![100.0, 102.0, 104.0, 106.0, 108.0, 110.0];
        let series = ema_series(&prices, 5);
        let k = 2.0 / 6.0;
        let expected = 110.0 * k + 104.0 * (1.0 - k);
        let last = series[5].unwrap();
        assert!((last - expected).abs() < 1e-9, "got {last}, expected {expected}");
    }

    #[test]
    fn ema_tracks_above_seed_in_uptrend() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let series = ema_series(&prices, 5);
        assert!(series.last().copied().flatten().unwrap() > 104.0);
    }

    #[test]
    fn ema_empty_input_yields_empty_series() {
        assert!(ema_series(&[], 5).is_empty());
    }
}
