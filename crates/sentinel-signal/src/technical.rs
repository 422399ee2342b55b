//! Local technical indicators.
//!
//! Computed from the bar window alone so the engine keeps producing
//! signals when the advisory provider is down.

/// Simple moving average over the last `period` values.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let tail = &values[values.len() - period..];
    Some(tail.iter().sum::<f64>() / period as f64)
}

/// Relative strength index over the last `period` deltas.
///
/// Simple average-gain / average-loss form. All losses returns 0,
/// all gains returns 100.
pub fn rsi(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period + 1 {
        return None;
    }
    let tail = &values[values.len() - period - 1..];
    let mut gains = 0.0;
    let mut losses = 0.0;
    for pair in tail.windows(2) {
        let delta = pair[1] - pair[0];
        if delta > 0.0 {
            gains += delta;
        } else {
            losses -= delta;
        }
    }
    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;
    if avg_loss == 0.0 {
        return Some(if avg_gain == 0.0 { 50.0 } else { 100.0 });
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Bullishness score in [0, 1] from closing prices, oldest first.
///
/// Starts from a neutral 0.5 and applies three bounded adjustments:
/// price versus the 20-period average, the 10/20 average crossover,
/// and a 14-period RSI oversold/overbought band. Indicators that
/// cannot be computed contribute nothing.
pub fn technical_score(closes: &[f64]) -> f64 {
    let mut score = 0.5;

    let last = match closes.last() {
        Some(v) => *v,
        None => return score,
    };

    if let Some(sma20) = sma(closes, 20) {
        if last > sma20 {
            score += 0.15;
        } else if last < sma20 {
            score -= 0.15;
        }

        if let Some(sma10) = sma(closes, 10) {
            if sma10 > sma20 {
                score += 0.15;
            } else if sma10 < sma20 {
                score -= 0.15;
            }
        }
    }

    if let Some(rsi14) = rsi(closes, 14) {
        if rsi14 < 30.0 {
            score += 0.20; // oversold, favors entry
        } else if rsi14 > 70.0 {
            score -= 0.20; // overbought
        }
    }

    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    fn falling(n: usize) -> Vec<f64> {
        (0..n).map(|i| 200.0 - i as f64).collect()
    }

    #[test]
    fn test_sma() {
        let v = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(sma(&v, 5), Some(3.0));
        assert_eq!(sma(&v, 2), Some(4.5));
        assert_eq!(sma(&v, 6), None);
        assert_eq!(sma(&v, 0), None);
    }

    #[test]
    fn test_rsi_extremes() {
        assert_eq!(rsi(&rising(20), 14), Some(100.0));
        assert_eq!(rsi(&falling(20), 14), Some(0.0));
        assert_eq!(rsi(&[100.0; 20], 14), Some(50.0));
        assert_eq!(rsi(&rising(10), 14), None);
    }

    #[test]
    fn test_rsi_mixed() {
        // Alternating +2/-1 deltas: avg gain 1.0, avg loss 0.5, rs=2.
        let mut v = vec![100.0];
        for i in 0..14 {
            let last = *v.last().unwrap();
            v.push(if i % 2 == 0 { last + 2.0 } else { last - 1.0 });
        }
        let r = rsi(&v, 14).unwrap();
        assert!(r > 50.0 && r < 100.0);
    }

    #[test]
    fn test_score_uptrend_bullish() {
        // Steady uptrend: price above sma20, sma10 above sma20, but
        // RSI pegged overbought pulls it back.
        let score = technical_score(&rising(30));
        assert!((score - 0.6).abs() < 1e-9); // 0.5 + 0.15 + 0.15 - 0.20
    }

    #[test]
    fn test_score_downtrend_bearish() {
        let score = technical_score(&falling(30));
        assert!((score - 0.4).abs() < 1e-9); // 0.5 - 0.15 - 0.15 + 0.20
    }

    #[test]
    fn test_score_insufficient_data_neutral() {
        assert_eq!(technical_score(&[]), 0.5);
        assert_eq!(technical_score(&rising(5)), 0.5);
    }

    #[test]
    fn test_score_flat_market_neutral() {
        assert_eq!(technical_score(&[100.0; 30]), 0.5);
    }

    #[test]
    fn test_score_clamped() {
        let score = technical_score(&rising(30));
        assert!((0.0..=1.0).contains(&score));
    }
}
