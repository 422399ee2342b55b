//! Synthetic market data.
//!
//! Deterministic random-walk bars for paper mode, so the whole engine
//! runs with no external data feed. Not a market model; just plausible
//! numbers with a controllable seed.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use sentinel_core::{Bar, BarWindow, Price};

use crate::error::ProviderResult;
use crate::traits::{MarketDataProvider, Timeframe};

/// Linear congruential step (Numerical Recipes constants).
fn lcg(state: &mut u64) -> u64 {
    *state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    *state
}

/// Random-walk market data generator.
pub struct SyntheticMarketData {
    state: Mutex<Inner>,
}

struct Inner {
    seed: u64,
    price: Decimal,
    /// Per-bar move in basis points.
    step_bps: u32,
}

impl SyntheticMarketData {
    #[must_use]
    pub fn new(start_price: Decimal, step_bps: u32, seed: u64) -> Self {
        Self {
            state: Mutex::new(Inner {
                seed,
                price: start_price,
                step_bps,
            }),
        }
    }

    fn next_price(inner: &mut Inner) -> Decimal {
        let roll = lcg(&mut inner.seed);
        let step = inner.price * Decimal::from(inner.step_bps) / Decimal::from(10_000);
        // Even roll walks up, odd walks down.
        if roll % 2 == 0 {
            inner.price += step;
        } else {
            inner.price -= step;
        }
        inner.price
    }

    fn timeframe_minutes(timeframe: Timeframe) -> i64 {
        match timeframe {
            Timeframe::Min1 => 1,
            Timeframe::Min5 => 5,
            Timeframe::Min15 => 15,
            Timeframe::Hour1 => 60,
            Timeframe::Day1 => 1_440,
        }
    }
}

#[async_trait]
impl MarketDataProvider for SyntheticMarketData {
    async fn get_bars(
        &self,
        _symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> ProviderResult<BarWindow> {
        let mut inner = self.state.lock();
        let minutes = Self::timeframe_minutes(timeframe);
        let now = Utc::now();

        let bars = (0..count)
            .map(|i| {
                let open = inner.price;
                let close = Self::next_price(&mut inner);
                let (high, low) = if close >= open { (close, open) } else { (open, close) };
                let age = (count - 1 - i) as i64;
                Bar::new(
                    Price::new(open),
                    Price::new(high),
                    Price::new(low),
                    Price::new(close),
                    Decimal::from(1_000),
                    now - Duration::minutes(age * minutes),
                )
            })
            .collect();
        Ok(BarWindow::new(bars))
    }

    async fn latest_price(&self, _symbol: &str) -> ProviderResult<Price> {
        Ok(Price::new(self.state.lock().price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_bars_are_fresh_and_complete() {
        let data = SyntheticMarketData::new(dec!(100), 10, 42);
        let window = data.get_bars("AAPL", Timeframe::Min5, 30).await.unwrap();
        assert_eq!(window.len(), 30);
        assert!(window.quality(20, ChronoDuration::minutes(10)).is_ok());
    }

    #[tokio::test]
    async fn test_deterministic_for_seed() {
        let a = SyntheticMarketData::new(dec!(100), 10, 7);
        let b = SyntheticMarketData::new(dec!(100), 10, 7);
        let wa = a.get_bars("AAPL", Timeframe::Min5, 10).await.unwrap();
        let wb = b.get_bars("AAPL", Timeframe::Min5, 10).await.unwrap();
        assert_eq!(wa.closes(), wb.closes());
    }

    #[tokio::test]
    async fn test_latest_price_tracks_walk() {
        let data = SyntheticMarketData::new(dec!(100), 10, 42);
        data.get_bars("AAPL", Timeframe::Min5, 5).await.unwrap();
        let px = data.latest_price("AAPL").await.unwrap();
        assert!(px.is_positive());
    }
}
