//! OHLCV bars and data-quality validation.
//!
//! The engine treats stale or incomplete market data as a skip, not an
//! error, so the validation here returns a descriptive `DataQuality`
//! verdict rather than failing.

use crate::Price;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Single OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Bar {
    pub fn new(
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            open,
            high,
            low,
            close,
            volume,
            timestamp,
        }
    }

    /// Structurally valid bar: positive prices, high >= low.
    pub fn is_valid(&self) -> bool {
        self.open.is_positive()
            && self.high.is_positive()
            && self.low.is_positive()
            && self.close.is_positive()
            && self.high >= self.low
    }
}

/// Data-quality verdict for a bar window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataQuality {
    /// Fresh and complete, safe to analyze.
    Ok,
    /// Latest bar older than the allowed age.
    Stale { age_secs: i64, max_secs: i64 },
    /// Fewer bars than analysis requires.
    Incomplete { got: usize, need: usize },
    /// A bar failed structural validation.
    Malformed { index: usize },
}

impl DataQuality {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Human-readable skip reason for the decision log.
    pub fn reason(&self) -> String {
        match self {
            Self::Ok => "ok".to_string(),
            Self::Stale { age_secs, max_secs } => {
                format!("market data stale: {age_secs}s old > {max_secs}s max")
            }
            Self::Incomplete { got, need } => {
                format!("insufficient bars: {got} < {need} required")
            }
            Self::Malformed { index } => format!("malformed bar at index {index}"),
        }
    }
}

/// Ordered window of bars (oldest first) with validation helpers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarWindow {
    bars: Vec<Bar>,
}

impl BarWindow {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Closing prices, oldest first.
    pub fn closes(&self) -> Vec<Decimal> {
        self.bars.iter().map(|b| b.close.inner()).collect()
    }

    /// Latest close, if any bars exist.
    pub fn last_close(&self) -> Option<Price> {
        self.bars.last().map(|b| b.close)
    }

    /// Validate freshness and completeness against analysis requirements.
    ///
    /// Checks, in order: minimum bar count, structural validity of each
    /// bar, and age of the newest bar.
    pub fn quality(&self, min_bars: usize, max_age: Duration) -> DataQuality {
        if self.bars.len() < min_bars {
            return DataQuality::Incomplete {
                got: self.bars.len(),
                need: min_bars,
            };
        }

        for (i, bar) in self.bars.iter().enumerate() {
            if !bar.is_valid() {
                return DataQuality::Malformed { index: i };
            }
        }

        if let Some(last) = self.bars.last() {
            let age = Utc::now() - last.timestamp;
            if age > max_age {
                return DataQuality::Stale {
                    age_secs: age.num_seconds(),
                    max_secs: max_age.num_seconds(),
                };
            }
        }

        DataQuality::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar_at(close: Decimal, age_secs: i64) -> Bar {
        let px = Price::new(close);
        Bar::new(
            px,
            Price::new(close + dec!(1)),
            Price::new(close - dec!(1)),
            px,
            dec!(1000),
            Utc::now() - Duration::seconds(age_secs),
        )
    }

    fn window(count: usize, last_age_secs: i64) -> BarWindow {
        let bars = (0..count)
            .map(|i| {
                let age = last_age_secs + ((count - 1 - i) as i64) * 60;
                bar_at(dec!(100), age)
            })
            .collect();
        BarWindow::new(bars)
    }

    #[test]
    fn test_quality_ok() {
        let w = window(30, 10);
        assert!(w.quality(20, Duration::minutes(5)).is_ok());
    }

    #[test]
    fn test_quality_incomplete() {
        let w = window(5, 10);
        match w.quality(20, Duration::minutes(5)) {
            DataQuality::Incomplete { got, need } => {
                assert_eq!(got, 5);
                assert_eq!(need, 20);
            }
            other => panic!("expected Incomplete, got {other:?}"),
        }
    }

    #[test]
    fn test_quality_stale() {
        let w = window(30, 3600);
        match w.quality(20, Duration::minutes(5)) {
            DataQuality::Stale { age_secs, .. } => assert!(age_secs >= 3600),
            other => panic!("expected Stale, got {other:?}"),
        }
    }

    #[test]
    fn test_quality_malformed() {
        let mut bars = window(30, 10).bars().to_vec();
        bars[3].high = Price::new(dec!(1));
        bars[3].low = Price::new(dec!(200)); // high < low
        let w = BarWindow::new(bars);
        match w.quality(20, Duration::minutes(5)) {
            DataQuality::Malformed { index } => assert_eq!(index, 3),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_stale_reason_mentions_ages() {
        let q = DataQuality::Stale {
            age_secs: 900,
            max_secs: 300,
        };
        let reason = q.reason();
        assert!(reason.contains("900"));
        assert!(reason.contains("300"));
    }
}
