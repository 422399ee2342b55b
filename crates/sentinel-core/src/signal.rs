//! Composed trading signals and market regime classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::OrderSide;

/// Action recommended by the signal composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

impl SignalAction {
    /// Order side for actionable signals; None for Hold.
    pub fn side(&self) -> Option<OrderSide> {
        match self {
            Self::Buy => Some(OrderSide::Buy),
            Self::Sell => Some(OrderSide::Sell),
            Self::Hold => None,
        }
    }

    pub fn is_actionable(&self) -> bool {
        !matches!(self, Self::Hold)
    }
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
            Self::Hold => write!(f, "HOLD"),
        }
    }
}

/// Coarse market-condition classification.
///
/// Scales confidence thresholds and position size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    TrendingBull,
    TrendingBear,
    Ranging,
    Volatile,
}

impl Regime {
    pub fn is_volatile(&self) -> bool {
        matches!(self, Self::Volatile)
    }

    pub fn is_trending(&self) -> bool {
        matches!(self, Self::TrendingBull | Self::TrendingBear)
    }

    /// Whether an action trades in the direction of the trend.
    ///
    /// Ranging/volatile regimes have no alignment either way.
    pub fn aligns_with(&self, action: SignalAction) -> bool {
        matches!(
            (self, action),
            (Self::TrendingBull, SignalAction::Buy) | (Self::TrendingBear, SignalAction::Sell)
        )
    }

    /// Whether an action trades against the trend.
    pub fn opposes(&self, action: SignalAction) -> bool {
        matches!(
            (self, action),
            (Self::TrendingBull, SignalAction::Sell) | (Self::TrendingBear, SignalAction::Buy)
        )
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TrendingBull => "trending_bull",
            Self::TrendingBear => "trending_bear",
            Self::Ranging => "ranging",
            Self::Volatile => "volatile",
        };
        write!(f, "{s}")
    }
}

/// Per-factor contributions to the composite confidence.
///
/// All scores are in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorScores {
    pub advisory: f64,
    pub risk: f64,
    pub sentiment: f64,
    pub technical: f64,
}

impl FactorScores {
    /// Neutral scores used when a factor source is unavailable.
    pub fn neutral() -> Self {
        Self {
            advisory: 0.5,
            risk: 0.5,
            sentiment: 0.5,
            technical: 0.5,
        }
    }
}

/// Composed trading signal, immutable once produced.
///
/// Consumed once per cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub action: SignalAction,
    /// Composite confidence in [0, 1].
    pub confidence: f64,
    pub scores: FactorScores,
    pub regime: Option<Regime>,
    /// Why this action was chosen (or why Hold).
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl Signal {
    pub fn hold(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            action: SignalAction::Hold,
            confidence: 0.0,
            scores: FactorScores::neutral(),
            regime: None,
            reason: reason.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_side() {
        assert_eq!(SignalAction::Buy.side(), Some(OrderSide::Buy));
        assert_eq!(SignalAction::Sell.side(), Some(OrderSide::Sell));
        assert_eq!(SignalAction::Hold.side(), None);
    }

    #[test]
    fn test_regime_alignment() {
        assert!(Regime::TrendingBull.aligns_with(SignalAction::Buy));
        assert!(Regime::TrendingBear.aligns_with(SignalAction::Sell));
        assert!(!Regime::TrendingBull.aligns_with(SignalAction::Sell));
        assert!(Regime::TrendingBull.opposes(SignalAction::Sell));
        assert!(!Regime::Volatile.aligns_with(SignalAction::Buy));
        assert!(!Regime::Volatile.opposes(SignalAction::Buy));
    }

    #[test]
    fn test_hold_signal() {
        let s = Signal::hold("AAPL", "confidence 0.55 below minimum 0.60");
        assert_eq!(s.action, SignalAction::Hold);
        assert!(s.reason.contains("0.55"));
    }
}
