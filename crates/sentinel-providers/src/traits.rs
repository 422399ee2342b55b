//! Async interfaces for the engine's external collaborators.
//!
//! Every integration point (market data, advisory, regime, broker,
//! risk validation) sits behind one of these traits so the engine can
//! run against live adapters or the in-process paper broker without
//! code changes.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sentinel_core::{
    AccountSnapshot, BarWindow, Order, OrderRequest, OrderSide, Position, Price, Qty, Regime,
    SignalAction,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

use crate::error::ProviderResult;
use crate::tick::PriceTick;

// ============================================================================
// Market data
// ============================================================================

/// Bar aggregation interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Min1,
    Min5,
    Min15,
    Hour1,
    Day1,
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Min1 => "1m",
            Self::Min5 => "5m",
            Self::Min15 => "15m",
            Self::Hour1 => "1h",
            Self::Day1 => "1d",
        };
        write!(f, "{s}")
    }
}

/// Historical and latest market data.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch the most recent `count` bars, oldest first.
    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> ProviderResult<BarWindow>;

    /// Latest traded price for a symbol.
    async fn latest_price(&self, symbol: &str) -> ProviderResult<Price>;
}

// ============================================================================
// Advisory and regime
// ============================================================================

/// External strategy/risk/sentiment analysis for one symbol.
///
/// All scores are normalized to [0, 1]. A higher risk score means the
/// validator considers the trade SAFER, matching the composite weight
/// direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryReport {
    pub recommendation: SignalAction,
    /// Advisory's own confidence in its recommendation, [0, 1].
    pub confidence: f64,
    /// Risk assessment score, [0, 1].
    pub risk_score: f64,
    /// Sentiment score, [0, 1].
    pub sentiment_score: f64,
}

/// Strategy advisory service.
///
/// Unavailability degrades the signal to technical-only; it never
/// aborts a cycle.
#[async_trait]
pub trait AdvisoryProvider: Send + Sync {
    async fn analyze(&self, symbol: &str) -> ProviderResult<AdvisoryReport>;
}

/// Market regime classification service.
#[async_trait]
pub trait RegimeClassifier: Send + Sync {
    /// Current regime for a symbol, or None when the classifier has no
    /// verdict.
    async fn get_regime(&self, symbol: &str) -> ProviderResult<Option<Regime>>;
}

// ============================================================================
// Broker
// ============================================================================

/// Order placement and account state.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    async fn get_account(&self) -> ProviderResult<AccountSnapshot>;

    async fn get_positions(&self) -> ProviderResult<Vec<Position>>;

    /// Submit an order. Returns the broker's view of it, which may not
    /// yet be terminal.
    async fn create_order(&self, request: OrderRequest) -> ProviderResult<Order>;

    /// Current broker-side state of an order.
    async fn get_order(&self, order_id: &str) -> ProviderResult<Order>;

    async fn cancel_order(&self, order_id: &str) -> ProviderResult<()>;

    /// Subscribe to streamed price ticks for the given symbols.
    ///
    /// Returns None when the connector has no streaming surface; the
    /// engine then relies on per-cycle management only.
    async fn subscribe_ticks(
        &self,
        _symbols: &[String],
    ) -> ProviderResult<Option<mpsc::Receiver<PriceTick>>> {
        Ok(None)
    }
}

// ============================================================================
// Risk validation
// ============================================================================

/// A trade proposed for independent risk review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeIntent {
    pub symbol: String,
    pub side: OrderSide,
    pub qty: Qty,
    pub price: Price,
    pub notional: Decimal,
    pub confidence: f64,
}

/// Severity of a single risk-rule violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    /// Logged, trade proceeds.
    Warn,
    /// Trade is skipped.
    Reject,
    /// Trade is skipped and the engine should stop trading.
    Halt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
}

/// Outcome of independent risk review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskVerdict {
    pub approved: bool,
    pub violations: Vec<RiskViolation>,
}

impl RiskVerdict {
    pub fn approved() -> Self {
        Self {
            approved: true,
            violations: Vec::new(),
        }
    }

    /// Whether any violation demands a full trading halt.
    pub fn demands_halt(&self) -> bool {
        self.violations
            .iter()
            .any(|v| v.severity == ViolationSeverity::Halt)
    }

    /// Joined rule names of blocking violations, for the decision log.
    pub fn blocking_rules(&self) -> String {
        self.violations
            .iter()
            .filter(|v| v.severity != ViolationSeverity::Warn)
            .map(|v| v.rule.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Second, independent risk check after the safety gate.
///
/// Unavailability is fail-closed: no verdict means no trade.
#[async_trait]
pub trait RiskValidator: Send + Sync {
    async fn validate_trade(&self, intent: &TradeIntent) -> ProviderResult<RiskVerdict>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_halt_detection() {
        let verdict = RiskVerdict {
            approved: false,
            violations: vec![
                RiskViolation {
                    rule: "concentration".into(),
                    severity: ViolationSeverity::Warn,
                    message: "position concentration elevated".into(),
                },
                RiskViolation {
                    rule: "drawdown".into(),
                    severity: ViolationSeverity::Halt,
                    message: "portfolio drawdown limit breached".into(),
                },
            ],
        };
        assert!(verdict.demands_halt());
        assert_eq!(verdict.blocking_rules(), "drawdown");
    }

    #[test]
    fn test_approved_verdict() {
        let verdict = RiskVerdict::approved();
        assert!(verdict.approved);
        assert!(!verdict.demands_halt());
        assert!(verdict.blocking_rules().is_empty());
    }
}
