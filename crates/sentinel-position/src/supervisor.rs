//! Open-position supervision.
//!
//! One decision function serves two trigger sources: the scheduled
//! cycle and the asynchronous price-tick path. Both funnel through
//! [`PositionSupervisor::manage`], which serializes per symbol so a
//! tick-driven close and a cycle-driven close can never both submit a
//! close order for the same position. Closing is idempotent: managing
//! a symbol with no open position is a no-op.

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use sentinel_core::{Position, Price};
use sentinel_exec::OrderExecutor;
use sentinel_gate::SafetyGate;
use sentinel_persistence::{TradeExitRecord, TradeLog};
use sentinel_providers::BrokerConnector;
use sentinel_telemetry::{metrics, SessionStats};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::PositionCache;
use crate::error::PositionResult;

/// Exit thresholds and cache behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionConfig {
    /// Close when unrealized P&L fraction reaches this gain.
    #[serde(default = "default_take_profit_fraction")]
    pub take_profit_fraction: Decimal,

    /// Close when unrealized P&L fraction reaches this loss.
    #[serde(default = "default_stop_loss_fraction")]
    pub stop_loss_fraction: Decimal,

    /// Position cache staleness window in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_take_profit_fraction() -> Decimal {
    Decimal::new(5, 2) // 0.05
}

fn default_stop_loss_fraction() -> Decimal {
    Decimal::new(3, 2) // 0.03
}

fn default_cache_ttl_secs() -> u64 {
    30
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            take_profit_fraction: default_take_profit_fraction(),
            stop_loss_fraction: default_stop_loss_fraction(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// Outcome of one manage pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManageOutcome {
    pub closed: bool,
    /// "take_profit" / "stop_loss" / "emergency" when closed.
    pub reason: Option<String>,
    pub realized_pnl: Option<Decimal>,
}

impl ManageOutcome {
    fn noop() -> Self {
        Self {
            closed: false,
            reason: None,
            realized_pnl: None,
        }
    }
}

/// Per-item result of a bulk close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseAllReport {
    pub closed: Vec<String>,
    /// Symbol and error text of failures; one failure never aborts
    /// the rest of the batch.
    pub failed: Vec<(String, String)>,
}

/// Watches open positions and triggers exits.
pub struct PositionSupervisor {
    config: PositionConfig,
    broker: Arc<dyn BrokerConnector>,
    executor: Arc<OrderExecutor>,
    gate: Arc<SafetyGate>,
    stats: Arc<SessionStats>,
    trade_log: Option<Arc<TradeLog>>,
    cache: PositionCache,
    locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl PositionSupervisor {
    #[must_use]
    pub fn new(
        config: PositionConfig,
        broker: Arc<dyn BrokerConnector>,
        executor: Arc<OrderExecutor>,
        gate: Arc<SafetyGate>,
        stats: Arc<SessionStats>,
        trade_log: Option<Arc<TradeLog>>,
    ) -> Self {
        let cache = PositionCache::new(Duration::from_secs(config.cache_ttl_secs));
        Self {
            config,
            broker,
            executor,
            gate,
            stats,
            trade_log,
            cache,
            locks: DashMap::new(),
        }
    }

    fn symbol_lock(&self, symbol: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Hold a symbol's management lock across an entry decision, so
    /// the position-state check and the submission that follows it
    /// cannot interleave with a concurrent close of the same symbol.
    ///
    /// [`manage`](Self::manage) and [`close_all`](Self::close_all)
    /// take this lock themselves; the holder must drop the guard
    /// before calling either for the same symbol.
    pub async fn entry_lock(&self, symbol: &str) -> tokio::sync::OwnedMutexGuard<()> {
        self.symbol_lock(symbol).lock_owned().await
    }

    /// Open position for a symbol, if any (cache-backed).
    pub async fn open_position(&self, symbol: &str) -> PositionResult<Option<Position>> {
        let positions = self.cache.get(self.broker.as_ref()).await?;
        Ok(positions.into_iter().find(|p| p.symbol == symbol))
    }

    /// All open positions (cache-backed).
    pub async fn open_positions(&self) -> PositionResult<Vec<Position>> {
        Ok(self.cache.get(self.broker.as_ref()).await?)
    }

    /// Drop the cached position view after a local order.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
    }

    /// Evaluate one symbol's position against exit thresholds at the
    /// given price and close it if a threshold is hit.
    ///
    /// Serialized per symbol across the cycle and tick paths. No open
    /// position is a no-op.
    pub async fn manage(&self, symbol: &str, current_price: Price) -> PositionResult<ManageOutcome> {
        let lock = self.symbol_lock(symbol);
        let _guard = lock.lock().await;

        // Re-read under the lock: a concurrent close may have already
        // removed the position.
        let Some(position) = self.open_position(symbol).await? else {
            return Ok(ManageOutcome::noop());
        };

        let Some(pnl_fraction) = position.pnl_fraction_at(current_price) else {
            warn!(symbol = %symbol, "Position has zero entry price, skipping");
            return Ok(ManageOutcome::noop());
        };

        let reason = if pnl_fraction >= self.config.take_profit_fraction {
            "take_profit"
        } else if pnl_fraction <= -self.config.stop_loss_fraction {
            "stop_loss"
        } else {
            debug!(
                symbol = %symbol,
                pnl_fraction = %pnl_fraction,
                price = %current_price,
                "Position within thresholds"
            );
            return Ok(ManageOutcome::noop());
        };

        let pnl = self.close(&position, current_price, reason).await?;
        Ok(ManageOutcome {
            closed: true,
            reason: Some(reason.to_string()),
            realized_pnl: Some(pnl),
        })
    }

    /// Submit the closing order and fold the realized result into
    /// session stats, the daily-loss accumulator, and the trade log.
    ///
    /// Caller must hold the symbol lock.
    async fn close(&self, position: &Position, current_price: Price, reason: &str) -> PositionResult<Decimal> {
        let result = self
            .executor
            .execute(
                self.broker.as_ref(),
                &position.symbol,
                position.side.opposite(),
                position.qty,
                current_price,
                false,
            )
            .await?;
        self.cache.invalidate();

        let exit_price = result.order.filled_avg_price.unwrap_or(current_price);
        let pnl = position.unrealized_pnl_at(exit_price);

        self.stats.record_realized(pnl);
        if pnl < Decimal::ZERO {
            self.gate.record_loss(-pnl);
        }
        metrics::POSITIONS_CLOSED.with_label_values(&[reason]).inc();

        if let Some(log) = &self.trade_log {
            log.log_exit(TradeExitRecord {
                timestamp: Utc::now(),
                order_id: result.order.id.clone(),
                symbol: position.symbol.clone(),
                qty: position.qty.inner(),
                exit_price: exit_price.inner(),
                pnl,
                pnl_pct: position.pnl_fraction_at(exit_price),
                reason: reason.to_string(),
            });
        }

        info!(
            symbol = %position.symbol,
            reason = %reason,
            exit_price = %exit_price,
            pnl = %pnl,
            timed_out = result.timed_out,
            "Position closed"
        );
        Ok(pnl)
    }

    /// Close every open position, continuing past per-item failures.
    pub async fn close_all(&self, reason: &str) -> PositionResult<CloseAllReport> {
        let positions = self.open_positions().await?;
        let mut report = CloseAllReport {
            closed: Vec::new(),
            failed: Vec::new(),
        };

        for position in positions {
            let lock = self.symbol_lock(&position.symbol);
            let _guard = lock.lock().await;

            // May already be gone by the time we get the lock.
            let Some(current) = self.open_position(&position.symbol).await? else {
                continue;
            };
            match self.close(&current, current.current_price, reason).await {
                Ok(_) => report.closed.push(current.symbol),
                Err(e) => {
                    warn!(symbol = %current.symbol, error = %e, "Bulk close failed for symbol");
                    report.failed.push((current.symbol, e.to_string()));
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sentinel_core::{OrderRequest, OrderSide, Qty};
    use sentinel_exec::ExecConfig;
    use sentinel_gate::GateConfig;
    use sentinel_providers::{PaperBroker, PaperConfig};

    struct Rig {
        broker: Arc<PaperBroker>,
        supervisor: PositionSupervisor,
        gate: Arc<SafetyGate>,
        stats: Arc<SessionStats>,
    }

    fn rig() -> Rig {
        let broker = Arc::new(PaperBroker::new(PaperConfig {
            slippage_bps: 0,
            ..PaperConfig::default()
        }));
        let gate = Arc::new(SafetyGate::new(GateConfig::default()));
        let stats = Arc::new(SessionStats::new());
        let supervisor = PositionSupervisor::new(
            PositionConfig {
                cache_ttl_secs: 0, // no staleness in tests
                ..PositionConfig::default()
            },
            broker.clone(),
            Arc::new(OrderExecutor::new(ExecConfig::default())),
            gate.clone(),
            stats.clone(),
            None,
        );
        Rig {
            broker,
            supervisor,
            gate,
            stats,
        }
    }

    async fn open_long(rig: &Rig, symbol: &str, qty: Decimal, price: Decimal) {
        rig.broker
            .create_order(OrderRequest::limit(
                symbol,
                OrderSide::Buy,
                Qty::new(qty),
                Price::new(price),
            ))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_no_position_is_noop() {
        let rig = rig();
        let outcome = rig.supervisor.manage("AAPL", Price::new(dec!(100))).await.unwrap();
        assert!(!outcome.closed);
    }

    #[tokio::test]
    async fn test_within_thresholds_holds() {
        let rig = rig();
        open_long(&rig, "AAPL", dec!(10), dec!(100)).await;
        let outcome = rig.supervisor.manage("AAPL", Price::new(dec!(101))).await.unwrap();
        assert!(!outcome.closed);
        assert_eq!(rig.broker.trade_history().len(), 1);
    }

    #[tokio::test]
    async fn test_take_profit_closes() {
        let rig = rig();
        open_long(&rig, "AAPL", dec!(10), dec!(100)).await;

        // +5% hits the default take-profit.
        let outcome = rig.supervisor.manage("AAPL", Price::new(dec!(105))).await.unwrap();
        assert!(outcome.closed);
        assert_eq!(outcome.reason.as_deref(), Some("take_profit"));
        assert_eq!(outcome.realized_pnl, Some(dec!(50)));
        assert!(rig.broker.get_positions().await.unwrap().is_empty());
        assert_eq!(rig.stats.snapshot().realized_pnl, dec!(50));
    }

    #[tokio::test]
    async fn test_stop_loss_reports_to_gate() {
        let rig = rig();
        open_long(&rig, "AAPL", dec!(10), dec!(100)).await;

        // -3% hits the default stop-loss.
        let outcome = rig.supervisor.manage("AAPL", Price::new(dec!(97))).await.unwrap();
        assert!(outcome.closed);
        assert_eq!(outcome.reason.as_deref(), Some("stop_loss"));
        assert_eq!(outcome.realized_pnl, Some(dec!(-30)));
        // The realized loss lands in the daily-loss accumulator.
        assert_eq!(rig.gate.state_snapshot().daily_loss, dec!(30));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let rig = rig();
        open_long(&rig, "AAPL", dec!(10), dec!(100)).await;
        let first = rig.supervisor.manage("AAPL", Price::new(dec!(105))).await.unwrap();
        assert!(first.closed);
        let second = rig.supervisor.manage("AAPL", Price::new(dec!(105))).await.unwrap();
        assert!(!second.closed);
        // Exactly one entry and one exit on the ledger.
        assert_eq!(rig.broker.trade_history().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_manage_single_close() {
        let rig = rig();
        open_long(&rig, "AAPL", dec!(10), dec!(100)).await;

        let supervisor = Arc::new(rig.supervisor);
        let a = {
            let s = supervisor.clone();
            tokio::spawn(async move { s.manage("AAPL", Price::new(dec!(105))).await })
        };
        let b = {
            let s = supervisor.clone();
            tokio::spawn(async move { s.manage("AAPL", Price::new(dec!(105))).await })
        };
        let (ra, rb) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
        assert_eq!(
            [ra.closed, rb.closed].iter().filter(|c| **c).count(),
            1,
            "exactly one path may close"
        );
        assert_eq!(rig.broker.trade_history().len(), 2);
    }

    #[tokio::test]
    async fn test_entry_lock_excludes_manage() {
        let rig = rig();
        open_long(&rig, "AAPL", dec!(10), dec!(100)).await;

        let supervisor = Arc::new(rig.supervisor);
        let guard = supervisor.entry_lock("AAPL").await;

        // A tick-driven close must wait while an entry decision holds
        // the symbol.
        let blocked = {
            let s = supervisor.clone();
            tokio::spawn(async move { s.manage("AAPL", Price::new(dec!(105))).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!blocked.is_finished(), "manage ran under a held entry lock");

        drop(guard);
        let outcome = blocked.await.unwrap().unwrap();
        assert!(outcome.closed);
    }

    #[tokio::test]
    async fn test_close_all_independent_outcomes() {
        let rig = rig();
        open_long(&rig, "AAPL", dec!(10), dec!(100)).await;
        open_long(&rig, "MSFT", dec!(5), dec!(200)).await;

        let report = rig.supervisor.close_all("emergency").await.unwrap();
        assert_eq!(report.closed.len(), 2);
        assert!(report.failed.is_empty());
        assert!(rig.broker.get_positions().await.unwrap().is_empty());
    }
}
