//! Price-tick consumer.
//!
//! A dedicated task drains the broker's tick stream and feeds the same
//! [`PositionSupervisor::manage`] entry point as the scheduled cycle,
//! so an exit threshold crossed mid-cycle triggers immediately instead
//! of waiting for the next pass. Per-symbol serialization inside the
//! supervisor keeps the two paths from racing.

use sentinel_providers::PriceTick;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::supervisor::PositionSupervisor;

/// Spawn the tick consumer. Returns its join handle; the task ends
/// when the stream closes.
pub fn spawn_tick_consumer(
    supervisor: Arc<PositionSupervisor>,
    mut ticks: mpsc::Receiver<PriceTick>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(tick) = ticks.recv().await {
            match supervisor.manage(&tick.symbol, tick.price).await {
                Ok(outcome) if outcome.closed => {
                    debug!(
                        symbol = %tick.symbol,
                        price = %tick.price,
                        reason = ?outcome.reason,
                        "Tick-driven close"
                    );
                }
                Ok(_) => {}
                // A failed manage pass must not kill the consumer.
                Err(e) => {
                    warn!(symbol = %tick.symbol, error = %e, "Tick-driven manage failed");
                }
            }
        }
        debug!("Tick stream closed, consumer exiting");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sentinel_core::{OrderRequest, OrderSide, Price, Qty};
    use sentinel_exec::{ExecConfig, OrderExecutor};
    use sentinel_gate::{GateConfig, SafetyGate};
    use sentinel_providers::{BrokerConnector, PaperBroker, PaperConfig};
    use sentinel_telemetry::SessionStats;

    use crate::supervisor::PositionConfig;

    #[tokio::test]
    async fn test_tick_triggers_close() {
        let broker = Arc::new(PaperBroker::new(PaperConfig {
            slippage_bps: 0,
            ..PaperConfig::default()
        }));
        broker
            .create_order(OrderRequest::limit(
                "AAPL",
                OrderSide::Buy,
                Qty::new(dec!(10)),
                Price::new(dec!(100)),
            ))
            .await
            .unwrap();

        let supervisor = Arc::new(PositionSupervisor::new(
            PositionConfig {
                cache_ttl_secs: 0,
                ..PositionConfig::default()
            },
            broker.clone(),
            Arc::new(OrderExecutor::new(ExecConfig::default())),
            Arc::new(SafetyGate::new(GateConfig::default())),
            Arc::new(SessionStats::new()),
            None,
        ));

        let ticks = broker
            .subscribe_ticks(&["AAPL".to_string()])
            .await
            .unwrap()
            .unwrap();
        let handle = spawn_tick_consumer(supervisor, ticks);

        // A tick past take-profit closes the position without a cycle.
        broker.push_tick(PriceTick::new("AAPL", Price::new(dec!(106)))).await;

        // Poll until the consumer has processed the tick.
        for _ in 0..100 {
            if broker.get_positions().await.unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(broker.get_positions().await.unwrap().is_empty());
        handle.abort();
    }
}
