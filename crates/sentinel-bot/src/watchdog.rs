//! Loop watchdog.
//!
//! Runs at twice the cycle interval. If wall-clock time since the
//! last completed cycle exceeds three intervals, the cycle timer is
//! assumed to have died silently; the watchdog logs a stall and nudges
//! the loop to run immediately. Best-effort self-healing: a genuinely
//! deadlocked process still needs external supervision.

use parking_lot::Mutex;
use sentinel_telemetry::metrics;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct Watchdog {
    cycle_interval: Duration,
    last_cycle: Arc<Mutex<Instant>>,
    running: Arc<AtomicBool>,
    nudge: mpsc::Sender<()>,
}

impl Watchdog {
    #[must_use]
    pub fn new(
        cycle_interval: Duration,
        last_cycle: Arc<Mutex<Instant>>,
        running: Arc<AtomicBool>,
        nudge: mpsc::Sender<()>,
    ) -> Self {
        Self {
            cycle_interval,
            last_cycle,
            running,
            nudge,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let check_every = self.cycle_interval * 2;
            let stall_after = self.cycle_interval * 3;
            let mut ticker = tokio::time::interval(check_every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await; // immediate first tick

            while self.running.load(Ordering::SeqCst) {
                ticker.tick().await;
                let elapsed = self.last_cycle.lock().elapsed();
                if elapsed > stall_after {
                    warn!(
                        elapsed_secs = elapsed.as_secs(),
                        stall_after_secs = stall_after.as_secs(),
                        "Trading loop stalled, re-arming cycle timer"
                    );
                    metrics::WATCHDOG_STALLS.inc();
                    if self.nudge.try_send(()).is_ok() {
                        info!("Cycle timer re-armed by watchdog");
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stall_triggers_nudge() {
        let (tx, mut rx) = mpsc::channel(1);
        let last_cycle = Arc::new(Mutex::new(Instant::now() - Duration::from_secs(10)));
        let running = Arc::new(AtomicBool::new(true));
        let handle = Watchdog::new(
            Duration::from_millis(20),
            last_cycle,
            running.clone(),
            tx,
        )
        .spawn();

        let nudged =
            tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
        assert!(nudged.is_ok(), "watchdog never nudged a stalled loop");

        running.store(false, Ordering::SeqCst);
        handle.abort();
    }

    #[tokio::test]
    async fn test_healthy_loop_not_nudged() {
        let (tx, mut rx) = mpsc::channel(1);
        let last_cycle = Arc::new(Mutex::new(Instant::now()));
        let running = Arc::new(AtomicBool::new(true));
        let handle = Watchdog::new(
            Duration::from_millis(50),
            last_cycle.clone(),
            running.clone(),
            tx,
        )
        .spawn();

        // Keep the heartbeat fresh while the watchdog checks.
        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(40)).await;
            *last_cycle.lock() = Instant::now();
            assert!(rx.try_recv().is_err());
        }

        running.store(false, Ordering::SeqCst);
        handle.abort();
    }
}
