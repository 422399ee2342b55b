//! Prometheus metrics for the trading engine.
//!
//! Covers:
//! - Cycle throughput and skips
//! - Guardrail blocks per check
//! - Order flow (submitted / filled / rejected / fallbacks)
//! - Realized slippage
//! - Watchdog recoveries
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration
//! fails, it indicates a fatal configuration error (e.g., duplicate
//! metric names) that should cause an immediate crash at startup
//! rather than silent failure. These panics only occur during static
//! initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram, Counter,
    CounterVec, Gauge, Histogram,
};

/// Completed decision cycles.
pub static CYCLES_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!("sentinel_cycles_total", "Completed decision cycles").unwrap()
});

/// Cycles that short-circuited without a trade.
/// Labels: reason (data_quality/hold/gate/risk_validator/sizing/managed_close)
pub static CYCLE_SKIPS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sentinel_cycle_skips_total",
        "Cycles skipped without submitting an order",
        &["reason"]
    )
    .unwrap()
});

/// Guardrail rejections per failing check.
pub static GATE_BLOCKS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sentinel_gate_blocks_total",
        "Trades blocked by a guardrail check",
        &["check"]
    )
    .unwrap()
});

/// Orders submitted to the broker.
pub static ORDERS_SUBMITTED: Lazy<Counter> = Lazy::new(|| {
    register_counter!("sentinel_orders_submitted_total", "Orders submitted").unwrap()
});

/// Orders confirmed filled.
pub static ORDERS_FILLED: Lazy<Counter> = Lazy::new(|| {
    register_counter!("sentinel_orders_filled_total", "Orders confirmed filled").unwrap()
});

/// Orders rejected by the broker.
pub static ORDERS_REJECTED: Lazy<Counter> = Lazy::new(|| {
    register_counter!("sentinel_orders_rejected_total", "Orders rejected by the broker").unwrap()
});

/// Bracket submissions that fell back to a plain order.
pub static BRACKET_FALLBACKS: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "sentinel_bracket_fallbacks_total",
        "Bracket orders resubmitted as plain limit orders"
    )
    .unwrap()
});

/// Realized fill slippage as a fraction of expected price.
pub static SLIPPAGE: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "sentinel_fill_slippage",
        "Realized slippage |fill-expected|/expected",
        vec![0.0001, 0.0005, 0.001, 0.002, 0.005, 0.01, 0.02, 0.05]
    )
    .unwrap()
});

/// Positions closed by the supervisor.
/// Labels: reason (take_profit/stop_loss/emergency)
pub static POSITIONS_CLOSED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sentinel_positions_closed_total",
        "Positions closed by the supervisor",
        &["reason"]
    )
    .unwrap()
});

/// Watchdog-detected stalls that re-armed the cycle timer.
pub static WATCHDOG_STALLS: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "sentinel_watchdog_stalls_total",
        "Loop stalls detected and recovered by the watchdog"
    )
    .unwrap()
});

/// Session realized P&L, lossy f64 for observability only.
pub static SESSION_PNL: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!("sentinel_session_pnl", "Session realized P&L").unwrap()
});
