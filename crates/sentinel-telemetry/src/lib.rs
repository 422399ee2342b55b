//! Observability for the trading engine.
//!
//! # Modules
//!
//! - [`logging`]: tracing initialization (JSON in production)
//! - [`metrics`]: Prometheus counters and histograms
//! - [`decision`]: fixed-capacity decision audit ring
//! - [`session`]: session P&L and drawdown tracking
//! - [`error`]: telemetry error types

pub mod decision;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod session;

pub use decision::{Decision, DecisionCategory, DecisionLog, DEFAULT_DECISION_CAPACITY};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use session::{SessionSnapshot, SessionStats};
