//! Autonomous trading engine.
//!
//! Orchestrates the decision cycle:
//! - Concurrent market data / account / regime fetch
//! - Existing-position management before fresh analysis
//! - Signal composition (advisory + technical + regime)
//! - Guardrail gate and optional external risk validation
//! - Sizing, execution, and audit recording
//!
//! Plus the session circuit breaker, the loop watchdog, and the
//! read-only status surface.

pub mod config;
pub mod engine;
pub mod error;
pub mod status;
pub mod watchdog;

pub use config::{EngineConfig, EngineMode, PersistenceConfig};
pub use engine::{CycleState, Providers, TradingEngine};
pub use error::{AppError, AppResult};
pub use status::StatusSnapshot;
pub use watchdog::Watchdog;
