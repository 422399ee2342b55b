//! Pre-trade guardrails and the emergency circuit breaker.
//!
//! Every order intent is validated against a fixed, ordered list of
//! guardrail checks backed by process-wide daily state (loss, trade
//! count, cooldown, emergency block). The state resets at local
//! midnight; the emergency block survives the reset.
//!
//! # Modules
//!
//! - [`gate`]: [`SafetyGate`] and [`GuardrailState`]
//! - [`checks`]: per-check audit records
//! - [`hours`]: regular-session market hours

pub mod checks;
pub mod gate;
pub mod hours;

pub use checks::{GateVerdict, GuardrailCheck};
pub use gate::{GateConfig, GuardrailState, SafetyGate};
pub use hours::is_market_open;
