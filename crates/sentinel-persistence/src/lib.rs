//! Trade persistence.
//!
//! # Modules
//!
//! - [`trade_log`]: append-only JSON Lines log of trade entries and
//!   exits, fire-and-forget from the engine's perspective
//! - [`error`]: persistence error types

pub mod error;
pub mod trade_log;

pub use error::{PersistenceError, PersistenceResult};
pub use trade_log::{TradeEntryRecord, TradeExitRecord, TradeLog, TradeRecord};
