//! Open-position supervision.
//!
//! # Modules
//!
//! - [`supervisor`]: [`PositionSupervisor`], exit-threshold evaluation
//!   serialized per symbol across cycle and tick paths
//! - [`cache`]: TTL cache over broker positions
//! - [`ticks`]: tick-stream consumer feeding the supervisor
//! - [`error`]: position error types

pub mod cache;
pub mod error;
pub mod supervisor;
pub mod ticks;

pub use cache::PositionCache;
pub use error::{PositionError, PositionResult};
pub use supervisor::{CloseAllReport, ManageOutcome, PositionConfig, PositionSupervisor};
pub use ticks::spawn_tick_consumer;
