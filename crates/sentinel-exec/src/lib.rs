//! Position sizing and order execution.
//!
//! # Modules
//!
//! - [`sizer`]: [`PositionSizer`], equity- and regime-aware quantity
//!   calculation that never fails (unusable inputs size to zero)
//! - [`executor`]: [`OrderExecutor`], marketable-limit submission with
//!   bracket fallback, fill polling, and slippage accounting
//! - [`error`]: execution error types

pub mod error;
pub mod executor;
pub mod sizer;

pub use error::{ExecError, ExecResult};
pub use executor::{ExecConfig, OrderExecutor, OrderResult};
pub use sizer::{PositionSizer, SizerConfig, SizingResult};
