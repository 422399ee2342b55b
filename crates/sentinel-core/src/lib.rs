//! Core domain types for the sentinel trading engine.
//!
//! This crate provides fundamental types used throughout the engine:
//! - `Price`, `Qty`: Precision-safe numeric types
//! - `Bar`, `BarWindow`: Market data with freshness validation
//! - `OrderRequest`, `Order`, `BracketSpec`: Order lifecycle types
//! - `Signal`, `Regime`: Composed trading signals
//! - `Position`, `AccountSnapshot`: Account state

pub mod account;
pub mod bar;
pub mod decimal;
pub mod error;
pub mod order;
pub mod position;
pub mod signal;

pub use account::AccountSnapshot;
pub use bar::{Bar, BarWindow, DataQuality};
pub use decimal::{Price, Qty};
pub use error::{CoreError, CoreResult};
pub use order::{
    BracketSpec, ClientOrderId, Order, OrderRequest, OrderSide, OrderStatus, OrderType,
    TimeInForce,
};
pub use position::Position;
pub use signal::{FactorScores, Regime, Signal, SignalAction};
