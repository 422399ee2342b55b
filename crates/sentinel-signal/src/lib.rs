//! Composite signal generation.
//!
//! # Modules
//!
//! - [`composer`]: [`SignalComposer`], blending advisory, technical,
//!   and regime inputs into one action + confidence
//! - [`technical`]: local SMA/RSI indicators and the bullishness score

pub mod composer;
pub mod technical;

pub use composer::{SignalComposer, SignalConfig};
pub use technical::{rsi, sma, technical_score};
