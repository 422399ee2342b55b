//! External collaborator interfaces and the paper broker.
//!
//! # Modules
//!
//! - [`traits`]: async interfaces for market data, advisory analysis,
//!   regime classification, broker access, and risk validation
//! - [`tick`]: streamed price updates
//! - [`paper`]: in-memory broker for paper trading and tests
//! - [`synthetic`]: deterministic random-walk market data for paper
//!   mode
//! - [`error`]: provider error types

pub mod error;
pub mod paper;
pub mod synthetic;
pub mod tick;
pub mod traits;

pub use error::{ProviderError, ProviderResult};
pub use paper::{PaperBroker, PaperConfig, PaperTrade};
pub use synthetic::SyntheticMarketData;
pub use tick::PriceTick;
pub use traits::{
    AdvisoryProvider, AdvisoryReport, BrokerConnector, MarketDataProvider, RegimeClassifier,
    RiskValidator, RiskVerdict, RiskViolation, Timeframe, TradeIntent, ViolationSeverity,
};
