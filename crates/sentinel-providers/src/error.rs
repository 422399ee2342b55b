//! Provider error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider could not be reached or returned a transport failure.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Provider did not answer within the configured deadline.
    #[error("Provider timed out after {0}s")]
    Timeout(u64),

    /// Broker rejected the request outright.
    #[error("Order rejected: {0}")]
    OrderRejected(String),

    /// Broker does not accept attached bracket legs.
    ///
    /// The executor treats this as a signal to retry the same entry
    /// as a plain order.
    #[error("Bracket orders not supported: {0}")]
    BracketUnsupported(String),

    /// Requested order does not exist on the broker side.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Not enough buying power to accept the order.
    #[error("Insufficient buying power: need {needed}, have {available}")]
    InsufficientBuyingPower { needed: String, available: String },

    /// Provider returned a payload the engine could not interpret.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Whether the executor may retry the same entry without brackets.
    pub fn is_bracket_rejection(&self) -> bool {
        matches!(self, Self::BracketUnsupported(_))
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
