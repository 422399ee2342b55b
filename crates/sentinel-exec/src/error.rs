//! Execution error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Broker error: {0}")]
    Provider(#[from] sentinel_providers::ProviderError),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),
}

pub type ExecResult<T> = Result<T, ExecError>;
