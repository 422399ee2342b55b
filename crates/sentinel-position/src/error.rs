//! Position management error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("Broker error: {0}")]
    Provider(#[from] sentinel_providers::ProviderError),

    #[error("Execution error: {0}")]
    Exec(#[from] sentinel_exec::ExecError),
}

pub type PositionResult<T> = Result<T, PositionError>;
