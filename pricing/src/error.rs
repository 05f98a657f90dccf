//! Host collaborator error types.

use bondcurve_common::{Address, Amount, ExchangeError};
use thiserror::Error;

/// Errors reported by the host runtime for an outbound reserve transfer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    /// The recipient refused the transfer.
    #[error("recipient {recipient} rejected {amount}: {reason}")]
    Rejected {
        recipient: Address,
        amount: Amount,
        reason: String,
    },

    /// The host could not execute the transfer.
    #[error("host unavailable: {0}")]
    Unavailable(String),
}

impl From<HostError> for ExchangeError {
    fn from(err: HostError) -> Self {
        ExchangeError::TransferFailed(err.to_string())
    }
}

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;
