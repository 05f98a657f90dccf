//! Error types for bondcurve.

use crate::{Address, Amount};
use thiserror::Error;

/// Main error type for exchange operations.
///
/// Every variant is a rejection of the whole call: the operation that
/// returns it leaves all state exactly as it found it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// The null identity was used as a recipient.
    #[error("Invalid recipient: the null address cannot receive units")]
    InvalidRecipient,

    /// The null identity was used as a sender.
    #[error("Invalid sender: the null address cannot send units")]
    InvalidSender,

    /// Account balance is below the requested amount.
    #[error("Insufficient balance for {account}: have {have}, need {need}")]
    InsufficientBalance {
        account: Address,
        have: Amount,
        need: Amount,
    },

    /// Spender is not authorized for the requested amount.
    #[error("Allowance exceeded for spender {spender}: allowed {allowed}, need {need}")]
    AllowanceExceeded {
        spender: Address,
        allowed: Amount,
        need: Amount,
    },

    /// A buy was submitted with no reserve currency attached.
    #[error("Payment required: no reserve currency attached")]
    ZeroPayment,

    /// Payment too small to buy even one smallest unit.
    #[error("Payment of {reserve} is below the minimum trade at price {price}")]
    BelowMinimumTrade { reserve: Amount, price: Amount },

    /// Seller has nothing to sell.
    #[error("No holdings to sell for {0}")]
    NoHoldings(Address),

    /// Reserve pool cannot cover the sale.
    #[error("Reserve insufficient: pool {pool}, owed {owed}")]
    ReserveInsufficient { pool: Amount, owed: Amount },

    /// Outbound reserve transfer was rejected by the host.
    #[error("Reserve transfer failed: {0}")]
    TransferFailed(String),

    /// Arithmetic overflow.
    #[error("Arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    /// Arithmetic underflow.
    #[error("Arithmetic underflow in {0}")]
    ArithmeticUnderflow(&'static str),

    /// Seed minting is not enabled on this exchange.
    #[error("Seed mint is disabled")]
    SeedMintDisabled,

    /// Malformed decimal amount.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Malformed address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl ExchangeError {
    /// Get a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ExchangeError::InvalidRecipient => "INVALID_RECIPIENT",
            ExchangeError::InvalidSender => "INVALID_SENDER",
            ExchangeError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            ExchangeError::AllowanceExceeded { .. } => "ALLOWANCE_EXCEEDED",
            ExchangeError::ZeroPayment => "ZERO_PAYMENT",
            ExchangeError::BelowMinimumTrade { .. } => "BELOW_MINIMUM_TRADE",
            ExchangeError::NoHoldings(_) => "NO_HOLDINGS",
            ExchangeError::ReserveInsufficient { .. } => "RESERVE_INSUFFICIENT",
            ExchangeError::TransferFailed(_) => "TRANSFER_FAILED",
            ExchangeError::ArithmeticOverflow(_) => "ARITHMETIC_OVERFLOW",
            ExchangeError::ArithmeticUnderflow(_) => "ARITHMETIC_UNDERFLOW",
            ExchangeError::SeedMintDisabled => "SEED_MINT_DISABLED",
            ExchangeError::InvalidAmount(_) => "INVALID_AMOUNT",
            ExchangeError::InvalidAddress(_) => "INVALID_ADDRESS",
            ExchangeError::ConfigurationError(_) => "CONFIGURATION_ERROR",
        }
    }

    /// Check if this is a fatal arithmetic abort.
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            ExchangeError::ArithmeticOverflow(_) | ExchangeError::ArithmeticUnderflow(_)
        )
    }
}

/// Result type alias for exchange operations.
pub type Result<T> = std::result::Result<T, ExchangeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ExchangeError::ZeroPayment.error_code(), "ZERO_PAYMENT");
        assert_eq!(
            ExchangeError::NoHoldings(Address::NULL).error_code(),
            "NO_HOLDINGS"
        );
        assert!(ExchangeError::ArithmeticOverflow("mint").is_arithmetic());
        assert!(!ExchangeError::InvalidRecipient.is_arithmetic());
    }

    #[test]
    fn test_error_display() {
        let err = ExchangeError::ReserveInsufficient { pool: 5, owed: 9 };
        assert_eq!(err.to_string(), "Reserve insufficient: pool 5, owed 9");
    }
}
