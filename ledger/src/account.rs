//! Account views exposed by the ledger.

use bondcurve_common::{Address, Amount};
use serde::{Deserialize, Serialize};

/// A holder and its current balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Holder identity.
    pub address: Address,
    /// Balance in raw units.
    pub balance: Amount,
}

impl Account {
    /// Create a new account view.
    pub fn new(address: Address, balance: Amount) -> Self {
        Self { address, balance }
    }

    /// Check if the account holds anything.
    pub fn is_empty(&self) -> bool {
        self.balance == 0
    }
}

/// An allowance granted by `owner` to `spender`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allowance {
    pub owner: Address,
    pub spender: Address,
    pub remaining: Amount,
}
