//! Supply change records.

use bondcurve_common::{Address, Amount};
use serde::{Deserialize, Serialize};

/// Type of supply change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplyChangeKind {
    /// Units created.
    Mint,
    /// Units destroyed.
    Burn,
}

/// Record of a mint or burn, with the values needed to undo it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyChange {
    /// Account affected.
    pub account: Address,
    /// Change type.
    pub kind: SupplyChangeKind,
    /// Amount minted or burned.
    pub amount: Amount,
    /// Account balance before the change.
    pub balance_before: Amount,
    /// Account balance after the change.
    pub balance_after: Amount,
    /// Total supply before the change.
    pub supply_before: Amount,
    /// Total supply after the change.
    pub supply_after: Amount,
}

impl SupplyChange {
    /// Check the record is internally consistent.
    pub fn is_consistent(&self) -> bool {
        match self.kind {
            SupplyChangeKind::Mint => {
                self.balance_before.checked_add(self.amount) == Some(self.balance_after)
                    && self.supply_before.checked_add(self.amount) == Some(self.supply_after)
            }
            SupplyChangeKind::Burn => {
                self.balance_before.checked_sub(self.amount) == Some(self.balance_after)
                    && self.supply_before.checked_sub(self.amount) == Some(self.supply_after)
            }
        }
    }
}
