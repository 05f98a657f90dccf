//! Bondcurve Ledger
//!
//! Fungible-unit account book: total supply, balances and allowances, with
//! mint, burn, transfer, approve and transfer-on-behalf.

pub mod engine;
pub mod account;
pub mod journal;
pub mod balance;

pub use engine::Ledger;
pub use account::{Account, Allowance};
pub use journal::JournalBatch;
pub use balance::{SupplyChange, SupplyChangeKind};
