//! Market state shared by the ledger and the pricing engine.

use bondcurve_common::Amount;
use bondcurve_ledger::Ledger;
use serde::{Deserialize, Serialize};

/// All mutable exchange state, owned in one place and passed explicitly.
#[derive(Debug, Clone, Default)]
pub struct MarketState {
    /// Unit ledger.
    pub ledger: Ledger,
    /// Units minted or burned through trading. Never decreases.
    pub cumulative_volume: Amount,
    /// Reserve currency held by the exchange.
    pub reserve_pool: Amount,
}

impl MarketState {
    /// Create an empty market.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture a point-in-time summary.
    pub fn snapshot(&self, price: Amount) -> MarketSnapshot {
        MarketSnapshot {
            total_supply: self.ledger.total_supply(),
            cumulative_volume: self.cumulative_volume,
            reserve_pool: self.reserve_pool,
            price,
            holders: self.ledger.account_count(),
        }
    }
}

/// Point-in-time summary of the market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub total_supply: Amount,
    pub cumulative_volume: Amount,
    pub reserve_pool: Amount,
    pub price: Amount,
    pub holders: usize,
}
