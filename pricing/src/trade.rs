//! Trade receipts.

use bondcurve_common::{format_units, Address, Amount, OperationId};
use serde::{Deserialize, Serialize};

/// Direction of a trade against the curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    /// Reserve currency in, units out.
    Buy,
    /// Units in, reserve currency out.
    Sell,
}

/// Represents a completed trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeReceipt {
    /// Operation that executed the trade.
    pub operation_id: OperationId,
    /// Buy or sell.
    pub side: TradeSide,
    /// Trader identity.
    pub trader: Address,
    /// Units minted (buy) or burned (sell).
    pub units: Amount,
    /// Reserve currency paid in (buy) or out (sell).
    pub reserve: Amount,
    /// Price the trade executed at.
    pub price: Amount,
    /// Cumulative volume after the trade.
    pub volume_after: Amount,
    /// Reserve pool after the trade.
    pub pool_after: Amount,
}

impl TradeReceipt {
    /// Get a human-readable one-line summary.
    pub fn summary(&self) -> String {
        let verb = match self.side {
            TradeSide::Buy => "bought",
            TradeSide::Sell => "sold",
        };
        format!(
            "{} {} {} units for {} reserve at {}",
            self.trader.short(),
            verb,
            format_units(self.units),
            format_units(self.reserve),
            format_units(self.price),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bondcurve_common::UNIT;

    #[test]
    fn test_summary() {
        let receipt = TradeReceipt {
            operation_id: OperationId::new(),
            side: TradeSide::Buy,
            trader: Address::from_label("alice"),
            units: UNIT,
            reserve: UNIT / 1000,
            price: UNIT / 1000,
            volume_after: UNIT,
            pool_after: UNIT / 1000,
        };

        let summary = receipt.summary();
        assert!(summary.contains("bought 1 units for 0.001 reserve at 0.001"));
    }
}
