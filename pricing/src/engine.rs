//! Main pricing engine implementation.

use tracing::{info, instrument, warn};

use bondcurve_common::{
    checked_add, checked_sub, Address, Amount, ExchangeError, Notification, OperationId, Result,
};
use bondcurve_ledger::JournalBatch;

use crate::curve::BondingCurve;
use crate::host::ReserveHost;
use crate::state::MarketState;
use crate::trade::{TradeReceipt, TradeSide};

/// The pricing engine.
///
/// Holds only the curve constants; all mutable state lives in the
/// [`MarketState`] passed to each call.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingEngine {
    curve: BondingCurve,
}

impl PricingEngine {
    /// Create a new pricing engine for the given curve.
    pub fn new(curve: BondingCurve) -> Self {
        Self { curve }
    }

    /// Get the curve.
    pub fn curve(&self) -> &BondingCurve {
        &self.curve
    }

    /// Current price per whole unit.
    pub fn current_price(&self, state: &MarketState) -> Result<Amount> {
        self.curve.price_at(state.cumulative_volume)
    }

    /// Units a payment of `reserve` would buy right now.
    pub fn quote_units_for_reserve(&self, state: &MarketState, reserve: Amount) -> Result<Amount> {
        let price = self.current_price(state)?;
        self.curve.units_for_reserve(reserve, price)
    }

    /// Reserve currency that selling `units` would pay right now.
    pub fn quote_reserve_for_units(&self, state: &MarketState, units: Amount) -> Result<Amount> {
        let price = self.current_price(state)?;
        self.curve.reserve_for_units(units, price)
    }

    /// Convert attached reserve currency into units for `caller`.
    #[instrument(skip(self, state, host), fields(caller = %caller, reserve = %reserve_attached))]
    pub fn buy<H: ReserveHost + ?Sized>(
        &self,
        state: &mut MarketState,
        host: &mut H,
        caller: Address,
        reserve_attached: Amount,
    ) -> Result<TradeReceipt> {
        if reserve_attached == 0 {
            return Err(ExchangeError::ZeroPayment);
        }

        let price = self.current_price(state)?;
        let units = self.curve.units_for_reserve(reserve_attached, price)?;
        if units == 0 {
            return Err(ExchangeError::BelowMinimumTrade {
                reserve: reserve_attached,
                price,
            });
        }

        let volume_after = checked_add(state.cumulative_volume, units, "cumulative volume")?;
        let pool_after = checked_add(state.reserve_pool, reserve_attached, "reserve pool")?;

        let operation_id = OperationId::new();
        let mut batch = JournalBatch::new(operation_id);

        // Mint is the only fallible effect; it runs first so a rejection
        // leaves volume and pool untouched.
        state.ledger.mint(caller, units, &mut batch)?;
        state.cumulative_volume = volume_after;
        state.reserve_pool = pool_after;

        batch.push(Notification::Bought {
            buyer: caller,
            reserve_spent: reserve_attached,
            units_received: units,
            price,
        });
        host.publish(&batch);

        info!(
            operation_id = %operation_id,
            units = %units,
            price = %price,
            volume = %volume_after,
            pool = %pool_after,
            "Buy executed"
        );

        Ok(TradeReceipt {
            operation_id,
            side: TradeSide::Buy,
            trader: caller,
            units,
            reserve: reserve_attached,
            price,
            volume_after,
            pool_after,
        })
    }

    /// Convert `caller`'s entire balance back into reserve currency.
    ///
    /// Volume, burn and pool are all updated before the host is asked to pay
    /// out. A rejected payment rolls every effect back.
    #[instrument(skip(self, state, host), fields(caller = %caller))]
    pub fn sell_all<H: ReserveHost + ?Sized>(
        &self,
        state: &mut MarketState,
        host: &mut H,
        caller: Address,
    ) -> Result<TradeReceipt> {
        let units = state.ledger.balance_of(&caller);
        if units == 0 {
            return Err(ExchangeError::NoHoldings(caller));
        }

        let price = self.current_price(state)?;
        let owed = self.curve.reserve_for_units(units, price)?;
        if state.reserve_pool < owed {
            return Err(ExchangeError::ReserveInsufficient {
                pool: state.reserve_pool,
                owed,
            });
        }

        let volume_before = state.cumulative_volume;
        let pool_before = state.reserve_pool;
        let volume_after = checked_add(volume_before, units, "cumulative volume")?;
        let pool_after = checked_sub(pool_before, owed, "reserve pool")?;

        let operation_id = OperationId::new();
        let mut batch = JournalBatch::new(operation_id);

        let change = state.ledger.burn(caller, units, &mut batch)?;
        state.cumulative_volume = volume_after;
        state.reserve_pool = pool_after;

        if let Err(err) = host.send_reserve(&caller, owed, state) {
            warn!(
                operation_id = %operation_id,
                host = host.name(),
                error = %err,
                "Reserve payout rejected, rolling back sale"
            );
            state.cumulative_volume = volume_before;
            state.reserve_pool = pool_before;
            state.ledger.revert(&change)?;
            return Err(err.into());
        }

        batch.push(Notification::Sold {
            seller: caller,
            units_sold: units,
            reserve_received: owed,
            price,
        });
        host.publish(&batch);

        info!(
            operation_id = %operation_id,
            units = %units,
            owed = %owed,
            price = %price,
            volume = %volume_after,
            pool = %pool_after,
            "Sell executed"
        );

        Ok(TradeReceipt {
            operation_id,
            side: TradeSide::Sell,
            trader: caller,
            units,
            reserve: owed,
            price,
            volume_after,
            pool_after,
        })
    }

    /// Accept reserve currency sent with no instruction.
    ///
    /// Returns the new pool balance.
    #[instrument(skip(self, state), fields(sender = %sender))]
    pub fn deposit(&self, state: &mut MarketState, sender: Address, amount: Amount) -> Result<Amount> {
        let pool_after = checked_add(state.reserve_pool, amount, "reserve pool")?;
        state.reserve_pool = pool_after;

        info!(amount = %amount, pool = %pool_after, "Reserve deposited");

        Ok(pool_after)
    }
}
