//! The bonding curve.
//!
//! Price grows linearly with cumulative trading volume:
//!
//! ```text
//! price(volume) = base_price + floor(volume * base_price / slope_denominator)
//! ```
//!
//! Prices are reserve-currency units per whole unit (`10^18` raw units), and
//! every division floors.

use bondcurve_common::{checked_add, mul_div, Amount, ExchangeError, Result, UNIT};
use serde::{Deserialize, Serialize};

/// Default base price: `10^15` reserve units per whole unit.
pub const DEFAULT_BASE_PRICE: Amount = 1_000_000_000_000_000;

/// Default slope denominator: `10^24`.
pub const DEFAULT_SLOPE_DENOMINATOR: Amount = 1_000_000_000_000_000_000_000_000;

/// Curve constants. Fixed at construction and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondingCurve {
    base_price: Amount,
    slope_denominator: Amount,
}

impl BondingCurve {
    /// Create a curve, rejecting zero constants.
    pub fn new(base_price: Amount, slope_denominator: Amount) -> Result<Self> {
        if base_price == 0 {
            return Err(ExchangeError::ConfigurationError(
                "base price must be positive".to_string(),
            ));
        }
        if slope_denominator == 0 {
            return Err(ExchangeError::ConfigurationError(
                "slope denominator must be positive".to_string(),
            ));
        }

        Ok(Self {
            base_price,
            slope_denominator,
        })
    }

    /// Base price.
    pub fn base_price(&self) -> Amount {
        self.base_price
    }

    /// Slope denominator.
    pub fn slope_denominator(&self) -> Amount {
        self.slope_denominator
    }

    /// Price at the given cumulative volume.
    pub fn price_at(&self, cumulative_volume: Amount) -> Result<Amount> {
        let growth = mul_div(
            cumulative_volume,
            self.base_price,
            self.slope_denominator,
            "price growth",
        )?;
        checked_add(self.base_price, growth, "price")
    }

    /// Units bought by `reserve` at `price`: `floor(reserve * 10^18 / price)`.
    ///
    /// Returns zero for a zero price.
    pub fn units_for_reserve(&self, reserve: Amount, price: Amount) -> Result<Amount> {
        if price == 0 {
            return Ok(0);
        }
        mul_div(reserve, UNIT, price, "units for reserve")
    }

    /// Reserve paid for `units` at `price`: `floor(units * price / 10^18)`.
    pub fn reserve_for_units(&self, units: Amount, price: Amount) -> Result<Amount> {
        mul_div(units, price, UNIT, "reserve for units")
    }
}

impl Default for BondingCurve {
    fn default() -> Self {
        Self {
            base_price: DEFAULT_BASE_PRICE,
            slope_denominator: DEFAULT_SLOPE_DENOMINATOR,
        }
    }
}
