//! Fixed-point amounts for bondcurve.
//!
//! Every stored quantity (unit balances, supply, allowances, cumulative
//! volume, reserve currency, prices) is an [`Amount`]: an unsigned integer
//! scaled by `10^DECIMALS`. Products that can exceed 128 bits are computed in
//! a 256-bit intermediate and narrowed back with an overflow check.

use rust_decimal::Decimal;

use crate::error::{ExchangeError, Result};

mod wide {
    use uint::construct_uint;

    construct_uint! {
        /// 256-bit unsigned integer for overflow-free intermediate products.
        pub struct U256(4);
    }
}

pub use wide::U256;

/// Raw fixed-point quantity.
pub type Amount = u128;

/// Number of fractional digits carried by units and reserve currency.
pub const DECIMALS: u32 = 18;

/// One whole unit (`10^18`).
pub const UNIT: Amount = 1_000_000_000_000_000_000;

/// Compute `floor(a * b / denominator)` without intermediate overflow.
///
/// Fails with `ArithmeticOverflow` when the quotient does not fit in an
/// [`Amount`] or when `denominator` is zero.
pub fn mul_div(a: Amount, b: Amount, denominator: Amount, op: &'static str) -> Result<Amount> {
    if denominator == 0 {
        return Err(ExchangeError::ArithmeticOverflow(op));
    }

    let product = U256::from(a) * U256::from(b);
    narrow(product / U256::from(denominator), op)
}

/// Narrow a 256-bit value back to an [`Amount`].
pub fn narrow(value: U256, op: &'static str) -> Result<Amount> {
    if value.bits() > 128 {
        return Err(ExchangeError::ArithmeticOverflow(op));
    }
    Ok(value.low_u128())
}

/// Checked addition that reports the failing operation.
pub fn checked_add(a: Amount, b: Amount, op: &'static str) -> Result<Amount> {
    a.checked_add(b).ok_or(ExchangeError::ArithmeticOverflow(op))
}

/// Checked subtraction that reports the failing operation.
pub fn checked_sub(a: Amount, b: Amount, op: &'static str) -> Result<Amount> {
    a.checked_sub(b).ok_or(ExchangeError::ArithmeticUnderflow(op))
}

/// Whole-unit multiple (`count * 10^18`).
pub const fn units(count: u64) -> Amount {
    count as Amount * UNIT
}

/// Format a raw amount as a decimal string with trailing zeros trimmed.
///
/// `1_500_000_000_000_000_000` formats as `"1.5"`, `UNIT` as `"1"`.
pub fn format_units(amount: Amount) -> String {
    let whole = amount / UNIT;
    let frac = amount % UNIT;

    if frac == 0 {
        return whole.to_string();
    }

    let digits = format!("{:018}", frac);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

/// Parse a human decimal string (e.g. `"0.001"`) into a raw amount.
///
/// Rejects negatives and more than 18 significant fractional digits.
pub fn parse_units(input: &str) -> Result<Amount> {
    let value: Decimal = input
        .trim()
        .parse()
        .map_err(|_| ExchangeError::InvalidAmount(input.to_string()))?;

    from_decimal(value).ok_or_else(|| ExchangeError::InvalidAmount(input.to_string()))
}

/// Convert a non-negative decimal into a raw amount.
pub fn from_decimal(value: Decimal) -> Option<Amount> {
    if value.is_sign_negative() && !value.is_zero() {
        return None;
    }

    let value = value.normalize();
    let scale = value.scale();
    if scale > DECIMALS {
        return None;
    }

    let mantissa = u128::try_from(value.mantissa()).ok()?;
    mantissa.checked_mul(10u128.pow(DECIMALS - scale))
}

/// Convert a raw amount into a decimal, when it fits in 96 bits of mantissa.
pub fn to_decimal(amount: Amount) -> Option<Decimal> {
    let signed = i128::try_from(amount).ok()?;
    Decimal::try_from_i128_with_scale(signed, DECIMALS).ok()
}

/// Serde adapter writing a raw [`Amount`] as a base-10 string.
///
/// Use with `#[serde(with = "amount_string")]` on fields that pass through
/// tagged or flattened containers, which cannot buffer 128-bit integers.
pub mod amount_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::Amount;

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(amount)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_mul_div_floor() {
        assert_eq!(mul_div(7, 3, 2, "test").unwrap(), 10);
        assert_eq!(mul_div(UNIT, UNIT, UNIT, "test").unwrap(), UNIT);
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        // 10^24 * 10^18 overflows u128 but the quotient fits.
        let reserve = 1_000_000 * UNIT;
        let price = 1_000_000_000_000_000;
        assert_eq!(
            mul_div(reserve, UNIT, price, "test").unwrap(),
            1_000_000_000 * UNIT
        );
    }

    #[test]
    fn test_mul_div_overflow_and_zero_denominator() {
        assert!(matches!(
            mul_div(u128::MAX, u128::MAX, 1, "test"),
            Err(ExchangeError::ArithmeticOverflow("test"))
        ));
        assert!(mul_div(1, 1, 0, "test").is_err());
    }

    #[test]
    fn test_checked_helpers() {
        assert_eq!(checked_add(1, 2, "add").unwrap(), 3);
        assert!(matches!(
            checked_sub(1, 2, "sub"),
            Err(ExchangeError::ArithmeticUnderflow("sub"))
        ));
        assert!(checked_add(u128::MAX, 1, "add").is_err());
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(0), "0");
        assert_eq!(format_units(UNIT), "1");
        assert_eq!(format_units(units(1000)), "1000");
        assert_eq!(format_units(UNIT + UNIT / 2), "1.5");
        assert_eq!(format_units(1), "0.000000000000000001");
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_units("1").unwrap(), UNIT);
        assert_eq!(parse_units("0.001").unwrap(), 1_000_000_000_000_000);
        assert_eq!(parse_units("1.50").unwrap(), UNIT + UNIT / 2);
        assert_eq!(parse_units("0.000000000000000001").unwrap(), 1);
        assert!(parse_units("-1").is_err());
        assert!(parse_units("0.0000000000000000001").is_err());
        assert!(parse_units("abc").is_err());
    }

    #[test]
    fn test_decimal_conversion() {
        assert_eq!(from_decimal(dec!(2.25)), Some(2 * UNIT + UNIT / 4));
        assert_eq!(to_decimal(UNIT / 4), Some(dec!(0.25)));
        assert_eq!(to_decimal(u128::MAX), None);
    }
}
