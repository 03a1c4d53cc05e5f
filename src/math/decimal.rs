//! Large decimal values, precise to 18 digits.
//!
//! Prices and USD values are carried as `Decimal`s. A token amount becomes
//! a value through [`Decimal::from_token_amount`], which removes the token's
//! own decimals.

#![allow(clippy::manual_range_contains)]

use {
    crate::{
        error::CoreError,
        math::common::{mul_div, pow10, wad, Rounding, TryAdd, TryMul, TrySub, BPS, SCALE},
    },
    alloc::{string::ToString, vec},
    core::fmt,
    odra::casper_types::U256,
};

/// Large decimal values, precise to 18 digits
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Eq, Ord)]
pub struct Decimal(pub U256);

impl Decimal {
    /// One
    pub fn one() -> Self {
        Self(wad())
    }

    /// Zero
    pub fn zero() -> Self {
        Self(U256::zero())
    }

    /// Create decimal from scaled value
    pub fn from_scaled_val(scaled_val: U256) -> Self {
        Self(scaled_val)
    }

    /// Return raw scaled value
    #[allow(clippy::wrong_self_convention)]
    pub fn to_scaled_val(&self) -> U256 {
        self.0
    }

    /// Create a decimal from a basis-point value, `10_000` being one.
    pub fn from_bps(bps: u32) -> Self {
        Self(wad() * U256::from(bps) / U256::from(BPS))
    }

    /// USD value of `amount` base units of a token with `decimals`, at
    /// `price` USD per whole token.
    pub fn from_token_amount(amount: U256, price: Decimal, decimals: u8) -> Result<Self, CoreError> {
        Ok(Self(mul_div(amount, price.0, pow10(decimals)?, Rounding::Down)?))
    }

    /// Number of base units of a token with `decimals` worth this value at
    /// `price` USD per whole token.
    pub fn to_token_amount(&self, price: Decimal, decimals: u8, rounding: Rounding) -> Result<U256, CoreError> {
        if price.0.is_zero() {
            return Err(CoreError::PriceUnavailable);
        }
        mul_div(self.0, pow10(decimals)?, price.0, rounding)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut scaled_val = self.0.to_string();
        if scaled_val.len() <= SCALE {
            scaled_val.insert_str(0, &vec!["0"; SCALE - scaled_val.len()].join(""));
            scaled_val.insert_str(0, "0.");
        } else {
            scaled_val.insert(scaled_val.len() - SCALE, '.');
        }
        f.write_str(&scaled_val)
    }
}

impl From<u64> for Decimal {
    fn from(val: u64) -> Self {
        // u64::MAX * 1e18 stays far below U256::MAX.
        Self(wad() * U256::from(val))
    }
}

impl TryAdd for Decimal {
    fn try_add(self, rhs: Self) -> Result<Self, CoreError> {
        Ok(Self(self.0.try_add(rhs.0)?))
    }
}

impl TrySub for Decimal {
    fn try_sub(self, rhs: Self) -> Result<Self, CoreError> {
        Ok(Self(self.0.try_sub(rhs.0)?))
    }
}

impl TryMul<Decimal> for Decimal {
    fn try_mul(self, rhs: Self) -> Result<Self, CoreError> {
        Ok(Self(mul_div(self.0, rhs.0, wad(), Rounding::Down)?))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloc::format;

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Decimal::one()), "1.000000000000000000");
        assert_eq!(format!("{}", Decimal::from_bps(8_000)), "0.800000000000000000");
        assert_eq!(format!("{}", Decimal::from(104_000u64)), "104000.000000000000000000");
    }

    #[test]
    fn test_token_value() {
        // 1 BTC (8 decimals) at 104,000 USD.
        let value = Decimal::from_token_amount(U256::from(100_000_000u64), Decimal::from(104_000u64), 8).unwrap();
        assert_eq!(value, Decimal::from(104_000u64));

        // 5,000,000 cents at 1 USD.
        let value = Decimal::from_token_amount(U256::from(5_000_000u64), Decimal::one(), 2).unwrap();
        assert_eq!(value, Decimal::from(50_000u64));
        assert_eq!(
            value.to_token_amount(Decimal::one(), 2, Rounding::Down),
            Ok(U256::from(5_000_000u64))
        );
    }

    #[test]
    fn test_checked_ops() {
        let half = Decimal::from_bps(5_000);
        assert_eq!(Decimal::one().try_mul(half), Ok(half));
        assert_eq!(Decimal::from(300u64).try_mul(Decimal::from_bps(2_500)), Ok(Decimal::from(75u64)));
        assert_eq!(half.try_add(half), Ok(Decimal::one()));
        assert_eq!(Decimal::zero().try_sub(half), Err(CoreError::MathOverflow));
        assert_eq!(Decimal::from_scaled_val(U256::MAX).try_mul(Decimal::from(2u64)), Err(CoreError::MathOverflow));
    }
}
