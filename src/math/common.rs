//! Scalers, rounding and checked arithmetic shared by `Decimal` and `Ray`.

use crate::error::CoreError;
use odra::casper_types::U256;

/// Decimal places of a WAD value
pub const SCALE: usize = 18;
/// Identity of a WAD value
pub const WAD: u64 = 1_000_000_000_000_000_000;
/// Decimal places of a RAY value
pub const RAY_SCALE: usize = 27;
/// Denominator of every basis-point parameter
pub const BPS: u32 = 10_000;
/// Length of the interest year in block-time milliseconds
pub const MILLIS_PER_YEAR: u64 = 365 * 24 * 60 * 60 * 1000;

/// Direction in which a division remainder is resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rounding {
    /// Toward zero.
    Down,
    /// Away from zero.
    Up,
}

/// Try to subtract, return an error on underflow
pub trait TrySub: Sized {
    /// Subtract
    fn try_sub(self, rhs: Self) -> Result<Self, CoreError>;
}

/// Try to add, return an error on overflow
pub trait TryAdd: Sized {
    /// Add
    fn try_add(self, rhs: Self) -> Result<Self, CoreError>;
}

/// Try to multiply, return an error on overflow
pub trait TryMul<RHS>: Sized {
    /// Multiply
    fn try_mul(self, rhs: RHS) -> Result<Self, CoreError>;
}

impl TryAdd for U256 {
    fn try_add(self, rhs: Self) -> Result<Self, CoreError> {
        self.checked_add(rhs).ok_or(CoreError::MathOverflow)
    }
}

impl TrySub for U256 {
    fn try_sub(self, rhs: Self) -> Result<Self, CoreError> {
        self.checked_sub(rhs).ok_or(CoreError::MathOverflow)
    }
}

impl TryMul<U256> for U256 {
    fn try_mul(self, rhs: U256) -> Result<Self, CoreError> {
        self.checked_mul(rhs).ok_or(CoreError::MathOverflow)
    }
}

/// WAD as a `U256`.
pub fn wad() -> U256 {
    U256::from(WAD)
}

/// RAY as a `U256`.
pub fn ray() -> U256 {
    U256::from(WAD) * U256::from(1_000_000_000u64)
}

/// `10^exponent`, failing beyond what a `U256` holds.
pub fn pow10(exponent: u8) -> Result<U256, CoreError> {
    U256::from(10u8)
        .checked_pow(U256::from(exponent))
        .ok_or(CoreError::MathOverflow)
}

/// `a * b / denominator` with an explicit rounding direction.
pub fn mul_div(a: U256, b: U256, denominator: U256, rounding: Rounding) -> Result<U256, CoreError> {
    if denominator.is_zero() {
        return Err(CoreError::MathOverflow);
    }
    let product = a.try_mul(b)?;
    let quotient = product / denominator;
    match rounding {
        Rounding::Up if !(product % denominator).is_zero() => quotient.try_add(U256::one()),
        _ => Ok(quotient),
    }
}

/// `amount * bps / 10_000`.
pub fn bps_of(amount: U256, bps: u32, rounding: Rounding) -> Result<U256, CoreError> {
    mul_div(amount, U256::from(bps), U256::from(BPS), rounding)
}

/// Floor of the square root, by Newton iteration.
pub fn integer_sqrt(value: U256) -> U256 {
    if value < U256::from(2u8) {
        return value;
    }
    let mut x = value;
    let mut y = (x + U256::one()) >> 1;
    while y < x {
        x = y;
        y = (x + value / x) >> 1;
    }
    x
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mul_div_rounding() {
        let seven = U256::from(7u8);
        let two = U256::from(2u8);
        assert_eq!(mul_div(seven, U256::one(), two, Rounding::Down), Ok(U256::from(3u8)));
        assert_eq!(mul_div(seven, U256::one(), two, Rounding::Up), Ok(U256::from(4u8)));
        assert_eq!(mul_div(U256::from(8u8), U256::one(), two, Rounding::Up), Ok(U256::from(4u8)));
        assert_eq!(
            mul_div(seven, seven, U256::zero(), Rounding::Down),
            Err(CoreError::MathOverflow)
        );
    }

    #[test]
    fn test_bps_of() {
        let amount = U256::from(1_000_000u64);
        assert_eq!(bps_of(amount, 10, Rounding::Up), Ok(U256::from(1_000u64)));
        assert_eq!(bps_of(U256::from(999u64), 10, Rounding::Down), Ok(U256::zero()));
        assert_eq!(bps_of(U256::from(999u64), 10, Rounding::Up), Ok(U256::one()));
    }

    #[test]
    fn test_integer_sqrt() {
        assert_eq!(integer_sqrt(U256::zero()), U256::zero());
        assert_eq!(integer_sqrt(U256::one()), U256::one());
        assert_eq!(integer_sqrt(U256::from(15u8)), U256::from(3u8));
        assert_eq!(integer_sqrt(U256::from(16u8)), U256::from(4u8));
        let big = wad() * wad();
        assert_eq!(integer_sqrt(big), wad());
        assert_eq!(integer_sqrt(big - U256::one()), wad() - U256::one());
    }

    #[test]
    fn test_scalers() {
        assert_eq!(pow10(SCALE as u8), Ok(wad()));
        assert_eq!(pow10(RAY_SCALE as u8), Ok(ray()));
        assert_eq!(wad() * U256::from(1_000_000_000u64), ray());
        assert!(pow10(78).is_err());
    }
}
