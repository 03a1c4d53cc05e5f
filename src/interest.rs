//! Lazy compounding index.
//!
//! Nothing ticks in the background: the index of a pair only moves when a
//! position of that pair is touched, by the simple interest accrued since
//! the previous touch. Debt is stored divided by the index current at the
//! time it was written, so one index update re-prices every position.

use crate::{
    error::CoreError,
    math::{
        common::{mul_div, Rounding, BPS, MILLIS_PER_YEAR},
        Ray, TryAdd,
    },
};
use odra::casper_types::U256;

/// Milliseconds between two block times, zero if the clock went backwards.
pub fn millis_elapsed(last_update: u64, now: u64) -> u64 {
    now.saturating_sub(last_update)
}

/// `index + index · rate · elapsed / (year · 10_000)`.
///
/// Returns the index untouched when no time has passed.
pub fn accrue_index(index: Ray, rate_bps: u32, elapsed_ms: u64) -> Result<Ray, CoreError> {
    if elapsed_ms == 0 || rate_bps == 0 {
        return Ok(index);
    }
    let growth = mul_div(
        index.to_scaled_val(),
        U256::from(rate_bps) * U256::from(elapsed_ms),
        U256::from(MILLIS_PER_YEAR) * U256::from(BPS),
        Rounding::Down,
    )?;
    index.try_add(Ray::from_scaled_val(growth))
}

/// Scaled debt recorded for `amount` of new debt; rounded up so the borrower
/// never owes less than they took.
pub fn scale_debt(amount: U256, index: Ray) -> Result<U256, CoreError> {
    index.scale_down(amount, Rounding::Up)
}

/// Scaled debt removed by a payment of `amount`; rounded down so a partial
/// payment never clears more than it covers.
pub fn scale_payment(amount: U256, index: Ray) -> Result<U256, CoreError> {
    index.scale_down(amount, Rounding::Down)
}

/// Debt currently owed for `scaled` at `index`, rounded up.
pub fn actual_debt(scaled: U256, index: Ray) -> Result<U256, CoreError> {
    index.scale_up(scaled, Rounding::Up)
}

#[cfg(test)]
mod test {
    use super::*;

    const DAY_MS: u64 = 24 * 60 * 60 * 1000;

    #[test]
    fn test_zero_elapsed_is_noop() {
        let index = accrue_index(Ray::one(), 500, 10 * DAY_MS).unwrap();
        assert_eq!(accrue_index(index, 500, 0), Ok(index));
        assert_eq!(accrue_index(accrue_index(index, 500, 0).unwrap(), 500, 0), Ok(index));
    }

    #[test]
    fn test_full_year_at_five_percent() {
        let index = accrue_index(Ray::one(), 500, MILLIS_PER_YEAR).unwrap();
        let expected = Ray::one().to_scaled_val() / U256::from(100u8) * U256::from(105u8);
        assert_eq!(index.to_scaled_val(), expected);
    }

    #[test]
    fn test_thirty_days_interest() {
        let principal = U256::from(5_000_000u64);
        let index = accrue_index(Ray::one(), 500, 30 * DAY_MS).unwrap();
        let scaled = scale_debt(principal, Ray::one()).unwrap();
        let interest = actual_debt(scaled, index).unwrap() - principal;
        // 5,000,000 · 0.05 · 30 / 365 = 20,547.9
        assert!(interest >= U256::from(20_342u64) && interest <= U256::from(20_754u64));
    }

    #[test]
    fn test_touches_compound() {
        let once = accrue_index(Ray::one(), 1_000, 2 * DAY_MS).unwrap();
        let twice = accrue_index(accrue_index(Ray::one(), 1_000, DAY_MS).unwrap(), 1_000, DAY_MS).unwrap();
        assert!(twice > once);
    }

    #[test]
    fn test_scaling_favours_the_ledger() {
        let index = accrue_index(Ray::one(), 700, 123 * DAY_MS).unwrap();
        let amount = U256::from(1_000_003u64);
        let scaled = scale_debt(amount, index).unwrap();
        assert!(actual_debt(scaled, index).unwrap() >= amount);
        assert!(scale_payment(amount, index).unwrap() <= scaled);
    }

    #[test]
    fn test_clock_going_backwards() {
        assert_eq!(millis_elapsed(100, 40), 0);
        assert_eq!(millis_elapsed(40, 100), 60);
    }
}
