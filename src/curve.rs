//! Stable-curve invariant `k = x·y·(x² + y²)` for the anchor pair.
//!
//! Every function here works on reserves normalized to 18 decimals. The
//! invariant is held WAD-scaled: `invariant(x, y) = 1e18 · X·Y·(X² + Y²)`
//! where `X = x / 1e18`. The same expression is used as the Newton target,
//! so a solution found by [`solve_reserve`] can be checked against `k`
//! without mixing two roundings of the same polynomial.

use crate::{
    error::CoreError,
    math::common::{mul_div, wad, Rounding, TryAdd, TrySub},
};
use odra::casper_types::U256;

/// Upper bound on Newton steps.
pub const MAX_ITERATIONS: usize = 255;

/// The invariant of a normalized reserve pair.
pub fn invariant(x: U256, y: U256) -> Result<U256, CoreError> {
    let w = wad();
    let xy = mul_div(x, y, w, Rounding::Down)?;
    let x2 = mul_div(x, x, w, Rounding::Down)?;
    let y2 = mul_div(y, y, w, Rounding::Down)?;
    mul_div(xy, x2.try_add(y2)?, w, Rounding::Down)
}

/// `∂k/∂y = x³ + 3·x·y²`, WAD-scaled like the invariant.
fn derivative(x: U256, y: U256) -> Result<U256, CoreError> {
    let w = wad();
    let x3 = mul_div(mul_div(x, x, w, Rounding::Down)?, x, w, Rounding::Down)?;
    let xy2 = mul_div(mul_div(y, y, w, Rounding::Down)?, x, w, Rounding::Down)?;
    x3.try_add(xy2.checked_mul(U256::from(3u8)).ok_or(CoreError::MathOverflow)?)
}

/// Smallest `y` with `invariant(x, y) >= k`, starting Newton from `guess`.
pub fn solve_reserve(x: U256, k: U256, guess: U256) -> Result<U256, CoreError> {
    let w = wad();
    let mut y = guess;
    for _ in 0..MAX_ITERATIONS {
        let f = invariant(x, y)?;
        let d = derivative(x, y)?;
        if d.is_zero() {
            return Err(CoreError::NoConvergence);
        }
        let step = if f > k {
            let step = mul_div(f - k, w, d, Rounding::Down)?;
            y = y.checked_sub(step).ok_or(CoreError::NoConvergence)?;
            step
        } else {
            let step = mul_div(k - f, w, d, Rounding::Down)?;
            y = y.try_add(step)?;
            step
        };
        if step <= U256::one() {
            return settle(x, k, y);
        }
    }
    Err(CoreError::NoConvergence)
}

/// Moves a converged `y` onto the smallest value that still preserves `k`,
/// galloping away from `y` to bracket it and then bisecting.
fn settle(x: U256, k: U256, y: U256) -> Result<U256, CoreError> {
    if k.is_zero() {
        return Ok(U256::zero());
    }
    // invariant(x, below) < k <= invariant(x, above)
    let (mut below, mut above) = if invariant(x, y)? >= k {
        let mut above = y;
        let mut step = U256::one();
        loop {
            match above.checked_sub(step) {
                Some(candidate) if invariant(x, candidate)? >= k => {
                    above = candidate;
                    step = step.try_add(step)?;
                }
                Some(candidate) => break (candidate, above),
                None => break (U256::zero(), above),
            }
        }
    } else {
        let mut below = y;
        let mut step = U256::one();
        loop {
            let candidate = below.try_add(step)?;
            if invariant(x, candidate)? >= k {
                break (below, candidate);
            }
            below = candidate;
            step = step.try_add(step)?;
        }
    };
    while above - below > U256::one() {
        let mid = below + ((above - below) >> 1);
        if invariant(x, mid)? >= k {
            above = mid;
        } else {
            below = mid;
        }
    }
    Ok(above)
}

/// Output reserve released when `amount_in` is added to reserve `x`.
pub fn amount_out(x: U256, y: U256, amount_in: U256) -> Result<U256, CoreError> {
    if x.is_zero() || y.is_zero() {
        return Err(CoreError::InsufficientLiquidity);
    }
    let k = invariant(x, y)?;
    if k.is_zero() {
        return Err(CoreError::InsufficientLiquidity);
    }
    let new_y = solve_reserve(x.try_add(amount_in)?, k, y)?;
    Ok(y.saturating_sub(new_y))
}

/// Input that must be added to reserve `x` to release `amount_out` of `y`.
pub fn amount_in(x: U256, y: U256, amount_out: U256) -> Result<U256, CoreError> {
    if x.is_zero() || y.is_zero() || amount_out >= y {
        return Err(CoreError::InsufficientLiquidity);
    }
    let k = invariant(x, y)?;
    if k.is_zero() {
        return Err(CoreError::InsufficientLiquidity);
    }
    // The invariant is symmetric, so solving for x mirrors solving for y.
    let new_x = solve_reserve(y.try_sub(amount_out)?, k, x)?;
    Ok(new_x.saturating_sub(x))
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    fn units(n: u64) -> U256 {
        U256::from(n) * wad()
    }

    #[test]
    fn test_invariant_is_symmetric() {
        let (x, y) = (units(1_200), units(800));
        assert_eq!(invariant(x, y), invariant(y, x));
        // 1·1·(1 + 1) = 2
        assert_eq!(invariant(units(1), units(1)), Ok(units(2)));
    }

    #[test]
    fn test_balanced_swap_is_near_linear() {
        let reserve = units(1_000_000);
        let out = amount_out(reserve, reserve, units(100_000)).unwrap();
        assert!(out < units(100_000));
        assert!(out > units(99_000));
    }

    #[test]
    fn test_solver_recovers_reserve() {
        let (x, y) = (units(500_000), units(700_000));
        let k = invariant(x, y).unwrap();
        let solved = solve_reserve(x, k, units(1)).unwrap();
        assert_eq!(solved, y);
    }

    #[test]
    fn test_empty_reserves() {
        assert_eq!(amount_out(U256::zero(), units(1), units(1)), Err(CoreError::InsufficientLiquidity));
        assert_eq!(amount_in(units(1), units(1), units(1)), Err(CoreError::InsufficientLiquidity));
    }

    #[test]
    fn test_dust_reserves_have_no_invariant() {
        // 1e-9 of each side floors the invariant to zero.
        let dust = U256::from(1_000_000_000u64);
        assert_eq!(invariant(dust, dust), Ok(U256::zero()));
        assert_eq!(amount_out(dust, dust, dust), Err(CoreError::InsufficientLiquidity));
        assert_eq!(amount_in(dust, dust, U256::one()), Err(CoreError::InsufficientLiquidity));
    }

    #[test]
    fn test_settle_from_a_distant_guess() {
        let (x, y) = (units(500_000), units(700_000));
        let k = invariant(x, y).unwrap();
        let far = U256::from(10_000_000u64);
        assert_eq!(settle(x, k, y + far), Ok(y));
        assert_eq!(settle(x, k, y - far), Ok(y));
        assert_eq!(settle(x, k, U256::zero()), Ok(y));
        assert_eq!(settle(x, U256::zero(), y), Ok(U256::zero()));
    }

    #[test]
    fn test_overflow_is_reported() {
        let billion = units(1_000_000_000);
        assert!(invariant(billion, billion).is_ok());
        let hundred_billion = units(100_000_000_000);
        assert_eq!(invariant(hundred_billion, hundred_billion), Err(CoreError::MathOverflow));
        assert_eq!(amount_out(billion, billion, hundred_billion), Err(CoreError::MathOverflow));
        assert_eq!(amount_out(hundred_billion, hundred_billion, units(1)), Err(CoreError::MathOverflow));
    }

    #[test]
    fn test_flat_derivative_does_not_converge() {
        // No reserve on the other side: the invariant cannot grow with y.
        assert_eq!(solve_reserve(U256::zero(), units(2), units(1)), Err(CoreError::NoConvergence));
        // One wei against sub-unit reserves floors the derivative to zero.
        assert_eq!(solve_reserve(U256::one(), units(2), U256::one()), Err(CoreError::NoConvergence));
    }

    #[test]
    fn test_zero_input_releases_nothing() {
        let reserve = units(10_000);
        assert_eq!(amount_out(reserve, reserve, U256::zero()), Ok(U256::zero()));
    }

    proptest! {
        #[test]
        fn k_never_decreases(x in 1_000u64..1_000_000_000, y in 1_000u64..1_000_000_000, dx in 1u64..1_000_000_000) {
            let (x, y, dx) = (units(x), units(y), units(dx));
            let out = amount_out(x, y, dx).unwrap();
            prop_assert!(out < y);
            let before = invariant(x, y).unwrap();
            let after = invariant(x + dx, y - out).unwrap();
            prop_assert!(after >= before);
        }

        #[test]
        fn exact_out_reproduces_exact_in(x in 100_000u64..10_000_000, ratio in 50u64..200, pct in 1u64..20) {
            let (x, y) = (units(x), units(x * ratio / 100));
            let dx = x * U256::from(pct) / U256::from(100u8);
            let out = amount_out(x, y, dx).unwrap();
            let back = amount_in(x, y, out).unwrap();
            prop_assert!(back <= dx);
            prop_assert!(dx - back <= U256::one());
        }
    }
}
