//! Anchor pool reserves, swap quotes and liquidity share accounting.
//!
//! Reserves are kept in token base units. Quotes normalize both sides to
//! 18 decimals before touching the curve and convert back with rounding
//! that always favours the pool.

use crate::{
    curve,
    error::CoreError,
    math::{
        common::{bps_of, integer_sqrt, mul_div, pow10, Rounding, BPS, SCALE},
        TryAdd, TrySub,
    },
};
use odra::casper_types::U256;

/// Shares locked forever by the first deposit.
pub const MINIMUM_LIQUIDITY: u64 = 1_000;

/// Side of the anchor pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// The base reserve asset
    Base,
    /// The base-stable synthetic
    Stable,
}

impl Side {
    /// The other side of the pair.
    pub fn opposite(self) -> Self {
        match self {
            Side::Base => Side::Stable,
            Side::Stable => Side::Base,
        }
    }
}

/// Decimal normalization factors of the two pool assets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolScales {
    base: U256,
    stable: U256,
}

impl PoolScales {
    /// Factors lifting each asset to 18 decimals.
    pub fn new(base_decimals: u8, stable_decimals: u8) -> Result<Self, CoreError> {
        Ok(Self { base: scale_for(base_decimals)?, stable: scale_for(stable_decimals)? })
    }

    fn of(&self, side: Side) -> U256 {
        match side {
            Side::Base => self.base,
            Side::Stable => self.stable,
        }
    }
}

fn scale_for(decimals: u8) -> Result<U256, CoreError> {
    let gap = (SCALE as u8).checked_sub(decimals).ok_or(CoreError::InvalidConfig)?;
    pow10(gap)
}

/// Priced swap, in token base units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapQuote {
    /// Gross amount taken from the trader
    pub amount_in: U256,
    /// Amount paid to the recipient
    pub amount_out: U256,
    /// Part of `amount_in` kept by the pool as fee
    pub fee: U256,
}

/// A deposit resolved against the current pool ratio.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deposit {
    /// Base asset taken
    pub base: U256,
    /// Stable asset taken
    pub stable: U256,
    /// Shares credited to the recipient
    pub shares: U256,
    /// Shares locked forever, non-zero only on the first deposit
    pub locked: U256,
}

/// The anchor pool's two reserve balances.
#[odra::odra_type]
pub struct ReservePair {
    /// Base reserve asset balance
    pub base: U256,
    /// Base-stable synthetic balance
    pub stable: U256,
}

impl ReservePair {
    /// A pool that has never been seeded.
    pub fn empty() -> Self {
        Self { base: U256::zero(), stable: U256::zero() }
    }

    /// Balance of one side.
    pub fn get(&self, side: Side) -> U256 {
        match side {
            Side::Base => self.base,
            Side::Stable => self.stable,
        }
    }

    fn get_mut(&mut self, side: Side) -> &mut U256 {
        match side {
            Side::Base => &mut self.base,
            Side::Stable => &mut self.stable,
        }
    }

    fn normalized(&self, side: Side, scales: &PoolScales) -> Result<U256, CoreError> {
        self.get(side)
            .checked_mul(scales.of(side))
            .ok_or(CoreError::MathOverflow)
    }

    /// The curve invariant of the normalized reserves.
    pub fn invariant(&self, scales: &PoolScales) -> Result<U256, CoreError> {
        curve::invariant(self.normalized(Side::Base, scales)?, self.normalized(Side::Stable, scales)?)
    }

    /// Prices selling exactly `amount_in` of `side_in`.
    pub fn quote_exact_in(
        &self,
        side_in: Side,
        amount_in: U256,
        fee_bps: u32,
        scales: &PoolScales,
    ) -> Result<SwapQuote, CoreError> {
        if amount_in.is_zero() {
            return Err(CoreError::ZeroAmount);
        }
        let side_out = side_in.opposite();
        let fee = bps_of(amount_in, fee_bps, Rounding::Up)?;
        let net_in = amount_in.try_sub(fee)?;

        let x = self.normalized(side_in, scales)?;
        let y = self.normalized(side_out, scales)?;
        let dx = net_in.checked_mul(scales.of(side_in)).ok_or(CoreError::MathOverflow)?;
        let dy = curve::amount_out(x, y, dx)?;
        let amount_out = dy / scales.of(side_out);
        if amount_out.is_zero() {
            return Err(CoreError::InsufficientOutput);
        }
        Ok(SwapQuote { amount_in, amount_out, fee })
    }

    /// Prices buying exactly `amount_out` of `side_out`.
    pub fn quote_exact_out(
        &self,
        side_out: Side,
        amount_out: U256,
        fee_bps: u32,
        scales: &PoolScales,
    ) -> Result<SwapQuote, CoreError> {
        if amount_out.is_zero() {
            return Err(CoreError::ZeroAmount);
        }
        let side_in = side_out.opposite();
        let x = self.normalized(side_in, scales)?;
        let y = self.normalized(side_out, scales)?;
        let dy = amount_out.checked_mul(scales.of(side_out)).ok_or(CoreError::MathOverflow)?;
        let dx = curve::amount_in(x, y, dy)?;
        let net_in = mul_div(dx, U256::one(), scales.of(side_in), Rounding::Up)?;
        if fee_bps >= BPS {
            return Err(CoreError::InvalidConfig);
        }
        let amount_in = mul_div(net_in, U256::from(BPS), U256::from(BPS - fee_bps), Rounding::Up)?;
        Ok(SwapQuote { amount_in, amount_out, fee: amount_in.try_sub(net_in)? })
    }

    /// Books a priced swap into the reserves.
    pub fn apply_swap(&mut self, side_in: Side, quote: &SwapQuote) -> Result<(), CoreError> {
        let reserve_in = self.get_mut(side_in);
        *reserve_in = reserve_in.try_add(quote.amount_in)?;
        let reserve_out = self.get_mut(side_in.opposite());
        *reserve_out = reserve_out
            .checked_sub(quote.amount_out)
            .ok_or(CoreError::InsufficientLiquidity)?;
        Ok(())
    }

    /// Resolves a deposit of at most `max_base`/`max_stable` against the
    /// current ratio; the first deposit sets the ratio.
    pub fn quote_deposit(
        &self,
        total_shares: U256,
        max_base: U256,
        max_stable: U256,
        scales: &PoolScales,
    ) -> Result<Deposit, CoreError> {
        if max_base.is_zero() || max_stable.is_zero() {
            return Err(CoreError::ZeroAmount);
        }
        if total_shares.is_zero() {
            let base_norm = max_base.checked_mul(scales.base).ok_or(CoreError::MathOverflow)?;
            let stable_norm = max_stable.checked_mul(scales.stable).ok_or(CoreError::MathOverflow)?;
            let liquidity = integer_sqrt(base_norm.checked_mul(stable_norm).ok_or(CoreError::MathOverflow)?);
            let locked = U256::from(MINIMUM_LIQUIDITY);
            if liquidity <= locked {
                return Err(CoreError::InsufficientLiquidity);
            }
            return Ok(Deposit { base: max_base, stable: max_stable, shares: liquidity - locked, locked });
        }

        let stable_optimal = mul_div(max_base, self.stable, self.base, Rounding::Up)?;
        let (base, stable) = if stable_optimal <= max_stable {
            (max_base, stable_optimal)
        } else {
            (mul_div(max_stable, self.base, self.stable, Rounding::Down)?, max_stable)
        };
        let shares = mul_div(base, total_shares, self.base, Rounding::Down)?
            .min(mul_div(stable, total_shares, self.stable, Rounding::Down)?);
        if shares.is_zero() {
            return Err(CoreError::InsufficientLiquidity);
        }
        Ok(Deposit { base, stable, shares, locked: U256::zero() })
    }

    /// Reserves paid out for burning `shares` of `total_shares`.
    pub fn quote_withdrawal(&self, total_shares: U256, shares: U256) -> Result<(U256, U256), CoreError> {
        if shares.is_zero() {
            return Err(CoreError::ZeroAmount);
        }
        if shares > total_shares {
            return Err(CoreError::InsufficientShares);
        }
        Ok((
            mul_div(self.base, shares, total_shares, Rounding::Down)?,
            mul_div(self.stable, shares, total_shares, Rounding::Down)?,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // Zero-decimal assets, so amounts read as whole tokens.
    fn whole_tokens() -> PoolScales {
        PoolScales::new(0, 0).unwrap()
    }

    fn seeded(base: u64, stable: u64) -> ReservePair {
        ReservePair { base: U256::from(base), stable: U256::from(stable) }
    }

    #[test]
    fn test_scenario_swap_with_five_bps_fee() {
        let scales = whole_tokens();
        let pool = seeded(1_000_000, 1_000_000);
        let quote = pool.quote_exact_in(Side::Base, U256::from(100_000u64), 5, &scales).unwrap();
        assert_eq!(quote.fee, U256::from(50u64));
        // Linear output would be 99,950; the curve gives a little less.
        assert!(quote.amount_out <= U256::from(99_950u64));
        assert!(quote.amount_out >= U256::from(98_950u64));
    }

    #[test]
    fn test_mixed_decimals_quote_like_equal_decimals() {
        let six = PoolScales::new(6, 2).unwrap();
        let pool = ReservePair {
            base: U256::from(1_000_000u64) * U256::from(1_000_000u64),
            stable: U256::from(1_000_000u64) * U256::from(100u64),
        };
        let quote = pool
            .quote_exact_in(Side::Base, U256::from(100_000u64) * U256::from(1_000_000u64), 5, &six)
            .unwrap();
        let whole_out = quote.amount_out / U256::from(100u64);
        assert!(whole_out >= U256::from(98_950u64) && whole_out <= U256::from(99_950u64));
    }

    #[test]
    fn test_exact_out_costs_at_least_exact_in() {
        let scales = whole_tokens();
        let pool = seeded(5_000_000, 4_000_000);
        let sell = pool.quote_exact_in(Side::Stable, U256::from(250_000u64), 30, &scales).unwrap();
        let buy = pool.quote_exact_out(Side::Base, sell.amount_out, 30, &scales).unwrap();
        assert!(buy.amount_in <= sell.amount_in);
        assert!(sell.amount_in - buy.amount_in <= U256::from(2u8));
    }

    #[test]
    fn test_apply_swap_keeps_k() {
        let scales = whole_tokens();
        let mut pool = seeded(1_000_000, 1_000_000);
        let before = pool.invariant(&scales).unwrap();
        let quote = pool.quote_exact_in(Side::Stable, U256::from(40_000u64), 5, &scales).unwrap();
        pool.apply_swap(Side::Stable, &quote).unwrap();
        assert_eq!(pool.stable, U256::from(1_040_000u64));
        assert!(pool.invariant(&scales).unwrap() >= before);
    }

    #[test]
    fn test_oversized_swap_overflows() {
        let scales = whole_tokens();
        let pool = seeded(1_000_000, 1_000_000);
        assert_eq!(
            pool.quote_exact_in(Side::Base, U256::from(100_000_000_000u64), 5, &scales),
            Err(CoreError::MathOverflow)
        );
    }

    #[test]
    fn test_swap_against_empty_pool() {
        let scales = PoolScales::new(18, 18).unwrap();
        assert_eq!(
            ReservePair::empty().quote_exact_in(Side::Base, U256::one(), 5, &scales),
            Err(CoreError::InsufficientLiquidity)
        );
        assert_eq!(PoolScales::new(19, 18), Err(CoreError::InvalidConfig));
    }

    #[test]
    fn test_first_deposit_locks_minimum_liquidity() {
        let scales = PoolScales::new(6, 18).unwrap();
        let deposit = ReservePair::empty()
            .quote_deposit(U256::zero(), U256::from(1_000_000u64), U256::from(1_000_000_000_000_000_000u64), &scales)
            .unwrap();
        // sqrt(1e18 · 1e18) minus the locked amount
        assert_eq!(deposit.locked, U256::from(MINIMUM_LIQUIDITY));
        assert_eq!(deposit.shares, U256::from(1_000_000_000_000_000_000u64) - deposit.locked);
    }

    #[test]
    fn test_dust_first_deposit_rejected() {
        let scales = PoolScales::new(18, 18).unwrap();
        assert_eq!(
            ReservePair::empty().quote_deposit(U256::zero(), U256::from(10u8), U256::from(10u8), &scales),
            Err(CoreError::InsufficientLiquidity)
        );
    }

    #[test]
    fn test_later_deposit_follows_ratio() {
        let scales = PoolScales::new(18, 18).unwrap();
        let pool = seeded(2_000, 1_000);
        let total = U256::from(1_414u64);
        let deposit = pool.quote_deposit(total, U256::from(500u64), U256::from(500u64), &scales).unwrap();
        assert_eq!(deposit.base, U256::from(500u64));
        assert_eq!(deposit.stable, U256::from(250u64));
        assert_eq!(deposit.shares, U256::from(353u64));

        let deposit = pool.quote_deposit(total, U256::from(5_000u64), U256::from(100u64), &scales).unwrap();
        assert_eq!(deposit.base, U256::from(200u64));
        assert_eq!(deposit.stable, U256::from(100u64));
    }

    #[test]
    fn test_withdrawal_is_pro_rata_floor() {
        let pool = seeded(1_001, 2_003);
        assert_eq!(
            pool.quote_withdrawal(U256::from(1_000u64), U256::from(500u64)),
            Ok((U256::from(500u64), U256::from(1_001u64)))
        );
        assert_eq!(
            pool.quote_withdrawal(U256::from(1_000u64), U256::from(1_001u64)),
            Err(CoreError::InsufficientShares)
        );
    }
}
