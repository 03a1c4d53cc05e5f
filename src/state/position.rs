//! Borrower positions: collateral, scaled debt and status.

use crate::{
    error::CoreError,
    interest,
    math::{Ray, TryAdd, TrySub},
};
use odra::casper_types::U256;

/// Lifecycle of a position.
#[odra::odra_type]
pub enum PositionStatus {
    /// No collateral and no debt.
    Empty,
    /// Holds collateral, debt or both.
    Active,
    /// Last touched by a liquidation.
    Liquidated,
}

/// A borrower's collateral and debt for one (collateral, synthetic) pair.
#[odra::odra_type]
pub struct Position {
    /// Collateral held, in collateral base units
    pub collateral: U256,
    /// Debt divided by the pair index at the time it was written
    pub scaled_debt: U256,
    /// Debt not yet attributed to interest
    pub principal: U256,
    /// Pair index when the position was last touched, RAY-scaled
    pub index_snapshot: U256,
    /// Pair rate when the position was last touched, in basis points
    pub rate_bps: u32,
    /// Block time of the last touch
    pub last_update: u64,
    /// Lifecycle state
    pub status: PositionStatus,
}

/// How a payment was split between interest and principal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RepaymentSplit {
    /// Part of the payment covering accrued interest
    pub interest: U256,
    /// Part of the payment reducing principal
    pub principal: U256,
    /// Scaled debt removed from the position
    pub scaled: U256,
}

impl Position {
    /// A position with nothing in it.
    pub fn empty() -> Self {
        Self {
            collateral: U256::zero(),
            scaled_debt: U256::zero(),
            principal: U256::zero(),
            index_snapshot: Ray::one().to_scaled_val(),
            rate_bps: 0,
            last_update: 0,
            status: PositionStatus::Empty,
        }
    }

    /// No collateral and no debt.
    pub fn is_empty(&self) -> bool {
        self.collateral.is_zero() && self.scaled_debt.is_zero()
    }

    /// Debt owed at `index`.
    pub fn debt(&self, index: Ray) -> Result<U256, CoreError> {
        interest::actual_debt(self.scaled_debt, index)
    }

    /// Interest accrued at `index` and not yet paid.
    pub fn accrued_interest(&self, index: Ray) -> Result<U256, CoreError> {
        Ok(self.debt(index)?.saturating_sub(self.principal))
    }

    /// Adds collateral.
    pub fn deposit(&mut self, amount: U256) -> Result<(), CoreError> {
        self.collateral = self.collateral.try_add(amount)?;
        Ok(())
    }

    /// Removes collateral.
    pub fn withdraw(&mut self, amount: U256) -> Result<(), CoreError> {
        self.collateral = self
            .collateral
            .checked_sub(amount)
            .ok_or(CoreError::InsufficientCollateral)?;
        Ok(())
    }

    /// Records `amount` of new debt at `index`; returns the scaled debt added.
    pub fn borrow(&mut self, amount: U256, index: Ray) -> Result<U256, CoreError> {
        let scaled = interest::scale_debt(amount, index)?;
        self.scaled_debt = self.scaled_debt.try_add(scaled)?;
        self.principal = self.principal.try_add(amount)?;
        Ok(scaled)
    }

    /// Applies `amount` to accrued interest first, then to principal.
    ///
    /// A payment equal to the debt clears the position's debt exactly.
    pub fn repay(&mut self, amount: U256, index: Ray) -> Result<RepaymentSplit, CoreError> {
        let debt = self.debt(index)?;
        if amount > debt {
            return Err(CoreError::InsufficientBalance);
        }
        let interest_owed = debt.saturating_sub(self.principal);
        let interest = amount.min(interest_owed);
        let principal = amount.try_sub(interest)?;

        let scaled = if amount == debt {
            self.scaled_debt
        } else {
            interest::scale_payment(amount, index)?.min(self.scaled_debt)
        };
        self.scaled_debt = self.scaled_debt.try_sub(scaled)?;
        self.principal = if self.scaled_debt.is_zero() {
            U256::zero()
        } else {
            self.principal.saturating_sub(principal)
        };
        Ok(RepaymentSplit { interest, principal, scaled })
    }

    /// Removes collateral taken by a liquidator.
    pub fn seize(&mut self, amount: U256) -> Result<(), CoreError> {
        self.withdraw(amount)
    }

    /// Takes every unit of collateral out of the position.
    pub fn release_collateral(&mut self) -> U256 {
        core::mem::replace(&mut self.collateral, U256::zero())
    }

    /// Stamps the position with the pair state it was last seen at.
    pub fn touch(&mut self, index: Ray, rate_bps: u32, now: u64, status: PositionStatus) {
        self.index_snapshot = index.to_scaled_val();
        self.rate_bps = rate_bps;
        self.last_update = now;
        self.status = if self.is_empty() { PositionStatus::Empty } else { status };
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::interest::accrue_index;

    const YEAR_MS: u64 = crate::math::common::MILLIS_PER_YEAR;

    fn units(n: u64) -> U256 {
        U256::from(n)
    }

    #[test]
    fn test_borrow_then_full_repay() {
        let mut position = Position::empty();
        position.deposit(units(100_000_000)).unwrap();
        position.borrow(units(5_000_000), Ray::one()).unwrap();
        let index = accrue_index(Ray::one(), 500, YEAR_MS / 12).unwrap();
        let debt = position.debt(index).unwrap();
        assert!(debt > units(5_000_000));

        let split = position.repay(debt, index).unwrap();
        assert_eq!(split.interest + split.principal, debt);
        assert_eq!(split.principal, units(5_000_000));
        assert_eq!(position.scaled_debt, U256::zero());
        assert_eq!(position.principal, U256::zero());
        assert_eq!(position.release_collateral(), units(100_000_000));
        assert!(position.is_empty());
    }

    #[test]
    fn test_payment_covers_interest_first() {
        let mut position = Position::empty();
        position.borrow(units(1_000_000), Ray::one()).unwrap();
        let index = accrue_index(Ray::one(), 1_000, YEAR_MS).unwrap();
        let interest = position.accrued_interest(index).unwrap();
        assert_eq!(interest, units(100_000));

        let split = position.repay(units(60_000), index).unwrap();
        assert_eq!(split.interest, units(60_000));
        assert_eq!(split.principal, U256::zero());
        assert_eq!(position.principal, units(1_000_000));

        // Rounding of the partial payment leaves one unit of interest behind.
        let split = position.repay(units(140_000), index).unwrap();
        assert_eq!(split.interest + split.principal, units(140_000));
        assert!(split.interest >= units(40_000) && split.interest <= units(40_001));
        assert_eq!(position.principal, units(1_000_000) - split.principal);
        assert!(position.debt(index).unwrap() >= units(900_000));
    }

    #[test]
    fn test_overpayment_rejected() {
        let mut position = Position::empty();
        position.borrow(units(10), Ray::one()).unwrap();
        assert_eq!(position.repay(units(11), Ray::one()), Err(CoreError::InsufficientBalance));
    }

    #[test]
    fn test_withdraw_more_than_held() {
        let mut position = Position::empty();
        position.deposit(units(10)).unwrap();
        assert_eq!(position.withdraw(units(11)), Err(CoreError::InsufficientCollateral));
        assert_eq!(position.collateral, units(10));
    }

    #[test]
    fn test_touch_marks_empty_positions() {
        let mut position = Position::empty();
        position.deposit(units(1)).unwrap();
        position.touch(Ray::one(), 500, 42, PositionStatus::Active);
        assert_eq!(position.status, PositionStatus::Active);
        position.withdraw(units(1)).unwrap();
        position.touch(Ray::one(), 500, 43, PositionStatus::Active);
        assert_eq!(position.status, PositionStatus::Empty);
        assert_eq!(position.last_update, 43);
    }
}
