//! Registry entries for collateral and synthetic assets, and the fee schedule.
//!
//! A cap of zero pauses the asset for the flow the cap governs.

use crate::{
    error::CoreError,
    math::{TryAdd, TrySub},
};
use odra::{casper_types::U256, prelude::*};
use serde::{Deserialize, Serialize};

/// Highest fee accepted for any fee parameter, in basis points.
pub const MAX_FEE_BPS: u32 = 1_000;

/// An asset accepted as collateral.
#[odra::odra_type]
pub struct CollateralConfig {
    /// Maximum collateral held across all positions
    pub cap: U256,
    /// Collateral currently held
    pub total: U256,
    /// Feed queried for this asset instead of the core oracle
    pub price_source: Option<Address>,
}

impl CollateralConfig {
    /// Books a deposit against the cap.
    pub fn deposit(&mut self, amount: U256) -> Result<(), CoreError> {
        if self.cap.is_zero() {
            return Err(CoreError::AssetPaused);
        }
        let total = self.total.try_add(amount)?;
        if total > self.cap {
            return Err(CoreError::CollateralCapExceeded);
        }
        self.total = total;
        Ok(())
    }

    /// Books collateral leaving the core. Always allowed, paused or not.
    pub fn release(&mut self, amount: U256) -> Result<(), CoreError> {
        self.total = self.total.try_sub(amount)?;
        Ok(())
    }
}

/// A synthetic asset the core may mint.
#[odra::odra_type]
pub struct SyntheticConfig {
    /// Maximum outstanding debt minted through borrowing
    pub mint_cap: U256,
    /// Maximum amount of a single flash loan
    pub flash_cap: U256,
    /// Debt principal currently minted through borrowing
    pub minted: U256,
}

impl SyntheticConfig {
    /// A fresh registration.
    pub fn new(mint_cap: U256, flash_cap: U256) -> Self {
        Self { mint_cap, flash_cap, minted: U256::zero() }
    }

    /// Minting is paused.
    pub fn is_paused(&self) -> bool {
        self.mint_cap.is_zero()
    }

    /// Books newly borrowed supply against the mint cap.
    pub fn record_mint(&mut self, amount: U256) -> Result<(), CoreError> {
        if self.is_paused() {
            return Err(CoreError::AssetPaused);
        }
        let minted = self.minted.try_add(amount)?;
        if minted > self.mint_cap {
            return Err(CoreError::MintCapExceeded);
        }
        self.minted = minted;
        Ok(())
    }

    /// Books repaid principal.
    pub fn record_burn(&mut self, amount: U256) {
        self.minted = self.minted.saturating_sub(amount);
    }

    /// Checks a flash loan of `amount` against the flash cap.
    pub fn check_flash(&self, amount: U256) -> Result<(), CoreError> {
        if self.flash_cap.is_zero() {
            return Err(CoreError::AssetPaused);
        }
        if amount > self.flash_cap {
            return Err(CoreError::FlashCapExceeded);
        }
        Ok(())
    }
}

/// Fees charged by the core, in basis points.
#[odra::odra_type]
#[derive(Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Anchor pool swap fee, kept by the pool
    pub swap_fee_bps: u32,
    /// Synthetic-to-synthetic swap fee, minted to the treasury
    pub synthetic_swap_fee_bps: u32,
    /// Flash loan fee, minted to the treasury
    pub flash_fee_bps: u32,
}

impl FeeSchedule {
    /// Rejects fees above [`MAX_FEE_BPS`].
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.swap_fee_bps > MAX_FEE_BPS
            || self.synthetic_swap_fee_bps > MAX_FEE_BPS
            || self.flash_fee_bps > MAX_FEE_BPS
        {
            return Err(CoreError::InvalidConfig);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_collateral_cap() {
        let mut config = CollateralConfig { cap: U256::from(100u8), total: U256::zero(), price_source: None };
        config.deposit(U256::from(60u8)).unwrap();
        assert_eq!(config.deposit(U256::from(41u8)), Err(CoreError::CollateralCapExceeded));
        config.deposit(U256::from(40u8)).unwrap();
        config.release(U256::from(100u8)).unwrap();
        config.cap = U256::zero();
        assert_eq!(config.deposit(U256::one()), Err(CoreError::AssetPaused));
    }

    #[test]
    fn test_mint_cap_and_pause() {
        let mut config = SyntheticConfig::new(U256::from(10u8), U256::zero());
        config.record_mint(U256::from(10u8)).unwrap();
        assert_eq!(config.record_mint(U256::one()), Err(CoreError::MintCapExceeded));
        config.record_burn(U256::from(4u8));
        config.record_mint(U256::from(4u8)).unwrap();
        assert_eq!(config.check_flash(U256::one()), Err(CoreError::AssetPaused));
        config.mint_cap = U256::zero();
        assert_eq!(config.record_mint(U256::one()), Err(CoreError::AssetPaused));
    }

    #[test]
    fn test_fee_bounds() {
        let fees = FeeSchedule { swap_fee_bps: 5, synthetic_swap_fee_bps: 30, flash_fee_bps: 10 };
        assert!(fees.validate().is_ok());
        assert_eq!(
            FeeSchedule { flash_fee_bps: MAX_FEE_BPS + 1, ..fees }.validate(),
            Err(CoreError::InvalidConfig)
        );
    }
}
