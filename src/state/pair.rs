//! Per (collateral, synthetic) pair configuration and interest index.

use crate::{
    error::CoreError,
    interest,
    math::{common::BPS, Ray},
};
use odra::casper_types::U256;
use serde::{Deserialize, Serialize};

/// Admin-set risk parameters of a pair.
#[odra::odra_type]
#[derive(Serialize, Deserialize)]
pub struct PairConfig {
    /// Annual interest rate in basis points
    pub rate_bps: u32,
    /// Maximum debt value as a share of collateral value, in basis points
    pub ltv_bps: u32,
    /// Collateral bonus paid to liquidators, in basis points
    pub penalty_bps: u32,
}

impl PairConfig {
    /// Rejects parameters that would make the pair unusable or insolvent.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.ltv_bps == 0 || self.ltv_bps >= BPS {
            return Err(CoreError::InvalidConfig);
        }
        if self.penalty_bps >= BPS || self.rate_bps > BPS {
            return Err(CoreError::InvalidConfig);
        }
        // Seizing debt · (1 + penalty) must not exceed the collateral that
        // backs a position sitting exactly at its LTV bound.
        if u64::from(self.ltv_bps) * u64::from(BPS + self.penalty_bps) > u64::from(BPS) * u64::from(BPS) {
            return Err(CoreError::InvalidConfig);
        }
        Ok(())
    }
}

/// Live state of a configured pair.
#[odra::odra_type]
pub struct PairState {
    /// Current risk parameters
    pub config: PairConfig,
    /// Compounding index, RAY-scaled
    pub index: U256,
    /// Block time of the last accrual
    pub last_update: u64,
    /// Sum of scaled debt over every position of the pair
    pub total_scaled_debt: U256,
}

impl PairState {
    /// A freshly configured pair, index at one.
    pub fn new(config: PairConfig, now: u64) -> Self {
        Self {
            config,
            index: Ray::one().to_scaled_val(),
            last_update: now,
            total_scaled_debt: U256::zero(),
        }
    }

    /// Current index without writing it back.
    pub fn index_at(&self, now: u64) -> Result<Ray, CoreError> {
        interest::accrue_index(
            Ray::from_scaled_val(self.index),
            self.config.rate_bps,
            interest::millis_elapsed(self.last_update, now),
        )
    }

    /// Brings the index up to `now` and returns it.
    pub fn accrue(&mut self, now: u64) -> Result<Ray, CoreError> {
        let index = self.index_at(now)?;
        self.index = index.to_scaled_val();
        self.last_update = self.last_update.max(now);
        Ok(index)
    }

    /// Replaces the risk parameters, settling interest at the old rate first.
    pub fn reconfigure(&mut self, config: PairConfig, now: u64) -> Result<(), CoreError> {
        self.accrue(now)?;
        self.config = config;
        Ok(())
    }

    /// Outstanding debt of the whole pair.
    pub fn total_debt(&self, now: u64) -> Result<U256, CoreError> {
        interest::actual_debt(self.total_scaled_debt, self.index_at(now)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const DAY_MS: u64 = 24 * 60 * 60 * 1000;

    fn config(rate_bps: u32) -> PairConfig {
        PairConfig { rate_bps, ltv_bps: 8_000, penalty_bps: 500 }
    }

    #[test]
    fn test_validate() {
        assert!(config(500).validate().is_ok());
        assert_eq!(PairConfig { ltv_bps: 0, ..config(500) }.validate(), Err(CoreError::InvalidConfig));
        assert_eq!(PairConfig { ltv_bps: 10_000, ..config(500) }.validate(), Err(CoreError::InvalidConfig));
        assert_eq!(
            PairConfig { ltv_bps: 9_800, penalty_bps: 500, rate_bps: 500 }.validate(),
            Err(CoreError::InvalidConfig)
        );
    }

    #[test]
    fn test_accrue_twice_at_same_time() {
        let mut pair = PairState::new(config(500), 0);
        let first = pair.accrue(7 * DAY_MS).unwrap();
        let second = pair.accrue(7 * DAY_MS).unwrap();
        assert_eq!(first, second);
        assert_eq!(pair.last_update, 7 * DAY_MS);
    }

    #[test]
    fn test_reconfigure_settles_old_rate() {
        let mut pair = PairState::new(config(1_000), 0);
        pair.reconfigure(config(0), 30 * DAY_MS).unwrap();
        let settled = pair.index;
        assert!(settled > Ray::one().to_scaled_val());
        pair.accrue(60 * DAY_MS).unwrap();
        assert_eq!(pair.index, settled);
    }
}
