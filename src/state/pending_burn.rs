//! The deferred-burn slot filled by synthetic swaps.

use odra::{casper_types::U256, prelude::*};

use crate::{error::CoreError, math::TryAdd};

/// Synthetic tokens received by the core and not yet destroyed.
///
/// Only one asset can wait at a time. Recording a different asset hands
/// the previous one back to the caller, which must burn it in the same
/// operation.
#[odra::odra_type]
pub struct PendingBurn {
    /// Asset awaiting destruction, if any
    pub asset: Option<Address>,
    /// Amount held by the core for that asset
    pub amount: U256,
}

impl Default for PendingBurn {
    fn default() -> Self {
        Self::empty()
    }
}

impl PendingBurn {
    /// An empty slot.
    pub fn empty() -> Self {
        Self { asset: None, amount: U256::zero() }
    }

    /// Nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.asset.is_none() || self.amount.is_zero()
    }

    /// Queues `amount` of `asset`.
    ///
    /// The same asset accumulates. A different asset replaces the slot and
    /// the displaced `(asset, amount)` is returned for immediate burning.
    pub fn record(&mut self, asset: Address, amount: U256) -> Result<Option<(Address, U256)>, CoreError> {
        if amount.is_zero() {
            return Err(CoreError::ZeroAmount);
        }
        if self.asset == Some(asset) {
            self.amount = self.amount.try_add(amount)?;
            return Ok(None);
        }
        let displaced = self.take();
        self.asset = Some(asset);
        self.amount = amount;
        Ok(displaced)
    }

    /// Empties the slot, returning what was waiting.
    pub fn take(&mut self) -> Option<(Address, U256)> {
        let taken = match self.asset {
            Some(asset) if !self.amount.is_zero() => Some((asset, self.amount)),
            _ => None,
        };
        *self = Self::empty();
        taken
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn assets() -> (Address, Address) {
        let env = odra_test::env();
        (env.get_account(1), env.get_account(2))
    }

    #[test]
    fn test_same_asset_accumulates() {
        let (a, _) = assets();
        let mut slot = PendingBurn::empty();
        assert_eq!(slot.record(a, U256::from(10u8)), Ok(None));
        assert_eq!(slot.record(a, U256::from(5u8)), Ok(None));
        assert_eq!(slot.asset, Some(a));
        assert_eq!(slot.amount, U256::from(15u8));
    }

    #[test]
    fn test_different_asset_displaces() {
        let (a, b) = assets();
        let mut slot = PendingBurn::empty();
        slot.record(a, U256::from(10u8)).unwrap();
        assert_eq!(slot.record(b, U256::from(7u8)), Ok(Some((a, U256::from(10u8)))));
        assert_eq!(slot.asset, Some(b));
        assert_eq!(slot.amount, U256::from(7u8));
    }

    #[test]
    fn test_take_clears() {
        let (a, _) = assets();
        let mut slot = PendingBurn::empty();
        assert_eq!(slot.take(), None);
        slot.record(a, U256::from(3u8)).unwrap();
        assert_eq!(slot.take(), Some((a, U256::from(3u8))));
        assert!(slot.is_empty());
        assert_eq!(slot.record(a, U256::zero()), Err(CoreError::ZeroAmount));
    }
}
