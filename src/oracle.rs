use odra::{casper_types::U256, prelude::*};

use crate::{error::CoreError, math::common::wad};

/// USD price feed maintained by an admin and approved publishers.
///
/// Prices are WAD-scaled USD per whole token. The anchor asset is always
/// worth exactly one unit and never needs publishing.
#[odra::module(events = [PriceUpdated, PublisherAdded, PublisherRemoved, MaxAgeUpdated, OracleAdminTransferred])]
pub struct PriceOracle {
    price_values: Mapping<Address, U256>,
    publish_times: Mapping<Address, u64>,
    approved_publishers: Mapping<Address, bool>,
    admin: Var<Address>,
    anchor: Var<Address>,
    max_age_ms: Var<u64>,
}

#[odra::module]
impl PriceOracle {
    /// Initialize the oracle. A `max_age_ms` of zero disables staleness checks.
    pub fn init(&mut self, admin: Address, anchor: Address, max_age_ms: u64) {
        self.admin.set(admin);
        self.anchor.set(anchor);
        self.max_age_ms.set(max_age_ms);
    }

    /// Publish a price for an asset
    pub fn set_price(&mut self, asset: Address, price: U256) {
        let caller = self.env().caller();
        if !self.is_admin(caller) && !self.is_approved_publisher(caller) {
            self.env().revert(CoreError::Unauthorized);
        }
        if price.is_zero() || asset == self.anchor.get_or_revert_with(CoreError::InvalidConfig) {
            self.env().revert(CoreError::InvalidConfig);
        }

        let timestamp = self.env().get_block_time();
        self.price_values.set(&asset, price);
        self.publish_times.set(&asset, timestamp);
        log::debug!("price of {:?} set to {} by {:?}", asset, price, caller);

        self.env().emit_event(PriceUpdated {
            asset,
            price,
            publisher: caller,
            timestamp,
        });
    }

    /// Price of `asset`, reverting when it is unknown or stale
    pub fn get_price(&self, asset: Address) -> U256 {
        match self.checked_price(asset) {
            Ok(price) => price,
            Err(error) => self.env().revert(error),
        }
    }

    /// Price of `asset` and its publish time, with no staleness check
    pub fn price_data(&self, asset: Address) -> Option<(U256, u64)> {
        Some((self.price_values.get(&asset)?, self.publish_times.get(&asset)?))
    }

    /// Add approved price publisher
    pub fn add_publisher(&mut self, publisher: Address) {
        let caller = self.only_admin();
        self.approved_publishers.set(&publisher, true);
        self.env().emit_event(PublisherAdded {
            publisher,
            added_by: caller,
        });
    }

    /// Remove price publisher
    pub fn remove_publisher(&mut self, publisher: Address) {
        let caller = self.only_admin();
        self.approved_publishers.set(&publisher, false);
        self.env().emit_event(PublisherRemoved {
            publisher,
            removed_by: caller,
        });
    }

    /// Set the maximum accepted price age (admin only)
    pub fn set_max_age(&mut self, max_age_ms: u64) {
        let caller = self.only_admin();
        self.max_age_ms.set(max_age_ms);
        self.env().emit_event(MaxAgeUpdated {
            max_age_ms,
            updated_by: caller,
        });
    }

    /// Transfer admin rights
    pub fn transfer_admin(&mut self, new_admin: Address) {
        let previous_admin = self.only_admin();
        self.admin.set(new_admin);
        self.env().emit_event(OracleAdminTransferred {
            previous_admin,
            new_admin,
        });
    }

    /// Check if address is approved publisher
    pub fn is_approved_publisher(&self, address: Address) -> bool {
        self.approved_publishers.get(&address).unwrap_or(false)
    }

    /// The asset priced at exactly one
    pub fn anchor(&self) -> Address {
        self.anchor.get_or_revert_with(CoreError::InvalidConfig)
    }
}

impl PriceOracle {
    fn is_admin(&self, address: Address) -> bool {
        self.admin.get() == Some(address)
    }

    fn only_admin(&self) -> Address {
        let caller = self.env().caller();
        if !self.is_admin(caller) {
            self.env().revert(CoreError::Unauthorized);
        }
        caller
    }

    fn checked_price(&self, asset: Address) -> Result<U256, CoreError> {
        if self.anchor.get() == Some(asset) {
            return Ok(wad());
        }
        let (price, published) = self.price_data(asset).ok_or(CoreError::PriceUnavailable)?;
        let max_age = self.max_age_ms.get_or_default();
        if max_age > 0 && self.env().get_block_time().saturating_sub(published) > max_age {
            return Err(CoreError::StalePrice);
        }
        Ok(price)
    }
}

/// A price was published.
#[odra::event]
pub struct PriceUpdated {
    pub asset: Address,
    pub price: U256,
    pub publisher: Address,
    pub timestamp: u64,
}

/// A publisher was approved.
#[odra::event]
pub struct PublisherAdded {
    pub publisher: Address,
    pub added_by: Address,
}

/// A publisher lost approval.
#[odra::event]
pub struct PublisherRemoved {
    pub publisher: Address,
    pub removed_by: Address,
}

/// The staleness bound changed.
#[odra::event]
pub struct MaxAgeUpdated {
    pub max_age_ms: u64,
    pub updated_by: Address,
}

/// Oracle admin rights moved.
#[odra::event]
pub struct OracleAdminTransferred {
    pub previous_admin: Address,
    pub new_admin: Address,
}
