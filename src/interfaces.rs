//! Contracts the core calls into.

use odra::{casper_types::U256, prelude::*};

/// A fungible token. Synthetic tokens additionally accept `mint` and `burn`
/// from the core.
#[odra::external_contract]
pub trait Asset {
    /// Moves tokens from the caller.
    fn transfer(&mut self, recipient: Address, amount: U256);
    /// Moves tokens out of an allowance granted to the caller.
    fn transfer_from(&mut self, owner: Address, recipient: Address, amount: U256);
    /// Creates tokens.
    fn mint(&mut self, to: Address, amount: U256);
    /// Destroys tokens.
    fn burn(&mut self, from: Address, amount: U256);
    /// Balance of `owner`.
    fn balance_of(&self, owner: Address) -> U256;
    /// Token decimals.
    fn decimals(&self) -> u8;
}

/// A WAD-scaled USD price source.
#[odra::external_contract]
pub trait PriceFeed {
    /// Price of one whole `asset`; reverts when unavailable.
    fn get_price(&self, asset: Address) -> U256;
}

/// Receiver of a flash loan.
///
/// The loaned amounts are minted to the receiver before the call. By the
/// time it returns, the receiver must hold `amounts[i] + fees[i]` of each
/// asset; the core burns that much.
#[odra::external_contract]
pub trait FlashBorrower {
    /// Returns `false` to abort the loan.
    fn on_flash_loan(
        &mut self,
        initiator: Address,
        assets: Vec<Address>,
        amounts: Vec<U256>,
        fees: Vec<U256>,
        data: Vec<u8>,
    ) -> bool;
}
