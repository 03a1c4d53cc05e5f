use odra::{casper_types::U256, prelude::*};

use crate::{error::CoreError, math::TryAdd};

/// Fungible token with a single privileged minter.
///
/// Synthetic assets are deployed with the core as minter. The same module
/// serves as collateral and reserve tokens in deployments that have none.
#[odra::module(events = [Transfer, Approval, MinterChanged])]
pub struct SyntheticToken {
    name: Var<String>,
    symbol: Var<String>,
    decimals: Var<u8>,
    total_supply: Var<U256>,
    balances: Mapping<Address, U256>,
    allowances: Mapping<(Address, Address), U256>,
    minter: Var<Address>,
}

#[odra::module]
impl SyntheticToken {
    /// Initialize the token.
    pub fn init(&mut self, name: String, symbol: String, decimals: u8, minter: Address) {
        self.name.set(name);
        self.symbol.set(symbol);
        self.decimals.set(decimals);
        self.minter.set(minter);
    }

    pub fn name(&self) -> String {
        self.name.get_or_default()
    }

    pub fn symbol(&self) -> String {
        self.symbol.get_or_default()
    }

    pub fn decimals(&self) -> u8 {
        self.decimals.get_or_default()
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply.get_or_default()
    }

    pub fn balance_of(&self, owner: Address) -> U256 {
        self.balances.get(&owner).unwrap_or_default()
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances.get(&(owner, spender)).unwrap_or_default()
    }

    pub fn minter(&self) -> Option<Address> {
        self.minter.get()
    }

    pub fn transfer(&mut self, recipient: Address, amount: U256) {
        let sender = self.env().caller();
        let result = self.move_balance(sender, recipient, amount);
        self.unwrap_or_revert(result);
    }

    pub fn approve(&mut self, spender: Address, amount: U256) {
        let owner = self.env().caller();
        self.allowances.set(&(owner, spender), amount);
        self.env().emit_event(Approval { owner, spender, amount });
    }

    pub fn transfer_from(&mut self, owner: Address, recipient: Address, amount: U256) {
        let spender = self.env().caller();
        let allowed = self.allowance(owner, spender);
        if allowed < amount {
            self.env().revert(CoreError::InsufficientAllowance);
        }
        self.allowances.set(&(owner, spender), allowed - amount);
        let result = self.move_balance(owner, recipient, amount);
        self.unwrap_or_revert(result);
    }

    /// Create tokens (minter only).
    pub fn mint(&mut self, to: Address, amount: U256) {
        self.only_minter();
        let result = self.credit(to, amount).and_then(|_| self.total_supply().try_add(amount));
        let supply = self.unwrap_or_revert(result);
        self.total_supply.set(supply);
        log::debug!("minted {} to {:?}", amount, to);
        self.env().emit_event(Transfer { from: None, to: Some(to), amount });
    }

    /// Destroy tokens held by `from` (minter only).
    pub fn burn(&mut self, from: Address, amount: U256) {
        self.only_minter();
        let result = self.debit(from, amount);
        self.unwrap_or_revert(result);
        let supply = self.total_supply().saturating_sub(amount);
        self.total_supply.set(supply);
        log::debug!("burned {} from {:?}", amount, from);
        self.env().emit_event(Transfer { from: Some(from), to: None, amount });
    }

    /// Hand minting rights to another address (minter only).
    pub fn set_minter(&mut self, new_minter: Address) {
        let previous = self.only_minter();
        self.minter.set(new_minter);
        self.env().emit_event(MinterChanged { previous, new_minter });
    }
}

impl SyntheticToken {
    fn only_minter(&self) -> Address {
        let caller = self.env().caller();
        if self.minter.get() != Some(caller) {
            self.env().revert(CoreError::NotMinter);
        }
        caller
    }

    fn unwrap_or_revert<T>(&self, result: Result<T, CoreError>) -> T {
        match result {
            Ok(value) => value,
            Err(error) => self.env().revert(error),
        }
    }

    fn credit(&mut self, owner: Address, amount: U256) -> Result<(), CoreError> {
        let balance = self.balance_of(owner).try_add(amount)?;
        self.balances.set(&owner, balance);
        Ok(())
    }

    fn debit(&mut self, owner: Address, amount: U256) -> Result<(), CoreError> {
        let balance = self
            .balance_of(owner)
            .checked_sub(amount)
            .ok_or(CoreError::InsufficientBalance)?;
        self.balances.set(&owner, balance);
        Ok(())
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: U256) -> Result<(), CoreError> {
        self.debit(from, amount)?;
        self.credit(to, amount)?;
        self.env().emit_event(Transfer { from: Some(from), to: Some(to), amount });
        Ok(())
    }
}

/// Tokens moved, were minted (`from` empty) or burned (`to` empty).
#[odra::event]
pub struct Transfer {
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub amount: U256,
}

/// An allowance was set.
#[odra::event]
pub struct Approval {
    pub owner: Address,
    pub spender: Address,
    pub amount: U256,
}

/// Minting rights moved.
#[odra::event]
pub struct MinterChanged {
    pub previous: Address,
    pub new_minter: Address,
}

#[cfg(test)]
mod tests {
    use super::*;
    use odra::host::{Deployer, HostEnv};

    fn setup() -> (HostEnv, SyntheticTokenHostRef) {
        let env = odra_test::env();
        let token = SyntheticToken::deploy(
            &env,
            SyntheticTokenInitArgs {
                name: "Synthetic USD".to_string(),
                symbol: "xUSD".to_string(),
                decimals: 2,
                minter: env.get_account(0),
            },
        );
        (env, token)
    }

    #[test]
    fn test_metadata() {
        let (env, token) = setup();
        assert_eq!(token.symbol(), "xUSD".to_string());
        assert_eq!(token.decimals(), 2);
        assert_eq!(token.minter(), Some(env.get_account(0)));
    }

    #[test]
    fn test_mint_and_burn_are_restricted() {
        let (env, mut token) = setup();
        let (alice, bob) = (env.get_account(1), env.get_account(2));
        token.mint(alice, U256::from(500u64));
        assert_eq!(token.total_supply(), U256::from(500u64));

        env.set_caller(bob);
        assert_eq!(token.try_mint(bob, U256::one()), Err(CoreError::NotMinter.into()));
        assert_eq!(token.try_burn(alice, U256::one()), Err(CoreError::NotMinter.into()));

        env.set_caller(env.get_account(0));
        token.burn(alice, U256::from(200u64));
        assert_eq!(token.balance_of(alice), U256::from(300u64));
        assert_eq!(token.total_supply(), U256::from(300u64));
        assert_eq!(token.try_burn(alice, U256::from(301u64)), Err(CoreError::InsufficientBalance.into()));
    }

    #[test]
    fn test_transfer_and_allowance() {
        let (env, mut token) = setup();
        let (alice, bob) = (env.get_account(1), env.get_account(2));
        token.mint(alice, U256::from(100u64));

        env.set_caller(alice);
        token.transfer(bob, U256::from(40u64));
        assert_eq!(token.try_transfer(bob, U256::from(61u64)), Err(CoreError::InsufficientBalance.into()));
        token.approve(bob, U256::from(50u64));

        env.set_caller(bob);
        assert_eq!(
            token.try_transfer_from(alice, bob, U256::from(51u64)),
            Err(CoreError::InsufficientAllowance.into())
        );
        token.transfer_from(alice, bob, U256::from(50u64));
        assert_eq!(token.balance_of(alice), U256::from(10u64));
        assert_eq!(token.balance_of(bob), U256::from(90u64));
        assert_eq!(token.allowance(alice, bob), U256::zero());
    }

    #[test]
    fn test_minter_handoff() {
        let (env, mut token) = setup();
        let core = env.get_account(3);
        token.set_minter(core);
        assert_eq!(token.try_mint(core, U256::one()), Err(CoreError::NotMinter.into()));
        env.set_caller(core);
        token.mint(core, U256::one());
        assert_eq!(token.balance_of(core), U256::one());
    }
}
