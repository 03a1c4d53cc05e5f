//! Events emitted by the core.

use odra::{casper_types::U256, prelude::*};

/// Anchor pool swap.
#[odra::event]
pub struct Swapped {
    pub trader: Address,
    pub recipient: Address,
    pub asset_in: Address,
    pub asset_out: Address,
    pub amount_in: U256,
    pub amount_out: U256,
    pub fee: U256,
}

/// Oracle-priced swap between two synthetics.
#[odra::event]
pub struct SyntheticSwapped {
    pub trader: Address,
    pub recipient: Address,
    pub asset_in: Address,
    pub asset_out: Address,
    pub amount_in: U256,
    pub amount_out: U256,
    pub fee: U256,
}

#[odra::event]
pub struct LiquidityAdded {
    pub provider: Address,
    pub recipient: Address,
    pub base_amount: U256,
    pub stable_amount: U256,
    pub shares: U256,
}

#[odra::event]
pub struct LiquidityRemoved {
    pub provider: Address,
    pub recipient: Address,
    pub base_amount: U256,
    pub stable_amount: U256,
    pub shares: U256,
}

#[odra::event]
pub struct Borrowed {
    pub borrower: Address,
    pub collateral: Address,
    pub synthetic: Address,
    pub collateral_in: U256,
    pub debt_out: U256,
}

#[odra::event]
pub struct Repaid {
    pub borrower: Address,
    pub collateral: Address,
    pub synthetic: Address,
    pub interest: U256,
    pub principal: U256,
    pub collateral_released: U256,
}

#[odra::event]
pub struct Withdrawn {
    pub borrower: Address,
    pub collateral: Address,
    pub synthetic: Address,
    pub amount: U256,
}

#[odra::event]
pub struct Liquidated {
    pub liquidator: Address,
    pub borrower: Address,
    pub collateral: Address,
    pub synthetic: Address,
    pub repaid: U256,
    pub seized: U256,
}

/// One asset leg of a flash loan.
#[odra::event]
pub struct FlashLoan {
    pub receiver: Address,
    pub initiator: Address,
    pub asset: Address,
    pub amount: U256,
    pub fee: U256,
}

/// Synthetic tokens queued for destruction.
#[odra::event]
pub struct BurnDeferred {
    pub asset: Address,
    pub amount: U256,
}

/// Queued synthetic tokens destroyed.
#[odra::event]
pub struct BurnSettled {
    pub asset: Address,
    pub amount: U256,
}

#[odra::event]
pub struct BridgeMinted {
    pub transfer_id: U256,
    pub asset: Address,
    pub recipient: Address,
    pub amount: U256,
}

#[odra::event]
pub struct BridgeBurned {
    pub asset: Address,
    pub from: Address,
    pub amount: U256,
}

#[odra::event]
pub struct PairConfigured {
    pub collateral: Address,
    pub synthetic: Address,
    pub rate_bps: u32,
    pub ltv_bps: u32,
    pub penalty_bps: u32,
}

#[odra::event]
pub struct AdminTransferred {
    pub previous_admin: Address,
    pub new_admin: Address,
}
