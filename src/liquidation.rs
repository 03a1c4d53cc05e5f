//! Solvency checks and liquidation sizing.

use crate::{
    error::CoreError,
    math::{
        common::{mul_div, Rounding, BPS},
        Decimal, TryMul,
    },
};
use odra::casper_types::U256;

/// Oracle view of one side of a position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssetPrice {
    /// USD per whole token
    pub price: Decimal,
    /// Token decimals
    pub decimals: u8,
}

impl AssetPrice {
    /// USD value of `amount` base units.
    pub fn value_of(&self, amount: U256) -> Result<Decimal, CoreError> {
        Decimal::from_token_amount(amount, self.price, self.decimals)
    }
}

/// `debt_value <= collateral_value · ltv / 10_000`.
pub fn within_ltv(debt_value: Decimal, collateral_value: Decimal, ltv_bps: u32) -> Result<bool, CoreError> {
    let limit = collateral_value.try_mul(Decimal::from_bps(ltv_bps))?;
    Ok(debt_value <= limit)
}

/// Amounts exchanged by a liquidation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiquidationPlan {
    /// Debt repaid by the liquidator
    pub repay: U256,
    /// Collateral handed to the liquidator
    pub seize: U256,
}

/// Sizes a liquidation of a position holding `debt` and `collateral`.
///
/// The liquidator asks to repay `requested`; repay is capped at the debt and
/// buys collateral worth its value plus `penalty_bps`. When that exceeds the
/// collateral held, all of it is seized and the repay shrinks in proportion.
pub fn plan(
    requested: U256,
    debt: U256,
    collateral: U256,
    debt_price: AssetPrice,
    collateral_price: AssetPrice,
    penalty_bps: u32,
) -> Result<LiquidationPlan, CoreError> {
    let mut repay = requested.min(debt);
    if repay.is_zero() {
        return Err(CoreError::LiquidationTooSmall);
    }
    let repay_value = debt_price.value_of(repay)?;
    let base_seize = repay_value.to_token_amount(collateral_price.price, collateral_price.decimals, Rounding::Down)?;
    let wanted = mul_div(base_seize, U256::from(BPS + penalty_bps), U256::from(BPS), Rounding::Down)?;

    let seize = if wanted > collateral {
        repay = mul_div(repay, collateral, wanted, Rounding::Down)?;
        collateral
    } else {
        wanted
    };
    if repay.is_zero() || seize.is_zero() {
        return Err(CoreError::LiquidationTooSmall);
    }
    Ok(LiquidationPlan { repay, seize })
}
