//! The synthpool core: anchor pool, synthetic swaps, the position ledger,
//! liquidations and flash loans.
//!
//! Every state-changing entry point runs through [`SynthCore::atomic`],
//! which holds the reentrancy guard for the whole operation and reverts
//! every effect of the call when the operation fails.

use alloc::vec;
use odra::{
    casper_types::{account::AccountHash, U256},
    prelude::*,
};

use crate::{
    error::CoreError,
    events::*,
    guard::ReentrancyGuard,
    interfaces::{AssetContractRef, FlashBorrowerContractRef, PriceFeedContractRef},
    liquidation::{self, AssetPrice},
    math::{
        common::{bps_of, Rounding},
        Decimal, Ray, TryAdd, TrySub,
    },
    state::{
        CollateralConfig, FeeSchedule, PairConfig, PairState, PendingBurn, PoolScales, Position, PositionStatus,
        ReservePair, Side, SwapQuote, SyntheticConfig,
    },
};


/// Key of a borrowing pair.
type PairKey = (Address, Address);
/// Key of a position: borrower, collateral, synthetic.
type PositionKey = (Address, Address, Address);

#[odra::module(events = [
    Swapped,
    SyntheticSwapped,
    LiquidityAdded,
    LiquidityRemoved,
    Borrowed,
    Repaid,
    Withdrawn,
    Liquidated,
    FlashLoan,
    BurnDeferred,
    BurnSettled,
    BridgeMinted,
    BridgeBurned,
    PairConfigured,
    AdminTransferred
])]
pub struct SynthCore {
    admin: Var<Address>,
    treasury: Var<Address>,
    oracle: Var<Address>,
    bridge: Var<Address>,
    base_asset: Var<Address>,
    stable_asset: Var<Address>,
    fees: Var<FeeSchedule>,
    reserves: Var<ReservePair>,
    total_shares: Var<U256>,
    lp_shares: Mapping<Address, U256>,
    pairs: Mapping<PairKey, PairState>,
    positions: Mapping<PositionKey, Position>,
    collaterals: Mapping<Address, CollateralConfig>,
    synthetics: Mapping<Address, SyntheticConfig>,
    pending_burn: Var<PendingBurn>,
    bridge_transfers: Mapping<U256, bool>,
    guard: SubModule<ReentrancyGuard>,
}

#[odra::module]
impl SynthCore {
    /// Initialize the core.
    ///
    /// `stable_asset` is the base-stable synthetic: it is registered as a
    /// synthetic with zero caps and must be the oracle's anchor. The
    /// treasury starts out as the admin.
    pub fn init(
        &mut self,
        base_asset: Address,
        admin: Address,
        oracle: Address,
        swap_fee_bps: u32,
        synthetic_swap_fee_bps: u32,
        flash_fee_bps: u32,
        stable_asset: Address,
    ) {
        let fees = FeeSchedule { swap_fee_bps, synthetic_swap_fee_bps, flash_fee_bps };
        let checked = fees
            .validate()
            .and_then(|_| ensure_address(base_asset))
            .and_then(|_| ensure_address(stable_asset))
            .and_then(|_| ensure_address(admin))
            .and_then(|_| ensure_address(oracle));
        if let Err(error) = checked {
            self.env().revert(error);
        }
        if base_asset == stable_asset {
            self.env().revert(CoreError::InvalidAssetPair);
        }

        self.admin.set(admin);
        self.treasury.set(admin);
        self.oracle.set(oracle);
        self.base_asset.set(base_asset);
        self.stable_asset.set(stable_asset);
        self.fees.set(fees);
        self.reserves.set(ReservePair::empty());
        self.total_shares.set(U256::zero());
        self.pending_burn.set(PendingBurn::empty());
        self.synthetics.set(&stable_asset, SyntheticConfig::new(U256::zero(), U256::zero()));
        log::info!("core initialized, base {:?}, stable {:?}", base_asset, stable_asset);
    }

    // ============================================================================
    // CONFIGURATION OPERATIONS
    // ============================================================================

    /// Set the risk parameters of a (collateral, synthetic) pair.
    ///
    /// Reconfiguring an existing pair accrues interest at the old rate up to
    /// now before the new rate applies.
    pub fn set_pair_config(
        &mut self,
        collateral: Address,
        synthetic: Address,
        rate_bps: u32,
        ltv_bps: u32,
        penalty_bps: u32,
    ) {
        self.atomic(|core| {
            core.only_admin()?;
            core.collateral_config_of(collateral)?;
            core.synthetic_config_of(synthetic)?;
            let config = PairConfig { rate_bps, ltv_bps, penalty_bps };
            config.validate()?;

            let now = core.now();
            let pair = match core.pairs.get(&(collateral, synthetic)) {
                Some(mut pair) => {
                    pair.reconfigure(config, now)?;
                    pair
                }
                None => PairState::new(config, now),
            };
            core.pairs.set(&(collateral, synthetic), pair);

            log::info!(
                "pair {:?}/{:?} configured: rate {} ltv {} penalty {}",
                collateral,
                synthetic,
                rate_bps,
                ltv_bps,
                penalty_bps
            );
            core.env().emit_event(PairConfigured { collateral, synthetic, rate_bps, ltv_bps, penalty_bps });
            Ok(())
        })
    }

    /// Register or update a collateral asset. A cap of zero pauses deposits.
    pub fn set_collateral_config(&mut self, asset: Address, cap: U256, price_source: Option<Address>) {
        self.atomic(|core| {
            core.only_admin()?;
            ensure_address(asset)?;
            let total = core.collaterals.get(&asset).map(|config| config.total).unwrap_or_default();
            core.collaterals.set(&asset, CollateralConfig { cap, total, price_source });
            log::info!("collateral {:?} cap set to {}", asset, cap);
            Ok(())
        })
    }

    /// Register or update a synthetic asset. A zero cap pauses the flow it governs.
    pub fn set_synthetic_caps(&mut self, asset: Address, mint_cap: U256, flash_cap: U256) {
        self.atomic(|core| {
            core.only_admin()?;
            ensure_address(asset)?;
            if core.base_asset.get() == Some(asset) {
                return Err(CoreError::InvalidAssetPair);
            }
            let minted = core.synthetics.get(&asset).map(|config| config.minted).unwrap_or_default();
            core.synthetics.set(&asset, SyntheticConfig { mint_cap, flash_cap, minted });
            log::info!("synthetic {:?} caps set: mint {} flash {}", asset, mint_cap, flash_cap);
            Ok(())
        })
    }

    /// Replace the fee schedule.
    pub fn set_fees(&mut self, swap_fee_bps: u32, synthetic_swap_fee_bps: u32, flash_fee_bps: u32) {
        self.atomic(|core| {
            core.only_admin()?;
            let fees = FeeSchedule { swap_fee_bps, synthetic_swap_fee_bps, flash_fee_bps };
            fees.validate()?;
            core.fees.set(fees);
            Ok(())
        })
    }

    /// Set the recipient of interest and fees.
    pub fn set_treasury(&mut self, treasury: Address) {
        self.atomic(|core| {
            core.only_admin()?;
            ensure_address(treasury)?;
            core.treasury.set(treasury);
            Ok(())
        })
    }

    /// Set the account allowed to mint and burn on behalf of other chains.
    pub fn set_bridge(&mut self, bridge: Address) {
        self.atomic(|core| {
            core.only_admin()?;
            ensure_address(bridge)?;
            core.bridge.set(bridge);
            Ok(())
        })
    }

    /// Set the default price feed.
    pub fn set_oracle(&mut self, oracle: Address) {
        self.atomic(|core| {
            core.only_admin()?;
            ensure_address(oracle)?;
            core.oracle.set(oracle);
            Ok(())
        })
    }

    /// Hand the admin role to another account.
    pub fn transfer_admin(&mut self, new_admin: Address) {
        self.atomic(|core| {
            let previous_admin = core.only_admin()?;
            ensure_address(new_admin)?;
            core.admin.set(new_admin);
            core.env().emit_event(AdminTransferred { previous_admin, new_admin });
            Ok(())
        })
    }

    // ============================================================================
    // POOL OPERATIONS
    // ============================================================================

    /// Deposit both reserve assets for LP shares credited to `recipient`.
    ///
    /// Takes at most `max_base` and `max_stable`; after the first deposit
    /// only the amounts matching the current ratio are pulled.
    pub fn add_liquidity(&mut self, max_base: U256, max_stable: U256, min_shares: U256, recipient: Address) -> U256 {
        self.atomic(|core| core.add_liquidity_inner(max_base, max_stable, min_shares, recipient))
    }

    /// Burn `shares` of the caller for a pro-rata cut of both reserves.
    pub fn remove_liquidity(
        &mut self,
        min_base: U256,
        min_stable: U256,
        shares: U256,
        recipient: Address,
    ) -> (U256, U256) {
        self.atomic(|core| core.remove_liquidity_inner(min_base, min_stable, shares, recipient))
    }

    /// Sell exactly `amount_in` of one reserve asset for the other.
    pub fn swap_exact_in(&mut self, asset_in: Address, amount_in: U256, min_out: U256, recipient: Address) -> U256 {
        self.atomic(|core| {
            ensure_address(recipient)?;
            let side_in = core.side_of(asset_in)?;
            core.settle_pending();
            let reserves = core.current_reserves();
            let scales = core.pool_scales()?;
            let quote = reserves.quote_exact_in(side_in, amount_in, core.fee_schedule().swap_fee_bps, &scales)?;
            if quote.amount_out < min_out {
                return Err(CoreError::SlippageExceeded);
            }
            core.execute_swap(side_in, quote, reserves, &scales, recipient)?;
            Ok(quote.amount_out)
        })
    }

    /// Buy exactly `amount_out` of one reserve asset; returns the amount paid.
    pub fn swap_exact_out(&mut self, asset_out: Address, amount_out: U256, max_in: U256, recipient: Address) -> U256 {
        self.atomic(|core| {
            ensure_address(recipient)?;
            let side_out = core.side_of(asset_out)?;
            core.settle_pending();
            let reserves = core.current_reserves();
            let scales = core.pool_scales()?;
            let quote = reserves.quote_exact_out(side_out, amount_out, core.fee_schedule().swap_fee_bps, &scales)?;
            if quote.amount_in > max_in {
                return Err(CoreError::SlippageExceeded);
            }
            core.execute_swap(side_out.opposite(), quote, reserves, &scales, recipient)?;
            Ok(quote.amount_in)
        })
    }

    /// Exchange one synthetic for another at oracle prices.
    ///
    /// The input is taken into the pending-burn slot; the output and the
    /// fee are minted.
    pub fn swap_synthetic(
        &mut self,
        asset_in: Address,
        asset_out: Address,
        amount_in: U256,
        min_out: U256,
        recipient: Address,
    ) -> U256 {
        self.atomic(|core| core.swap_synthetic_inner(asset_in, asset_out, amount_in, min_out, recipient))
    }

    /// Destroy whatever waits in the pending-burn slot.
    pub fn settle_pending_burn(&mut self) {
        self.atomic(|core| match core.settle_pending() {
            Some(_) => Ok(()),
            None => Err(CoreError::NoPendingBurn),
        })
    }

    // ============================================================================
    // LEDGER OPERATIONS
    // ============================================================================

    /// Deposit collateral and/or draw debt on a position.
    pub fn borrow(&mut self, collateral: Address, synthetic: Address, collateral_in: U256, debt_out: U256) {
        self.atomic(|core| core.borrow_inner(collateral, synthetic, collateral_in, debt_out))
    }

    /// Repay debt, interest first; returns the amount actually paid.
    ///
    /// An `amount` of zero, or at least the debt, repays everything. With
    /// `claim_collateral` the whole collateral is returned, which requires
    /// the debt to be cleared by this call.
    pub fn repay(&mut self, collateral: Address, synthetic: Address, amount: U256, claim_collateral: bool) -> U256 {
        self.atomic(|core| core.repay_inner(collateral, synthetic, amount, claim_collateral))
    }

    /// Take collateral out of a position that stays within its LTV.
    pub fn withdraw(&mut self, collateral: Address, synthetic: Address, amount: U256) {
        self.atomic(|core| core.withdraw_inner(collateral, synthetic, amount))
    }

    /// Accrue interest on a pair; returns the new index.
    pub fn accrue(&mut self, collateral: Address, synthetic: Address) -> U256 {
        self.atomic(|core| {
            let mut pair = core.pair_state(collateral, synthetic)?;
            let index = pair.accrue(core.now())?;
            core.pairs.set(&(collateral, synthetic), pair);
            log::debug!("pair {:?}/{:?} accrued to index {}", collateral, synthetic, index);
            Ok(index.to_scaled_val())
        })
    }

    // ============================================================================
    // LIQUIDATION OPERATIONS
    // ============================================================================

    /// Repay up to `repay_amount` of an unhealthy position's debt for its
    /// collateral plus the pair's penalty. Returns `(repaid, seized)`.
    pub fn liquidate(
        &mut self,
        borrower: Address,
        collateral: Address,
        synthetic: Address,
        repay_amount: U256,
    ) -> (U256, U256) {
        self.atomic(|core| core.liquidate_inner(borrower, collateral, synthetic, repay_amount))
    }

    // ============================================================================
    // FLASH LOAN OPERATIONS
    // ============================================================================

    /// Flash-mint a single synthetic; returns the fee charged.
    pub fn simple_flash_loan(&mut self, receiver: Address, asset: Address, amount: U256, data: Vec<u8>) -> U256 {
        self.atomic(|core| {
            let fees = core.flash_loan_inner(receiver, vec![asset], vec![amount], data)?;
            Ok(fees.first().copied().unwrap_or_default())
        })
    }

    /// Flash-mint several synthetics in one callback; returns the fees charged.
    pub fn flash_loan(&mut self, receiver: Address, assets: Vec<Address>, amounts: Vec<U256>, data: Vec<u8>) -> Vec<U256> {
        self.atomic(|core| core.flash_loan_inner(receiver, assets, amounts, data))
    }

    // ============================================================================
    // BRIDGE OPERATIONS
    // ============================================================================

    /// Mint a synthetic arriving from another chain.
    ///
    /// Each `transfer_id` is honoured once; a replay returns `false` and
    /// changes nothing.
    pub fn bridge_mint(&mut self, transfer_id: U256, asset: Address, recipient: Address, amount: U256) -> bool {
        self.atomic(|core| {
            core.only_bridge()?;
            if core.synthetic_config_of(asset)?.is_paused() {
                return Err(CoreError::AssetPaused);
            }
            ensure_address(recipient)?;
            if amount.is_zero() {
                return Err(CoreError::ZeroAmount);
            }
            if core.bridge_transfers.get(&transfer_id).unwrap_or_default() {
                log::debug!("bridge transfer {} already processed", transfer_id);
                return Ok(false);
            }
            core.bridge_transfers.set(&transfer_id, true);
            core.asset(asset).mint(recipient, amount);
            log::info!("bridge transfer {} minted {} of {:?}", transfer_id, amount, asset);
            core.env().emit_event(BridgeMinted { transfer_id, asset, recipient, amount });
            Ok(true)
        })
    }

    /// Burn a synthetic leaving for another chain.
    pub fn bridge_burn(&mut self, asset: Address, from: Address, amount: U256) {
        self.atomic(|core| {
            core.only_bridge()?;
            core.synthetic_config_of(asset)?;
            if amount.is_zero() {
                return Err(CoreError::ZeroAmount);
            }
            core.asset(asset).burn(from, amount);
            log::info!("bridge burned {} of {:?} from {:?}", amount, asset, from);
            core.env().emit_event(BridgeBurned { asset, from, amount });
            Ok(())
        })
    }

    // ============================================================================
    // QUERY FUNCTIONS
    // ============================================================================

    pub fn admin(&self) -> Option<Address> {
        self.admin.get()
    }

    pub fn treasury(&self) -> Option<Address> {
        self.treasury.get()
    }

    pub fn oracle(&self) -> Option<Address> {
        self.oracle.get()
    }

    pub fn bridge(&self) -> Option<Address> {
        self.bridge.get()
    }

    pub fn base_asset(&self) -> Option<Address> {
        self.base_asset.get()
    }

    pub fn stable_asset(&self) -> Option<Address> {
        self.stable_asset.get()
    }

    pub fn fee_schedule(&self) -> FeeSchedule {
        self.fees.get_or_revert_with(CoreError::InvalidConfig)
    }

    /// Pool reserves as `(base, stable)`.
    pub fn reserves(&self) -> (U256, U256) {
        let reserves = self.current_reserves();
        (reserves.base, reserves.stable)
    }

    /// Curve invariant of the current reserves.
    pub fn invariant(&self) -> U256 {
        let result = self.pool_scales().and_then(|scales| self.current_reserves().invariant(&scales));
        self.unwrap_or_revert(result)
    }

    pub fn total_shares(&self) -> U256 {
        self.total_shares.get_or_default()
    }

    pub fn shares_of(&self, owner: Address) -> U256 {
        self.lp_shares.get(&owner).unwrap_or_default()
    }

    /// Asset and amount waiting to be burned.
    pub fn pending_burn(&self) -> Option<(Address, U256)> {
        let slot = self.pending_slot();
        slot.asset.filter(|_| !slot.is_empty()).map(|asset| (asset, slot.amount))
    }

    /// Output of `swap_exact_in` at the current reserves.
    pub fn quote_exact_in(&self, asset_in: Address, amount_in: U256) -> U256 {
        let result = self.side_of(asset_in).and_then(|side| {
            let scales = self.pool_scales()?;
            self.current_reserves()
                .quote_exact_in(side, amount_in, self.fee_schedule().swap_fee_bps, &scales)
        });
        self.unwrap_or_revert(result).amount_out
    }

    /// Input charged by `swap_exact_out` at the current reserves.
    pub fn quote_exact_out(&self, asset_out: Address, amount_out: U256) -> U256 {
        let result = self.side_of(asset_out).and_then(|side| {
            let scales = self.pool_scales()?;
            self.current_reserves()
                .quote_exact_out(side, amount_out, self.fee_schedule().swap_fee_bps, &scales)
        });
        self.unwrap_or_revert(result).amount_in
    }

    /// Amounts `add_liquidity` would take and the shares it would credit,
    /// as `(base, stable, shares)`.
    pub fn quote_add_liquidity(&self, max_base: U256, max_stable: U256) -> (U256, U256, U256) {
        let result = self.pool_scales().and_then(|scales| {
            self.current_reserves()
                .quote_deposit(self.total_shares(), max_base, max_stable, &scales)
        });
        let deposit = self.unwrap_or_revert(result);
        (deposit.base, deposit.stable, deposit.shares)
    }

    /// Output of `swap_synthetic` at current prices.
    pub fn quote_synthetic(&self, asset_in: Address, asset_out: Address, amount_in: U256) -> U256 {
        let result = self.price_synthetic_swap(asset_in, asset_out, amount_in);
        self.unwrap_or_revert(result).amount_out
    }

    pub fn pair(&self, collateral: Address, synthetic: Address) -> Option<PairState> {
        self.pairs.get(&(collateral, synthetic))
    }

    /// Borrow index of a pair as of now, RAY-scaled.
    pub fn current_index(&self, collateral: Address, synthetic: Address) -> U256 {
        let result = self
            .pair_state(collateral, synthetic)
            .and_then(|pair| pair.index_at(self.now()));
        self.unwrap_or_revert(result).to_scaled_val()
    }

    /// Outstanding debt of every position in a pair as of now.
    pub fn pair_debt(&self, collateral: Address, synthetic: Address) -> U256 {
        let result = self
            .pair_state(collateral, synthetic)
            .and_then(|pair| pair.total_debt(self.now()));
        self.unwrap_or_revert(result)
    }

    pub fn position(&self, borrower: Address, collateral: Address, synthetic: Address) -> Option<Position> {
        self.positions.get(&(borrower, collateral, synthetic))
    }

    /// Debt of a position as of now.
    pub fn debt_of(&self, borrower: Address, collateral: Address, synthetic: Address) -> U256 {
        let result = self.pair_state(collateral, synthetic).and_then(|pair| {
            let index = pair.index_at(self.now())?;
            self.positions
                .get(&(borrower, collateral, synthetic))
                .map_or(Ok(U256::zero()), |position| position.debt(index))
        });
        self.unwrap_or_revert(result)
    }

    /// The position is over its pair's LTV at current prices.
    pub fn is_liquidatable(&self, borrower: Address, collateral: Address, synthetic: Address) -> bool {
        let result = self.pair_state(collateral, synthetic).and_then(|pair| {
            let position = match self.positions.get(&(borrower, collateral, synthetic)) {
                Some(position) if !position.scaled_debt.is_zero() => position,
                _ => return Ok(false),
            };
            let index = pair.index_at(self.now())?;
            let (debt_value, collateral_value) = self.position_values(&position, collateral, synthetic, index)?;
            Ok(!liquidation::within_ltv(debt_value, collateral_value, pair.config.ltv_bps)?)
        });
        self.unwrap_or_revert(result)
    }

    pub fn collateral_config(&self, asset: Address) -> Option<CollateralConfig> {
        self.collaterals.get(&asset)
    }

    pub fn synthetic_config(&self, asset: Address) -> Option<SyntheticConfig> {
        self.synthetics.get(&asset)
    }

    /// The core may mint `asset`.
    pub fn is_synthetic(&self, asset: Address) -> bool {
        self.synthetics.get(&asset).is_some()
    }

    pub fn is_transfer_processed(&self, transfer_id: U256) -> bool {
        self.bridge_transfers.get(&transfer_id).unwrap_or_default()
    }
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

impl SynthCore {
    /// Runs `operation` holding the guard; any error reverts the whole call.
    fn atomic<T>(&mut self, operation: impl FnOnce(&mut Self) -> Result<T, CoreError>) -> T {
        self.guard.enter();
        match operation(self) {
            Ok(value) => {
                self.guard.exit();
                value
            }
            Err(error) => {
                log::warn!("operation reverted: {}", error);
                self.env().revert(error)
            }
        }
    }

    fn unwrap_or_revert<T>(&self, result: Result<T, CoreError>) -> T {
        match result {
            Ok(value) => value,
            Err(error) => self.env().revert(error),
        }
    }

    fn only_admin(&self) -> Result<Address, CoreError> {
        let caller = self.env().caller();
        if self.admin.get() != Some(caller) {
            return Err(CoreError::Unauthorized);
        }
        Ok(caller)
    }

    fn only_bridge(&self) -> Result<Address, CoreError> {
        let caller = self.env().caller();
        if self.bridge.get() != Some(caller) {
            return Err(CoreError::NotBridge);
        }
        Ok(caller)
    }

    fn now(&self) -> u64 {
        self.env().get_block_time()
    }

    fn asset(&self, address: Address) -> AssetContractRef {
        AssetContractRef::new(self.env(), address)
    }

    fn treasury_address(&self) -> Result<Address, CoreError> {
        self.treasury.get().ok_or(CoreError::InvalidConfig)
    }

    fn current_reserves(&self) -> ReservePair {
        self.reserves.get().unwrap_or_else(ReservePair::empty)
    }

    fn pending_slot(&self) -> PendingBurn {
        self.pending_burn.get().unwrap_or_default()
    }

    fn reserve_asset(&self, side: Side) -> Result<Address, CoreError> {
        match side {
            Side::Base => self.base_asset.get(),
            Side::Stable => self.stable_asset.get(),
        }
        .ok_or(CoreError::InvalidConfig)
    }

    fn side_of(&self, asset: Address) -> Result<Side, CoreError> {
        if self.base_asset.get() == Some(asset) {
            Ok(Side::Base)
        } else if self.stable_asset.get() == Some(asset) {
            Ok(Side::Stable)
        } else {
            Err(CoreError::InvalidAssetPair)
        }
    }

    fn pool_scales(&self) -> Result<PoolScales, CoreError> {
        let base = self.asset(self.reserve_asset(Side::Base)?).decimals();
        let stable = self.asset(self.reserve_asset(Side::Stable)?).decimals();
        PoolScales::new(base, stable)
    }

    fn collateral_config_of(&self, asset: Address) -> Result<CollateralConfig, CoreError> {
        self.collaterals.get(&asset).ok_or(CoreError::UnknownAsset)
    }

    fn synthetic_config_of(&self, asset: Address) -> Result<SyntheticConfig, CoreError> {
        self.synthetics.get(&asset).ok_or(CoreError::UnknownAsset)
    }

    fn pair_state(&self, collateral: Address, synthetic: Address) -> Result<PairState, CoreError> {
        self.pairs.get(&(collateral, synthetic)).ok_or(CoreError::PairNotConfigured)
    }

    fn price_from(&self, asset: Address, source: Option<Address>) -> Result<AssetPrice, CoreError> {
        let feed = source.or_else(|| self.oracle.get()).ok_or(CoreError::PriceUnavailable)?;
        let price = PriceFeedContractRef::new(self.env(), feed).get_price(asset);
        if price.is_zero() {
            return Err(CoreError::PriceUnavailable);
        }
        Ok(AssetPrice { price: Decimal::from_scaled_val(price), decimals: self.asset(asset).decimals() })
    }

    fn collateral_price(&self, asset: Address) -> Result<AssetPrice, CoreError> {
        let config = self.collateral_config_of(asset)?;
        self.price_from(asset, config.price_source)
    }

    fn synthetic_price(&self, asset: Address) -> Result<AssetPrice, CoreError> {
        self.price_from(asset, None)
    }

    /// USD values of a position's debt and collateral at `index`.
    fn position_values(
        &self,
        position: &Position,
        collateral: Address,
        synthetic: Address,
        index: Ray,
    ) -> Result<(Decimal, Decimal), CoreError> {
        let debt_value = self.synthetic_price(synthetic)?.value_of(position.debt(index)?)?;
        let collateral_value = self.collateral_price(collateral)?.value_of(position.collateral)?;
        Ok((debt_value, collateral_value))
    }

    fn ensure_within_ltv(
        &self,
        position: &Position,
        collateral: Address,
        synthetic: Address,
        ltv_bps: u32,
        index: Ray,
    ) -> Result<(), CoreError> {
        if position.scaled_debt.is_zero() {
            return Ok(());
        }
        let (debt_value, collateral_value) = self.position_values(position, collateral, synthetic, index)?;
        if !liquidation::within_ltv(debt_value, collateral_value, ltv_bps)? {
            return Err(CoreError::LtvExceeded);
        }
        Ok(())
    }

    /// Burns whatever waits in the pending slot.
    fn settle_pending(&mut self) -> Option<(Address, U256)> {
        let mut slot = self.pending_slot();
        let taken = slot.take();
        if let Some((asset, amount)) = taken {
            self.pending_burn.set(slot);
            let this = self.env().self_address();
            self.asset(asset).burn(this, amount);
            log::debug!("settled pending burn of {} {:?}", amount, asset);
            self.env().emit_event(BurnSettled { asset, amount });
        }
        taken
    }

    fn execute_swap(
        &mut self,
        side_in: Side,
        quote: SwapQuote,
        mut reserves: ReservePair,
        scales: &PoolScales,
        recipient: Address,
    ) -> Result<(), CoreError> {
        let k_before = reserves.invariant(scales)?;
        reserves.apply_swap(side_in, &quote)?;
        debug_assert!(reserves.invariant(scales)? >= k_before, "swap decreased the invariant");
        self.reserves.set(reserves);

        let asset_in = self.reserve_asset(side_in)?;
        let asset_out = self.reserve_asset(side_in.opposite())?;
        let trader = self.env().caller();
        let this = self.env().self_address();
        self.asset(asset_in).transfer_from(trader, this, quote.amount_in);
        self.asset(asset_out).transfer(recipient, quote.amount_out);

        log::info!(
            "swap {} {:?} for {} {:?}, fee {}",
            quote.amount_in,
            asset_in,
            quote.amount_out,
            asset_out,
            quote.fee
        );
        self.env().emit_event(Swapped {
            trader,
            recipient,
            asset_in,
            asset_out,
            amount_in: quote.amount_in,
            amount_out: quote.amount_out,
            fee: quote.fee,
        });
        Ok(())
    }

    fn add_liquidity_inner(
        &mut self,
        max_base: U256,
        max_stable: U256,
        min_shares: U256,
        recipient: Address,
    ) -> Result<U256, CoreError> {
        ensure_address(recipient)?;
        let mut reserves = self.current_reserves();
        let total = self.total_shares();
        let scales = self.pool_scales()?;
        let deposit = reserves.quote_deposit(total, max_base, max_stable, &scales)?;
        if deposit.shares < min_shares {
            return Err(CoreError::SlippageExceeded);
        }

        reserves.base = reserves.base.try_add(deposit.base)?;
        reserves.stable = reserves.stable.try_add(deposit.stable)?;
        self.reserves.set(reserves);
        self.total_shares.set(total.try_add(deposit.shares)?.try_add(deposit.locked)?);
        let balance = self.shares_of(recipient).try_add(deposit.shares)?;
        self.lp_shares.set(&recipient, balance);

        let provider = self.env().caller();
        let this = self.env().self_address();
        self.asset(self.reserve_asset(Side::Base)?).transfer_from(provider, this, deposit.base);
        self.asset(self.reserve_asset(Side::Stable)?).transfer_from(provider, this, deposit.stable);

        log::info!("liquidity added: {} base, {} stable, {} shares", deposit.base, deposit.stable, deposit.shares);
        self.env().emit_event(LiquidityAdded {
            provider,
            recipient,
            base_amount: deposit.base,
            stable_amount: deposit.stable,
            shares: deposit.shares,
        });
        Ok(deposit.shares)
    }

    fn remove_liquidity_inner(
        &mut self,
        min_base: U256,
        min_stable: U256,
        shares: U256,
        recipient: Address,
    ) -> Result<(U256, U256), CoreError> {
        ensure_address(recipient)?;
        let provider = self.env().caller();
        let balance = self.shares_of(provider);
        if shares > balance {
            return Err(CoreError::InsufficientShares);
        }
        let mut reserves = self.current_reserves();
        let total = self.total_shares();
        let (base_amount, stable_amount) = reserves.quote_withdrawal(total, shares)?;
        if base_amount < min_base || stable_amount < min_stable {
            return Err(CoreError::SlippageExceeded);
        }

        reserves.base = reserves.base.try_sub(base_amount)?;
        reserves.stable = reserves.stable.try_sub(stable_amount)?;
        self.reserves.set(reserves);
        self.total_shares.set(total.try_sub(shares)?);
        self.lp_shares.set(&provider, balance.try_sub(shares)?);

        if !base_amount.is_zero() {
            self.asset(self.reserve_asset(Side::Base)?).transfer(recipient, base_amount);
        }
        if !stable_amount.is_zero() {
            self.asset(self.reserve_asset(Side::Stable)?).transfer(recipient, stable_amount);
        }

        log::info!("liquidity removed: {} base, {} stable, {} shares", base_amount, stable_amount, shares);
        self.env().emit_event(LiquidityRemoved { provider, recipient, base_amount, stable_amount, shares });
        Ok((base_amount, stable_amount))
    }

    /// Prices a synthetic swap: oracle value converted, fee taken from the output.
    fn price_synthetic_swap(&self, asset_in: Address, asset_out: Address, amount_in: U256) -> Result<SwapQuote, CoreError> {
        if amount_in.is_zero() {
            return Err(CoreError::ZeroAmount);
        }
        if asset_in == asset_out {
            return Err(CoreError::InvalidAssetPair);
        }
        let config_in = self.synthetic_config_of(asset_in)?;
        let config_out = self.synthetic_config_of(asset_out)?;
        if config_in.is_paused() || config_out.is_paused() {
            return Err(CoreError::AssetPaused);
        }

        let price_in = self.synthetic_price(asset_in)?;
        let price_out = self.synthetic_price(asset_out)?;
        let value = price_in.value_of(amount_in)?;
        let gross = value.to_token_amount(price_out.price, price_out.decimals, Rounding::Down)?;
        let fee = bps_of(gross, self.fee_schedule().synthetic_swap_fee_bps, Rounding::Up)?;
        let amount_out = gross.saturating_sub(fee);
        if amount_out.is_zero() {
            return Err(CoreError::InsufficientOutput);
        }
        Ok(SwapQuote { amount_in, amount_out, fee })
    }

    fn swap_synthetic_inner(
        &mut self,
        asset_in: Address,
        asset_out: Address,
        amount_in: U256,
        min_out: U256,
        recipient: Address,
    ) -> Result<U256, CoreError> {
        ensure_address(recipient)?;
        let quote = self.price_synthetic_swap(asset_in, asset_out, amount_in)?;
        if quote.amount_out < min_out {
            return Err(CoreError::SlippageExceeded);
        }

        let trader = self.env().caller();
        let this = self.env().self_address();
        self.asset(asset_in).transfer_from(trader, this, amount_in);

        let mut slot = self.pending_slot();
        let displaced = slot.record(asset_in, amount_in)?;
        self.pending_burn.set(slot);
        if let Some((asset, amount)) = displaced {
            self.asset(asset).burn(this, amount);
            self.env().emit_event(BurnSettled { asset, amount });
        }
        self.env().emit_event(BurnDeferred { asset: asset_in, amount: amount_in });

        self.asset(asset_out).mint(recipient, quote.amount_out);
        if !quote.fee.is_zero() {
            self.asset(asset_out).mint(self.treasury_address()?, quote.fee);
        }

        log::info!(
            "synthetic swap {} {:?} for {} {:?}, fee {}",
            amount_in,
            asset_in,
            quote.amount_out,
            asset_out,
            quote.fee
        );
        self.env().emit_event(SyntheticSwapped {
            trader,
            recipient,
            asset_in,
            asset_out,
            amount_in,
            amount_out: quote.amount_out,
            fee: quote.fee,
        });
        Ok(quote.amount_out)
    }

    fn borrow_inner(
        &mut self,
        collateral: Address,
        synthetic: Address,
        collateral_in: U256,
        debt_out: U256,
    ) -> Result<(), CoreError> {
        if collateral_in.is_zero() && debt_out.is_zero() {
            return Err(CoreError::ZeroAmount);
        }
        let borrower = self.env().caller();
        let now = self.now();
        let mut pair = self.pair_state(collateral, synthetic)?;
        let index = pair.accrue(now)?;
        let key = (borrower, collateral, synthetic);
        let mut position = self.positions.get(&key).unwrap_or_else(Position::empty);

        if !collateral_in.is_zero() {
            let mut collateral_config = self.collateral_config_of(collateral)?;
            collateral_config.deposit(collateral_in)?;
            position.deposit(collateral_in)?;
            self.collaterals.set(&collateral, collateral_config);
        }
        if !debt_out.is_zero() {
            let mut synthetic_config = self.synthetic_config_of(synthetic)?;
            synthetic_config.record_mint(debt_out)?;
            let scaled = position.borrow(debt_out, index)?;
            pair.total_scaled_debt = pair.total_scaled_debt.try_add(scaled)?;
            self.synthetics.set(&synthetic, synthetic_config);
        }
        self.ensure_within_ltv(&position, collateral, synthetic, pair.config.ltv_bps, index)?;

        position.touch(index, pair.config.rate_bps, now, PositionStatus::Active);
        self.positions.set(&key, position);
        self.pairs.set(&(collateral, synthetic), pair);

        if !collateral_in.is_zero() {
            let this = self.env().self_address();
            self.asset(collateral).transfer_from(borrower, this, collateral_in);
        }
        if !debt_out.is_zero() {
            self.asset(synthetic).mint(borrower, debt_out);
        }

        log::info!("borrow on {:?}/{:?}: +{} collateral, +{} debt", collateral, synthetic, collateral_in, debt_out);
        self.env().emit_event(Borrowed { borrower, collateral, synthetic, collateral_in, debt_out });
        Ok(())
    }

    fn repay_inner(
        &mut self,
        collateral: Address,
        synthetic: Address,
        amount: U256,
        claim_collateral: bool,
    ) -> Result<U256, CoreError> {
        let borrower = self.env().caller();
        let now = self.now();
        let mut pair = self.pair_state(collateral, synthetic)?;
        let index = pair.accrue(now)?;
        let key = (borrower, collateral, synthetic);
        let mut position = self
            .positions
            .get(&key)
            .filter(|position| !position.is_empty())
            .ok_or(CoreError::PositionNotFound)?;

        let debt = position.debt(index)?;
        let payment = if amount.is_zero() || amount >= debt { debt } else { amount };
        if payment.is_zero() && !claim_collateral {
            return Err(CoreError::ZeroAmount);
        }

        let split = position.repay(payment, index)?;
        pair.total_scaled_debt = pair.total_scaled_debt.saturating_sub(split.scaled);
        let mut synthetic_config = self.synthetic_config_of(synthetic)?;
        synthetic_config.record_burn(split.principal);
        self.synthetics.set(&synthetic, synthetic_config);

        let released = if claim_collateral {
            if !position.scaled_debt.is_zero() {
                return Err(CoreError::DebtOutstanding);
            }
            let released = position.release_collateral();
            let mut collateral_config = self.collateral_config_of(collateral)?;
            collateral_config.release(released)?;
            self.collaterals.set(&collateral, collateral_config);
            released
        } else {
            U256::zero()
        };

        position.touch(index, pair.config.rate_bps, now, PositionStatus::Active);
        self.positions.set(&key, position);
        self.pairs.set(&(collateral, synthetic), pair);

        if !payment.is_zero() {
            self.asset(synthetic).burn(borrower, payment);
        }
        if !split.interest.is_zero() {
            self.asset(synthetic).mint(self.treasury_address()?, split.interest);
        }
        if !released.is_zero() {
            self.asset(collateral).transfer(borrower, released);
        }

        log::info!(
            "repay on {:?}/{:?}: {} interest, {} principal, {} collateral released",
            collateral,
            synthetic,
            split.interest,
            split.principal,
            released
        );
        self.env().emit_event(Repaid {
            borrower,
            collateral,
            synthetic,
            interest: split.interest,
            principal: split.principal,
            collateral_released: released,
        });
        Ok(payment)
    }

    fn withdraw_inner(&mut self, collateral: Address, synthetic: Address, amount: U256) -> Result<(), CoreError> {
        if amount.is_zero() {
            return Err(CoreError::ZeroAmount);
        }
        let borrower = self.env().caller();
        let now = self.now();
        let mut pair = self.pair_state(collateral, synthetic)?;
        let index = pair.accrue(now)?;
        let key = (borrower, collateral, synthetic);
        let mut position = self.positions.get(&key).ok_or(CoreError::PositionNotFound)?;

        position.withdraw(amount)?;
        self.ensure_within_ltv(&position, collateral, synthetic, pair.config.ltv_bps, index)?;
        let mut collateral_config = self.collateral_config_of(collateral)?;
        collateral_config.release(amount)?;

        position.touch(index, pair.config.rate_bps, now, PositionStatus::Active);
        self.positions.set(&key, position);
        self.pairs.set(&(collateral, synthetic), pair);
        self.collaterals.set(&collateral, collateral_config);
        self.asset(collateral).transfer(borrower, amount);

        log::info!("withdrew {} of {:?}", amount, collateral);
        self.env().emit_event(Withdrawn { borrower, collateral, synthetic, amount });
        Ok(())
    }

    fn liquidate_inner(
        &mut self,
        borrower: Address,
        collateral: Address,
        synthetic: Address,
        repay_amount: U256,
    ) -> Result<(U256, U256), CoreError> {
        let liquidator = self.env().caller();
        let now = self.now();
        let mut pair = self.pair_state(collateral, synthetic)?;
        let index = pair.accrue(now)?;
        let key = (borrower, collateral, synthetic);
        let mut position = self
            .positions
            .get(&key)
            .filter(|position| !position.scaled_debt.is_zero())
            .ok_or(CoreError::PositionNotFound)?;

        let debt_price = self.synthetic_price(synthetic)?;
        let collateral_price = self.collateral_price(collateral)?;
        let debt = position.debt(index)?;
        let debt_value = debt_price.value_of(debt)?;
        let collateral_value = collateral_price.value_of(position.collateral)?;
        if liquidation::within_ltv(debt_value, collateral_value, pair.config.ltv_bps)? {
            return Err(CoreError::PositionHealthy);
        }

        let plan = liquidation::plan(
            repay_amount,
            debt,
            position.collateral,
            debt_price,
            collateral_price,
            pair.config.penalty_bps,
        )?;
        let split = position.repay(plan.repay, index)?;
        position.seize(plan.seize)?;
        pair.total_scaled_debt = pair.total_scaled_debt.saturating_sub(split.scaled);

        let mut synthetic_config = self.synthetic_config_of(synthetic)?;
        synthetic_config.record_burn(split.principal);
        let mut collateral_config = self.collateral_config_of(collateral)?;
        collateral_config.release(plan.seize)?;

        position.touch(index, pair.config.rate_bps, now, PositionStatus::Liquidated);
        self.positions.set(&key, position);
        self.pairs.set(&(collateral, synthetic), pair);
        self.synthetics.set(&synthetic, synthetic_config);
        self.collaterals.set(&collateral, collateral_config);

        self.asset(synthetic).burn(liquidator, plan.repay);
        if !split.interest.is_zero() {
            self.asset(synthetic).mint(self.treasury_address()?, split.interest);
        }
        self.asset(collateral).transfer(liquidator, plan.seize);

        log::info!(
            "liquidated {:?} on {:?}/{:?}: repaid {}, seized {}",
            borrower,
            collateral,
            synthetic,
            plan.repay,
            plan.seize
        );
        self.env().emit_event(Liquidated {
            liquidator,
            borrower,
            collateral,
            synthetic,
            repaid: plan.repay,
            seized: plan.seize,
        });
        Ok((plan.repay, plan.seize))
    }

    fn flash_loan_inner(
        &mut self,
        receiver: Address,
        assets: Vec<Address>,
        amounts: Vec<U256>,
        data: Vec<u8>,
    ) -> Result<Vec<U256>, CoreError> {
        if assets.len() != amounts.len() {
            return Err(CoreError::LengthMismatch);
        }
        if assets.is_empty() {
            return Err(CoreError::ZeroAmount);
        }
        ensure_address(receiver)?;

        let fee_bps = self.fee_schedule().flash_fee_bps;
        let mut fees = Vec::with_capacity(assets.len());
        // The flash cap bounds what one batch lends of an asset in total.
        let mut totals: Vec<(Address, U256)> = Vec::new();
        for (asset, amount) in assets.iter().zip(amounts.iter()) {
            if amount.is_zero() {
                return Err(CoreError::ZeroAmount);
            }
            match totals.iter_mut().find(|(seen, _)| seen == asset) {
                Some((_, total)) => *total = total.try_add(*amount)?,
                None => totals.push((*asset, *amount)),
            }
            fees.push(bps_of(*amount, fee_bps, Rounding::Up)?);
        }
        for (asset, total) in totals.iter() {
            self.synthetic_config_of(*asset)?.check_flash(*total)?;
        }

        for (asset, amount) in assets.iter().zip(amounts.iter()) {
            self.asset(*asset).mint(receiver, *amount);
        }
        let initiator = self.env().caller();
        let accepted = FlashBorrowerContractRef::new(self.env(), receiver).on_flash_loan(
            initiator,
            assets.clone(),
            amounts.clone(),
            fees.clone(),
            data,
        );
        if !accepted {
            return Err(CoreError::FlashLoanRejected);
        }

        let treasury = self.treasury_address()?;
        for ((asset, amount), fee) in assets.iter().zip(amounts.iter()).zip(fees.iter()) {
            let owed = amount.try_add(*fee)?;
            if self.asset(*asset).balance_of(receiver) < owed {
                return Err(CoreError::FlashLoanNotRepaid);
            }
            self.asset(*asset).burn(receiver, owed);
            if !fee.is_zero() {
                self.asset(*asset).mint(treasury, *fee);
            }
            log::info!("flash loan of {} {:?} repaid with fee {}", amount, asset, fee);
            self.env().emit_event(FlashLoan { receiver, initiator, asset: *asset, amount: *amount, fee: *fee });
        }
        Ok(fees)
    }
}

/// Rejects the all-zero account hash.
fn ensure_address(address: Address) -> Result<(), CoreError> {
    if address == Address::Account(AccountHash::new([0u8; 32])) {
        return Err(CoreError::ZeroAddress);
    }
    Ok(())
}
