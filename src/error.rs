//! Error types shared by every module of the core.

use core::fmt;

/// Errors raised by the pool, the position ledger and their collaborators.
///
/// Codes are grouped by family, ten per decade, so that a reverted
/// deploy can be classified from the numeric code alone.
#[odra::odra_error]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoreError {
    // 1: validation
    ZeroAddress = 1,
    ZeroAmount = 2,
    LengthMismatch = 3,
    InvalidConfig = 4,
    SlippageExceeded = 5,
    InvalidAssetPair = 6,
    InsufficientOutput = 7,

    // 10: capacity
    MintCapExceeded = 10,
    CollateralCapExceeded = 11,
    FlashCapExceeded = 12,
    InsufficientLiquidity = 13,
    InsufficientShares = 14,
    InsufficientBalance = 15,
    InsufficientAllowance = 16,

    // 20: solvency
    LtvExceeded = 20,
    PositionHealthy = 21,
    InsufficientCollateral = 22,
    DebtOutstanding = 23,
    LiquidationTooSmall = 24,

    // 30: math
    MathOverflow = 30,
    NoConvergence = 31,

    // 40: state
    NoPendingBurn = 40,
    AssetPaused = 41,
    PositionNotFound = 42,
    PairNotConfigured = 43,
    UnknownAsset = 44,
    Reentrancy = 45,
    FlashLoanNotRepaid = 46,
    FlashLoanRejected = 47,
    PriceUnavailable = 48,
    StalePrice = 49,

    // 50: authorization
    Unauthorized = 50,
    NotBridge = 51,
    NotMinter = 52,
}

/// Error family, used by callers that only care about the class of failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input.
    Validation,
    /// A cap, reserve or balance is too small.
    Capacity,
    /// The operation would leave a position outside its bounds.
    Solvency,
    /// Fixed-point overflow or a solver that did not converge.
    Math,
    /// The ledger is not in a state that allows the operation.
    State,
    /// The caller lacks the required role.
    Authorization,
}

impl CoreError {
    /// Family of this error.
    pub fn kind(&self) -> ErrorKind {
        match self.clone() as u16 {
            0..=9 => ErrorKind::Validation,
            10..=19 => ErrorKind::Capacity,
            20..=29 => ErrorKind::Solvency,
            30..=39 => ErrorKind::Math,
            40..=49 => ErrorKind::State,
            _ => ErrorKind::Authorization,
        }
    }

    /// Human readable description.
    pub fn message(&self) -> &str {
        match self {
            CoreError::ZeroAddress => "Address must not be the zero account",
            CoreError::ZeroAmount => "Amount must be greater than zero",
            CoreError::LengthMismatch => "Asset and amount lists differ in length",
            CoreError::InvalidConfig => "Configuration value out of range",
            CoreError::SlippageExceeded => "Result is outside the caller's slippage bound",
            CoreError::InvalidAssetPair => "Asset pair is not supported by this operation",
            CoreError::InsufficientOutput => "Output rounds down to zero",
            CoreError::MintCapExceeded => "Synthetic mint cap exceeded",
            CoreError::CollateralCapExceeded => "Collateral cap exceeded",
            CoreError::FlashCapExceeded => "Flash loan cap exceeded",
            CoreError::InsufficientLiquidity => "Pool reserves are insufficient",
            CoreError::InsufficientShares => "Not enough liquidity shares",
            CoreError::InsufficientBalance => "Insufficient token balance",
            CoreError::InsufficientAllowance => "Insufficient token allowance",
            CoreError::LtvExceeded => "Debt value would exceed the loan-to-value bound",
            CoreError::PositionHealthy => "Position is within its loan-to-value bound",
            CoreError::InsufficientCollateral => "Position does not hold that much collateral",
            CoreError::DebtOutstanding => "Collateral can only be claimed once debt is zero",
            CoreError::LiquidationTooSmall => "Liquidation resolves to a zero amount",
            CoreError::MathOverflow => "Math operation overflow",
            CoreError::NoConvergence => "Invariant solver did not converge",
            CoreError::NoPendingBurn => "No pending burn to settle",
            CoreError::AssetPaused => "Asset is paused",
            CoreError::PositionNotFound => "Position not found",
            CoreError::PairNotConfigured => "Collateral/synthetic pair is not configured",
            CoreError::UnknownAsset => "Asset is not registered",
            CoreError::Reentrancy => "Reentrant call",
            CoreError::FlashLoanNotRepaid => "Flash loan was not repaid with its fee",
            CoreError::FlashLoanRejected => "Flash loan receiver rejected the loan",
            CoreError::PriceUnavailable => "No price published for asset",
            CoreError::StalePrice => "Published price is too old",
            CoreError::Unauthorized => "Caller lacks the required role",
            CoreError::NotBridge => "Caller is not the registered bridge",
            CoreError::NotMinter => "Caller is not the token minter",
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_families() {
        assert_eq!(CoreError::ZeroAmount.kind(), ErrorKind::Validation);
        assert_eq!(CoreError::MintCapExceeded.kind(), ErrorKind::Capacity);
        assert_eq!(CoreError::PositionHealthy.kind(), ErrorKind::Solvency);
        assert_eq!(CoreError::NoConvergence.kind(), ErrorKind::Math);
        assert_eq!(CoreError::NoPendingBurn.kind(), ErrorKind::State);
        assert_eq!(CoreError::NotBridge.kind(), ErrorKind::Authorization);
    }
}
