use ethers::types::U256;
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

/// Errors raised while turning user input into a sell quote.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuoteError {
    /// The amount could not be parsed as a non-negative decimal.
    #[error("invalid sell amount: {0:?}")]
    InvalidInput(String),
    /// Submission gate: the amount is below the configured minimum.
    #[error("minimum sell amount is {minimum}, got {amount}")]
    BelowMinimum { amount: Decimal, minimum: Decimal },
    /// An intermediate value left the decimal range.
    #[error("quote for {amount} is out of range")]
    Overflow { amount: Decimal },
}

/// A smallest-unit amount whose integer part does not fit a `Decimal`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{raw} with {decimals} decimals exceeds the decimal range")]
pub struct AmountOutOfRange {
    pub raw: U256,
    pub decimals: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupFailure {
    /// Bad address, non-conforming contract or transport error.
    Unresolved,
    /// The contract answered but the holder balance cannot be represented.
    BalanceOutOfRange,
}

impl fmt::Display for LookupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupFailure::Unresolved => write!(f, "failed to resolve token"),
            LookupFailure::BalanceOutOfRange => write!(f, "balance out of range for token"),
        }
    }
}

/// Token contract lookup failed. Partial results are never surfaced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} {contract}: {reason}")]
pub struct LookupError {
    pub contract: String,
    pub kind: LookupFailure,
    pub reason: String,
}

impl LookupError {
    pub fn new(contract: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            contract: contract.into(),
            kind: LookupFailure::Unresolved,
            reason: reason.to_string(),
        }
    }

    pub fn out_of_range(contract: impl Into<String>, source: AmountOutOfRange) -> Self {
        Self {
            contract: contract.into(),
            kind: LookupFailure::BalanceOutOfRange,
            reason: source.to_string(),
        }
    }
}

/// Which mandatory fetch of an aggregation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    NativeBalance,
    TokenBalances,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStage::NativeBalance => write!(f, "native balance"),
            FetchStage::TokenBalances => write!(f, "token balances"),
        }
    }
}

/// Balance or token list could not be fetched, so the whole aggregation fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortfolioError {
    #[error("failed to fetch {stage} for {address}: {reason}")]
    AggregationFailure {
        stage: FetchStage,
        address: String,
        reason: String,
    },
}
