//! Sell quote computation.
//!
//! Everything here is synchronous and side-effect free. Amounts are kept at
//! full precision; rounding only happens in the `*_display` accessors.

use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::asset::AssetRef;
use crate::config::QuoteConfig;
use crate::error::QuoteError;
use crate::metrics;
use crate::utils::{group_digits, strip_grouping};

/// Decimal places used when reporting the fiat proceeds.
pub const RECEIVE_DISPLAY_DP: u32 = 4;
/// Decimal places used when reporting the gas fee.
pub const GAS_FEE_DISPLAY_DP: u32 = 6;

/// Native asset price in fiat. `None` (or zero) means the price is unknown.
pub type NativePrice = Option<Decimal>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellQuote {
    pub input_amount: Decimal,
    pub receive_fiat: Decimal,
    pub gas_fee_native: Decimal,
    pub gas_sufficient: bool,
}

impl SellQuote {
    pub fn zero(input_amount: Decimal) -> Self {
        Self {
            input_amount,
            receive_fiat: Decimal::ZERO,
            gas_fee_native: Decimal::ZERO,
            gas_sufficient: true,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.receive_fiat.is_zero() && self.gas_fee_native.is_zero()
    }

    pub fn receive_fiat_display(&self) -> Decimal {
        self.receive_fiat.round_dp(RECEIVE_DISPLAY_DP)
    }

    pub fn gas_fee_native_display(&self) -> Decimal {
        self.gas_fee_native.round_dp(GAS_FEE_DISPLAY_DP)
    }
}

impl fmt::Display for SellQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sell {} -> receive {:.4}, gas fee {:.6}{}",
            self.input_amount,
            self.receive_fiat_display(),
            self.gas_fee_native_display(),
            if self.gas_sufficient { "" } else { " (insufficient)" }
        )
    }
}

/// Parse a user-entered amount. Comma grouping separators are ignored; an
/// empty string is zero. Underscores are not digit separators here.
pub fn parse_amount(raw_input: &str) -> Result<Decimal, QuoteError> {
    let clean = strip_grouping(raw_input);
    if clean.is_empty() {
        return Ok(Decimal::ZERO);
    }
    if clean.contains('_') {
        return Err(QuoteError::InvalidInput(raw_input.to_string()));
    }

    let amount =
        Decimal::from_str(&clean).map_err(|_| QuoteError::InvalidInput(raw_input.to_string()))?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(QuoteError::InvalidInput(raw_input.to_string()));
    }
    Ok(amount)
}

pub fn compute_quote(
    raw_input: &str,
    holder_balance: Decimal,
    fixed_unit_price: Decimal,
    native_price: NativePrice,
    native_balance: Decimal,
    gas_percent: Decimal,
) -> Result<SellQuote, QuoteError> {
    let parsed = parse_amount(raw_input)?;
    let amount = parsed.min(holder_balance);

    let price = match native_price {
        Some(price) if !price.is_zero() => price,
        _ => return Ok(SellQuote::zero(amount)),
    };
    if amount.is_zero() {
        return Ok(SellQuote::zero(amount));
    }

    let overflow = || QuoteError::Overflow { amount };
    let receive_fiat = amount.checked_mul(fixed_unit_price).ok_or_else(overflow)?;
    let gas_fee_fiat = receive_fiat.checked_mul(gas_percent).ok_or_else(overflow)?;
    let gas_fee_native = gas_fee_fiat.checked_div(price).ok_or_else(overflow)?;

    Ok(SellQuote {
        input_amount: amount,
        receive_fiat,
        gas_fee_native,
        gas_sufficient: native_balance >= gas_fee_native,
    })
}

/// Quote for the full holder balance ("Max").
pub fn clamp_to_max(
    holder_balance: Decimal,
    fixed_unit_price: Decimal,
    native_price: NativePrice,
    native_balance: Decimal,
    gas_percent: Decimal,
) -> Result<SellQuote, QuoteError> {
    compute_quote(
        &holder_balance.to_string(),
        holder_balance,
        fixed_unit_price,
        native_price,
        native_balance,
        gas_percent,
    )
}

pub fn meets_minimum(amount: Decimal, min_sell: Decimal) -> bool {
    amount >= min_sell
}

/// What a confirmed sell would yield. Nothing is executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellSummary {
    pub symbol: String,
    pub amount: Decimal,
    pub receive_fiat: Decimal,
    pub gas_fee_native: Decimal,
    pub native_symbol: String,
    pub gas_sufficient: bool,
}

impl fmt::Display for SellSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Token: {}", self.symbol)?;
        writeln!(f, "Amount: {}", group_digits(&self.amount.normalize().to_string()))?;
        writeln!(
            f,
            "Receive: {} USDT",
            group_digits(&format!("{:.4}", self.receive_fiat))
        )?;
        write!(f, "Gas Fee: {:.6} {}", self.gas_fee_native, self.native_symbol)
    }
}

/// Live quote state behind a sell form: the last accepted input and the
/// quote derived from it. Every input change re-derives the quote.
#[derive(Debug, Clone)]
pub struct QuoteEngine {
    config: QuoteConfig,
    holder_balance: Decimal,
    native_price: NativePrice,
    native_balance: Decimal,
    input: String,
    quote: SellQuote,
}

impl QuoteEngine {
    pub fn new(config: QuoteConfig) -> Self {
        Self {
            config,
            holder_balance: Decimal::ZERO,
            native_price: None,
            native_balance: Decimal::ZERO,
            input: String::new(),
            quote: SellQuote::zero(Decimal::ZERO),
        }
    }

    fn compute(&self, raw_input: &str) -> Result<SellQuote, QuoteError> {
        compute_quote(
            raw_input,
            self.holder_balance,
            self.config.fixed_unit_price,
            self.native_price,
            self.native_balance,
            self.config.gas_percent,
        )
    }

    fn recompute(&mut self) {
        match self.compute(&self.input) {
            Ok(quote) => self.quote = quote,
            Err(e) => {
                warn!("Quote for {:?} cleared: {}", self.input, e);
                self.quote = SellQuote::zero(self.quote.input_amount);
            }
        }
    }

    pub fn config(&self) -> &QuoteConfig {
        &self.config
    }

    pub fn quote(&self) -> &SellQuote {
        &self.quote
    }

    pub fn holder_balance(&self) -> Decimal {
        self.holder_balance
    }

    /// Input echo for the amount field, with thousands separators.
    pub fn display_input(&self) -> String {
        group_digits(&self.quote.input_amount.normalize().to_string())
    }

    /// Switch to a newly resolved asset. The previous amount no longer applies.
    pub fn set_asset(&mut self, asset: &AssetRef) {
        self.holder_balance = asset.holder_balance;
        self.input.clear();
        self.quote = SellQuote::zero(Decimal::ZERO);
    }

    pub fn set_native_price(&mut self, price: NativePrice) {
        self.native_price = price;
        self.recompute();
    }

    pub fn set_native_balance(&mut self, balance: Decimal) {
        self.native_balance = balance;
        self.recompute();
    }

    /// Recompute from a raw edit. On error the previous input and quote stay.
    pub fn apply_input(&mut self, raw_input: &str) -> Result<&SellQuote, QuoteError> {
        let quote = match self.compute(raw_input) {
            Ok(quote) => quote,
            Err(e) => {
                debug!("Rejected sell input {:?}: {}", raw_input, e);
                metrics::record_quote_rejected();
                return Err(e);
            }
        };

        metrics::record_quote_computed();
        self.input = raw_input.to_string();
        self.quote = quote;
        Ok(&self.quote)
    }

    pub fn apply_max(&mut self) -> Result<&SellQuote, QuoteError> {
        let raw = self.holder_balance.to_string();
        self.apply_input(&raw)
    }

    /// Submission gate. Only checked here, never while the user is typing.
    /// The summary is derived from the current inputs, not a cached quote.
    pub fn confirm(&self, symbol: &str, native_symbol: &str) -> Result<SellSummary, QuoteError> {
        let quote = self.compute(&self.input)?;
        let amount = quote.input_amount;
        if amount.is_zero() || !meets_minimum(amount, self.config.min_sell) {
            return Err(QuoteError::BelowMinimum {
                amount,
                minimum: self.config.min_sell,
            });
        }

        Ok(SellSummary {
            symbol: symbol.to_string(),
            amount,
            receive_fiat: quote.receive_fiat_display(),
            gas_fee_native: quote.gas_fee_native_display(),
            native_symbol: native_symbol.to_string(),
            gas_sufficient: quote.gas_sufficient,
        })
    }
}
