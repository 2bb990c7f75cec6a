use anyhow::Result;
use ethers::types::Address;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use swap_quote_core::{
    clamp_to_max, compute_quote, meets_minimum, AssetRef, QuoteConfig, QuoteEngine, QuoteError,
    SellQuote,
};
use test_log::test;

const UNIT_PRICE: Decimal = dec!(0.002);
const GAS_PERCENT: Decimal = dec!(0.15);

fn asset(holder_balance: Decimal) -> AssetRef {
    AssetRef {
        contract_id: Address::from_low_u64_be(0x56),
        symbol: "TKN".to_string(),
        decimals: 18,
        holder_balance,
    }
}

#[test]
fn test_bsc_reference_quote() -> Result<()> {
    let quote = compute_quote(
        "3,000,000",
        dec!(5000000),
        UNIT_PRICE,
        Some(dec!(600)),
        dec!(0.5),
        GAS_PERCENT,
    )?;

    assert_eq!(quote.input_amount, dec!(3000000));
    assert_eq!(format!("{:.4}", quote.receive_fiat_display()), "6000.0000");
    assert_eq!(format!("{:.6}", quote.gas_fee_native_display()), "1.500000");
    // 0.5 BNB does not cover a 1.5 BNB fee
    assert!(!quote.gas_sufficient);

    Ok(())
}

#[test]
fn test_fee_matches_formula_below_balance() -> Result<()> {
    let holder = dec!(10000000);
    for (input, native_price) in [
        ("1", dec!(600)),
        ("2,000,000", dec!(2450.17)),
        ("9999999.999", dec!(0.5)),
    ] {
        let amount: Decimal = input.replace(',', "").parse()?;
        let quote = compute_quote(input, holder, UNIT_PRICE, Some(native_price), dec!(1), GAS_PERCENT)?;
        assert_eq!(quote.input_amount, amount);
        assert_eq!(quote.gas_fee_native, amount * UNIT_PRICE * GAS_PERCENT / native_price);
        assert_eq!(quote.gas_sufficient, dec!(1) >= quote.gas_fee_native);
    }
    Ok(())
}

#[test]
fn test_amount_above_balance_is_clamped() -> Result<()> {
    for input in ["5,000,001", "99999999999", "5000000.0001"] {
        let quote = compute_quote(input, dec!(5000000), UNIT_PRICE, Some(dec!(600)), dec!(1), GAS_PERCENT)?;
        assert_eq!(quote.input_amount, dec!(5000000));
    }
    Ok(())
}

#[test]
fn test_empty_equals_zero() -> Result<()> {
    let empty = compute_quote("", dec!(10), UNIT_PRICE, Some(dec!(600)), dec!(1), GAS_PERCENT)?;
    let zero = compute_quote("0", dec!(10), UNIT_PRICE, Some(dec!(600)), dec!(1), GAS_PERCENT)?;
    assert_eq!(empty, zero);
    assert_eq!(empty, SellQuote::zero(Decimal::ZERO));
    Ok(())
}

#[test]
fn test_clamp_to_max_is_idempotent() -> Result<()> {
    let first = clamp_to_max(dec!(1234567.891), UNIT_PRICE, Some(dec!(600)), dec!(1), GAS_PERCENT)?;
    let second = clamp_to_max(first.input_amount, UNIT_PRICE, Some(dec!(600)), dec!(1), GAS_PERCENT)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_invalid_input_leaves_quote_unchanged() -> Result<()> {
    let mut engine = QuoteEngine::new(QuoteConfig::default());
    engine.set_asset(&asset(dec!(5000000)));
    engine.set_native_price(Some(dec!(600)));
    engine.set_native_balance(dec!(2));

    let before = *engine.apply_input("2,500,000")?;
    let err = engine.apply_input("2,500,000abc").unwrap_err();
    assert!(matches!(err, QuoteError::InvalidInput(_)));
    assert_eq!(*engine.quote(), before);
    Ok(())
}

#[test]
fn test_minimum_sell_gate() -> Result<()> {
    assert!(!meets_minimum(dec!(1999999), dec!(2000000)));

    let mut engine = QuoteEngine::new(QuoteConfig::default());
    engine.set_asset(&asset(dec!(5000000)));
    engine.set_native_price(Some(dec!(600)));

    // Typing below the minimum is fine; only confirmation is gated.
    engine.apply_input("1,999,999")?;
    assert_eq!(engine.quote().input_amount, dec!(1999999));
    assert!(matches!(
        engine.confirm("TKN", "BNB"),
        Err(QuoteError::BelowMinimum { .. })
    ));

    engine.apply_input("2,000,000")?;
    let summary = engine.confirm("TKN", "BNB")?;
    assert_eq!(summary.amount, dec!(2000000));
    assert_eq!(summary.receive_fiat, dec!(4000));
    assert_eq!(summary.gas_fee_native, dec!(1));
    Ok(())
}

#[test]
fn test_injected_config() -> Result<()> {
    let config = QuoteConfig {
        fixed_unit_price: dec!(1),
        gas_percent: dec!(0.5),
        min_sell: dec!(1),
    };
    config.validate_all()?;

    let mut engine = QuoteEngine::new(config);
    engine.set_asset(&asset(dec!(100)));
    engine.set_native_price(Some(dec!(10)));
    engine.set_native_balance(dec!(5));

    let quote = *engine.apply_max()?;
    assert_eq!(quote.receive_fiat, dec!(100));
    assert_eq!(quote.gas_fee_native, dec!(5));
    assert!(quote.gas_sufficient);
    assert_eq!(engine.display_input(), "100");
    Ok(())
}

#[test]
fn test_gas_covered_at_exact_fee() -> Result<()> {
    let quote = compute_quote("3,000,000", dec!(5000000), UNIT_PRICE, Some(dec!(600)), dec!(1.5), GAS_PERCENT)?;
    assert_eq!(quote.gas_fee_native, dec!(1.5));
    assert!(quote.gas_sufficient);

    let quote = compute_quote("3,000,000", dec!(5000000), UNIT_PRICE, Some(dec!(600)), dec!(1.499999), GAS_PERCENT)?;
    assert!(!quote.gas_sufficient);
    Ok(())
}

#[test]
fn test_confirm_after_late_price() -> Result<()> {
    let mut engine = QuoteEngine::new(QuoteConfig::default());
    engine.set_asset(&asset(dec!(5000000)));
    engine.set_native_balance(dec!(0.001));
    engine.apply_input("3,000,000")?;
    assert!(engine.quote().is_zero());

    // price lands after the user typed
    engine.set_native_price(Some(dec!(600)));
    let summary = engine.confirm("TKN", "BNB")?;
    assert_eq!(summary.amount, dec!(3000000));
    assert_eq!(summary.receive_fiat, dec!(6000));
    assert_eq!(summary.gas_fee_native, dec!(1.5));
    assert!(!summary.gas_sufficient);
    assert_eq!(*engine.quote(), compute_quote("3,000,000", dec!(5000000), UNIT_PRICE, Some(dec!(600)), dec!(0.001), GAS_PERCENT)?);
    Ok(())
}

#[test]
fn test_underscore_separators_rejected() {
    let result = compute_quote("1_000", dec!(5000), UNIT_PRICE, Some(dec!(600)), dec!(1), GAS_PERCENT);
    assert_eq!(result, Err(QuoteError::InvalidInput("1_000".to_string())));
}
