use anyhow::Result;
use ethers::types::U256;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use rust_decimal::Decimal;

use crate::error::AmountOutOfRange;

/// Solana native balances are reported in lamports.
pub const LAMPORTS_DECIMALS: u32 = 9;

/// Largest scale a `Decimal` can carry.
const DECIMAL_MAX_SCALE: u32 = 28;

pub fn setup_logger(level: LevelFilter) -> Result<()> {
    let colors = ColoredLevelConfig {
        trace: Color::Cyan,
        debug: Color::Magenta,
        info: Color::Green,
        warn: Color::Yellow,
        error: Color::Red,
        ..ColoredLevelConfig::new()
    };

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%H:%M:%S]"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .chain(std::io::stdout())
        .level(LevelFilter::Warn)
        .level_for("swap_quote_core", level)
        .level_for("swap_quote", level)
        .apply()?;

    Ok(())
}

/// Convert a smallest-unit integer into a decimal amount using `decimals`.
///
/// Fractional digits that do not fit (beyond 28 places, or beyond what the
/// 96-bit mantissa holds next to the integer part) are truncated, so the
/// result never overstates the amount. An integer part larger than
/// `Decimal::MAX` is an error.
pub fn units_to_decimal(raw: U256, decimals: u8) -> Result<Decimal, AmountOutOfRange> {
    let max_mantissa = U256::from(u128::MAX >> 32);
    let ten = U256::from(10u8);

    let mut mantissa = raw;
    let mut scale = decimals as u32;
    while scale > DECIMAL_MAX_SCALE || mantissa > max_mantissa {
        if scale == 0 {
            return Err(AmountOutOfRange { raw, decimals });
        }
        mantissa = mantissa / ten;
        scale -= 1;
    }

    Ok(Decimal::from_i128_with_scale(mantissa.as_u128() as i128, scale).normalize())
}

pub fn lamports_to_sol(lamports: u64) -> Decimal {
    Decimal::from_i128_with_scale(lamports as i128, LAMPORTS_DECIMALS).normalize()
}

/// Remove thousands separators and surrounding whitespace from user input.
pub fn strip_grouping(raw: &str) -> String {
    raw.trim().replace(',', "")
}

/// Format the integer part of an amount with thousands separators,
/// e.g. `"3000000.5"` becomes `"3,000,000.5"`.
pub fn group_digits(amount: &str) -> String {
    let (int_part, frac_part) = match amount.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (amount, None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }

    match frac_part {
        Some(f) => format!("{}.{}", grouped, f),
        None => grouped,
    }
}
