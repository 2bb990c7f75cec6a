use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::{env, str::FromStr, time::Duration};
use validator::{Validate, ValidationError};

pub const DEFAULT_FIXED_UNIT_PRICE: Decimal = dec!(0.002);
pub const DEFAULT_GAS_PERCENT: Decimal = dec!(0.15);
pub const DEFAULT_MIN_SELL: Decimal = dec!(2000000);

pub const DEFAULT_PRICE_API_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_HELIUS_API_URL: &str = "https://api.helius.xyz";

/// Static pricing parameters for the quote engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct QuoteConfig {
    // Fiat (USDT) paid per token
    #[validate(custom = "validate_positive")]
    pub fixed_unit_price: Decimal,
    // Fraction of the fiat proceeds charged as gas, paid in the native asset
    #[validate(custom = "validate_fraction")]
    pub gas_percent: Decimal,
    #[validate(custom = "validate_non_negative")]
    pub min_sell: Decimal,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            fixed_unit_price: DEFAULT_FIXED_UNIT_PRICE,
            gas_percent: DEFAULT_GAS_PERCENT,
            min_sell: DEFAULT_MIN_SELL,
        }
    }
}

impl QuoteConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            fixed_unit_price: decimal_var("FIXED_UNIT_PRICE")?.unwrap_or(defaults.fixed_unit_price),
            gas_percent: decimal_var("GAS_PERCENT")?.unwrap_or(defaults.gas_percent),
            min_sell: decimal_var("MIN_SELL")?.unwrap_or(defaults.min_sell),
        })
    }

    pub fn validate_all(&self) -> Result<()> {
        self.validate()
            .map_err(|e| anyhow!("Quote configuration validation failed: {:?}", e))
    }
}

/// Endpoints and transport settings for the network-facing components.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServiceConfig {
    #[validate(custom = "validate_http_url")]
    pub evm_rpc_url: Option<String>,
    #[validate(custom = "validate_http_url")]
    pub price_api_url: String,
    #[validate(custom = "validate_http_url")]
    pub solana_rpc_url: Option<String>,
    #[validate(custom = "validate_http_url")]
    pub helius_api_url: String,
    pub helius_api_key: Option<String>,
    pub request_timeout: Duration,
    pub metrics_port: Option<u16>,
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            evm_rpc_url: None,
            price_api_url: DEFAULT_PRICE_API_URL.to_string(),
            solana_rpc_url: None,
            helius_api_url: DEFAULT_HELIUS_API_URL.to_string(),
            helius_api_key: None,
            request_timeout: Duration::from_secs(15),
            metrics_port: None,
            log_level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let request_timeout = match env::var("REQUEST_TIMEOUT_SECS").ok() {
            Some(secs) => Duration::from_secs(secs.parse()?),
            None => defaults.request_timeout,
        };
        let metrics_port = match env::var("METRICS_PORT").ok() {
            Some(port) => Some(port.parse()?),
            None => None,
        };

        Ok(Self {
            evm_rpc_url: env::var("EVM_RPC_URL").ok(),
            price_api_url: env::var("PRICE_API_URL").unwrap_or(defaults.price_api_url),
            solana_rpc_url: env::var("SOLANA_RPC_URL").ok(),
            helius_api_url: env::var("HELIUS_API_URL").unwrap_or(defaults.helius_api_url),
            helius_api_key: env::var("HELIUS_API_KEY").ok(),
            request_timeout,
            metrics_port,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }

    pub fn validate_all(&self) -> Result<()> {
        if let Err(e) = self.validate() {
            return Err(anyhow!("Service configuration validation failed: {:?}", e));
        }
        if self.request_timeout.is_zero() {
            return Err(anyhow!("request timeout must be non-zero"));
        }
        if self.solana_rpc_url.is_some() && self.helius_api_key.is_none() {
            return Err(anyhow!("SOLANA_RPC_URL is set but HELIUS_API_KEY is missing"));
        }
        Ok(())
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

fn decimal_var(name: &str) -> Result<Option<Decimal>> {
    match env::var(name) {
        Ok(value) => Decimal::from_str(value.trim())
            .map(Some)
            .map_err(|e| anyhow!("{} is not a decimal: {}", name, e)),
        Err(_) => Ok(None),
    }
}

// Custom validators
fn validate_http_url(url: &str) -> Result<(), ValidationError> {
    match url::Url::parse(url) {
        Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => Ok(()),
        _ => Err(ValidationError::new("invalid_http_url")),
    }
}

fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() || value.is_zero() {
        return Err(ValidationError::new("not_positive"));
    }
    Ok(())
}

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("negative"));
    }
    Ok(())
}

fn validate_fraction(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value > Decimal::ONE {
        return Err(ValidationError::new("not_a_fraction"));
    }
    Ok(())
}
