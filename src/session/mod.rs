use anyhow::Result;
use ethers::{providers::Middleware, types::Address};
use log::info;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::units_to_decimal;

/// Native assets on EVM chains use 18 decimals.
pub const NATIVE_DECIMALS: u8 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chain {
    Ethereum,
    BinanceSmartChain,
    Other(u64),
}

impl Chain {
    pub fn id(&self) -> u64 {
        match self {
            Chain::Ethereum => 1,
            Chain::BinanceSmartChain => 56,
            Chain::Other(id) => *id,
        }
    }

    /// Asset id used by the price feed. Unknown chains have no price.
    pub fn price_asset_id(&self) -> Option<&'static str> {
        match self {
            Chain::Ethereum => Some("ethereum"),
            Chain::BinanceSmartChain => Some("binancecoin"),
            Chain::Other(_) => None,
        }
    }

    pub fn native_symbol(&self) -> &'static str {
        match self {
            Chain::BinanceSmartChain => "BNB",
            _ => "ETH",
        }
    }
}

impl From<u64> for Chain {
    fn from(id: u64) -> Self {
        match id {
            1 => Chain::Ethereum,
            56 => Chain::BinanceSmartChain,
            other => Chain::Other(other),
        }
    }
}

/// The connected wallet as reported by the connector. Core components only
/// read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletSession {
    pub address: Address,
    pub chain_id: u64,
    pub native_balance: Decimal,
}

impl WalletSession {
    pub fn new(address: Address, chain_id: u64, native_balance: Decimal) -> Self {
        Self {
            address,
            chain_id,
            native_balance,
        }
    }

    /// Read chain id and native balance for `address` through the connector.
    pub async fn connect<M: Middleware>(client: &M, address: Address) -> Result<Self>
    where
        M::Error: 'static,
    {
        let chain_id = client.get_chainid().await?.as_u64();
        let balance = client.get_balance(address, None).await?;
        let native_balance = units_to_decimal(balance, NATIVE_DECIMALS)?;

        info!(
            "Connected {:?} on chain {} with {} {}",
            address,
            chain_id,
            native_balance,
            Chain::from(chain_id).native_symbol()
        );

        Ok(Self::new(address, chain_id, native_balance))
    }

    pub fn chain(&self) -> Chain {
        Chain::from(self.chain_id)
    }

    /// Re-read the native balance. Returns a new session; the old one is untouched.
    pub async fn refresh_native_balance<M: Middleware>(&self, client: &M) -> Result<Self>
    where
        M::Error: 'static,
    {
        let balance = client.get_balance(self.address, None).await?;
        Ok(Self {
            native_balance: units_to_decimal(balance, NATIVE_DECIMALS)?,
            ..self.clone()
        })
    }

    /// Short form used in headers, e.g. `0x1234...abcd`.
    pub fn short_address(&self) -> String {
        let full = format!("{:?}", self.address);
        format!("{}...{}", &full[..6], &full[full.len() - 4..])
    }
}
