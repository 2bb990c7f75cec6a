use anyhow::Result;
use async_trait::async_trait;
use ethers::{
    contract::abigen,
    providers::Middleware,
    types::{Address, U256},
};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{str::FromStr, sync::Arc};

use crate::error::LookupError;
use crate::metrics;
use crate::requests::RequestTracker;
use crate::utils::units_to_decimal;

abigen!(
    Erc20,
    r#"[
        function symbol() external view returns (string)
        function decimals() external view returns (uint8)
        function balanceOf(address account) external view returns (uint256)
    ]"#
);

/// A token resolved for the connected holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    pub contract_id: Address,
    pub symbol: String,
    pub decimals: u8,
    pub holder_balance: Decimal,
}

/// The three read calls a token lookup needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenReader: Send + Sync {
    async fn symbol(&self, token: Address) -> Result<String>;
    async fn decimals(&self, token: Address) -> Result<u8>;
    async fn balance_of(&self, token: Address, holder: Address) -> Result<U256>;
}

/// Reads ERC-20 view functions through any ethers middleware.
pub struct Erc20Reader<M> {
    client: Arc<M>,
}

impl<M: Middleware> Erc20Reader<M> {
    pub fn new(client: Arc<M>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<M> TokenReader for Erc20Reader<M>
where
    M: Middleware + 'static,
{
    async fn symbol(&self, token: Address) -> Result<String> {
        Ok(Erc20::new(token, self.client.clone()).symbol().call().await?)
    }

    async fn decimals(&self, token: Address) -> Result<u8> {
        Ok(Erc20::new(token, self.client.clone()).decimals().call().await?)
    }

    async fn balance_of(&self, token: Address, holder: Address) -> Result<U256> {
        Ok(Erc20::new(token, self.client.clone())
            .balance_of(holder)
            .call()
            .await?)
    }
}

/// Resolve symbol, decimals and the holder's balance. Any failed read
/// collapses into a single `LookupError`; a balance too large to represent
/// is reported as `LookupFailure::BalanceOutOfRange`.
pub async fn resolve<R>(reader: &R, contract_id: &str, holder: Address) -> Result<AssetRef, LookupError>
where
    R: TokenReader + ?Sized,
{
    let contract = Address::from_str(contract_id.trim())
        .map_err(|e| LookupError::new(contract_id, format!("invalid contract address: {}", e)))?;

    let symbol = reader
        .symbol(contract)
        .await
        .map_err(|e| LookupError::new(contract_id, e))?;
    let decimals = reader
        .decimals(contract)
        .await
        .map_err(|e| LookupError::new(contract_id, e))?;
    let raw_balance = reader
        .balance_of(contract, holder)
        .await
        .map_err(|e| LookupError::new(contract_id, e))?;
    let holder_balance = units_to_decimal(raw_balance, decimals)
        .map_err(|e| LookupError::out_of_range(contract_id, e))?;

    debug!("Resolved {} ({}): {} held by {:?}", symbol, contract_id, holder_balance, holder);

    Ok(AssetRef {
        contract_id: contract,
        symbol,
        decimals,
        holder_balance,
    })
}

/// Outcome of a tracked search.
#[derive(Debug)]
pub enum SearchOutcome {
    Resolved(AssetRef),
    Failed(LookupError),
    /// The user searched for another contract while this one was in flight.
    Stale,
}

/// Token search box: resolves the latest entered contract and drops results
/// for contracts that are no longer the current search.
pub struct AssetSearch<R: ?Sized> {
    reader: Arc<R>,
    tracker: RequestTracker<String>,
}

impl<R: TokenReader + ?Sized> AssetSearch<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            reader,
            tracker: RequestTracker::new(),
        }
    }

    pub async fn search(&self, contract_id: &str, holder: Address) -> SearchOutcome {
        let key = contract_id.trim().to_lowercase();
        let token = self.tracker.begin(key).await;
        let result = resolve(self.reader.as_ref(), contract_id, holder).await;

        if !self.tracker.is_current(&token).await {
            debug!("Discarding lookup for {}: superseded", contract_id);
            metrics::record_lookup_discarded();
            return SearchOutcome::Stale;
        }

        match result {
            Ok(asset) => {
                info!("Found token {} with balance {}", asset.symbol, asset.holder_balance);
                metrics::record_lookup(true);
                SearchOutcome::Resolved(asset)
            }
            Err(e) => {
                warn!("{}", e);
                metrics::record_lookup(false);
                SearchOutcome::Failed(e)
            }
        }
    }

    /// Clear the search (e.g. on disconnect); in-flight results become stale.
    pub async fn clear(&self) {
        self.tracker.reset().await;
    }
}
