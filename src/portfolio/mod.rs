//! Wallet portfolio aggregation.
//!
//! Native balance, token balances and token metadata come from independent
//! calls. Metadata is fetched in one batch for all held mints and is optional
//! per entry: a missing record never drops a balance.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use itertools::Itertools;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, time::Duration, time::Instant};

use crate::error::{FetchStage, PortfolioError};
use crate::metrics;
use crate::utils::lamports_to_sol;

/// One token holding as reported by the balance source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub mint: String,
    pub amount: u64,
    #[serde(default)]
    pub decimals: u8,
    #[serde(default, rename = "amountUI")]
    pub amount_ui: Option<Decimal>,
    /// Ticker reported alongside the balance, if any.
    #[serde(default)]
    pub symbol: Option<String>,
}

impl TokenBalance {
    pub fn ui_balance(&self) -> Decimal {
        self.amount_ui.unwrap_or_else(|| {
            Decimal::try_from_i128_with_scale(self.amount as i128, self.decimals as u32)
                .unwrap_or_default()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    pub mint: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub logo_uri: Option<String>,
    #[serde(default)]
    pub supply: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioEntry {
    pub mint: String,
    pub raw_balance: u64,
    pub ui_balance: Decimal,
    /// Symbol from the balance record, used when metadata has none.
    pub symbol: Option<String>,
    pub metadata: Option<TokenMetadata>,
}

impl PortfolioEntry {
    /// Metadata name, then the balance symbol, then the mint.
    pub fn display_name(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.name.as_deref())
            .or(self.symbol.as_deref())
            .unwrap_or(&self.mint)
    }

    pub fn display_symbol(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.symbol.as_deref())
            .or(self.symbol.as_deref())
            .unwrap_or(&self.mint)
    }

    pub fn logo_uri(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.logo_uri.as_deref())
    }

    /// Supply as shown on the token card.
    pub fn supply_label(&self) -> String {
        let supply = match self.metadata.as_ref().and_then(|m| m.supply.as_deref()) {
            Some(s) if !s.is_empty() => s,
            _ => return "N/A".to_string(),
        };
        match supply.parse::<f64>() {
            Ok(n) if n >= 1e9 => "1 Billion".to_string(),
            Ok(n) if n >= 1e6 => "1 Million".to_string(),
            _ => supply.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataStatus {
    /// Every entry has metadata (or there are no entries).
    Complete,
    /// The metadata source answered but omitted some mints.
    Partial { missing: usize },
    /// The metadata request failed; no entry has metadata.
    Unavailable { reason: String },
    /// Aggregation failed before metadata was requested.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    pub address: String,
    pub native_balance: Decimal,
    pub entries: Vec<PortfolioEntry>,
    pub metadata_status: MetadataStatus,
}

impl Portfolio {
    /// What the grid shows after a failed aggregation. The status stays
    /// `Unknown` so it cannot pass for an empty wallet.
    pub fn empty(address: &str) -> Self {
        Self {
            address: address.to_string(),
            native_balance: Decimal::ZERO,
            entries: Vec::new(),
            metadata_status: MetadataStatus::Unknown,
        }
    }

    pub fn missing_metadata(&self) -> usize {
        self.entries.iter().filter(|e| e.metadata.is_none()).count()
    }
}

/// The three independent reads an aggregation needs.
#[async_trait]
pub trait PortfolioSource: Send + Sync {
    /// Native balance in the smallest unit (lamports).
    async fn fetch_native_balance(&self, address: &str) -> Result<u64>;
    async fn fetch_token_balances(&self, address: &str) -> Result<Vec<TokenBalance>>;
    /// One request for all of `mints`.
    async fn fetch_metadata(&self, mints: &[String]) -> Result<Vec<TokenMetadata>>;
}

/// Join balances with metadata by mint. Output order follows `balances`.
pub fn merge_entries(balances: Vec<TokenBalance>, metadata: Vec<TokenMetadata>) -> Vec<PortfolioEntry> {
    let mut by_mint: HashMap<String, TokenMetadata> = HashMap::with_capacity(metadata.len());
    for record in metadata {
        by_mint.entry(record.mint.clone()).or_insert(record);
    }

    balances
        .into_iter()
        .map(|balance| {
            let ui_balance = balance.ui_balance();
            let metadata = by_mint.get(&balance.mint).cloned();
            PortfolioEntry {
                mint: balance.mint,
                raw_balance: balance.amount,
                ui_balance,
                symbol: balance.symbol,
                metadata,
            }
        })
        .collect()
}

pub async fn aggregate<S>(source: &S, address: &str) -> Result<Portfolio, PortfolioError>
where
    S: PortfolioSource + ?Sized,
{
    let started = Instant::now();
    let fail = |stage: FetchStage, e: anyhow::Error| {
        warn!("Portfolio aggregation for {} failed at {}: {}", address, stage, e);
        metrics::record_aggregation_failed();
        PortfolioError::AggregationFailure {
            stage,
            address: address.to_string(),
            reason: e.to_string(),
        }
    };

    let lamports = source
        .fetch_native_balance(address)
        .await
        .map_err(|e| fail(FetchStage::NativeBalance, e))?;
    let balances = source
        .fetch_token_balances(address)
        .await
        .map_err(|e| fail(FetchStage::TokenBalances, e))?;

    let mints: Vec<String> = balances.iter().map(|b| b.mint.clone()).unique().collect();
    let (metadata, failure) = if mints.is_empty() {
        (Vec::new(), None)
    } else {
        match source.fetch_metadata(&mints).await {
            Ok(records) => (records, None),
            Err(e) => {
                warn!("Token metadata unavailable for {} mints: {}", mints.len(), e);
                (Vec::new(), Some(e.to_string()))
            }
        }
    };

    let entries = merge_entries(balances, metadata);
    let missing = entries.iter().filter(|e| e.metadata.is_none()).count();
    let metadata_status = match failure {
        Some(reason) => MetadataStatus::Unavailable { reason },
        None if missing > 0 => MetadataStatus::Partial { missing },
        None => MetadataStatus::Complete,
    };
    if missing > 0 {
        debug!("{} of {} entries lack metadata", missing, entries.len());
    }

    metrics::record_aggregation(started.elapsed(), missing);
    info!(
        "Aggregated portfolio for {}: {} tokens in {:?}",
        address,
        entries.len(),
        started.elapsed()
    );

    Ok(Portfolio {
        address: address.to_string(),
        native_balance: lamports_to_sol(lamports),
        entries,
        metadata_status,
    })
}

/// Helius REST + Solana JSON-RPC backed source.
pub struct HeliusSource {
    client: reqwest::Client,
    rpc_url: String,
    api_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<RpcBalance>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RpcBalance {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct BalancesResponse {
    #[serde(default)]
    tokens: Vec<TokenBalance>,
}

impl HeliusSource {
    pub fn new(
        rpc_url: impl Into<String>,
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            rpc_url: rpc_url.into(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl PortfolioSource for HeliusSource {
    async fn fetch_native_balance(&self, address: &str) -> Result<u64> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getBalance",
            "params": [address],
        });

        let resp: RpcResponse = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = resp.error {
            return Err(anyhow!("Solana RPC error: {}", error));
        }
        resp.result
            .map(|r| r.value)
            .ok_or_else(|| anyhow!("Solana RPC: missing 'result' field"))
    }

    async fn fetch_token_balances(&self, address: &str) -> Result<Vec<TokenBalance>> {
        let url = format!("{}/v0/addresses/{}/balances", self.api_url, address);
        let resp: BalancesResponse = self
            .client
            .get(&url)
            .query(&[("api-key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.tokens)
    }

    async fn fetch_metadata(&self, mints: &[String]) -> Result<Vec<TokenMetadata>> {
        let url = format!("{}/v0/tokens", self.api_url);
        let records = self
            .client
            .post(&url)
            .query(&[("api-key", self.api_key.as_str())])
            .json(&serde_json::json!({ "mintAccounts": mints }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn balance(mint: &str, amount: u64, decimals: u8) -> TokenBalance {
        TokenBalance {
            mint: mint.to_string(),
            amount,
            decimals,
            amount_ui: None,
            symbol: None,
        }
    }

    fn meta(mint: &str, symbol: &str) -> TokenMetadata {
        TokenMetadata {
            mint: mint.to_string(),
            symbol: Some(symbol.to_string()),
            ..TokenMetadata::default()
        }
    }

    #[test]
    fn test_merge_keeps_balance_order() {
        let entries = merge_entries(
            vec![balance("C", 1, 0), balance("A", 2, 0), balance("B", 3, 0)],
            vec![meta("B", "BBB"), meta("A", "AAA")],
        );
        let mints: Vec<&str> = entries.iter().map(|e| e.mint.as_str()).collect();
        assert_eq!(mints, ["C", "A", "B"]);
        assert!(entries[0].metadata.is_none());
        assert_eq!(entries[1].display_symbol(), "AAA");
        assert_eq!(entries[2].display_symbol(), "BBB");
    }

    #[test]
    fn test_merge_without_metadata() {
        let entries = merge_entries(vec![balance("A", 1_500_000, 6)], Vec::new());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].ui_balance, dec!(1.5));
        assert_eq!(entries[0].display_name(), "A");
    }

    #[test]
    fn test_names_fall_back_to_balance_symbol() {
        let mut held = balance("A", 1, 0);
        held.symbol = Some("ALP".to_string());
        let entries = merge_entries(
            vec![held, balance("B", 1, 0)],
            vec![TokenMetadata {
                mint: "A".to_string(),
                name: Some("Alpha".to_string()),
                ..TokenMetadata::default()
            }],
        );
        assert_eq!(entries[0].display_name(), "Alpha");
        assert_eq!(entries[0].display_symbol(), "ALP");
        assert_eq!(entries[1].display_name(), "B");

        let bare = merge_entries(
            vec![TokenBalance {
                symbol: Some("ALP".to_string()),
                ..balance("A", 1, 0)
            }],
            Vec::new(),
        );
        assert_eq!(bare[0].display_name(), "ALP");
    }

    #[test]
    fn test_empty_portfolio_is_not_complete() {
        let portfolio = Portfolio::empty("wallet");
        assert!(portfolio.entries.is_empty());
        assert_eq!(portfolio.metadata_status, MetadataStatus::Unknown);
    }

    #[test]
    fn test_ui_balance_prefers_reported_value() {
        let mut b = balance("A", 1_500_000, 6);
        b.amount_ui = Some(dec!(1.49));
        assert_eq!(b.ui_balance(), dec!(1.49));
    }

    #[test]
    fn test_supply_label() {
        let mut entry = merge_entries(vec![balance("A", 1, 0)], vec![meta("A", "AAA")]).remove(0);
        assert_eq!(entry.supply_label(), "N/A");

        let with_supply = |supply: &str| TokenMetadata {
            supply: Some(supply.to_string()),
            ..meta("A", "AAA")
        };
        entry.metadata = Some(with_supply("5000000000"));
        assert_eq!(entry.supply_label(), "1 Billion");
        entry.metadata = Some(with_supply("2500000"));
        assert_eq!(entry.supply_label(), "1 Million");
        entry.metadata = Some(with_supply("420"));
        assert_eq!(entry.supply_label(), "420");
    }

    #[test]
    fn test_balances_wire_format() {
        let body = r#"{
            "tokens": [
                {"mint": "A", "amount": 2500, "decimals": 2, "tokenAccount": "x"},
                {"mint": "B", "amount": 7, "decimals": 0, "amountUI": 7, "symbol": "BEE"}
            ],
            "nativeBalance": 10
        }"#;
        let parsed: BalancesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.tokens.len(), 2);
        assert_eq!(parsed.tokens[0].ui_balance(), dec!(25));
        assert_eq!(parsed.tokens[1].amount_ui, Some(dec!(7)));
        assert_eq!(parsed.tokens[1].symbol.as_deref(), Some("BEE"));
        assert_eq!(parsed.tokens[0].symbol, None);

        let metadata: Vec<TokenMetadata> =
            serde_json::from_str(r#"[{"mint": "A", "name": "Alpha", "logoUri": "https://x/a.png"}]"#).unwrap();
        assert_eq!(metadata[0].logo_uri.as_deref(), Some("https://x/a.png"));
        assert_eq!(metadata[0].supply, None);
    }
}
