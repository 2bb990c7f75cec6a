use anyhow::{anyhow, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::{collections::HashMap, time::Duration};

use crate::metrics;
use crate::quote::NativePrice;
use crate::requests::RequestTracker;
use crate::session::Chain;

/// Source of fiat prices keyed by the feed's asset id.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// USD price of `asset_id`; `Ok(None)` when the feed has no quote for it.
    async fn fetch_usd_price(&self, asset_id: &str) -> Result<Option<Decimal>>;
}

/// CoinGecko-compatible `simple/price` endpoint.
pub struct CoinGeckoFeed {
    client: reqwest::Client,
    base_url: String,
}

impl CoinGeckoFeed {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PriceFeed for CoinGeckoFeed {
    async fn fetch_usd_price(&self, asset_id: &str) -> Result<Option<Decimal>> {
        let url = format!("{}/simple/price", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("ids", asset_id), ("vs_currencies", "usd")])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(anyhow!("price feed returned {}", resp.status()));
        }

        let body: HashMap<String, HashMap<String, Decimal>> = resp.json().await?;
        Ok(body.get(asset_id).and_then(|prices| prices.get("usd")).copied())
    }
}

/// Result of a price refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceUpdate {
    /// The response is for the current chain and was applied.
    Applied(NativePrice),
    /// The chain has no price id; price is unknown.
    Unsupported,
    /// The user switched chains while the request was in flight.
    Stale,
}

/// Native asset price for the connected chain. Refreshes are keyed by chain
/// id and only the latest one may publish.
pub struct PriceOracle<F> {
    feed: F,
    prices: DashMap<u64, Decimal>,
    tracker: RequestTracker<u64>,
}

impl<F: PriceFeed> PriceOracle<F> {
    pub fn new(feed: F) -> Self {
        Self {
            feed,
            prices: DashMap::new(),
            tracker: RequestTracker::new(),
        }
    }

    pub async fn refresh(&self, chain_id: u64) -> PriceUpdate {
        let token = self.tracker.begin(chain_id).await;

        let asset_id = match Chain::from(chain_id).price_asset_id() {
            Some(id) => id,
            None => {
                debug!("No price asset for chain {}", chain_id);
                return PriceUpdate::Unsupported;
            }
        };

        let fetched = self.feed.fetch_usd_price(asset_id).await;

        if !self.tracker.is_current(&token).await {
            debug!("Discarding {} price for chain {}: chain changed", asset_id, chain_id);
            metrics::record_price_refresh(false);
            return PriceUpdate::Stale;
        }
        metrics::record_price_refresh(true);

        let price = match fetched {
            Ok(Some(price)) if price > Decimal::ZERO => Some(price),
            Ok(_) => None,
            Err(e) => {
                warn!("Failed to fetch {} price: {}", asset_id, e);
                metrics::record_price_failure();
                None
            }
        };

        match price {
            Some(price) => {
                info!("{} price: {} USD", Chain::from(chain_id).native_symbol(), price);
                self.prices.insert(chain_id, price);
            }
            None => {
                self.prices.remove(&chain_id);
            }
        }

        PriceUpdate::Applied(price)
    }

    /// Price for the chain of the latest refresh. Unknown until one completes.
    pub async fn current(&self) -> NativePrice {
        let chain_id = self.tracker.current_target().await?;
        self.prices.get(&chain_id).map(|price| *price)
    }

    pub fn cached(&self, chain_id: u64) -> NativePrice {
        self.prices.get(&chain_id).map(|price| *price)
    }
}
