//! Sell-quote and wallet portfolio core.
//!
//! Quote math is pure (`quote`); price, token and portfolio reads are async
//! and sit behind traits so they can be swapped out in tests.

pub mod asset;
pub mod config;
pub mod error;
pub mod metrics;
pub mod oracle;
pub mod portfolio;
pub mod quote;
pub mod requests;
pub mod session;
pub mod utils;

pub use asset::{resolve, AssetRef, AssetSearch, Erc20Reader, SearchOutcome, TokenReader};
pub use config::{QuoteConfig, ServiceConfig};
pub use error::{AmountOutOfRange, FetchStage, LookupError, LookupFailure, PortfolioError, QuoteError};
pub use oracle::{CoinGeckoFeed, PriceFeed, PriceOracle, PriceUpdate};
pub use portfolio::{
    aggregate, merge_entries, HeliusSource, MetadataStatus, Portfolio, PortfolioEntry,
    PortfolioSource, TokenBalance, TokenMetadata,
};
pub use quote::{
    clamp_to_max, compute_quote, meets_minimum, NativePrice, QuoteEngine, SellQuote, SellSummary,
};
pub use requests::{RequestToken, RequestTracker};
pub use session::{Chain, WalletSession};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
