use anyhow::{anyhow, Result};
use colored::Colorize;
use ethers::{
    providers::{Http, Provider},
    types::Address,
};
use log::{error, info, warn};
use std::{env, str::FromStr, sync::Arc};
use tokio::task::JoinSet;

use swap_quote_core::{
    aggregate,
    metrics::install_exporter,
    utils::{group_digits, setup_logger},
    AssetSearch, CoinGeckoFeed, Erc20Reader, HeliusSource, MetadataStatus, Portfolio, PriceOracle,
    PriceUpdate, QuoteConfig, QuoteEngine, SearchOutcome, ServiceConfig, WalletSession,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    dotenv::dotenv().ok();
    let service = ServiceConfig::from_env()?;
    service.validate_all()?;
    setup_logger(service.log_level())?;

    let quote_config = QuoteConfig::from_env()?;
    quote_config.validate_all()?;

    if let Some(port) = service.metrics_port {
        install_exporter(port)?;
    }

    let mut set: JoinSet<Result<()>> = JoinSet::new();

    if let (Some(rpc_url), Ok(wallet), Ok(token)) = (
        service.evm_rpc_url.clone(),
        env::var("WALLET_ADDRESS"),
        env::var("TOKEN_ADDRESS"),
    ) {
        let service = service.clone();
        let quote_config = quote_config.clone();
        let sell_amount = env::var("SELL_AMOUNT").ok();
        set.spawn(async move {
            run_quote(&service, quote_config, &rpc_url, &wallet, &token, sell_amount).await
        });
    }

    if let (Some(rpc_url), Some(api_key), Ok(wallet)) = (
        service.solana_rpc_url.clone(),
        service.helius_api_key.clone(),
        env::var("SOLANA_WALLET_ADDRESS"),
    ) {
        let service = service.clone();
        set.spawn(async move { run_portfolio(&service, &rpc_url, &api_key, &wallet).await });
    }

    if set.is_empty() {
        warn!("Nothing to do: set EVM_RPC_URL, WALLET_ADDRESS and TOKEN_ADDRESS for a quote, or SOLANA_RPC_URL, HELIUS_API_KEY and SOLANA_WALLET_ADDRESS for a portfolio");
        return Ok(());
    }

    while let Some(res) = set.join_next().await {
        match res {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => error!("{}", e),
            Err(e) => error!("Task error: {}", e),
        }
    }

    Ok(())
}

async fn run_quote(
    service: &ServiceConfig,
    quote_config: QuoteConfig,
    rpc_url: &str,
    wallet: &str,
    token: &str,
    sell_amount: Option<String>,
) -> Result<()> {
    let provider = Arc::new(Provider::<Http>::try_from(rpc_url)?);
    let address = Address::from_str(wallet)?;
    let session = WalletSession::connect(provider.as_ref(), address).await?;
    let chain = session.chain();

    let oracle = PriceOracle::new(CoinGeckoFeed::new(
        service.price_api_url.clone(),
        service.request_timeout,
    )?);
    let search = AssetSearch::new(Arc::new(Erc20Reader::new(provider.clone())));

    let (price_update, outcome) = tokio::join!(
        oracle.refresh(session.chain_id),
        search.search(token, session.address)
    );
    if price_update == PriceUpdate::Unsupported {
        warn!("No price feed for chain {}; quotes will be zero", session.chain_id);
    }

    let asset = match outcome {
        SearchOutcome::Resolved(asset) => asset,
        SearchOutcome::Failed(e) => return Err(e.into()),
        SearchOutcome::Stale => return Err(anyhow!("token search superseded")),
    };

    let mut engine = QuoteEngine::new(quote_config);
    engine.set_asset(&asset);
    engine.set_native_price(oracle.current().await);
    engine.set_native_balance(session.native_balance);

    match sell_amount {
        Some(raw) => engine.apply_input(&raw)?,
        None => engine.apply_max()?,
    };

    let quote = engine.quote();
    println!(
        "{} | {} {}",
        session.short_address(),
        session.native_balance.round_dp(4),
        chain.native_symbol()
    );
    println!(
        "From: {} {} (balance {})",
        engine.display_input(),
        asset.symbol,
        group_digits(&asset.holder_balance.normalize().to_string())
    );
    println!("To: {:.4} USDT", quote.receive_fiat_display());
    let gas_line = format!(
        "Gas Fee ({}%): {:.6} {}",
        (engine.config().gas_percent * rust_decimal::Decimal::ONE_HUNDRED).normalize(),
        quote.gas_fee_native_display(),
        chain.native_symbol()
    );
    if quote.gas_sufficient {
        println!("{}", gas_line);
    } else {
        println!("{}", format!("{} (insufficient)", gas_line).red());
    }

    match engine.confirm(&asset.symbol, chain.native_symbol()) {
        Ok(summary) => {
            info!("Quote confirmed for {} {}", summary.amount, summary.symbol);
            println!("{}", summary.to_string().green());
        }
        Err(e) => warn!("{}", e),
    }

    Ok(())
}

async fn run_portfolio(
    service: &ServiceConfig,
    rpc_url: &str,
    api_key: &str,
    wallet: &str,
) -> Result<()> {
    let source = HeliusSource::new(
        rpc_url,
        service.helius_api_url.clone(),
        api_key,
        service.request_timeout,
    )?;

    let portfolio = match aggregate(&source, wallet).await {
        Ok(portfolio) => portfolio,
        Err(e) => {
            error!("{}", e);
            Portfolio::empty(wallet)
        }
    };

    println!("{}: {:.2} SOL", wallet, portfolio.native_balance);
    for entry in &portfolio.entries {
        println!(
            "{:<24} {:<10} supply {:<12} balance {}",
            entry.display_name(),
            entry.display_symbol(),
            entry.supply_label(),
            entry.ui_balance
        );
    }
    match &portfolio.metadata_status {
        MetadataStatus::Complete | MetadataStatus::Unknown => {}
        MetadataStatus::Partial { missing } => warn!("{} tokens have no metadata", missing),
        MetadataStatus::Unavailable { reason } => warn!("Token metadata unavailable: {}", reason),
    }

    Ok(())
}
