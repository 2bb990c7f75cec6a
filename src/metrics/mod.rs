use anyhow::Result;
use log::info;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{net::SocketAddr, time::Duration};

// Metric names
const METRIC_QUOTES_COMPUTED: &str = "quotes_computed_total";
const METRIC_QUOTES_REJECTED: &str = "quotes_rejected_total";
const METRIC_PRICE_REFRESHES: &str = "price_refreshes_total";
const METRIC_PRICE_STALE: &str = "price_responses_discarded_total";
const METRIC_PRICE_FAILURES: &str = "price_fetch_failures_total";
const METRIC_LOOKUPS_RESOLVED: &str = "asset_lookups_resolved_total";
const METRIC_LOOKUPS_FAILED: &str = "asset_lookups_failed_total";
const METRIC_LOOKUPS_STALE: &str = "asset_lookups_discarded_total";
const METRIC_AGGREGATIONS: &str = "portfolio_aggregations_total";
const METRIC_AGGREGATIONS_FAILED: &str = "portfolio_aggregations_failed_total";
const METRIC_METADATA_MISSES: &str = "portfolio_metadata_misses_total";
const METRIC_AGGREGATION_TIME: &str = "portfolio_aggregation_seconds";

/// Serve the Prometheus scrape endpoint on `port`.
pub fn install_exporter(port: u16) -> Result<()> {
    let addr: SocketAddr = ([127, 0, 0, 1], port).into();
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

pub fn record_quote_computed() {
    counter!(METRIC_QUOTES_COMPUTED, 1);
}

pub fn record_quote_rejected() {
    counter!(METRIC_QUOTES_REJECTED, 1);
}

pub fn record_price_refresh(applied: bool) {
    if applied {
        counter!(METRIC_PRICE_REFRESHES, 1);
    } else {
        counter!(METRIC_PRICE_STALE, 1);
    }
}

pub fn record_price_failure() {
    counter!(METRIC_PRICE_FAILURES, 1);
}

pub fn record_lookup(resolved: bool) {
    if resolved {
        counter!(METRIC_LOOKUPS_RESOLVED, 1);
    } else {
        counter!(METRIC_LOOKUPS_FAILED, 1);
    }
}

pub fn record_lookup_discarded() {
    counter!(METRIC_LOOKUPS_STALE, 1);
}

pub fn record_aggregation(elapsed: Duration, metadata_misses: usize) {
    counter!(METRIC_AGGREGATIONS, 1);
    counter!(METRIC_METADATA_MISSES, metadata_misses as u64);
    histogram!(METRIC_AGGREGATION_TIME, elapsed.as_secs_f64());
}

pub fn record_aggregation_failed() {
    counter!(METRIC_AGGREGATIONS_FAILED, 1);
}
