use futures::future::join_all;
use nse_chain::{ChainCache, ChainConfig, FetchKey};
use std::sync::Arc;
use tokio::time::interval;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    init_logging();

    let config = ChainConfig::from_env();
    info!(
        symbol = %config.symbol,
        expiries = ?config.expiries,
        ttl_secs = config.ttl.as_secs(),
        refresh_secs = config.refresh_interval.as_secs(),
        "starting option-chain monitor"
    );

    let cache = Arc::new(ChainCache::from_config(&config));
    let keys: Vec<FetchKey> = config
        .expiries
        .iter()
        .map(|expiry| FetchKey::new(config.symbol.clone(), expiry.clone()))
        .collect();

    let mut timer = interval(config.refresh_interval);
    loop {
        timer.tick().await;

        // Expiries refresh concurrently; one failing leaves the others alone.
        let refreshes = keys.iter().map(|key| {
            let cache = Arc::clone(&cache);
            async move { (key, cache.get_or_fetch(key).await) }
        });

        for (key, result) in join_all(refreshes).await {
            match result {
                Ok(snapshot) => info!(
                    %key,
                    spot = snapshot.spot,
                    pcr_oi = snapshot.pcr_open_interest,
                    pcr_volume = snapshot.pcr_volume,
                    rows = snapshot.rows.len(),
                    "chain snapshot"
                ),
                Err(err) if err.is_blocked() => {
                    warn!(%key, %err, "upstream temporarily blocked, retrying next cycle")
                }
                Err(err) => error!(%key, %err, "chain refresh failed"),
            }
        }
    }
}

/// Initialize logging
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
