use crate::{
    aggregate::put_call_ratios,
    chain::{ChainSnapshot, FetchKey},
    config::ChainConfig,
    error::FetchError,
    fetch::ChainFetcher,
    normalize::normalize,
    transport::{HttpTransport, Transport},
};
use chrono::Utc;
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, info};

/// TTL-scoped memoization of composed fetch results, keyed by
/// (symbol, expiry).
///
/// Each key owns an async slot lock that is held across the upstream round
/// trip, so concurrent misses on one key collapse into a single fetch whose
/// result every waiter shares. Distinct keys refresh independently, and a
/// failed refresh leaves any previous entry in place for the next attempt.
/// Entries live for the process lifetime.
pub struct ChainCache<T: Transport> {
    fetcher: ChainFetcher<T>,
    ttl: Duration,
    slots: Mutex<HashMap<FetchKey, Arc<tokio::sync::Mutex<Slot>>>>,
}

#[derive(Default)]
struct Slot {
    value: Option<Cached>,
}

struct Cached {
    snapshot: ChainSnapshot,
    fetched: Instant,
}

impl ChainCache<HttpTransport> {
    /// Build a cache backed by the production browser-mimicking transport.
    pub fn from_config(config: &ChainConfig) -> Self {
        Self::new(Arc::new(HttpTransport::new(config)), config.ttl)
    }
}

impl<T: Transport> ChainCache<T> {
    pub fn new(transport: Arc<T>, ttl: Duration) -> Self {
        Self {
            fetcher: ChainFetcher::new(transport),
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached snapshot for `key` if it is younger than the TTL,
    /// otherwise run one fetch → normalize → aggregate pass and store the
    /// result.
    pub async fn get_or_fetch(&self, key: &FetchKey) -> Result<ChainSnapshot, FetchError> {
        let slot = self.slot(key);
        let mut slot = slot.lock().await;

        if let Some(cached) = &slot.value {
            if cached.fetched.elapsed() < self.ttl {
                debug!(%key, age = ?cached.fetched.elapsed(), "cache hit");
                return Ok(cached.snapshot.clone());
            }
        }

        let snapshot = self.refresh(key).await?;
        slot.value = Some(Cached {
            snapshot: snapshot.clone(),
            fetched: Instant::now(),
        });

        Ok(snapshot)
    }

    async fn refresh(&self, key: &FetchKey) -> Result<ChainSnapshot, FetchError> {
        let payload = self.fetcher.fetch(key).await?;
        let rows = normalize(&payload, Some(key.expiry.as_str()))?;
        let ratios = put_call_ratios(&rows);

        info!(
            %key,
            spot = payload.records.underlying_value,
            rows = rows.len(),
            pcr_oi = ratios.open_interest,
            pcr_volume = ratios.volume,
            "chain refreshed"
        );

        Ok(ChainSnapshot {
            spot: payload.records.underlying_value,
            pcr_open_interest: ratios.open_interest,
            pcr_volume: ratios.volume,
            rows,
            time_fetched: Utc::now(),
        })
    }

    fn slot(&self, key: &FetchKey) -> Arc<tokio::sync::Mutex<Slot>> {
        Arc::clone(self.slots.lock().entry(key.clone()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::TransportError,
        transport::mock::{MockTransport, json_response, sample_chain_body},
    };

    fn key() -> FetchKey {
        FetchKey::from(("NIFTY", "16-Dec-2025"))
    }

    fn valid_reply() -> Result<crate::transport::RawResponse, TransportError> {
        Ok(json_response(sample_chain_body()))
    }

    #[tokio::test]
    async fn test_second_call_inside_ttl_is_served_from_cache() {
        let transport = Arc::new(MockTransport::new(vec![valid_reply()]));
        let cache = ChainCache::new(Arc::clone(&transport), Duration::from_secs(30));

        let first = cache.get_or_fetch(&key()).await.unwrap();
        let second = cache.get_or_fetch(&key()).await.unwrap();

        assert_eq!(transport.requests(), 1);
        assert_eq!(first, second);
        assert_eq!(first.spot, 19500.0);
        assert!((first.pcr_open_interest - 0.5).abs() < 1e-9);
        assert!((first.pcr_volume - 0.5).abs() < 1e-9);
        assert_eq!(first.rows.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_refetches() {
        let transport = Arc::new(MockTransport::new(vec![valid_reply(), valid_reply()]));
        let cache = ChainCache::new(Arc::clone(&transport), Duration::ZERO);

        cache.get_or_fetch(&key()).await.unwrap();
        cache.get_or_fetch(&key()).await.unwrap();

        assert_eq!(transport.requests(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_does_not_poison_later_attempts() {
        let transport = Arc::new(MockTransport::new(vec![
            valid_reply(),
            Err(TransportError::Http("connection reset".to_string())),
            valid_reply(),
        ]));
        let cache = ChainCache::new(Arc::clone(&transport), Duration::ZERO);

        assert!(cache.get_or_fetch(&key()).await.is_ok());
        let error = cache.get_or_fetch(&key()).await.unwrap_err();
        assert!(matches!(error, FetchError::Transport(_)));

        // Next scheduled call retries from scratch and succeeds.
        assert!(cache.get_or_fetch(&key()).await.is_ok());
        assert_eq!(transport.requests(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_misses_collapse_into_one_fetch() {
        let transport = Arc::new(
            MockTransport::new(vec![valid_reply()])
                .with_request_delay(Duration::from_millis(50)),
        );
        let cache = ChainCache::new(Arc::clone(&transport), Duration::from_secs(30));

        let target = key();
        let (first, second) =
            tokio::join!(cache.get_or_fetch(&target), cache.get_or_fetch(&target));

        assert_eq!(transport.requests(), 1);
        assert_eq!(first.unwrap(), second.unwrap());
    }

    #[tokio::test]
    async fn test_failure_on_one_key_leaves_other_keys_alone() {
        let transport = Arc::new(MockTransport::new(vec![
            valid_reply(),
            Err(TransportError::Http("connection reset".to_string())),
        ]));
        let cache = ChainCache::new(Arc::clone(&transport), Duration::from_secs(30));

        let near = key();
        let far = FetchKey::from(("NIFTY", "30-Dec-2025"));

        let snapshot = cache.get_or_fetch(&near).await.unwrap();
        assert!(cache.get_or_fetch(&far).await.is_err());

        // The healthy key is still served from cache, untouched.
        assert_eq!(cache.get_or_fetch(&near).await.unwrap(), snapshot);
        assert_eq!(transport.requests(), 2);
    }

    #[tokio::test]
    async fn test_off_target_expiry_yields_empty_snapshot_not_error() {
        let transport = Arc::new(MockTransport::new(vec![valid_reply()]));
        let cache = ChainCache::new(Arc::clone(&transport), Duration::from_secs(30));

        let snapshot = cache
            .get_or_fetch(&FetchKey::from(("NIFTY", "30-Dec-2025")))
            .await
            .unwrap();

        assert!(snapshot.rows.is_empty());
        assert_eq!(snapshot.pcr_open_interest, 0.0);
        assert_eq!(snapshot.pcr_volume, 0.0);
        assert_eq!(snapshot.spot, 19500.0);
    }
}
