use smol_str::SmolStr;
use std::time::Duration;
use url::Url;

/// Site root used for the cookie warm-up handshake and as the base of every
/// data request.
pub const DEFAULT_BASE_URL: &str = "https://www.nseindia.com";

/// API variant path segment under `/api/`.
pub const DEFAULT_ENDPOINT_VARIANT: &str = "option-chain-v3";

pub const DEFAULT_SYMBOL: &str = "NIFTY";
pub const DEFAULT_EXPIRY: &str = "16-Dec-2025";

/// How long a composed snapshot stays fresh before the next call re-fetches.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Per-request deadline on every network call, warm-up included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Cadence of the periodic driver loop.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Runtime configuration: the single underlying, the expiry labels to fan out
/// over, and the cache/transport timing knobs.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub base_url: Url,
    pub endpoint_variant: String,
    pub symbol: SmolStr,
    /// Exact-match expiry labels, e.g. `16-Dec-2025`.
    pub expiries: Vec<SmolStr>,
    pub ttl: Duration,
    pub request_timeout: Duration,
    pub refresh_interval: Duration,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            endpoint_variant: DEFAULT_ENDPOINT_VARIANT.to_string(),
            symbol: SmolStr::new_static(DEFAULT_SYMBOL),
            expiries: vec![SmolStr::new_static(DEFAULT_EXPIRY)],
            ttl: DEFAULT_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

impl ChainConfig {
    /// Load configuration from `CHAIN_*` environment variables, falling back
    /// to the defaults above for anything unset or unparseable.
    ///
    /// `CHAIN_EXPIRIES` is a comma-separated list of exact expiry labels.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = std::env::var("CHAIN_BASE_URL")
            .ok()
            .and_then(|raw| Url::parse(&raw).ok())
            .unwrap_or(defaults.base_url);

        let endpoint_variant =
            std::env::var("CHAIN_ENDPOINT_VARIANT").unwrap_or(defaults.endpoint_variant);

        let symbol = std::env::var("CHAIN_SYMBOL")
            .map(SmolStr::from)
            .unwrap_or(defaults.symbol);

        let expiries = std::env::var("CHAIN_EXPIRIES")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|label| !label.is_empty())
                    .map(SmolStr::from)
                    .collect::<Vec<_>>()
            })
            .filter(|labels| !labels.is_empty())
            .unwrap_or(defaults.expiries);

        let ttl = env_secs("CHAIN_TTL_SECS").unwrap_or(defaults.ttl);
        let request_timeout = env_secs("CHAIN_TIMEOUT_SECS").unwrap_or(defaults.request_timeout);
        let refresh_interval = env_secs("CHAIN_REFRESH_SECS").unwrap_or(defaults.refresh_interval);

        Self {
            base_url,
            endpoint_variant,
            symbol,
            expiries,
            ttl,
            request_timeout,
            refresh_interval,
        }
    }
}

fn env_secs(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .map(Duration::from_secs)
}
