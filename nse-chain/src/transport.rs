use crate::{chain::FetchKey, config::ChainConfig, error::TransportError};
use async_trait::async_trait;
use reqwest::{
    Client,
    header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderValue, REFERER, USER_AGENT},
};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Browser identity presented on every request. The upstream rejects clients
/// that do not look like a common desktop browser, so the value is reproduced
/// verbatim rather than derived from the crate version.
pub const CHAIN_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36";

/// Cookie settle delay between the warm-up request and the first data request.
pub const WARM_UP_SETTLE: Duration = Duration::from_secs(1);

/// Raw upstream response, captured before any interpretation so the detector
/// can classify it from shape alone.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// Upstream I/O seam: builds warmed sessions and issues data requests.
///
/// Two domain-specific operations, not a general HTTP abstraction. The seam
/// exists so the retry and caching layers can be exercised against a scripted
/// transport.
#[async_trait]
pub trait Transport: Send + Sync {
    type Session: Send + Sync;

    /// Build a fresh session, cookie warm-up handshake included.
    async fn connect(&self) -> Result<Self::Session, TransportError>;

    /// Issue one option-chain data request with the given session.
    async fn request(
        &self,
        session: &Self::Session,
        key: &FetchKey,
    ) -> Result<RawResponse, TransportError>;
}

/// Live warmed session: a cookie-carrying client reused across polls until a
/// detected block forces a rebuild.
#[derive(Debug, Clone)]
pub struct HttpSession {
    client: Client,
}

/// Production [`Transport`] backed by `reqwest`, presenting the browser
/// header set with a cookie jar.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: Url,
    endpoint_variant: String,
    request_timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &ChainConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            endpoint_variant: config.endpoint_variant.clone(),
            request_timeout: config.request_timeout,
        }
    }

    fn default_headers(&self) -> Result<HeaderMap, TransportError> {
        let referer = self
            .base_url
            .join("option-chain")
            .map_err(|err| TransportError::Url(err.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CHAIN_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(
            REFERER,
            HeaderValue::from_str(referer.as_str())
                .map_err(|err| TransportError::Url(err.to_string()))?,
        );
        Ok(headers)
    }

    fn data_url(&self, key: &FetchKey) -> Result<Url, TransportError> {
        let mut url = self
            .base_url
            .join(&format!("api/{}", self.endpoint_variant))
            .map_err(|err| TransportError::Url(err.to_string()))?;

        url.query_pairs_mut()
            .append_pair("type", "Indices")
            .append_pair("symbol", key.symbol.as_str())
            .append_pair("expiry", key.expiry.as_str());

        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    type Session = HttpSession;

    async fn connect(&self) -> Result<HttpSession, TransportError> {
        let client = Client::builder()
            .default_headers(self.default_headers()?)
            .cookie_store(true)
            .timeout(self.request_timeout)
            .build()?;

        // Warm cookies. The upstream promises nothing about the status here
        // and the original flow never checks it; only transport failure aborts.
        let warm_up = client.get(self.base_url.clone()).send().await?;
        debug!(status = warm_up.status().as_u16(), "warm-up handshake done");

        tokio::time::sleep(WARM_UP_SETTLE).await;

        Ok(HttpSession { client })
    }

    async fn request(
        &self,
        session: &HttpSession,
        key: &FetchKey,
    ) -> Result<RawResponse, TransportError> {
        let url = self.data_url(key)?;
        let response = session.client.get(url).send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await?;

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}
