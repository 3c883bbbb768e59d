use crate::{
    chain::{ChainPayload, FetchKey},
    detect::{Classified, classify},
    error::FetchError,
    session::SessionManager,
    transport::Transport,
};
use std::sync::Arc;
use tracing::warn;

/// Fetches one raw option-chain document, absorbing at most one blocked
/// response per call by rebuilding the session and reissuing the request.
///
/// The assumption behind the single retry: blocking is usually cookie/session
/// staleness, which a fresh warm-up cures. A second blocked response means the
/// upstream is actively throttling and hammering it would make things worse.
pub struct ChainFetcher<T: Transport> {
    sessions: SessionManager<T>,
}

impl<T: Transport> ChainFetcher<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            sessions: SessionManager::new(transport),
        }
    }

    /// Fetch and decode the chain document for `key`.
    ///
    /// Exactly one recovery cycle per call, triggered only by a `Blocked`
    /// classification: invalidate the observed session, warm a fresh one,
    /// reissue once. Transport failures surface immediately at either attempt.
    pub async fn fetch(&self, key: &FetchKey) -> Result<ChainPayload, FetchError> {
        let session = self.sessions.acquire().await?;
        let raw = self
            .sessions
            .transport()
            .request(session.session(), key)
            .await?;

        let reason = match classify(&raw) {
            Classified::Valid(document) => return decode(document),
            Classified::Blocked(reason) => reason,
        };

        warn!(%key, %reason, "blocked response, rebuilding session for one retry");
        self.sessions.invalidate(&session).await;

        let session = self.sessions.acquire().await?;
        let raw = self
            .sessions
            .transport()
            .request(session.session(), key)
            .await?;

        match classify(&raw) {
            Classified::Valid(document) => decode(document),
            Classified::Blocked(reason) => {
                warn!(%key, %reason, "still blocked after session rebuild");
                Err(FetchError::Blocked(reason))
            }
        }
    }
}

/// Decode a known-valid JSON document into the typed chain envelope.
///
/// A failure here is an upstream schema change, not throttling, so it is
/// surfaced as [`FetchError::MalformedData`] and never triggers recovery.
fn decode(document: serde_json::Value) -> Result<ChainPayload, FetchError> {
    serde_json::from_value(document).map_err(|err| FetchError::MalformedData(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{BlockedReason, TransportError},
        transport::mock::{MockTransport, html_challenge, json_response, sample_chain_body},
    };

    fn key() -> FetchKey {
        FetchKey::from(("NIFTY", "16-Dec-2025"))
    }

    #[tokio::test]
    async fn test_valid_first_response_needs_one_request() {
        let transport = Arc::new(MockTransport::new(vec![Ok(json_response(
            sample_chain_body(),
        ))]));
        let fetcher = ChainFetcher::new(Arc::clone(&transport));

        let payload = fetcher.fetch(&key()).await.unwrap();

        assert_eq!(payload.records.underlying_value, 19500.0);
        assert_eq!(transport.requests(), 1);
        assert_eq!(transport.connects(), 1);
    }

    #[tokio::test]
    async fn test_blocked_then_valid_recovers_with_one_rebuild() {
        let transport = Arc::new(MockTransport::new(vec![
            Ok(html_challenge()),
            Ok(json_response(sample_chain_body())),
        ]));
        let fetcher = ChainFetcher::new(Arc::clone(&transport));

        let payload = fetcher.fetch(&key()).await.unwrap();

        // Second response's payload, after exactly two data requests and one
        // extra session acquisition.
        assert_eq!(payload.records.underlying_value, 19500.0);
        assert_eq!(transport.requests(), 2);
        assert_eq!(transport.connects(), 2);
    }

    #[tokio::test]
    async fn test_blocked_twice_is_terminal_after_two_requests() {
        let transport = Arc::new(MockTransport::new(vec![
            Ok(html_challenge()),
            Ok(html_challenge()),
            Ok(json_response(sample_chain_body())),
        ]));
        let fetcher = ChainFetcher::new(Arc::clone(&transport));

        let error = fetcher.fetch(&key()).await.unwrap_err();

        assert_eq!(
            error,
            FetchError::Blocked(BlockedReason::ContentType(Some("text/html".to_string())))
        );
        // The queued third (valid) reply is never requested.
        assert_eq!(transport.requests(), 2);
        assert_eq!(transport.connects(), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_retried() {
        let transport = Arc::new(MockTransport::new(vec![Err(TransportError::Timeout(
            "deadline elapsed".to_string(),
        ))]));
        let fetcher = ChainFetcher::new(Arc::clone(&transport));

        let error = fetcher.fetch(&key()).await.unwrap_err();

        assert!(matches!(error, FetchError::Transport(_)));
        assert_eq!(transport.requests(), 1);
        assert_eq!(transport.connects(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_during_recovery_surfaces() {
        let transport = Arc::new(MockTransport::new(vec![
            Ok(html_challenge()),
            Err(TransportError::Http("connection reset".to_string())),
        ]));
        let fetcher = ChainFetcher::new(Arc::clone(&transport));

        let error = fetcher.fetch(&key()).await.unwrap_err();

        assert!(matches!(error, FetchError::Transport(_)));
        assert_eq!(transport.requests(), 2);
    }

    #[tokio::test]
    async fn test_valid_json_with_wrong_schema_is_malformed() {
        let transport = Arc::new(MockTransport::new(vec![Ok(json_response(
            r#"{"filtered": {"data": []}}"#,
        ))]));
        let fetcher = ChainFetcher::new(Arc::clone(&transport));

        let error = fetcher.fetch(&key()).await.unwrap_err();

        assert!(matches!(error, FetchError::MalformedData(_)));
        // Schema changes do not trigger the recovery cycle.
        assert_eq!(transport.requests(), 1);
        assert_eq!(transport.connects(), 1);
    }
}
