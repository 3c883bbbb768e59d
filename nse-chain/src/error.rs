use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All errors generated on the `nse-chain` fetch path.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum FetchError {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("upstream blocked the request: {0}")]
    Blocked(BlockedReason),

    #[error("malformed chain payload: {0}")]
    MalformedData(String),
}

impl FetchError {
    /// Determine if the upstream actively throttled us, as opposed to a
    /// network fault or a schema change. Callers typically surface these as
    /// "temporarily blocked, try again later".
    pub fn is_blocked(&self) -> bool {
        matches!(self, FetchError::Blocked(_))
    }
}

/// Transport-level failures during session creation, warm-up, or a data
/// request.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("http failure: {0}")]
    Http(String),

    #[error("failed to build request url: {0}")]
    Url(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            Self::Timeout(value.to_string())
        } else {
            Self::Http(value.to_string())
        }
    }
}

/// Why the detector classified a response as blocked rather than valid.
///
/// The upstream answers throttled clients with HTML challenge pages or empty
/// bodies, not a structured error, so no declared error code can be trusted:
/// classification looks at the response shape instead.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Display)]
pub enum BlockedReason {
    #[display("http status {_0}")]
    HttpStatus(u16),

    #[display("content type {_0:?} is not json")]
    ContentType(Option<String>),

    #[display("body is not valid json: {_0}")]
    InvalidJson(String),
}
