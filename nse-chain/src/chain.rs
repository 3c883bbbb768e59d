use chrono::{DateTime, Utc};
use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Identity of one unit of cached work: (underlying symbol, expiry label).
///
/// The expiry label is matched byte-for-byte against the feed's `expiryDate`
/// field. No date parsing or normalisation happens anywhere, so a label in an
/// unexpected format selects zero rows rather than failing.
#[derive(
    Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Constructor, Display,
)]
#[display("{symbol}|{expiry}")]
pub struct FetchKey {
    pub symbol: SmolStr,
    pub expiry: SmolStr,
}

impl<S, E> From<(S, E)> for FetchKey
where
    S: Into<SmolStr>,
    E: Into<SmolStr>,
{
    fn from((symbol, expiry): (S, E)) -> Self {
        Self {
            symbol: symbol.into(),
            expiry: expiry.into(),
        }
    }
}

/// Decoded option-chain document, as served by the upstream API.
///
/// Field names mirror the wire format. Everything below the envelope is
/// optional because per-strike entries routinely omit whole sub-records; only
/// the envelope itself is required.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChainPayload {
    pub records: ChainRecords,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChainRecords {
    /// Spot price of the underlying.
    #[serde(rename = "underlyingValue")]
    pub underlying_value: f64,

    /// Per-strike entries, one per (strike, expiry) the feed reports.
    #[serde(default)]
    pub data: Vec<StrikeEntry>,
}

/// One per-strike record: an optional call (`CE`) and put (`PE`) side.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StrikeEntry {
    #[serde(rename = "strikePrice", default)]
    pub strike_price: Option<f64>,

    #[serde(rename = "expiryDate", default)]
    pub expiry_date: Option<SmolStr>,

    #[serde(rename = "CE", default)]
    pub call: Option<SideQuote>,

    #[serde(rename = "PE", default)]
    pub put: Option<SideQuote>,
}

/// Quote fields for a single side of one strike.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct SideQuote {
    #[serde(rename = "openInterest", default)]
    pub open_interest: Option<f64>,

    #[serde(rename = "totalTradedVolume", default)]
    pub total_traded_volume: Option<f64>,

    #[serde(rename = "lastPrice", default)]
    pub last_price: Option<f64>,
}

/// One normalised strike of the chain.
///
/// `None` means the feed omitted the field; it is displayed as null downstream
/// and counted as zero by aggregation only.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct OptionRow {
    /// Exercise price identifying the row; the chain's sort key.
    pub strike: f64,
    pub call_last_price: Option<f64>,
    pub call_open_interest: Option<f64>,
    pub call_volume: Option<f64>,
    pub put_last_price: Option<f64>,
    pub put_open_interest: Option<f64>,
    pub put_volume: Option<f64>,
}

/// Composed result for one (symbol, expiry), handed to the presentation
/// collaborator: spot price, both put/call ratios, and the strike rows sorted
/// ascending.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChainSnapshot {
    pub spot: f64,
    pub pcr_open_interest: f64,
    pub pcr_volume: f64,
    pub rows: Vec<OptionRow>,
    /// When the upstream fetch backing this snapshot completed.
    pub time_fetched: DateTime<Utc>,
}
