use crate::{
    chain::{ChainPayload, OptionRow, StrikeEntry},
    error::FetchError,
};

/// Flatten per-strike entries into rows sorted ascending by strike price,
/// optionally keeping only entries whose `expiryDate` equals `expiry_filter`
/// exactly.
///
/// Off-target expiries are dropped silently, so an empty result is a valid
/// outcome of a mismatched filter label. A missing strike price is a
/// malformed-payload error instead: it signals an upstream schema change, not
/// an off-target entry.
pub fn normalize(
    payload: &ChainPayload,
    expiry_filter: Option<&str>,
) -> Result<Vec<OptionRow>, FetchError> {
    let mut rows = Vec::with_capacity(payload.records.data.len());

    for entry in &payload.records.data {
        if let Some(filter) = expiry_filter {
            if entry.expiry_date.as_deref() != Some(filter) {
                continue;
            }
        }
        rows.push(row_from_entry(entry)?);
    }

    // Stable: feed order is preserved for equal strikes.
    rows.sort_by(|a, b| a.strike.total_cmp(&b.strike));

    Ok(rows)
}

fn row_from_entry(entry: &StrikeEntry) -> Result<OptionRow, FetchError> {
    let strike = entry
        .strike_price
        .ok_or_else(|| FetchError::MalformedData("strike entry missing strikePrice".to_string()))?;

    let call = entry.call.unwrap_or_default();
    let put = entry.put.unwrap_or_default();

    Ok(OptionRow {
        strike,
        call_last_price: call.last_price,
        call_open_interest: call.open_interest,
        call_volume: call.total_traded_volume,
        put_last_price: put.last_price,
        put_open_interest: put.open_interest,
        put_volume: put.total_traded_volume,
    })
}
