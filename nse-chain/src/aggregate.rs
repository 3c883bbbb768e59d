use crate::chain::OptionRow;

/// Put/call ratios derived from one set of chain rows, each rounded to two
/// decimals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PutCallRatios {
    pub open_interest: f64,
    pub volume: f64,
}

/// Sum open interest and traded volume per side and derive the put/call
/// ratios.
///
/// Absent fields count as zero for the sums only; the row keeps its nulls for
/// display. A zero call-side denominator yields a `0.0` ratio by policy: zero
/// open interest is a legitimate state for a freshly listed expiry, not an
/// error.
pub fn put_call_ratios(rows: &[OptionRow]) -> PutCallRatios {
    let mut call_oi = 0.0;
    let mut call_volume = 0.0;
    let mut put_oi = 0.0;
    let mut put_volume = 0.0;

    for row in rows {
        call_oi += row.call_open_interest.unwrap_or(0.0);
        call_volume += row.call_volume.unwrap_or(0.0);
        put_oi += row.put_open_interest.unwrap_or(0.0);
        put_volume += row.put_volume.unwrap_or(0.0);
    }

    PutCallRatios {
        open_interest: ratio(put_oi, call_oi),
        volume: ratio(put_volume, call_volume),
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        round2(numerator / denominator)
    }
}

/// Round half away from zero to two decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
