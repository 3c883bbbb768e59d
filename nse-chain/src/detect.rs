use crate::{error::BlockedReason, transport::RawResponse};

/// Outcome of classifying one raw upstream response.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    /// Well-formed JSON; carries the parsed document.
    Valid(serde_json::Value),
    /// Shape consistent with anti-bot throttling: an error status, a non-JSON
    /// content type, or an unparseable body.
    Blocked(BlockedReason),
}

/// Classify a raw response as valid JSON or a blocked/invalid answer.
///
/// The rules fire in order: status, declared content type, body parse. The
/// first violation wins, so the recorded [`BlockedReason`] names the outermost
/// symptom.
pub fn classify(response: &RawResponse) -> Classified {
    if !(200..300).contains(&response.status) {
        return Classified::Blocked(BlockedReason::HttpStatus(response.status));
    }

    if !declares_json(response.content_type.as_deref()) {
        return Classified::Blocked(BlockedReason::ContentType(response.content_type.clone()));
    }

    match serde_json::from_str(&response.body) {
        Ok(document) => Classified::Valid(document),
        Err(err) => Classified::Blocked(BlockedReason::InvalidJson(err.to_string())),
    }
}

/// True when the declared content type is a JSON media type, parameters
/// (`; charset=...`) ignored.
fn declares_json(content_type: Option<&str>) -> bool {
    match content_type {
        Some(value) => {
            let mime = value.split(';').next().unwrap_or(value).trim();
            mime.ends_with("json")
        }
        None => false,
    }
}
