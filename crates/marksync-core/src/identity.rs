//! Identity resolution between record-views.

use url::Url;

use crate::error::UrlError;
use crate::record::BookmarkView;

/// Parses and normalizes a raw URL string.
///
/// The result is a fully parsed absolute URL with an `http` or `https`
/// scheme and a host. Comparing the re-serialized form (never the raw
/// input) makes trivially-equivalent spellings match: default ports,
/// percent-encoding, missing trailing slashes on the root path.
pub fn normalize_url(raw: &str) -> Result<Url, UrlError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }
    let url = Url::parse(trimmed).map_err(|error| UrlError::Parse(error.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::UnsupportedScheme(url.scheme().to_string()));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlError::MissingHost);
    }
    Ok(url)
}

/// Whether two record-views refer to the same logical entity.
///
/// True when both carry the same non-empty id, or when either side is still
/// pending and their `(owner, normalized url)` pairs are equal. A durable id
/// always wins; the correlation key only bridges the window before one is
/// assigned.
#[must_use]
pub fn matches(a: &BookmarkView, b: &BookmarkView) -> bool {
    if !a.record.id.is_empty() && a.record.id == b.record.id {
        return true;
    }
    if a.pending || b.pending {
        return match (a.correlation_key(), b.correlation_key()) {
            (Some(key_a), Some(key_b)) => key_a == key_b,
            _ => false,
        };
    }
    false
}
