//! Key-value-pair request encoding shared by every OGC operation.

use std::collections::BTreeMap;

use reqwest::Url;
use wms_common::{WmsError, WmsResult};

/// Append `params` to `base_url` as a form-encoded query string.
///
/// Parameters already present on the base URL are kept; a trailing `?` is
/// accepted, as servers commonly advertise endpoints that way.
pub fn build_url(base_url: &str, params: &[(&str, String)]) -> WmsResult<Url> {
    let mut url = Url::parse(base_url).map_err(|e| WmsError::InvalidParameter {
        param: "baseUrl".to_string(),
        message: format!("'{}': {}", base_url, e),
    })?;
    url.query_pairs_mut()
        .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
    Ok(url)
}

/// Decode the query string of `url` into a flat, key-ordered map.
///
/// Repeated keys keep their last value.
pub fn query_params(url: &str) -> WmsResult<BTreeMap<String, String>> {
    let parsed = Url::parse(url).map_err(|e| WmsError::InvalidParameter {
        param: "url".to_string(),
        message: format!("'{}': {}", url, e),
    })?;
    Ok(parsed.query_pairs().into_owned().collect())
}
