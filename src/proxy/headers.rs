//! Header construction, forwarding, and hop-by-hop stripping.
//!
//! [`build_outbound_headers`] clones the inbound headers, strips
//! hop-by-hop headers (keeping the `Connection`/`Upgrade` pair for
//! upgrade requests), rewrites `Host` to the origin, overwrites
//! `X-Forwarded-Host` with the inbound hostname, and overwrites
//! `Authorization` when a static bearer token is configured.

use std::sync::LazyLock;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Uri};

use crate::config::model::BEARER_TOKEN;
use crate::error::ConfigurationError;

pub static X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

static HOP_BY_HOP: LazyLock<Vec<HeaderName>> = LazyLock::new(|| {
    [
        "connection",
        "keep-alive",
        "transfer-encoding",
        "te",
        "trailer",
        "upgrade",
        "proxy-authorization",
        "proxy-authenticate",
    ]
    .iter()
    .filter_map(|name| name.parse::<HeaderName>().ok())
    .collect()
});

/// `true` when the request asks to switch protocols (e.g. a WebSocket handshake).
#[must_use]
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    headers.contains_key(header::UPGRADE)
        && headers
            .get_all(header::CONNECTION)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
}

/// Strip hop-by-hop headers. With `keep_upgrade`, the `Connection` and
/// `Upgrade` headers survive so the handshake reaches the other side.
pub fn strip_hop_by_hop(headers: &mut HeaderMap, keep_upgrade: bool) {
    for name in HOP_BY_HOP.iter() {
        if keep_upgrade && (*name == header::CONNECTION || *name == header::UPGRADE) {
            continue;
        }
        headers.remove(name);
    }
}

pub fn build_outbound_headers(
    original: &HeaderMap,
    hostname: &str,
    target: &Uri,
    bearer_token: Option<&str>,
) -> Result<HeaderMap, ConfigurationError> {
    let mut headers = original.clone();
    strip_hop_by_hop(&mut headers, is_upgrade_request(original));

    // Rewrite Host
    if let Some(authority) = target.authority() {
        if let Ok(val) = HeaderValue::from_str(authority.as_str()) {
            headers.insert(header::HOST, val);
        }
    }

    // X-Forwarded-Host: never trust a client-supplied value
    match HeaderValue::from_str(hostname) {
        Ok(val) => {
            headers.insert(X_FORWARDED_HOST.clone(), val);
        }
        Err(_) => {
            headers.remove(&X_FORWARDED_HOST);
        }
    }

    if let Some(token) = bearer_token {
        let mut val = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            ConfigurationError::InvalidBinding {
                name: BEARER_TOKEN.to_string(),
                reason: "token contains characters not allowed in a header".into(),
            }
        })?;
        val.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, val);
    }

    Ok(headers)
}
