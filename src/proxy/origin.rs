//! Origin selection and target URI construction.
//!
//! [`resolve`] picks exactly one upstream base URL from the static
//! bindings: the single `ORIGIN_URL`, or `ORIGIN_URL_PROD` /
//! `ORIGIN_URL_STAGING` chosen by the inbound hostname prefix.
//! [`target_uri`] appends the inbound path and query to it verbatim.

use axum::http::uri::Authority;
use axum::http::{header, HeaderMap, Uri};

use crate::config::model::{Config, ORIGIN_URL, ORIGIN_URL_PROD, ORIGIN_URL_STAGING};
use crate::error::ConfigurationError;

/// Hostnames starting with this literal are served by the prod origin.
pub const PROD_HOST_PREFIX: &str = "proxy-prod";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOrigin<'a> {
    pub binding: &'static str,
    pub base_url: &'a str,
}

/// Pick the upstream for `hostname`. Both dual-origin bindings are
/// required even though only one is used per request.
pub fn resolve<'a>(
    hostname: &str,
    config: &'a Config,
) -> Result<ResolvedOrigin<'a>, ConfigurationError> {
    let bindings = &config.bindings;

    if !config.policy.dual_origin {
        return Ok(ResolvedOrigin {
            binding: ORIGIN_URL,
            base_url: bindings.require(ORIGIN_URL)?,
        });
    }

    let prod = bindings.require(ORIGIN_URL_PROD)?;
    let staging = bindings.require(ORIGIN_URL_STAGING)?;

    Ok(if hostname.starts_with(PROD_HOST_PREFIX) {
        ResolvedOrigin {
            binding: ORIGIN_URL_PROD,
            base_url: prod,
        }
    } else {
        ResolvedOrigin {
            binding: ORIGIN_URL_STAGING,
            base_url: staging,
        }
    })
}

/// `base_url + path + "?" + query`, with the `?` omitted for an empty query.
pub fn target_uri(origin: &ResolvedOrigin<'_>, inbound: &Uri) -> Result<Uri, ConfigurationError> {
    let path = inbound.path();
    let query = inbound.query().filter(|q| !q.is_empty());

    let capacity = origin.base_url.len() + path.len() + query.map_or(0, |q| q.len() + 1);
    let mut target = String::with_capacity(capacity);
    target.push_str(origin.base_url);
    target.push_str(path);
    if let Some(query) = query {
        target.push('?');
        target.push_str(query);
    }

    let invalid = |reason: String| ConfigurationError::InvalidBinding {
        name: origin.binding.to_string(),
        reason,
    };

    let uri: Uri = target.parse().map_err(|e| invalid(format!("{e}")))?;
    match uri.scheme_str() {
        Some("http" | "https") if uri.authority().is_some() => Ok(uri),
        _ => Err(invalid("expected an absolute http or https URL".into())),
    }
}

/// Hostname the caller addressed, lowercased and without port. Taken from
/// the request target when it is in absolute form, else from the `Host`
/// header.
#[must_use]
pub fn inbound_hostname(uri: &Uri, headers: &HeaderMap) -> String {
    if let Some(host) = uri.host() {
        return host.to_ascii_lowercase();
    }
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.parse::<Authority>().ok())
        .map(|a| a.host().to_ascii_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{Bindings, Policy};

    fn dual_config() -> Config {
        Config {
            policy: Policy {
                dual_origin: true,
                ..Policy::default()
            },
            bindings: [
                (ORIGIN_URL_PROD, "https://todo-prod.example.com"),
                (ORIGIN_URL_STAGING, "https://todo-stg.example.com"),
            ]
            .into_iter()
            .collect::<Bindings>(),
        }
    }

    #[test]
    fn prod_prefix_selects_prod() {
        let config = dual_config();
        for host in ["proxy-prod", "proxy-prod.example.com", "proxy-prod-eu.workers.dev"] {
            let origin = resolve(host, &config).unwrap();
            assert_eq!(origin.binding, ORIGIN_URL_PROD, "{host}");
            assert_eq!(origin.base_url, "https://todo-prod.example.com");
        }
    }

    #[test]
    fn everything_else_selects_staging() {
        let config = dual_config();
        for host in [
            "proxy-staging.example.com",
            "www.proxy-prod.example.com",
            "",
        ] {
            let origin = resolve(host, &config).unwrap();
            assert_eq!(origin.binding, ORIGIN_URL_STAGING, "{host}");
        }
    }

    #[test]
    fn single_origin_ignores_hostname() {
        let config = Config {
            policy: Policy::default(),
            bindings: [(ORIGIN_URL, "http://origin:8080")].into_iter().collect(),
        };
        assert_eq!(
            resolve("proxy-prod.example.com", &config).unwrap().base_url,
            "http://origin:8080"
        );
    }

    #[test]
    fn missing_staging_fails_even_for_prod_host() {
        let mut config = dual_config();
        config.bindings = [(ORIGIN_URL_PROD, "https://todo-prod.example.com")]
            .into_iter()
            .collect();
        assert_eq!(
            resolve("proxy-prod.example.com", &config).unwrap_err(),
            ConfigurationError::MissingBinding(ORIGIN_URL_STAGING.into())
        );
    }

    #[test]
    fn missing_single_origin_fails() {
        let config = Config::default();
        assert_eq!(
            resolve("anything", &config).unwrap_err(),
            ConfigurationError::MissingBinding(ORIGIN_URL.into())
        );
    }

    fn origin(base_url: &str) -> ResolvedOrigin<'_> {
        ResolvedOrigin {
            binding: ORIGIN_URL,
            base_url,
        }
    }

    #[test]
    fn target_keeps_path_and_query_verbatim() {
        let inbound: Uri = "/todos/42?sort=desc&x=%20y".parse().unwrap();
        let target = target_uri(&origin("https://todo.example.com"), &inbound).unwrap();
        assert_eq!(
            target.to_string(),
            "https://todo.example.com/todos/42?sort=desc&x=%20y"
        );
    }

    #[test]
    fn empty_query_is_dropped() {
        let inbound: Uri = "/todos?".parse().unwrap();
        let target = target_uri(&origin("http://origin:8080"), &inbound).unwrap();
        assert_eq!(target.to_string(), "http://origin:8080/todos");
    }

    #[test]
    fn base_path_is_prefixed() {
        let inbound: Uri = "/v1/items".parse().unwrap();
        let target = target_uri(&origin("http://origin:8080/api"), &inbound).unwrap();
        assert_eq!(target.to_string(), "http://origin:8080/api/v1/items");
    }

    #[test]
    fn relative_origin_is_a_configuration_error() {
        let inbound: Uri = "/".parse().unwrap();
        let err = target_uri(&origin("origin-without-scheme"), &inbound).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidBinding { name, .. } if name == ORIGIN_URL
        ));
    }

    #[test]
    fn hostname_from_host_header_drops_port() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "proxy-prod.example.com:8443".parse().unwrap());
        let uri: Uri = "/".parse().unwrap();
        assert_eq!(inbound_hostname(&uri, &headers), "proxy-prod.example.com");
    }

    #[test]
    fn hostname_prefers_absolute_form_target() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "ignored.example.com".parse().unwrap());
        let uri: Uri = "http://proxy-prod.example.com/path".parse().unwrap();
        assert_eq!(inbound_hostname(&uri, &headers), "proxy-prod.example.com");
    }

    #[test]
    fn hostname_is_lowercased() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "PROXY-PROD.Example.COM:8787".parse().unwrap());
        let uri: Uri = "/".parse().unwrap();
        let hostname = inbound_hostname(&uri, &headers);
        assert_eq!(hostname, "proxy-prod.example.com");
        assert_eq!(resolve(&hostname, &dual_config()).unwrap().binding, ORIGIN_URL_PROD);

        let uri: Uri = "http://Proxy-Prod.example.com/".parse().unwrap();
        assert_eq!(inbound_hostname(&uri, &HeaderMap::new()), "proxy-prod.example.com");
    }

    #[test]
    fn hostname_missing_is_empty() {
        let uri: Uri = "/".parse().unwrap();
        assert_eq!(inbound_hostname(&uri, &HeaderMap::new()), "");
    }
}
