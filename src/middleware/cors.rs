//! CORS negotiation stage.
//!
//! The advertised origin always comes from configuration, never from the
//! request's own `Origin` header, so one deployment allows exactly one
//! origin. Allowed headers and methods are both `*`. Every `OPTIONS`
//! request is answered here with `204` and the CORS headers only.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::config::model::{Config, CorsOnMissing};
use crate::error::{ConfigurationError, ForwardError};
use crate::server::AppState;

/// The origin value to advertise, evaluated in binding order.
///
/// With [`CorsOnMissing::FailFast`] every listed binding must be present
/// and the first one is advertised. With [`CorsOnMissing::TryNext`] the
/// first present binding wins.
pub fn allowed_origin(config: &Config) -> Result<&str, ConfigurationError> {
    let names = config.policy.cors_allow_origin_bindings();

    match config.policy.cors.on_missing {
        CorsOnMissing::FailFast => {
            let mut first = None;
            for name in &names {
                let value = config.bindings.require(name)?;
                first.get_or_insert(value);
            }
            first.ok_or_else(|| {
                ConfigurationError::MissingBinding("cors.allow_origin_bindings".into())
            })
        }
        CorsOnMissing::TryNext => names
            .iter()
            .find_map(|name| config.bindings.get(name))
            .ok_or_else(|| ConfigurationError::MissingBinding(names.join(" | "))),
    }
}

fn allowed_origin_header(config: &Config) -> Result<HeaderValue, ConfigurationError> {
    let origin = allowed_origin(config)?;
    HeaderValue::from_str(origin).map_err(|_| ConfigurationError::InvalidBinding {
        name: "cors.allow_origin_bindings".into(),
        reason: "value is not a valid header value".into(),
    })
}

fn apply_cors_headers(headers: &mut HeaderMap, allow_origin: HeaderValue) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("*"),
    );
}

pub async fn cors_stage(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.policy.cors.enabled {
        return next.run(request).await;
    }

    let allow_origin = match allowed_origin_header(&state.config) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(
                method = %request.method(),
                path = %request.uri().path(),
                error = %e,
                "CORS policy cannot be evaluated"
            );
            return ForwardError::from(e).into_response();
        }
    };

    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_cors_headers(response.headers_mut(), allow_origin);
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut(), allow_origin);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{Bindings, Policy, ORIGIN_URL, ORIGIN_URL_PROD, ORIGIN_URL_STAGING};

    fn dual(on_missing: CorsOnMissing, bindings: &[(&str, &str)]) -> Config {
        let mut policy = Policy {
            dual_origin: true,
            ..Policy::default()
        };
        policy.cors.on_missing = on_missing;
        Config {
            policy,
            bindings: bindings.iter().copied().collect::<Bindings>(),
        }
    }

    #[test]
    fn single_origin_advertises_origin_url() {
        let config = Config {
            policy: Policy::default(),
            bindings: [(ORIGIN_URL, "https://todo.example.com")].into_iter().collect(),
        };
        assert_eq!(allowed_origin(&config).unwrap(), "https://todo.example.com");
    }

    #[test]
    fn fail_fast_advertises_first_policy() {
        let config = dual(
            CorsOnMissing::FailFast,
            &[
                (ORIGIN_URL_PROD, "https://prod.example.com"),
                (ORIGIN_URL_STAGING, "https://stg.example.com"),
            ],
        );
        assert_eq!(allowed_origin(&config).unwrap(), "https://prod.example.com");
    }

    #[test]
    fn fail_fast_stops_at_first_missing_binding() {
        let config = dual(
            CorsOnMissing::FailFast,
            &[(ORIGIN_URL_STAGING, "https://stg.example.com")],
        );
        assert_eq!(
            allowed_origin(&config).unwrap_err(),
            ConfigurationError::MissingBinding(ORIGIN_URL_PROD.into())
        );
    }

    #[test]
    fn fail_fast_requires_later_bindings_too() {
        let config = dual(
            CorsOnMissing::FailFast,
            &[(ORIGIN_URL_PROD, "https://prod.example.com")],
        );
        assert_eq!(
            allowed_origin(&config).unwrap_err(),
            ConfigurationError::MissingBinding(ORIGIN_URL_STAGING.into())
        );
    }

    #[test]
    fn try_next_falls_through_to_present_binding() {
        let config = dual(
            CorsOnMissing::TryNext,
            &[(ORIGIN_URL_STAGING, "https://stg.example.com")],
        );
        assert_eq!(allowed_origin(&config).unwrap(), "https://stg.example.com");
    }

    #[test]
    fn try_next_fails_when_nothing_is_present() {
        let config = dual(CorsOnMissing::TryNext, &[]);
        assert!(matches!(
            allowed_origin(&config).unwrap_err(),
            ConfigurationError::MissingBinding(names) if names.contains(ORIGIN_URL_PROD)
        ));
    }

    #[test]
    fn cors_headers_overwrite_origin_values() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("https://elsewhere.example.com"),
        );
        apply_cors_headers(
            &mut headers,
            HeaderValue::from_static("https://todo.example.com"),
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://todo.example.com"
        );
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap(), "*");
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(), "*");
    }
}
