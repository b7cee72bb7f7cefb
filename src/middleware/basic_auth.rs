//! Static HTTP Basic auth gate.
//!
//! When `policy.basic_auth` is on, every request must carry
//! `Authorization: Basic` credentials equal to the `username` and
//! `password` bindings. Anything else is answered with `401` before the
//! forwarder runs. The credential pair is deployment-scoped; there is no
//! user directory and the origin is never consulted.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use subtle::{Choice, ConstantTimeEq};

use crate::config::model::{BASIC_AUTH_PASSWORD, BASIC_AUTH_USERNAME};
use crate::error::ForwardError;
use crate::server::AppState;

/// Decode an `Authorization` value of the form `Basic <base64(user:pass)>`.
/// The scheme keyword is case-insensitive (RFC 7617).
#[must_use]
pub fn parse_basic_credentials(value: &HeaderValue) -> Option<(String, String)> {
    let value = value.to_str().ok()?.trim();
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

fn credential_eq(given: &str, expected: &str) -> Choice {
    given.as_bytes().ct_eq(expected.as_bytes())
}

/// Both fields are always compared, and the results are combined without
/// short-circuiting.
#[must_use]
pub fn credentials_match(given: (&str, &str), expected: (&str, &str)) -> bool {
    (credential_eq(given.0, expected.0) & credential_eq(given.1, expected.1)).into()
}

pub async fn basic_auth_stage(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let config = &state.config;
    if !config.policy.basic_auth {
        return next.run(request).await;
    }

    let expected = config
        .bindings
        .require(BASIC_AUTH_USERNAME)
        .and_then(|user| Ok((user, config.bindings.require(BASIC_AUTH_PASSWORD)?)));
    let (expected_user, expected_pass) = match expected {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(error = %e, "basic-auth gate enabled without credentials");
            return ForwardError::from(e).into_response();
        }
    };

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(parse_basic_credentials)
        .is_some_and(|(user, pass)| {
            credentials_match((&user, &pass), (expected_user, expected_pass))
        });

    if authorized {
        next.run(request).await
    } else {
        tracing::debug!(
            method = %request.method(),
            path = %request.uri().path(),
            "request rejected by basic-auth gate"
        );
        ForwardError::Authentication.into_response()
    }
}
