//! Origin resolution and request forwarding.
//!
//! [`forward_handler`] is the Axum fallback at the end of the stage
//! chain. It resolves the upstream origin for the inbound hostname,
//! derives the outbound request, and relays the origin's response.
//! Bodies are moved, never collected, so uploads and downloads stream
//! in both directions. Submodules handle origin selection ([`origin`]),
//! header construction ([`headers`]), and upgraded connections
//! ([`upgrade`]).

pub mod headers;
pub mod origin;
pub mod upgrade;

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::config::model::BEARER_TOKEN;
use crate::error::ForwardError;
use crate::server::AppState;

pub async fn forward_handler(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let correlation_id = request
        .headers()
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);
    let hostname = origin::inbound_hostname(request.uri(), request.headers());
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    match forward(&state, request, &hostname, &correlation_id).await {
        Ok(response) => response,
        Err(e) => {
            match &e {
                ForwardError::Configuration(err) => tracing::error!(
                    correlation_id = %correlation_id,
                    method = %method,
                    path = %path,
                    hostname = %hostname,
                    error = %err,
                    "proxy misconfigured, refusing to forward"
                ),
                _ => tracing::warn!(
                    correlation_id = %correlation_id,
                    method = %method,
                    path = %path,
                    hostname = %hostname,
                    error = %e,
                    "forwarding failed"
                ),
            }
            e.into_response()
        }
    }
}

/// Forward one request to its origin. No retry and no fallback origin:
/// a failed attempt is the caller's failure.
pub async fn forward(
    state: &AppState,
    mut request: Request,
    hostname: &str,
    correlation_id: &str,
) -> Result<Response, ForwardError> {
    let config = &state.config;

    let origin = origin::resolve(hostname, config)?;
    let target = origin::target_uri(&origin, request.uri())?;
    let bearer_token = if config.policy.static_bearer_token {
        Some(config.bindings.require(BEARER_TOKEN)?)
    } else {
        None
    };
    let outbound_headers =
        headers::build_outbound_headers(request.headers(), hostname, &target, bearer_token)?;

    let client_upgrade =
        headers::is_upgrade_request(request.headers()).then(|| hyper::upgrade::on(&mut request));

    let (parts, body) = request.into_parts();
    tracing::info!(
        correlation_id = %correlation_id,
        method = %parts.method,
        path = %parts.uri.path(),
        hostname = %hostname,
        origin = origin.binding,
        "request received"
    );

    let mut outbound = hyper::Request::new(body);
    *outbound.method_mut() = parts.method;
    *outbound.uri_mut() = target;
    *outbound.headers_mut() = outbound_headers;

    let start = Instant::now();
    let pending = state.http_client.request(outbound);
    let result = match state.upstream_timeout {
        Some(limit) => tokio::time::timeout(limit, pending)
            .await
            .map_err(|_| ForwardError::UpstreamTimeout(limit))?,
        None => pending.await,
    };
    let mut response = result.map_err(|e| ForwardError::Upstream {
        source: Box::new(e),
    })?;

    let status = response.status();
    tracing::info!(
        correlation_id = %correlation_id,
        origin = origin.binding,
        status = status.as_u16(),
        latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        "origin responded"
    );

    let switching = status == StatusCode::SWITCHING_PROTOCOLS;
    if switching {
        match client_upgrade {
            Some(client_upgrade) => {
                let upstream_upgrade = hyper::upgrade::on(&mut response);
                upgrade::splice(client_upgrade, upstream_upgrade, correlation_id.to_string());
            }
            None => {
                return Err(ForwardError::Upstream {
                    source: "origin switched protocols without an upgrade request".into(),
                });
            }
        }
    }

    let (mut parts, body) = response.into_parts();
    headers::strip_hop_by_hop(&mut parts.headers, switching);
    Ok(Response::from_parts(parts, Body::new(body)))
}
