//! Shared fixtures: a stub origin that echoes what it received, and a
//! proxy instance bound to an ephemeral port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use axum::Router;

use edge_proxy::config::model::{Bindings, Config, Policy};
use edge_proxy::server::{self, AppState};

/// A running stub origin. Every response carries what the origin saw in
/// `x-seen-*` headers and echoes the request body back.
pub struct StubOrigin {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl StubOrigin {
    pub async fn start() -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .fallback(echo)
            .with_state(Arc::clone(&hits));
        let (addr, shutdown) = serve(router).await;
        Self {
            addr,
            hits,
            shutdown: Some(shutdown),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for StubOrigin {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn echo(State(hits): State<Arc<AtomicUsize>>, request: Request) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);

    let seen = |name: &str| {
        request
            .headers()
            .get(name)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("-"))
    };
    let forwarded_host = seen("x-forwarded-host");
    let authorization = seen("authorization");
    let host = seen("host");
    let correlation_id = seen("x-correlation-id");
    let uri = HeaderValue::from_str(&request.uri().to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("-"));
    let method = HeaderValue::from_str(request.method().as_str())
        .unwrap_or_else(|_| HeaderValue::from_static("-"));

    let mut response = Response::new(Body::new(request.into_body()));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert("x-seen-forwarded-host", forwarded_host);
    headers.insert("x-seen-authorization", authorization);
    headers.insert("x-seen-host", host);
    headers.insert("x-seen-uri", uri);
    headers.insert("x-seen-method", method);
    headers.insert("x-seen-correlation-id", correlation_id);
    response
}

async fn serve(router: Router) -> (SocketAddr, tokio::sync::oneshot::Sender<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    (addr, shutdown_tx)
}

/// A running proxy. Dropping it stops the listener.
pub struct Proxy {
    pub addr: SocketAddr,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl Proxy {
    pub async fn start(config: Config) -> Self {
        Self::start_with_timeout(config, None).await
    }

    pub async fn start_with_timeout(config: Config, upstream_timeout: Option<Duration>) -> Self {
        let state = Arc::new(AppState::new(config, upstream_timeout));
        let (addr, shutdown) = serve(server::build_router(state)).await;
        Self {
            addr,
            shutdown: Some(shutdown),
        }
    }

    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{path_and_query}", self.addr)
    }

    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub fn config(policy: Policy, bindings: &[(&str, &str)]) -> Config {
    Config {
        policy,
        bindings: bindings.iter().copied().collect::<Bindings>(),
    }
}

/// An address nothing is listening on.
pub async fn dead_origin() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
