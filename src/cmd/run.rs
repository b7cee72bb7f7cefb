//! `edge-proxy run` — start the proxy server.
//!
//! Resolves configuration once (config file, then environment), validates
//! it against the policy, builds the shared state, and serves until
//! SIGTERM / Ctrl+C.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::RunArgs;
use crate::config::sources::{self, env::EnvSource};
use crate::config::{validation, ConfigResolver, ConfigSource};
use crate::error::EdgeProxyError;
use crate::logging;
use crate::server::{self, AppState};

pub async fn execute(args: RunArgs) -> Result<(), EdgeProxyError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    let resolver = resolve_config_sources(&args).await?;
    let (config, version) = resolver.load().await?;

    if let Err(errors) = validation::validate(&config) {
        for e in &errors {
            tracing::error!(
                scope = %e.scope,
                field = %e.field,
                message = %e.message,
                "invalid proxy configuration"
            );
        }
        if !args.defer_config_errors {
            return Err(EdgeProxyError::ConfigValidation { errors });
        }
        tracing::warn!(
            errors = errors.len(),
            "starting with an incomplete config, affected requests will fail with 500"
        );
    }

    let policy = config.policy.clone();
    let state = Arc::new(AppState::new(config, args.upstream_timeout()));
    let router = server::build_router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        config_source = %resolver.source_names(),
        config_version = %version.short(),
        dual_origin = policy.dual_origin,
        basic_auth = policy.basic_auth,
        static_bearer_token = policy.static_bearer_token,
        cors = policy.cors.enabled,
        upstream_timeout_ms = ?args.upstream_timeout_ms,
        "edge-proxy started"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    tracing::info!("edge-proxy stopped");
    Ok(())
}

async fn resolve_config_sources(args: &RunArgs) -> Result<ConfigResolver, EdgeProxyError> {
    let mut layers: Vec<Box<dyn ConfigSource>> = Vec::new();

    if let Some(source) = resolve_file_source(args.config.as_deref()).await? {
        layers.push(source);
    }

    // The environment is read here, once, and nowhere else.
    layers.push(Box::new(EnvSource::from_process()));

    Ok(ConfigResolver::new(layers))
}

async fn resolve_file_source(
    explicit: Option<&std::path::Path>,
) -> Result<Option<Box<dyn ConfigSource>>, EdgeProxyError> {
    if let Some(path) = explicit {
        return create_file_source(path).map(Some);
    }

    // Auto-detect in current directory
    let candidates = [
        "edge-proxy.yaml",
        "edge-proxy.yml",
        "edge-proxy.json",
        "edge-proxy.toml",
    ];

    for name in &candidates {
        let path = PathBuf::from(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!(path = %path.display(), "auto-detected config file");
            return create_file_source(&path).map(Some);
        }
    }

    Ok(None)
}

pub(crate) fn create_file_source(
    path: &std::path::Path,
) -> Result<Box<dyn ConfigSource>, EdgeProxyError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => Ok(Box::new(sources::yaml::new(path.to_path_buf()))),

        #[cfg(feature = "json")]
        "json" => Ok(Box::new(sources::json::new(path.to_path_buf()))),

        #[cfg(feature = "toml")]
        "toml" => Ok(Box::new(sources::toml_source::new(path.to_path_buf()))),

        other => Err(EdgeProxyError::UnsupportedFormat(other.to_string())),
    }
}
