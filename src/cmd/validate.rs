//! `edge-proxy validate` — check a configuration file for errors.
//!
//! Loads the config file (optionally overlaid with the environment),
//! validates it, and reports results in either human-readable text or
//! machine-readable JSON format. Binding values are never printed.

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::config::sources::env::EnvSource;
use crate::config::{validation, ConfigResolver, ConfigSource};
use crate::error::EdgeProxyError;

use super::run::create_file_source;

pub async fn execute(args: &ValidateArgs) -> Result<(), EdgeProxyError> {
    let path = &args.config;

    if !path.exists() {
        return Err(EdgeProxyError::ConfigFileNotFound { path: path.clone() });
    }

    let mut layers: Vec<Box<dyn ConfigSource>> = vec![create_file_source(path)?];
    if args.with_env {
        layers.push(Box::new(EnvSource::from_process()));
    }
    let (config, version) = ConfigResolver::new(layers).load().await?;

    if let Err(errors) = validation::validate(&config) {
        match args.format {
            ValidateFormat::Text => {
                eprintln!("\u{2717} {} has {} errors\n", path.display(), errors.len());
                for error in &errors {
                    eprintln!("{error}");
                }
            }
            ValidateFormat::Json => {
                let json_errors: Vec<serde_json::Value> = errors
                    .iter()
                    .map(|e| {
                        serde_json::json!({
                            "scope": e.scope,
                            "field": e.field,
                            "message": e.message,
                            "suggestion": e.suggestion,
                        })
                    })
                    .collect();
                println!(
                    "{}",
                    serde_json::json!({
                        "valid": false,
                        "errors": json_errors,
                    })
                );
            }
        }
        return Err(EdgeProxyError::ConfigValidation { errors });
    }

    match args.format {
        ValidateFormat::Text => {
            println!(
                "\u{2713} {}",
                validation::format_validation_report(&path.display().to_string(), &config)
            );
        }
        ValidateFormat::Json => {
            let policy = &config.policy;
            println!(
                "{}",
                serde_json::json!({
                    "valid": true,
                    "version": version.short(),
                    "dual_origin": policy.dual_origin,
                    "basic_auth": policy.basic_auth,
                    "static_bearer_token": policy.static_bearer_token,
                    "cors": policy.cors.enabled,
                    "bindings": config.bindings.names().collect::<Vec<_>>(),
                })
            );
        }
    }

    Ok(())
}
