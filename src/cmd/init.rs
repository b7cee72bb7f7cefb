//! `edge-proxy init` — generate a starter configuration file.
//!
//! Builds a [`Config`] for the chosen deployment variant and serializes it
//! to YAML, JSON, or TOML. Placeholder secrets are meant to be replaced,
//! or removed from the file and supplied through the environment.

use std::path::PathBuf;

use crate::cli::{ConfigFormat, InitArgs, Variant};
use crate::config::model::{
    Bindings, Config, CorsOnMissing, CorsPolicy, Policy, BASIC_AUTH_PASSWORD,
    BASIC_AUTH_USERNAME, BEARER_TOKEN, ORIGIN_URL, ORIGIN_URL_PROD, ORIGIN_URL_STAGING,
};
use crate::error::EdgeProxyError;

pub fn execute(args: &InitArgs) -> Result<(), EdgeProxyError> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("edge-proxy.{}", args.format.extension())));

    if output.exists() {
        return Err(EdgeProxyError::FileExists { path: output });
    }

    let content = render(&starter_config(args.variant), &args.format)?;

    std::fs::write(&output, content)?;
    println!("Created {}", output.display());
    Ok(())
}

/// The starting point for each deployment shape.
#[must_use]
pub fn starter_config(variant: Variant) -> Config {
    match variant {
        Variant::Single => Config {
            policy: Policy::default(),
            bindings: Bindings::from_iter([(ORIGIN_URL, "http://localhost:8080")]),
        },
        Variant::Dual => Config {
            policy: Policy {
                dual_origin: true,
                basic_auth: true,
                cors: CorsPolicy {
                    on_missing: CorsOnMissing::TryNext,
                    ..CorsPolicy::default()
                },
                ..Policy::default()
            },
            bindings: Bindings::from_iter([
                (ORIGIN_URL_PROD, "https://app.example.com"),
                (ORIGIN_URL_STAGING, "https://staging.app.example.com"),
                (BASIC_AUTH_USERNAME, "change-me"),
                (BASIC_AUTH_PASSWORD, "change-me"),
            ]),
        },
        Variant::Bearer => Config {
            policy: Policy {
                static_bearer_token: true,
                ..Policy::default()
            },
            bindings: Bindings::from_iter([
                (ORIGIN_URL, "https://origin.example.com"),
                (BEARER_TOKEN, "change-me"),
            ]),
        },
        Variant::BasicAuth => Config {
            policy: Policy {
                basic_auth: true,
                ..Policy::default()
            },
            bindings: Bindings::from_iter([
                (ORIGIN_URL, "https://origin.example.com"),
                (BASIC_AUTH_USERNAME, "change-me"),
                (BASIC_AUTH_PASSWORD, "change-me"),
            ]),
        },
    }
}

const HEADER: &str = "# edge-proxy config\n#\n\
                      # Values under `bindings` can be left out here and supplied as\n\
                      # environment variables of the same name instead.\n\n";

/// Serialize a `Config` to a formatted string in the given format.
pub fn render(config: &Config, format: &ConfigFormat) -> Result<String, EdgeProxyError> {
    match format {
        #[cfg(feature = "yaml")]
        ConfigFormat::Yaml => serde_yml::to_string(config)
            .map(|body| format!("{HEADER}{body}"))
            .map_err(|e| EdgeProxyError::Io(std::io::Error::other(e.to_string()))),

        #[cfg(not(feature = "yaml"))]
        ConfigFormat::Yaml => Err(EdgeProxyError::UnsupportedFormat("yaml".into())),

        ConfigFormat::Json => serde_json::to_string_pretty(config)
            .map(|body| body + "\n")
            .map_err(|e| EdgeProxyError::Io(std::io::Error::other(e.to_string()))),

        #[cfg(feature = "toml")]
        ConfigFormat::Toml => toml::to_string_pretty(config)
            .map(|body| format!("{HEADER}{body}"))
            .map_err(|e| EdgeProxyError::Io(std::io::Error::other(e.to_string()))),

        #[cfg(not(feature = "toml"))]
        ConfigFormat::Toml => Err(EdgeProxyError::UnsupportedFormat("toml".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validation;

    const VARIANTS: [Variant; 4] = [
        Variant::Single,
        Variant::Dual,
        Variant::Bearer,
        Variant::BasicAuth,
    ];

    #[test]
    fn every_starter_config_validates() {
        for variant in VARIANTS {
            let config = starter_config(variant);
            assert!(
                validation::validate(&config).is_ok(),
                "{variant:?} starter config should be valid"
            );
        }
    }

    #[test]
    fn json_output_parses_back() {
        for variant in VARIANTS {
            let config = starter_config(variant);
            let text = render(&config, &ConfigFormat::Json).unwrap();
            let layer: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert!(layer.get("bindings").is_some());
        }
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn yaml_output_is_a_loadable_layer() {
        let config = starter_config(Variant::Dual);
        let text = render(&config, &ConfigFormat::Yaml).unwrap();
        assert!(text.starts_with("# edge-proxy config"));

        let layer =
            crate::config::sources::parse_config_str("yaml", &text, "edge-proxy.yaml").unwrap();
        assert_eq!(layer.policy, Some(config.policy));
        assert_eq!(layer.bindings, config.bindings);
    }

    #[cfg(feature = "toml")]
    #[test]
    fn toml_output_is_a_loadable_layer() {
        let config = starter_config(Variant::Bearer);
        let text = render(&config, &ConfigFormat::Toml).unwrap();
        let layer =
            crate::config::sources::parse_config_str("toml", &text, "edge-proxy.toml").unwrap();
        assert_eq!(layer.bindings, config.bindings);
        assert!(layer.policy.is_some_and(|p| p.static_bearer_token));
    }

    #[test]
    fn refuses_to_overwrite() {
        let dir = std::env::temp_dir().join(format!("edge-proxy-init-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let output = dir.join("edge-proxy.json");
        std::fs::write(&output, "{}").unwrap();

        let args = InitArgs {
            format: ConfigFormat::Json,
            output: Some(output.clone()),
            variant: Variant::Single,
        };
        let err = execute(&args).unwrap_err();
        assert!(matches!(err, EdgeProxyError::FileExists { .. }));
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "{}");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
