//! Configuration validation with detailed error reporting.
//!
//! The [`validate`] function checks a merged [`Config`] against its own
//! policy: every binding an enabled capability needs must be present,
//! origin URLs must be absolute `http`/`https` URLs, and the CORS stage
//! must have at least one usable allow-origin binding. All problems are
//! returned at once as [`ValidationError`] values with suggestions.

use url::Url;

use super::model::{
    Config, CorsOnMissing, BASIC_AUTH_PASSWORD, BASIC_AUTH_USERNAME, BEARER_TOKEN, ORIGIN_URL,
    ORIGIN_URL_PROD, ORIGIN_URL_STAGING,
};
use crate::error::ValidationError;

/// Validate an origin base URL. Returns `Ok(())` or a human-readable error.
pub fn validate_origin_url(url: &str) -> Result<(), String> {
    match Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            if scheme != "http" && scheme != "https" {
                Err(format!(
                    "unsupported scheme '{scheme}' (expected http or https)"
                ))
            } else if parsed.host_str().is_none() {
                Err(format!("'{url}' has no host"))
            } else if parsed.query().is_some() || parsed.fragment().is_some() {
                Err(format!("'{url}' must not carry a query or fragment"))
            } else {
                Ok(())
            }
        }
        Err(_) => Err(format!("'{url}' is not a valid URL")),
    }
}

fn missing(field: &str, why: &str) -> ValidationError {
    ValidationError {
        scope: "bindings".into(),
        field: field.into(),
        message: format!("required when {why}"),
        suggestion: Some(format!("set {field} in the config file or environment")),
    }
}

pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let policy = &config.policy;
    let bindings = &config.bindings;

    let origin_bindings: &[&str] = if policy.dual_origin {
        &[ORIGIN_URL_PROD, ORIGIN_URL_STAGING]
    } else {
        &[ORIGIN_URL]
    };
    let why = if policy.dual_origin {
        "policy.dual_origin is on"
    } else {
        "policy.dual_origin is off"
    };

    for name in origin_bindings {
        match bindings.get(name) {
            Some(url) => {
                if let Err(msg) = validate_origin_url(url) {
                    errors.push(ValidationError {
                        scope: "bindings".into(),
                        field: (*name).into(),
                        message: msg,
                        suggestion: None,
                    });
                } else if url.ends_with('/') {
                    errors.push(ValidationError {
                        scope: "bindings".into(),
                        field: (*name).into(),
                        message: "origin URL ends with '/'".into(),
                        suggestion: Some(format!(
                            "did you mean '{}'? the inbound path is appended verbatim",
                            url.trim_end_matches('/')
                        )),
                    });
                }
            }
            None => errors.push(missing(name, why)),
        }
    }

    if policy.basic_auth {
        for name in [BASIC_AUTH_USERNAME, BASIC_AUTH_PASSWORD] {
            if bindings.get(name).is_none() {
                errors.push(missing(name, "policy.basic_auth is on"));
            }
        }
        if bindings
            .get(BASIC_AUTH_USERNAME)
            .is_some_and(|u| u.contains(':'))
        {
            errors.push(ValidationError {
                scope: "bindings".into(),
                field: BASIC_AUTH_USERNAME.into(),
                message: "basic-auth usernames cannot contain ':'".into(),
                suggestion: None,
            });
        }
    }

    if policy.static_bearer_token && bindings.get(BEARER_TOKEN).is_none() {
        errors.push(missing(BEARER_TOKEN, "policy.static_bearer_token is on"));
    }

    if policy.cors.enabled {
        let cors_bindings = policy.cors_allow_origin_bindings();
        let absent: Vec<&str> = cors_bindings
            .iter()
            .copied()
            .filter(|name| bindings.get(name).is_none())
            .collect();
        let unusable = match policy.cors.on_missing {
            CorsOnMissing::FailFast => !absent.is_empty(),
            CorsOnMissing::TryNext => absent.len() == cors_bindings.len(),
        };
        if unusable {
            errors.push(ValidationError {
                scope: "policy".into(),
                field: "cors.allow_origin_bindings".into(),
                message: format!("no value for {}", absent.join(", ")),
                suggestion: match policy.cors.on_missing {
                    CorsOnMissing::FailFast => {
                        Some("set the bindings, or use cors.on_missing: try_next".into())
                    }
                    CorsOnMissing::TryNext => None,
                },
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Human-readable summary of a valid config. Never prints binding values.
#[must_use]
pub fn format_validation_report(path: &str, config: &Config) -> String {
    let policy = &config.policy;
    let on_off = |b: bool| if b { "on" } else { "off" };
    let names: Vec<&str> = config.bindings.names().collect();

    let mut lines = vec![
        format!("  dual origin:         {}", on_off(policy.dual_origin)),
        format!("  basic auth:          {}", on_off(policy.basic_auth)),
        format!("  static bearer token: {}", on_off(policy.static_bearer_token)),
    ];
    if policy.cors.enabled {
        lines.push(format!(
            "  cors:                on ({:?}, from {})",
            policy.cors.on_missing,
            policy.cors_allow_origin_bindings().join(", ")
        ));
    } else {
        lines.push("  cors:                off".into());
    }
    lines.push(format!("  bindings:            {}", names.join(", ")));

    format!("{path} is valid\n{}", lines.join("\n"))
}
