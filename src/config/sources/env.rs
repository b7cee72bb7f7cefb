//! Environment-variable config layer.
//!
//! The process environment is snapshotted once at startup and handed to
//! [`EnvSource`] as a plain map, so nothing below the `run` command ever
//! reads ambient globals. Recognised binding names are copied verbatim;
//! `BASIC_AUTH_USERNAME` / `BASIC_AUTH_PASSWORD` are accepted as aliases
//! for the lowercase `username` / `password` bindings. Policy flags are
//! read from `PROXY_*` variables; when none is set the layer carries no
//! policy and an earlier layer (or the default) decides.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::config::model::{
    Bindings, CorsOnMissing, Policy, BASIC_AUTH_PASSWORD, BASIC_AUTH_USERNAME, KNOWN_BINDINGS,
};
use crate::config::{ConfigLayer, ConfigSource};
use crate::error::EdgeProxyError;

const ALIASES: &[(&str, &str)] = &[
    ("BASIC_AUTH_USERNAME", BASIC_AUTH_USERNAME),
    ("BASIC_AUTH_PASSWORD", BASIC_AUTH_PASSWORD),
];

pub const DUAL_ORIGIN_VAR: &str = "PROXY_DUAL_ORIGIN";
pub const BASIC_AUTH_VAR: &str = "PROXY_BASIC_AUTH";
pub const STATIC_BEARER_TOKEN_VAR: &str = "PROXY_STATIC_BEARER_TOKEN";
pub const CORS_ON_MISSING_VAR: &str = "PROXY_CORS_ON_MISSING";

pub struct EnvSource {
    vars: HashMap<String, String>,
}

impl EnvSource {
    #[must_use]
    pub fn new(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            vars: vars.into_iter().collect(),
        }
    }

    /// Snapshot the current process environment.
    #[must_use]
    pub fn from_process() -> Self {
        Self::new(std::env::vars())
    }

    fn var(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn bindings(&self) -> Bindings {
        let mut bindings = Bindings::new();
        for (alias, name) in ALIASES {
            if let Some(value) = self.var(alias) {
                bindings.insert(*name, value);
            }
        }
        for name in KNOWN_BINDINGS {
            if let Some(value) = self.var(name) {
                bindings.insert(*name, value);
            }
        }
        bindings
    }

    fn flag(&self, name: &str) -> Result<Option<bool>, EdgeProxyError> {
        self.var(name).map(|v| parse_bool(name, v)).transpose()
    }

    fn policy(&self) -> Result<Option<Policy>, EdgeProxyError> {
        let dual_origin = self.flag(DUAL_ORIGIN_VAR)?;
        let basic_auth = self.flag(BASIC_AUTH_VAR)?;
        let static_bearer_token = self.flag(STATIC_BEARER_TOKEN_VAR)?;
        let on_missing = self
            .var(CORS_ON_MISSING_VAR)
            .map(|v| {
                v.parse::<CorsOnMissing>()
                    .map_err(|msg| env_error(CORS_ON_MISSING_VAR, msg))
            })
            .transpose()?;

        if dual_origin.is_none()
            && basic_auth.is_none()
            && static_bearer_token.is_none()
            && on_missing.is_none()
        {
            return Ok(None);
        }

        let mut policy = Policy {
            dual_origin: dual_origin.unwrap_or(false),
            basic_auth: basic_auth.unwrap_or(false),
            static_bearer_token: static_bearer_token.unwrap_or(false),
            ..Policy::default()
        };
        if let Some(mode) = on_missing {
            policy.cors.on_missing = mode;
        }
        Ok(Some(policy))
    }
}

#[async_trait]
impl ConfigSource for EnvSource {
    fn name(&self) -> &'static str {
        "env"
    }

    async fn load(&self) -> Result<ConfigLayer, EdgeProxyError> {
        Ok(ConfigLayer {
            policy: self.policy()?,
            bindings: self.bindings(),
        })
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, EdgeProxyError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(env_error(
            name,
            format!("'{other}' is not a boolean (expected true or false)"),
        )),
    }
}

fn env_error(name: &str, message: String) -> EdgeProxyError {
    EdgeProxyError::ConfigParse {
        path: format!("environment variable {name}"),
        source: message.into(),
    }
}
