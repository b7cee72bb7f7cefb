//! Serde data structures for the Edge Proxy configuration.
//!
//! [`Config`] is the root: a declarative [`Policy`] saying which stages
//! and capabilities a deployment turns on, and the [`Bindings`] that
//! supply origin URLs and secrets. All types derive `Serialize` and
//! `Deserialize` with `deny_unknown_fields` for strict parsing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

pub const ORIGIN_URL: &str = "ORIGIN_URL";
pub const ORIGIN_URL_PROD: &str = "ORIGIN_URL_PROD";
pub const ORIGIN_URL_STAGING: &str = "ORIGIN_URL_STAGING";
pub const BEARER_TOKEN: &str = "GOOGLE_CLOUD_PRINT_IDENTITY_TOKEN";
pub const BASIC_AUTH_USERNAME: &str = "username";
pub const BASIC_AUTH_PASSWORD: &str = "password";

/// Every binding name the proxy reads.
pub const KNOWN_BINDINGS: &[&str] = &[
    ORIGIN_URL,
    ORIGIN_URL_PROD,
    ORIGIN_URL_STAGING,
    BEARER_TOKEN,
    BASIC_AUTH_USERNAME,
    BASIC_AUTH_PASSWORD,
];

const fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

fn is_false(v: &bool) -> bool {
    !*v
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Policy::is_default")]
    pub policy: Policy,

    #[serde(default, skip_serializing_if = "Bindings::is_empty")]
    pub bindings: Bindings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Policy {
    /// Select between prod and staging origins by hostname prefix.
    #[serde(default, skip_serializing_if = "is_false")]
    pub dual_origin: bool,

    /// Gate every request behind the static `username`/`password` pair.
    #[serde(default, skip_serializing_if = "is_false")]
    pub basic_auth: bool,

    /// Overwrite `Authorization` with the configured bearer token.
    #[serde(default, skip_serializing_if = "is_false")]
    pub static_bearer_token: bool,

    #[serde(default, skip_serializing_if = "CorsPolicy::is_default")]
    pub cors: CorsPolicy,
}

impl Policy {
    fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Binding names whose values are advertised as the allowed CORS origin,
    /// in evaluation order.
    #[must_use]
    pub fn cors_allow_origin_bindings(&self) -> Vec<&str> {
        if !self.cors.allow_origin_bindings.is_empty() {
            return self
                .cors
                .allow_origin_bindings
                .iter()
                .map(String::as_str)
                .collect();
        }
        if self.dual_origin {
            vec![ORIGIN_URL_PROD, ORIGIN_URL_STAGING]
        } else {
            vec![ORIGIN_URL]
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CorsPolicy {
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "CorsOnMissing::is_default")]
    pub on_missing: CorsOnMissing,

    /// Explicit binding list. Empty means derived from `dual_origin`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_origin_bindings: Vec<String>,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            on_missing: CorsOnMissing::default(),
            allow_origin_bindings: Vec::new(),
        }
    }
}

impl CorsPolicy {
    fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// What the CORS stage does when an allow-origin binding is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorsOnMissing {
    /// The first missing binding fails the request.
    #[default]
    FailFast,
    /// Skip missing bindings; fail only when none is present.
    TryNext,
}

impl CorsOnMissing {
    fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

impl std::str::FromStr for CorsOnMissing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fail_fast" => Ok(Self::FailFast),
            "try_next" => Ok(Self::TryNext),
            other => Err(format!(
                "'{other}' is not a CORS fallback mode (expected fail_fast or try_next)"
            )),
        }
    }
}

/// Named string values supplied by the hosting environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Bindings(BTreeMap<String, String>);

impl Bindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty value counts as absent.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Look up a binding that the active policy cannot do without.
    pub fn require(&self, name: &str) -> Result<&str, ConfigurationError> {
        self.get(name)
            .ok_or_else(|| ConfigurationError::MissingBinding(name.to_string()))
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Overlay `other` on top of `self`; values from `other` win.
    pub fn extend(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
