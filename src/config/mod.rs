//! Configuration loading and validation.
//!
//! Defines the [`ConfigSource`] trait for pluggable config layers, the
//! [`ConfigResolver`] that merges layers in order into one [`Config`],
//! and the [`ConfigVersion`] fingerprint logged at startup. Submodules
//! provide the data model, validation logic, and concrete sources.
//!
//! Configuration is resolved exactly once, before the listener starts.
//! Request handling only ever sees the merged, immutable result.

pub mod model;
pub mod sources;
pub mod validation;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::EdgeProxyError;
use model::{Bindings, Config, Policy};

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigVersion {
    Hash(String),
}

impl ConfigVersion {
    #[must_use]
    pub fn of(config: &Config) -> Self {
        // Serializing a plain struct of strings and bools cannot fail.
        let canonical = serde_json::to_vec(config).unwrap_or_default();
        Self::Hash(sources::sha256_hex(&canonical))
    }

    /// First 8 hex characters, enough to tell deployments apart in logs.
    #[must_use]
    pub fn short(&self) -> &str {
        match self {
            Self::Hash(h) => h.get(..8).unwrap_or(h),
        }
    }
}

/// One partial view of the configuration, as contributed by a single source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    #[serde(default)]
    pub policy: Option<Policy>,

    #[serde(default)]
    pub bindings: Bindings,
}

// async_trait is required here because ConfigSource is used as Box<dyn ConfigSource>
// and native async fn in traits (Rust 1.75+) does not support dyn dispatch.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn load(&self) -> Result<ConfigLayer, EdgeProxyError>;
}

/// Merges layers in order: later bindings override earlier ones and the
/// policy of the last layer that defines one wins.
pub struct ConfigResolver {
    layers: Vec<Box<dyn ConfigSource>>,
}

impl ConfigResolver {
    #[must_use]
    pub fn new(layers: Vec<Box<dyn ConfigSource>>) -> Self {
        Self { layers }
    }

    pub async fn load(&self) -> Result<(Config, ConfigVersion), EdgeProxyError> {
        let mut policy = None;
        let mut bindings = Bindings::new();

        for source in &self.layers {
            let layer = source.load().await?;
            tracing::debug!(
                source = source.name(),
                bindings = layer.bindings.len(),
                policy = layer.policy.is_some(),
                "config layer loaded"
            );
            if layer.policy.is_some() {
                policy = layer.policy;
            }
            bindings.extend(layer.bindings);
        }

        let config = Config {
            policy: policy.unwrap_or_default(),
            bindings,
        };
        let version = ConfigVersion::of(&config);
        Ok((config, version))
    }

    #[must_use]
    pub fn source_names(&self) -> String {
        self.layers
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join("+")
    }
}
