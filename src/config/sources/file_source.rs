//! Generic async file-based config source.
//!
//! [`FileSource`] implements [`ConfigSource`] for any file format by
//! accepting a deserialization function at construction time. It reads
//! the file asynchronously via Tokio and returns the parsed layer.
//! Validation happens after all layers are merged, since a file often
//! leaves secrets to the environment.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::config::{ConfigLayer, ConfigSource};
use crate::error::EdgeProxyError;

type Deserialize = fn(&str) -> Result<ConfigLayer, Box<dyn std::error::Error + Send + Sync>>;

pub struct FileSource {
    path: PathBuf,
    name: &'static str,
    deserialize: Deserialize,
}

impl FileSource {
    #[must_use]
    pub fn new(path: PathBuf, name: &'static str, deserialize: Deserialize) -> Self {
        Self {
            path,
            name,
            deserialize,
        }
    }

    async fn read_content(&self) -> Result<String, EdgeProxyError> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EdgeProxyError::ConfigFileNotFound {
                    path: self.path.clone(),
                }
            } else {
                EdgeProxyError::Io(e)
            }
        })
    }
}

#[async_trait]
impl ConfigSource for FileSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn load(&self) -> Result<ConfigLayer, EdgeProxyError> {
        let content = self.read_content().await?;

        (self.deserialize)(&content).map_err(|e| EdgeProxyError::ConfigParse {
            path: self.path.display().to_string(),
            source: e,
        })
    }
}
