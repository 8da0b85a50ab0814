//! Manifest feed over pre-captured responses (saved files, fixtures).

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use streamaudit_core::{InterceptedManifest, ManifestFeed, PageResult};

#[derive(Debug, Clone, Default)]
pub struct StaticManifestFeed {
    manifests: Vec<InterceptedManifest>,
}

impl StaticManifestFeed {
    pub fn new(manifests: Vec<InterceptedManifest>) -> Self {
        Self { manifests }
    }

    /// Load manifest files from disk. The file name stands in for the URL, so
    /// the format is classified from its extension or, failing that, its body.
    pub async fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut manifests = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let body = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
            manifests.push(InterceptedManifest {
                url: path.display().to_string(),
                body,
                declared_type: None,
            });
        }
        Ok(Self { manifests })
    }
}

#[async_trait]
impl ManifestFeed for StaticManifestFeed {
    async fn start(&self) -> PageResult<()> {
        Ok(())
    }

    async fn captured(&self) -> PageResult<Vec<InterceptedManifest>> {
        Ok(self.manifests.clone())
    }
}
