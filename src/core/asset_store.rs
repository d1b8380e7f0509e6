//! Filesystem storage for the latest value of each asset.
//!
//! One JSON file per asset under the storage directory. A materialization
//! replaces the previous value; runs that do not select an upstream asset
//! read it from here.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::debug;

use crate::domain::{AssetKey, AssetValue};

/// Latest-value store keyed by asset
pub struct AssetStore {
    base_dir: PathBuf,
}

impl AssetStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the stored value for `asset`
    pub fn path_for(&self, asset: AssetKey) -> PathBuf {
        self.base_dir.join(format!("{}.json", asset))
    }

    /// Persist `value`, replacing any earlier value of the same asset
    pub async fn save(&self, value: &AssetValue) -> Result<PathBuf> {
        fs::create_dir_all(&self.base_dir)
            .await
            .with_context(|| format!("Failed to create storage directory: {}", self.base_dir.display()))?;

        let path = self.path_for(value.key());
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(value).context("Failed to serialize asset value")?;

        // Write then rename so readers never observe a partial file
        fs::write(&tmp_path, json)
            .await
            .with_context(|| format!("Failed to write asset value: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path)
            .await
            .with_context(|| format!("Failed to replace asset value: {}", path.display()))?;

        debug!(asset = %value.key(), path = %path.display(), "Stored asset value");
        Ok(path)
    }

    /// Load the latest value of `asset`, if it was ever materialized
    pub async fn load(&self, asset: AssetKey) -> Result<Option<AssetValue>> {
        let path = self.path_for(asset);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read(&path)
            .await
            .with_context(|| format!("Failed to read asset value: {}", path.display()))?;

        let value: AssetValue = serde_json::from_slice(&content)
            .with_context(|| format!("Failed to parse asset value: {}", path.display()))?;

        if value.key() != asset {
            anyhow::bail!(
                "Stored value at {} belongs to {}, expected {}",
                path.display(),
                value.key(),
                asset
            );
        }

        Ok(Some(value))
    }
}
