//! Versioned whole-asset cache for offline use.
//!
//! Assets live under `<root>/<version>/<asset>`. Installing a version fetches
//! every listed asset; activating it deletes every other version directory.
//! Lookups are cache-first with a network fallback. There is no expiry: a
//! new release bumps the version string.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::dataset::{self, AssetOrigin, LoadError};

pub const DEFAULT_CACHE_VERSION: &str = "kuralview-v1";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("invalid cache version '{version}'")]
    InvalidVersion { version: String },

    #[error("invalid asset name '{asset}'")]
    InvalidAsset { asset: String },

    #[error("cache io failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch asset '{asset}': {source}")]
    Origin {
        asset: String,
        #[source]
        source: LoadError,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetCache {
    root: PathBuf,
    version: String,
}

impl AssetCache {
    pub fn new(root: impl Into<PathBuf>, version: &str) -> Result<Self, CacheError> {
        let version = version.trim();
        let valid = !version.is_empty()
            && version != "."
            && version != ".."
            && !version.contains(['/', '\\']);
        if !valid {
            return Err(CacheError::InvalidVersion {
                version: version.to_string(),
            });
        }
        Ok(Self {
            root: root.into(),
            version: version.to_string(),
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn version_dir(&self) -> PathBuf {
        self.root.join(&self.version)
    }

    fn asset_path(&self, asset: &str) -> Result<PathBuf, CacheError> {
        self.asset_path_in(&self.version_dir(), asset)
    }

    fn asset_path_in(&self, dir: &Path, asset: &str) -> Result<PathBuf, CacheError> {
        if !dataset::is_relative_asset(asset) {
            return Err(CacheError::InvalidAsset {
                asset: asset.to_string(),
            });
        }
        Ok(dir.join(asset.trim()))
    }

    // install writes here first and renames into place once every asset is in
    fn staging_dir(&self) -> PathBuf {
        self.root.join(format!(".{}.partial", self.version))
    }

    /// Whether the current version has been installed or populated.
    pub async fn is_installed(&self) -> bool {
        tokio::fs::metadata(self.version_dir())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// The cached copy of `asset` in the current version, if present.
    pub async fn cached(&self, asset: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.asset_path(asset)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::Io {
                path: path.display().to_string(),
                source: e,
            }),
        }
    }

    pub async fn store(&self, asset: &str, bytes: &[u8]) -> Result<(), CacheError> {
        let path = self.asset_path(asset)?;
        write_file(&path, bytes).await
    }

    async fn fetch_from_origin(
        &self,
        client: &reqwest::Client,
        origin: &AssetOrigin,
        asset: &str,
    ) -> Result<Vec<u8>, CacheError> {
        let source = origin.locate(asset).map_err(|e| CacheError::Origin {
            asset: asset.to_string(),
            source: e,
        })?;
        dataset::fetch_bytes(client, &source)
            .await
            .map_err(|e| CacheError::Origin {
                asset: asset.to_string(),
                source: e,
            })
    }

    /// Fetches every asset from the origin into the current version. The
    /// install is all-or-nothing: when any asset fails, the current version
    /// is left as it was.
    pub async fn install(
        &self,
        client: &reqwest::Client,
        origin: &AssetOrigin,
        assets: &[String],
    ) -> Result<usize, CacheError> {
        let staging = self.staging_dir();
        remove_dir_if_present(&staging).await?;

        match self.stage(client, origin, assets, &staging).await {
            Ok(stored) => {
                let target = self.version_dir();
                remove_dir_if_present(&target).await?;
                tokio::fs::rename(&staging, &target)
                    .await
                    .map_err(|e| CacheError::Io {
                        path: target.display().to_string(),
                        source: e,
                    })?;
                tracing::info!(stored, version = %self.version, "cache installed");
                Ok(stored)
            }
            Err(e) => {
                if let Err(cleanup) = remove_dir_if_present(&staging).await {
                    tracing::warn!(error = %cleanup, "failed to remove partial cache install");
                }
                Err(e)
            }
        }
    }

    async fn stage(
        &self,
        client: &reqwest::Client,
        origin: &AssetOrigin,
        assets: &[String],
        staging: &Path,
    ) -> Result<usize, CacheError> {
        tokio::fs::create_dir_all(staging)
            .await
            .map_err(|e| CacheError::Io {
                path: staging.display().to_string(),
                source: e,
            })?;
        let mut stored = 0usize;
        for asset in assets.iter().map(|a| a.trim()).filter(|a| !a.is_empty()) {
            let path = self.asset_path_in(staging, asset)?;
            let bytes = self.fetch_from_origin(client, origin, asset).await?;
            write_file(&path, &bytes).await?;
            tracing::debug!(asset, bytes = bytes.len(), version = %self.version, "cached asset");
            stored += 1;
        }
        Ok(stored)
    }

    /// Deletes every cache version except the current one and returns the
    /// names that were removed.
    pub async fn activate(&self) -> Result<Vec<String>, CacheError> {
        let mut removed = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(removed),
            Err(e) => {
                return Err(CacheError::Io {
                    path: self.root.display().to_string(),
                    source: e,
                })
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    return Err(CacheError::Io {
                        path: self.root.display().to_string(),
                        source: e,
                    })
                }
            };
            let name = entry.file_name().to_string_lossy().to_string();
            if name == self.version {
                continue;
            }
            let path = entry.path();
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            if !is_dir {
                continue;
            }
            tokio::fs::remove_dir_all(&path)
                .await
                .map_err(|e| CacheError::Io {
                    path: path.display().to_string(),
                    source: e,
                })?;
            tracing::info!(cache = %name, "removed stale cache");
            removed.push(name);
        }
        removed.sort();
        Ok(removed)
    }

    /// Installs and activates the current version when it is missing, or
    /// always when `force` is set. Returns whether an install ran.
    pub async fn ensure_current(
        &self,
        client: &reqwest::Client,
        origin: &AssetOrigin,
        assets: &[String],
        force: bool,
    ) -> Result<bool, CacheError> {
        if !force && self.is_installed().await {
            return Ok(false);
        }
        self.install(client, origin, assets).await?;
        self.activate().await?;
        Ok(true)
    }

    /// Cache-first lookup: serves the cached copy when present, otherwise
    /// fetches from the origin and keeps the response for next time.
    pub async fn fetch(
        &self,
        client: &reqwest::Client,
        origin: &AssetOrigin,
        asset: &str,
    ) -> Result<Vec<u8>, CacheError> {
        if let Some(bytes) = self.cached(asset).await? {
            tracing::debug!(asset, "cache hit");
            return Ok(bytes);
        }
        tracing::debug!(asset, "cache miss");
        let bytes = self.fetch_from_origin(client, origin, asset).await?;
        self.store(asset, &bytes).await?;
        Ok(bytes)
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CacheError::Io {
                path: parent.display().to_string(),
                source: e,
            })?;
    }
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| CacheError::Io {
            path: path.display().to_string(),
            source: e,
        })
}

async fn remove_dir_if_present(path: &Path) -> Result<(), CacheError> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CacheError::Io {
            path: path.display().to_string(),
            source: e,
        }),
    }
}
