//! Remote script retrieval
//!
//! Downloads dependency scripts into the remote cache directory.
//!
//! A batch succeeds only when every download succeeds. Only the first
//! failure of a batch is reported; downloads still in flight at that point
//! are not cancelled but driven to completion in the background, and their
//! outcome is only logged.

pub mod source;

pub use source::{DefaultSource, ModuleSource};

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::module::traits::ModuleError;

/// Downloads scripts from a [`ModuleSource`] into a directory
#[derive(Clone)]
pub struct Fetcher {
    source: Arc<dyn ModuleSource>,
}

impl Fetcher {
    pub fn new(source: Arc<dyn ModuleSource>) -> Self {
        Self { source }
    }

    /// Create `dir` and its parents unless it already is a directory
    pub async fn ensure_directory(dir: &Path) -> Result<(), ModuleError> {
        let directory_error = |reason: String| ModuleError::Directory {
            path: dir.display().to_string(),
            reason,
        };

        match tokio::fs::metadata(dir).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(directory_error("exists and is not a directory".to_string())),
            Err(_) => tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| directory_error(e.to_string())),
        }
    }

    /// Read `uri` and write its bytes to `dest_dir/dest_filename`, replacing
    /// any previous file
    pub async fn fetch_one(
        &self,
        uri: &str,
        dest_dir: &Path,
        dest_filename: &str,
    ) -> Result<(), ModuleError> {
        Self::download(Arc::clone(&self.source), uri.to_string(), dest_dir.join(dest_filename)).await
    }

    async fn download(
        source: Arc<dyn ModuleSource>,
        uri: String,
        dest: PathBuf,
    ) -> Result<(), ModuleError> {
        debug!("Retrieving {} into {:?}", uri, dest);
        let data = source.read(&uri).await.map_err(|e| ModuleError::Fetch {
            uri: uri.clone(),
            reason: format!("{:#}", e),
        })?;
        tokio::fs::write(&dest, &data)
            .await
            .map_err(|e| ModuleError::Write {
                path: dest.display().to_string(),
                reason: e.to_string(),
            })?;
        debug!("Retrieved {} ({} bytes)", uri, data.len());
        Ok(())
    }

    /// Download every `uri -> filename` pair into `dest_dir` concurrently.
    ///
    /// An empty batch succeeds without touching the filesystem. A directory
    /// failure is returned before any download starts. Otherwise returns
    /// the first download failure observed, if any.
    pub async fn fetch_all(
        &self,
        dest_dir: &Path,
        batch: &IndexMap<String, String>,
    ) -> Result<(), ModuleError> {
        if batch.is_empty() {
            return Ok(());
        }
        Self::ensure_directory(dest_dir).await?;

        info!("Retrieving {} scripts into {:?}", batch.len(), dest_dir);

        let mut pending: FuturesUnordered<BoxFuture<'static, Result<(), ModuleError>>> = batch
            .iter()
            .map(|(uri, filename)| {
                Self::download(Arc::clone(&self.source), uri.clone(), dest_dir.join(filename)).boxed()
            })
            .collect();

        while let Some(result) = pending.next().await {
            if let Err(first) = result {
                if !pending.is_empty() {
                    let remaining = pending.len();
                    tokio::spawn(async move {
                        while let Some(result) = pending.next().await {
                            if let Err(e) = result {
                                warn!("Unreported retrieval failure: {}", e);
                            }
                        }
                        debug!("{} detached retrievals finished", remaining);
                    });
                }
                return Err(first);
            }
        }

        info!("Retrieved {} scripts", batch.len());
        Ok(())
    }
}
