//! Module sources
//!
//! Where remote script bytes are read from: HTTP(S) through reqwest, local
//! files through tokio.

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;
use url::Url;

/// Reads the full contents behind a URI
#[async_trait]
pub trait ModuleSource: Send + Sync {
    async fn read(&self, uri: &str) -> anyhow::Result<Bytes>;
}

/// `http(s)://` via reqwest, `file://` and absolute paths via the filesystem
pub struct DefaultSource {
    #[cfg(feature = "http")]
    client: reqwest::Client,
}

impl DefaultSource {
    /// Create a source sending `user_agent` with HTTP requests.
    ///
    /// Fails when the HTTP client cannot be built, e.g. for a user agent
    /// that is not a valid header value.
    pub fn new(user_agent: &str) -> anyhow::Result<Self> {
        #[cfg(feature = "http")]
        {
            let client = reqwest::Client::builder()
                .user_agent(user_agent)
                .build()
                .context("failed to build HTTP client")?;
            Ok(Self { client })
        }
        #[cfg(not(feature = "http"))]
        {
            let _ = user_agent;
            Ok(Self {})
        }
    }

    async fn read_file(path: &std::path::Path) -> anyhow::Result<Bytes> {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Bytes::from(data))
    }

    #[cfg(feature = "http")]
    async fn read_http(&self, url: Url) -> anyhow::Result<Bytes> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            bail!("server returned {}", status);
        }
        Ok(response.bytes().await?)
    }

    #[cfg(not(feature = "http"))]
    async fn read_http(&self, url: Url) -> anyhow::Result<Bytes> {
        bail!("{} requires the `http` feature", url.scheme())
    }
}

#[async_trait]
impl ModuleSource for DefaultSource {
    async fn read(&self, uri: &str) -> anyhow::Result<Bytes> {
        debug!("Reading {}", uri);

        if uri.starts_with('/') {
            return Self::read_file(std::path::Path::new(uri)).await;
        }

        let url = Url::parse(uri)?;
        match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| anyhow!("{} is not a local file", uri))?;
                Self::read_file(&path).await
            }
            "http" | "https" => self.read_http(url).await,
            other => bail!("unsupported scheme {}", other),
        }
    }
}
