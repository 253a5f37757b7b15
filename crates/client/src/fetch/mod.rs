//! Archive download pipeline.
//!
//! ### Protocol
//! - One plain GET per version, no authentication
//! - `200` is success, `404` means the version does not exist,
//!   anything else is a remote error carrying the status code
//! - Max redirects: 5
//! - Max body bytes: 100MB (configurable)
//!
//! ### Extraction
//! - The body is parsed as a zip archive on the blocking pool
//! - Only entries under the target directory are kept (see [`archive`])

pub mod archive;

use bytes::Bytes;
use reqwest::{Client, StatusCode, header};
use std::time::{Duration, Instant};
use url::Url;

pub use archive::{ArchiveError, extract};

use docshelf_core::{Error, Snapshot};

/// Configuration for the archive fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "docshelf/0.1")
    pub user_agent: String,

    /// Maximum archive size in bytes (default: 100MB)
    pub max_bytes: usize,

    /// Request timeout (default: 60s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "docshelf/0.1".to_string(),
            max_bytes: 100 * 1024 * 1024,
            timeout: Duration::from_millis(60_000),
            max_redirects: 5,
        }
    }
}

/// HTTP client that downloads zip archives and turns them into snapshots.
#[derive(Debug, Clone)]
pub struct ArchiveFetcher {
    http: Client,
    config: FetchConfig,
}

impl ArchiveFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::remote(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Download the archive at `url` and extract the files under `dir`.
    pub async fn fetch(&self, url: &Url, dir: &str) -> Result<Snapshot, Error> {
        let body = self.download(url).await?;

        let source = url.to_string();
        let dir = dir.to_string();
        let snapshot = tokio::task::spawn_blocking(move || archive::extract(&source, body, &dir))
            .await
            .map_err(|e| Error::ArchiveParse(format!("extraction task failed: {e}")))??;

        tracing::debug!(url = %url, files = snapshot.len(), root = snapshot.root(), "extracted archive");
        Ok(snapshot)
    }

    /// Perform the GET for `url`, returning the raw body.
    pub async fn download(&self, url: &Url) -> Result<Bytes, Error> {
        let start = Instant::now();

        let response = self
            .http
            .get(url.clone())
            .header(header::ACCEPT, "application/zip, */*")
            .send()
            .await
            .map_err(|e| request_error(url, &e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::VersionNotFound(format!("GET {url}: no archive at this location")));
        }
        if status != StatusCode::OK {
            return Err(Error::remote_status(status.as_u16(), url.as_str()));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(too_large(url, len as usize, self.config.max_bytes));
        }

        let bytes = response.bytes().await.map_err(|e| request_error(url, &e))?;
        if bytes.len() > self.config.max_bytes {
            return Err(too_large(url, bytes.len(), self.config.max_bytes));
        }

        tracing::info!(
            url = %url,
            bytes = bytes.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "downloaded content archive"
        );

        Ok(bytes)
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn request_error(url: &Url, err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::remote(format!("GET {url}: timed out"))
    } else {
        Error::remote(format!("GET {url}: {err}"))
    }
}

fn too_large(url: &Url, len: usize, max: usize) -> Error {
    Error::remote(format!("GET {url}: archive of {len} bytes exceeds {max}"))
}
