//! Versioned content: the cache façade used by the content-serving layer.
//!
//! Composes the URL resolver, the archive fetcher and the snapshot cache.
//! Version identifiers are validated before the cache is consulted, so a
//! rejected version never reaches the network.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docshelf_core::cache::{DEFAULT_FETCH_TIMEOUT, DEFAULT_TTL};
use docshelf_core::version;
use docshelf_core::{AppConfig, Error, Snapshot, SnapshotCache, SnapshotSource};

use crate::fetch::{ArchiveFetcher, FetchConfig};

/// Settings for [`VersionedContent`].
#[derive(Debug, Clone)]
pub struct ContentConfig {
    /// Archive URL template containing `$VERSION`, optionally with a
    /// `#dir/` fragment.
    pub template: String,
    /// Directory inside the archive, replacing the template's fragment.
    pub dir: Option<String>,
    /// Version used for empty version identifiers.
    pub default_branch: String,
    pub ttl: Duration,
    /// Deadline for every fetch run by the cache.
    pub refresh_timeout: Duration,
    pub fetch: FetchConfig,
}

impl ContentConfig {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            dir: None,
            default_branch: "master".into(),
            ttl: DEFAULT_TTL,
            refresh_timeout: DEFAULT_FETCH_TIMEOUT,
            fetch: FetchConfig::default(),
        }
    }
}

impl From<&AppConfig> for ContentConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            template: config.content_url.clone(),
            dir: config.content_dir.clone(),
            default_branch: config.default_branch.clone(),
            ttl: config.cache_ttl(),
            refresh_timeout: config.refresh_timeout(),
            fetch: FetchConfig {
                user_agent: config.user_agent.clone(),
                max_bytes: config.max_bytes,
                timeout: config.timeout(),
                ..FetchConfig::default()
            },
        }
    }
}

/// Loads snapshots by resolving the template and downloading the archive.
pub struct RemoteArchiveSource {
    template: String,
    dir: Option<String>,
    default_branch: String,
    fetcher: ArchiveFetcher,
}

#[async_trait]
impl SnapshotSource for RemoteArchiveSource {
    async fn load(&self, version: &str) -> Result<Snapshot, Error> {
        let resolved = version::resolve(version, &self.template, &self.default_branch)?;
        let dir = self.dir.as_deref().unwrap_or(&resolved.dir);
        tracing::debug!(version, url = %resolved.url, dir, "fetching content archive");
        self.fetcher.fetch(&resolved.url, dir).await
    }
}

/// Versioned, cached access to remote content snapshots.
///
/// Cloning is cheap; clones share one cache.
#[derive(Clone)]
pub struct VersionedContent {
    cache: SnapshotCache,
    default_branch: String,
}

impl VersionedContent {
    /// Build the content cache for a remote archive template.
    ///
    /// # Errors
    ///
    /// Returns `Error::InsecureTemplate` or `Error::InvalidUrl` for a bad
    /// template, and `Error::InvalidVersion` for a bad default branch.
    pub fn new(config: ContentConfig) -> Result<Self, Error> {
        version::check_template(&config.template)?;
        version::validate_version(&config.default_branch)?;
        if let Some(dir) = &config.dir
            && dir.contains("..")
        {
            return Err(Error::InvalidInput(format!("content directory {dir:?} must not contain '..'")));
        }
        // Surfaces unparseable templates now rather than on the first request.
        version::resolve("", &config.template, &config.default_branch)?;

        let source = RemoteArchiveSource {
            template: config.template,
            dir: config.dir.map(|dir| normalize_dir(&dir)),
            default_branch: config.default_branch.clone(),
            fetcher: ArchiveFetcher::new(config.fetch)?,
        };

        Ok(Self::from_source(Arc::new(source), config.default_branch, config.ttl, config.refresh_timeout))
    }

    /// Build the content cache on top of an arbitrary snapshot source.
    pub fn from_source(
        source: Arc<dyn SnapshotSource>, default_branch: impl Into<String>, ttl: Duration, refresh_timeout: Duration,
    ) -> Self {
        Self { cache: SnapshotCache::new(source, ttl, refresh_timeout), default_branch: default_branch.into() }
    }

    pub fn default_branch(&self) -> &str {
        &self.default_branch
    }

    /// The version a request for `version` is served from.
    pub fn effective_version<'a>(&'a self, version: &'a str) -> &'a str {
        version::effective_version(version, &self.default_branch)
    }

    /// Get the snapshot for `version`; the empty string means the default
    /// branch.
    pub async fn resolve(&self, version: &str) -> Result<Arc<Snapshot>, Error> {
        let version = self.effective_version(version);
        version::validate_version(version)?;
        self.cache.get(version).await
    }

    /// Like [`resolve`](Self::resolve), giving up after `deadline`.
    ///
    /// The fetch itself keeps running for other callers.
    pub async fn resolve_within(&self, version: &str, deadline: Duration) -> Result<Arc<Snapshot>, Error> {
        match tokio::time::timeout(deadline, self.resolve(version)).await {
            Ok(result) => result,
            Err(_) => Err(Error::remote(format!(
                "resolving version {:?}: no snapshot within {deadline:?}",
                self.effective_version(version)
            ))),
        }
    }

    /// Download the default version, failing if the remote is unusable.
    pub async fn prefetch_default(&self) -> Result<Arc<Snapshot>, Error> {
        let snapshot = self.resolve("").await?;
        tracing::info!(
            version = %self.default_branch,
            source = snapshot.source(),
            files = snapshot.len(),
            bytes = snapshot.total_bytes(),
            "default content version ready"
        );
        Ok(snapshot)
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }
}

/// Give a configured directory the trailing slash the archive prefix needs.
fn normalize_dir(dir: &str) -> String {
    let dir = dir.trim_start_matches('/');
    if dir.is_empty() || dir.ends_with('/') { dir.to_string() } else { format!("{dir}/") }
}
