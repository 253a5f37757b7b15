//! docshelf server entry point.
//!
//! Loads configuration, downloads the default content version and boots the
//! MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::{Context, Result};
use docshelf_client::{ContentConfig, VersionedContent};
use docshelf_core::AppConfig;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(
        content_url = %config.content_url,
        default_branch = %config.default_branch,
        ttl_secs = config.cache_ttl_secs,
        "Starting docshelf server on stdio transport"
    );

    let content = VersionedContent::new(ContentConfig::from(&config)).context("configuring content cache")?;
    if config.prefetch_default {
        content.prefetch_default().await.context("downloading content default version")?;
    }

    let handler = handler::DocshelfServer::new(content, config.refresh_timeout());
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
