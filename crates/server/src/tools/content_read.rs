//! content_read tool implementation.
//!
//! Reads one page (or any file) from a version of the content archive.

use std::time::Duration;

use docshelf_client::VersionedContent;
use docshelf_core::Snapshot;
use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// Input parameters for content_read tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContentReadParams {
    /// Branch or tag to read from. Empty or omitted means the default branch.
    #[serde(default)]
    pub version: String,

    /// Page path as it appears in a URL, e.g. `admin/install`.
    /// `.md` and `/index.md` are tried when the exact file is missing.
    #[serde(default)]
    pub path: String,
}

/// Output structure for content_read tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContentReadOutput {
    /// The version the page was served from.
    pub version: String,
    /// Path of the file that matched, relative to the content root.
    pub path: String,
    /// Archive URL the snapshot was downloaded from.
    pub source: String,
    /// ISO8601 timestamp of when the snapshot was fetched.
    pub fetched_at: String,
    /// File size in bytes.
    pub bytes: usize,
    /// File contents.
    pub text: String,
}

/// Implementation of the content_read tool.
pub async fn read_impl(
    content: &VersionedContent, deadline: Duration, params: ContentReadParams,
) -> Result<CallToolResult, McpError> {
    let snapshot = content.resolve_within(&params.version, deadline).await?;
    let version = content.effective_version(&params.version).to_string();

    let output = read_page(&snapshot, version, &params.path)?;
    tracing::debug!(version = %output.version, path = %output.path, bytes = output.bytes, "content_read");

    let json = serde_json::to_string_pretty(&output).map_err(ToolError::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn read_page(snapshot: &Snapshot, version: String, path: &str) -> Result<ContentReadOutput, McpError> {
    let (file, data) = snapshot.resolve_page(path)?;
    let text = std::str::from_utf8(data).map_err(|_| ToolError::NotText(file.clone()))?;

    Ok(ContentReadOutput {
        version,
        path: file,
        source: snapshot.source().to_string(),
        fetched_at: snapshot.fetched_at().to_rfc3339(),
        bytes: data.len(),
        text: text.to_string(),
    })
}
