//! content_list tool implementation.
//!
//! Lists a directory of a version of the content archive.

use std::time::Duration;

use docshelf_client::VersionedContent;
use docshelf_core::{DirEntry, Snapshot};
use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// Input parameters for content_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContentListParams {
    /// Branch or tag to list. Empty or omitted means the default branch.
    #[serde(default)]
    pub version: String,

    /// Directory relative to the content root. Empty lists the root.
    #[serde(default)]
    pub dir: String,
}

/// Output structure for content_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContentListOutput {
    /// The version the listing was served from.
    pub version: String,
    pub dir: String,
    /// Entries directly inside `dir`, sorted by name.
    pub entries: Vec<DirEntry>,
    /// Number of files in the whole snapshot.
    pub total_files: usize,
    /// ISO8601 timestamp of when the snapshot was fetched.
    pub fetched_at: String,
}

/// Implementation of the content_list tool.
pub async fn list_impl(
    content: &VersionedContent, deadline: Duration, params: ContentListParams,
) -> Result<CallToolResult, McpError> {
    let snapshot = content.resolve_within(&params.version, deadline).await?;
    let version = content.effective_version(&params.version).to_string();

    let output = list_dir(&snapshot, version, &params.dir)?;

    let json = serde_json::to_string_pretty(&output).map_err(ToolError::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn list_dir(snapshot: &Snapshot, version: String, dir: &str) -> Result<ContentListOutput, McpError> {
    let entries = snapshot.read_dir(dir)?;

    Ok(ContentListOutput {
        version,
        dir: dir.trim_matches('/').to_string(),
        entries,
        total_files: snapshot.len(),
        fetched_at: snapshot.fetched_at().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{DEADLINE, content};
    use rmcp::model::ErrorCode;

    #[tokio::test]
    async fn test_list_root() {
        let snapshot = content().resolve("").await.unwrap();
        let output = list_dir(&snapshot, "main".into(), "/").unwrap();

        let names: Vec<_> = output.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["admin", "img", "index.md"]);
        assert_eq!(output.total_files, 4);
        assert_eq!(output.dir, "");
    }

    #[tokio::test]
    async fn test_list_nested() {
        let snapshot = content().resolve("").await.unwrap();
        let output = list_dir(&snapshot, "main".into(), "admin/").unwrap();

        assert_eq!(output.dir, "admin");
        assert_eq!(output.entries.len(), 2);
        assert!(output.entries[0].is_dir);
        assert_eq!(output.entries[0].path, "admin/config");
        assert_eq!(output.entries[1].size, Some(14));
    }

    #[tokio::test]
    async fn test_list_impl_missing_dir() {
        let params = ContentListParams { version: String::new(), dir: "nope".into() };
        let err = list_impl(&content(), DEADLINE, params).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32001));
    }

    #[tokio::test]
    async fn test_list_impl_named_version() {
        let content = content();
        let params = ContentListParams { version: "v2.0".into(), dir: String::new() };
        let result = list_impl(&content, DEADLINE, params).await.unwrap();

        assert!(!result.is_error.unwrap_or(false));
        assert_eq!(content.cache().cached_versions(), vec!["v2.0".to_string()]);
    }
}
