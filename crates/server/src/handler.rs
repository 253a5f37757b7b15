//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::time::Duration;

use crate::tools::content_list::{ContentListParams, list_impl};
use crate::tools::content_read::{ContentReadParams, read_impl};

use docshelf_client::VersionedContent;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for docshelf.
#[derive(Clone)]
pub struct DocshelfServer {
    tool_router: ToolRouter<Self>,
    content: VersionedContent,
    /// How long a tool call waits for a version to download.
    deadline: Duration,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl DocshelfServer {
    /// Create a new server handler.
    pub fn new(content: VersionedContent, deadline: Duration) -> Self {
        Self { tool_router: Self::tool_router(), content, deadline }
    }

    /// Read a documentation page from a given version.
    #[tool(
        description = "Read a documentation page. `version` is a branch or tag (empty for the default branch); \
                       `path` is the page path, tried as-is, with `.md`, then as a directory index."
    )]
    async fn content_read(&self, params: Parameters<ContentReadParams>) -> Result<CallToolResult, McpError> {
        read_impl(&self.content, self.deadline, params.0).await
    }

    /// List a directory of a given version.
    #[tool(description = "List files and subdirectories of a documentation directory for a branch or tag.")]
    async fn content_list(&self, params: Parameters<ContentListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.content, self.deadline, params.0).await
    }
}

impl ServerHandler for DocshelfServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "docshelf".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(format!(
                "Versioned documentation pages. Omit `version` to read the default branch ({}).",
                self.content.default_branch()
            )),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
