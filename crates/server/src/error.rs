//! Structured errors for the docshelf server.
//!
//! Failures of the content cache map through `docshelf_core::Error`; these
//! cover what goes wrong while shaping a tool response.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Structured errors for the docshelf server.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The requested file is not UTF-8 text.
    #[error("NOT_TEXT: {0} is not a UTF-8 text file")]
    NotText(String),

    /// Tool output could not be encoded.
    #[error("SERIALIZE_FAILED: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let code = match &err {
            ToolError::NotText(_) => -32602,
            ToolError::Serialize(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_text_maps_to_invalid_params() {
        let err: McpError = ToolError::NotText("img/logo.png".into()).into();
        assert_eq!(err.code, ErrorCode(-32602));
        assert!(err.message.contains("img/logo.png"));
    }
}
