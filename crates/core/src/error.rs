//! Unified error types for docshelf.
//!
//! Every failure a caller of the content cache can observe is one of these
//! variants. Errors are `Clone` so a single fetch outcome can be handed to
//! every task waiting on the same version.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Unified error types for docshelf.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Invalid tool or request parameters.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Version identifier rejected before any network access.
    #[error("INVALID_VERSION: {0}")]
    InvalidVersion(String),

    /// URL template would let a version string resolve ambiguous refs.
    #[error("INSECURE_TEMPLATE: {0}")]
    InsecureTemplate(String),

    /// Template or substituted URL is not a usable http(s) URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The remote host has no archive for this version (HTTP 404).
    #[error("VERSION_NOT_FOUND: {0}")]
    VersionNotFound(String),

    /// No file or directory at this path in the snapshot.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// Transport failure, timeout, oversized body or unexpected HTTP status.
    #[error("REMOTE_ERROR: {message}")]
    Remote { status: Option<u16>, message: String },

    /// Body is not a readable zip archive.
    #[error("ARCHIVE_PARSE: {0}")]
    ArchiveParse(String),
}

impl Error {
    /// Remote failure without an HTTP status (network error, timeout).
    pub fn remote(message: impl Into<String>) -> Self {
        Error::Remote { status: None, message: message.into() }
    }

    /// Remote failure carrying the unexpected HTTP status code.
    pub fn remote_status(status: u16, url: &str) -> Self {
        Error::Remote { status: Some(status), message: format!("GET {url}: HTTP response status code {status}") }
    }

    /// Whether this error means "does not exist" (version or path).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::VersionNotFound(_) | Error::NotFound(_))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::NotFound(msg) => (-32001, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::Remote { message, .. } => (-32008, message.clone()),
            Error::InvalidVersion(msg) => (-32020, msg.clone()),
            Error::InsecureTemplate(msg) => (-32021, msg.clone()),
            Error::VersionNotFound(msg) => (-32022, msg.clone()),
            Error::ArchiveParse(msg) => (-32023, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
