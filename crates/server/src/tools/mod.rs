//! MCP tool implementations.
//!
//! This module contains all tools exposed by the docshelf server.

pub mod content_list;
pub mod content_read;
