//! Client code for docshelf.
//!
//! This crate provides the archive download pipeline and the versioned
//! content cache built on top of it, shared by the server.

pub mod content;
pub mod fetch;

pub use content::{ContentConfig, RemoteArchiveSource, VersionedContent};
pub use fetch::{ArchiveError, ArchiveFetcher, FetchConfig};
