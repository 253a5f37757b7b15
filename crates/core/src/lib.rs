//! Core types and shared functionality for docshelf.
//!
//! This crate provides:
//! - Immutable content snapshots
//! - The in-memory snapshot cache with background refresh
//! - Version identifier validation and archive URL resolution
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod snapshot;
pub mod version;

pub use cache::{SnapshotCache, SnapshotSource};
pub use config::AppConfig;
pub use error::Error;
pub use snapshot::{DirEntry, Snapshot};
