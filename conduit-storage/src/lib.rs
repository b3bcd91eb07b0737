//! Reference storage layer for the conduit MCP daemon.
//!
//! `mcp_store` implements the `conduit-interfaces` `MetadataStore` and
//! `BlobStore` traits directly over `sqlx`/the filesystem; this is the
//! only storage surface the daemon has a counterpart for.

pub mod error;
pub mod mcp_store;

pub use error::{StorageError, StorageResult};
pub use mcp_store::{FilesystemBlobStore, SqliteMetadataStore};
