//! Shared trait definitions for the conduit MCP daemon.
//!
//! The daemon's external collaborators — the metadata store, the blob
//! store, and loaded tool/resource/prompt handlers — are modelled here as
//! traits so the rest of the workspace is runnable against any backend,
//! with a reference implementation shipped in `conduit-storage` and
//! `conduit-registry`.

pub mod blob;
pub mod metadata;
pub mod registry;

pub use blob::BlobStore;
pub use metadata::MetadataStore;
pub use registry::{Handler, HandlerConstructor, ModuleLoader, WithPartitionKey};
