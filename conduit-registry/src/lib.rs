//! Dynamic module/handler resolution for the conduit MCP daemon (§4.C).
//!
//! Two collaborating pieces: a [`StaticHandlerRegistry`] of
//! already-linked-in handler constructors, and [`ConduitModuleLoader`],
//! which additionally knows how to fetch and extract a packaged archive
//! on miss and dlopen it into the same registry.

pub mod error;
pub mod loader;
pub mod static_registry;

pub use error::{RegistryError, Result};
pub use loader::{ConduitModuleLoader, PackageLoaderConfig};
pub use static_registry::StaticHandlerRegistry;
