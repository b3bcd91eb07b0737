//! Module/handler loading surface (§4.C).
//!
//! The source selects a handler by `(package, module, class)` strings and
//! calls a named function on it. This trait models that capability set so
//! `conduit-registry` can ship both a static in-process registry and an
//! on-demand zip-download-and-extract loader without `conduit-mcp`
//! depending on either concretely (§9 "dynamic dispatch over handlers").

use async_trait::async_trait;
use conduit_core::error::Result;
use serde_json::Value;
use std::sync::Arc;

/// A constructed, callable handler instance. Handlers are constructed once
/// per `(module_name, class_name)` per request and invoked by function
/// name; the loader may cache constructed handlers across requests for the
/// same partition as long as `partition_key` is re-stamped per call.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Invoke `function_name` with `args`, returning whatever JSON shape
    /// the handler produces — the dispatch engine (§4.F) is responsible
    /// for classifying it into MCP content.
    async fn call(&self, function_name: &str, args: Value) -> Result<Value>;

    /// Set the request's partition key on the handler instance, mirroring
    /// "if the resulting object has a writable `partition_key` field, set
    /// it" (§4.C). A no-op for handlers without such a field.
    fn set_partition_key(&self, _partition_key: &str) {}
}

/// Constructs a `Handler` from its settings map and a logger-equivalent
/// context (here, a `tracing::Span`-scoped target string is enough since
/// `tracing` macros pick up the ambient span).
pub type HandlerConstructor =
    Arc<dyn Fn(Value) -> Result<Arc<dyn Handler>> + Send + Sync>;

/// Resolves `(package, module, class)` to a constructed `Handler`,
/// downloading and extracting a packaged archive on miss when `source`
/// is present (§4.C).
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(
        &self,
        package_name: Option<&str>,
        module_name: &str,
        class_name: &str,
        source: Option<&str>,
        setting: Value,
    ) -> Result<Arc<dyn Handler>>;
}

/// Marker trait documenting the "writable `partition_key` field"
/// constructor convention (§4.C); implemented by generated/registered
/// handler wrapper types that expose such a field.
pub trait WithPartitionKey {
    fn set_partition_key(&mut self, partition_key: &str);
}
