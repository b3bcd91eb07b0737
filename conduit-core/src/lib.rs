//! Core domain models and types for the conduit MCP daemon.
//!
//! This crate has no internal path dependencies and defines the domain
//! language shared by every other crate: the MCP entity model (functions,
//! modules, settings, call records), the JSON-RPC envelope, and the
//! JSON-Schema-driven argument validator.

pub mod error;
pub mod types;
pub mod validation;

pub use error::{ConduitError, Result};
pub use types::{
    CallFilter, CallStatus, CallUpdate, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    McpConfigurationDocument, McpFunction, McpFunctionCall, McpModule, McpSetting, McpType,
    MaterialisedConfig, ModuleLink, PartitionKey, ReturnType,
};
pub use validation::{validate_and_fill_defaults, ValidationOutcome};
