//! Re-exports the shared error taxonomy (§7).
//!
//! The daemon's components all return [`conduit_core::error::ConduitError`]
//! directly rather than wrapping it in a crate-local type — the taxonomy
//! already distinguishes every case the dispatch/cache/SSE/config-store
//! layers need, and a wrapper here would just be a pass-through.

pub use conduit_core::error::{ConduitError, Result};
