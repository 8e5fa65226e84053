//! uaflow Server - live address-space endpoint
//!
//! This crate hosts a mutable address space behind a WebSocket endpoint and
//! lets an upstream flow reshape it at runtime.
//!
//! The server supports:
//! - Multiple concurrent connections, each with its own sessions
//! - JSON-RPC 2.0 browse, read, write and call
//! - Restart-in-place with a freshly built address space
//! - Adding and deleting nodes through flow messages

mod dispatch;
mod error;
mod handlers;
mod lifecycle;
pub mod model;
mod runtime;
mod server;
mod status;

pub use dispatch::{CommandDispatcher, DispatchError, DispatchOutcome, Effect, COUNTER_VARIABLE};
pub use error::ServerError;
pub use lifecycle::{ServerLifecycle, ServerState};
pub use model::{DynamicCategory, ProcessValues, VendorModel};
pub use runtime::{
    BuildInfo, Endpoint, ServerConfig, ServerRuntime, SharedAddressSpace, DEFAULT_PORT,
};
pub use server::{WsEndpoint, WsRuntime};
pub use status::ServerStatus;
