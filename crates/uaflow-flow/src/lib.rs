//! uaflow Flow - hosts uaflow nodes in a message-driven workflow
//!
//! Each node reads newline-delimited JSON flow messages and writes its
//! outbound messages the same way:
//!
//! - [`ServerNode`]: serves the address space and applies commands
//! - [`BrowserNode`]: browses an endpoint and republishes the items
//! - [`FlowConfig`]: the JSON configuration both nodes are built from

mod browser_node;
pub mod config;
mod host;
mod node;
mod server_node;

pub use browser_node::BrowserNode;
pub use config::FlowConfig;
pub use host::{run, run_stdio};
pub use node::FlowNode;
pub use server_node::ServerNode;
