//! uaflow Client - browse a live address space from the flow
//!
//! This crate implements the browsing side of uaflow:
//!
//! - [`ProtocolClient`]: the connect/session/browse capability
//! - [`BrowseSession`]: one bounded connect → session → browse → close run
//! - [`BrowseController`]: picks a root per trigger and republishes items
//! - [`WsProtocolClient`]: the client for the uaflow WebSocket endpoint
//!
//! # Example
//!
//! ```no_run
//! use uaflow_client::{BrowseController, WsProtocolClient};
//! use uaflow_core::FlowMessage;
//!
//! # async fn run() {
//! let mut controller = BrowseController::new(WsProtocolClient::default, "ws://localhost:53880");
//! let out = controller.on_input(FlowMessage::default()).await;
//! println!("{}", out.payload);
//! # }
//! ```

mod client;
mod controller;
mod error;
mod session;
mod status;
mod ws;

pub use client::{ClientFactory, ProtocolClient};
pub use controller::{BrowseController, DEFAULT_ROOT};
pub use error::{BrowseError, BrowseStep, ClientError};
pub use session::{BrowseOutcome, BrowseSession, DEFAULT_STEP_TIMEOUT};
pub use status::BrowseStatus;
pub use ws::{WsConnection, WsProtocolClient, WsSession};
