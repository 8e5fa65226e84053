//! uaflow Core - shared vocabulary for the address space and its clients
//!
//! This crate holds the types every other uaflow crate speaks:
//!
//! - [`NodeId`]: namespace-qualified node identifiers (`ns=4;s=VendorName`)
//! - [`Variant`], [`DataType`], [`StatusCode`]: values and outcomes
//! - [`NodeClass`], [`ReferenceType`], [`Argument`]: node metadata
//! - [`ReferenceDescription`], [`BrowseResult`]: browse records
//! - [`FlowMessage`] and its tagged payload decoders
//! - [`protocol`]: the JSON-RPC messages spoken over the endpoint
//!
//! # Example
//!
//! ```
//! use uaflow_core::NodeId;
//!
//! let id: NodeId = "ns=4;s=Equipment".parse().unwrap();
//! assert_eq!(id.namespace, 4);
//! assert_eq!(id.to_string(), "ns=4;s=Equipment");
//! ```

pub mod browse;
pub mod error;
pub mod message;
pub mod node;
pub mod node_id;
pub mod protocol;
pub mod status;
pub mod variant;

pub use browse::{BrowseDirection, BrowseResult, ReferenceDescription};
pub use error::{MessageError, NodeIdError};
pub use message::{BrowseRequest, FlowMessage, ServerCommand, ServerPayload, VariableMessage};
pub use node::{Argument, NodeClass, ReferenceType};
pub use node_id::{Identifier, NodeId};
pub use status::{Fill, Shape, StatusIndicator};
pub use variant::{DataType, StatusCode, Variant};
