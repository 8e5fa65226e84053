//! uaflow Graph - the live address space
//!
//! This crate manages the hierarchical graph of objects, variables and
//! methods served by the endpoint, and the bindings that give variables
//! and methods their live behavior.
//!
//! # Architecture
//!
//! The graph uses a petgraph stable graph internally with indexes for:
//! - Id-based lookups
//! - Browse-name lookups
//!
//! # Example
//!
//! ```
//! use uaflow_core::{DataType, NodeId, Variant};
//! use uaflow_graph::{AddressSpaceBuilder, VariableBinding};
//!
//! let mut space = AddressSpaceBuilder::new().build().unwrap();
//! let plant = NodeId::string(4, "Plant");
//! space.add_object(&NodeId::OBJECTS_FOLDER, plant.clone(), "Plant").unwrap();
//! space
//!     .add_variable(
//!         &plant,
//!         NodeId::string(4, "Level"),
//!         "Level",
//!         DataType::Double,
//!         VariableBinding::constant(Variant::Double(0.5)),
//!     )
//!     .unwrap();
//!
//! assert!(space.find_node(&plant).is_some());
//! ```

mod binding;
mod builder;
mod error;
mod graph;
mod node;
mod reference;

pub use binding::{
    CallResult, MethodBinding, MethodHandler, PreparedCall, SharedValue, VariableBinding,
};
pub use builder::{AddressSpaceBuilder, ModelSeed, SeedNode};
pub use error::{GraphError, SeedError};
pub use graph::{AddressSpace, AddressSpaceStats, NodeHandle};
pub use node::{NodeBody, UaNode};
pub use reference::Reference;
