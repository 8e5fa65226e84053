//! Node weights stored in the address-space graph.

use crate::binding::{MethodBinding, VariableBinding};
use uaflow_core::{DataType, NodeClass, NodeId};

/// What a node is, together with its live behavior.
#[derive(Debug, Clone)]
pub enum NodeBody {
    Object,
    Variable {
        data_type: DataType,
        binding: VariableBinding,
    },
    Method(MethodBinding),
}

/// A node in the address space.
#[derive(Debug, Clone)]
pub struct UaNode {
    pub node_id: NodeId,
    pub browse_name: String,
    pub display_name: String,
    pub body: NodeBody,
    /// Creation order within the graph; browse results are sorted by it.
    pub(crate) seq: u64,
}

impl UaNode {
    pub(crate) fn new(node_id: NodeId, browse_name: impl Into<String>, body: NodeBody) -> Self {
        let browse_name = browse_name.into();
        Self {
            node_id,
            display_name: browse_name.clone(),
            browse_name,
            body,
            seq: 0,
        }
    }

    pub fn node_class(&self) -> NodeClass {
        match self.body {
            NodeBody::Object => NodeClass::Object,
            NodeBody::Variable { .. } => NodeClass::Variable,
            NodeBody::Method(_) => NodeClass::Method,
        }
    }

    pub fn data_type(&self) -> Option<DataType> {
        match &self.body {
            NodeBody::Variable { data_type, .. } => Some(*data_type),
            _ => None,
        }
    }

    pub fn method(&self) -> Option<&MethodBinding> {
        match &self.body {
            NodeBody::Method(method) => Some(method),
            _ => None,
        }
    }
}
