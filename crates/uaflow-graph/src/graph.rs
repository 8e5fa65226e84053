//! Core address-space data structure.
//!
//! The AddressSpace wraps a petgraph stable graph and adds an identifier
//! index so nodes can be found by [`NodeId`]. A stable graph keeps node
//! handles valid when other nodes are deleted at runtime.

use crate::binding::{MethodBinding, MethodHandler, PreparedCall, VariableBinding};
use crate::error::GraphError;
use crate::node::{NodeBody, UaNode};
use crate::reference::Reference;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use uaflow_core::{
    Argument, BrowseDirection, BrowseResult, DataType, NodeClass, NodeId, ReferenceDescription,
    ReferenceType, StatusCode, Variant,
};

/// Handle to a node inside one address-space instance.
pub type NodeHandle = NodeIndex;

/// First numeric id handed out to nodes created without an explicit id.
const FIRST_ASSIGNED_ID: u32 = 1000;

/// The hierarchical node graph served by the endpoint.
///
/// Invariants:
/// - node ids are unique; an id is never handed out twice by one instance
/// - every node except the root has exactly one hierarchical parent reference
#[derive(Debug)]
pub struct AddressSpace {
    graph: StableDiGraph<UaNode, ReferenceType>,

    /// Maps node ids to graph handles.
    id_index: HashMap<NodeId, NodeHandle>,

    /// Maps browse names to handles (for search).
    name_index: HashMap<String, Vec<NodeHandle>>,

    root: Option<NodeHandle>,
    next_seq: u64,
    next_assigned_id: u32,
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressSpace {
    /// Creates an empty address space with no root.
    ///
    /// Most callers want [`AddressSpaceBuilder`](crate::AddressSpaceBuilder),
    /// which adds the standard folders first.
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::new(),
            id_index: HashMap::new(),
            name_index: HashMap::new(),
            root: None,
            next_seq: 0,
            next_assigned_id: FIRST_ASSIGNED_ID,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Construction
    // ─────────────────────────────────────────────────────────────────────────

    /// Adds the parentless root node. Only one root may exist.
    pub fn add_root(
        &mut self,
        node_id: NodeId,
        browse_name: impl Into<String>,
    ) -> Result<NodeHandle, GraphError> {
        if self.root.is_some() {
            return Err(GraphError::RootExists);
        }
        if self.id_index.contains_key(&node_id) {
            return Err(GraphError::DuplicateIdentifier(node_id));
        }
        let handle = self.insert(UaNode::new(node_id, browse_name, NodeBody::Object));
        self.root = Some(handle);
        Ok(handle)
    }

    /// Adds an object organized by `parent`.
    pub fn add_object(
        &mut self,
        parent: &NodeId,
        node_id: NodeId,
        browse_name: impl Into<String>,
    ) -> Result<NodeHandle, GraphError> {
        self.add_child(
            parent,
            ReferenceType::Organizes,
            UaNode::new(node_id, browse_name, NodeBody::Object),
        )
    }

    /// Adds a variable as a component of `parent`.
    pub fn add_variable(
        &mut self,
        parent: &NodeId,
        node_id: NodeId,
        browse_name: impl Into<String>,
        data_type: DataType,
        binding: VariableBinding,
    ) -> Result<NodeHandle, GraphError> {
        self.add_child(
            parent,
            ReferenceType::HasComponent,
            UaNode::new(node_id, browse_name, NodeBody::Variable { data_type, binding }),
        )
    }

    /// Adds a method as a component of `parent`.
    ///
    /// The method's id is assigned by the address space, in the parent's
    /// namespace.
    pub fn add_method(
        &mut self,
        parent: &NodeId,
        browse_name: impl Into<String>,
        inputs: Vec<Argument>,
        outputs: Vec<Argument>,
        handler: MethodHandler,
    ) -> Result<NodeHandle, GraphError> {
        if !self.id_index.contains_key(parent) {
            return Err(GraphError::ParentNotFound(parent.clone()));
        }
        let node_id = self.assign_id(parent.namespace);
        self.add_child(
            parent,
            ReferenceType::HasComponent,
            UaNode::new(
                node_id,
                browse_name,
                NodeBody::Method(MethodBinding::new(inputs, outputs, handler)),
            ),
        )
    }

    /// Adds `node` below `parent` through a reference of the given type.
    pub(crate) fn add_child(
        &mut self,
        parent: &NodeId,
        reference_type: ReferenceType,
        node: UaNode,
    ) -> Result<NodeHandle, GraphError> {
        if self.id_index.contains_key(&node.node_id) {
            return Err(GraphError::DuplicateIdentifier(node.node_id));
        }
        let parent_handle = self
            .handle_of(parent)
            .ok_or_else(|| GraphError::ParentNotFound(parent.clone()))?;

        debug!(
            "Adding {} {} under {} ({})",
            node.node_class(),
            node.node_id,
            parent,
            reference_type
        );

        let handle = self.insert(node);
        self.graph.add_edge(parent_handle, handle, reference_type);
        Ok(handle)
    }

    fn insert(&mut self, mut node: UaNode) -> NodeHandle {
        node.seq = self.next_seq;
        self.next_seq += 1;

        let id = node.node_id.clone();
        let name = node.browse_name.clone();
        let handle = self.graph.add_node(node);

        self.id_index.insert(id, handle);
        self.name_index.entry(name).or_default().push(handle);
        handle
    }

    fn assign_id(&mut self, namespace: u16) -> NodeId {
        loop {
            let candidate = NodeId::numeric(namespace, self.next_assigned_id);
            self.next_assigned_id += 1;
            if !self.id_index.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookup
    // ─────────────────────────────────────────────────────────────────────────

    /// Finds a node by id.
    pub fn find_node(&self, id: &NodeId) -> Option<&UaNode> {
        let handle = self.id_index.get(id)?;
        self.graph.node_weight(*handle)
    }

    /// Gets a node by its handle.
    pub fn get(&self, handle: NodeHandle) -> Option<&UaNode> {
        self.graph.node_weight(handle)
    }

    /// Gets the handle for a node id.
    pub fn handle_of(&self, id: &NodeId) -> Option<NodeHandle> {
        self.id_index.get(id).copied()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.id_index.contains_key(id)
    }

    /// Finds all nodes with a given browse name.
    pub fn find_by_name(&self, name: &str) -> Vec<&UaNode> {
        self.name_index
            .get(name)
            .map(|handles| {
                handles
                    .iter()
                    .filter_map(|h| self.graph.node_weight(*h))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the references of `reference_type` touching `id`.
    ///
    /// Forward references start at `id`; inverse ones end at it. Results are
    /// in creation order of the node at the other end. An unknown id yields
    /// an empty list.
    pub fn find_references(
        &self,
        id: &NodeId,
        reference_type: ReferenceType,
        forward: bool,
    ) -> Vec<Reference> {
        self.references(id, forward)
            .into_iter()
            .filter(|(ty, _)| *ty == reference_type)
            .filter_map(|(ty, other)| {
                let other = self.graph.node_weight(other)?.node_id.clone();
                Some(if forward {
                    Reference::new(ty, id.clone(), other)
                } else {
                    Reference::new(ty, other, id.clone())
                })
            })
            .collect()
    }

    /// Returns the hierarchical reference from `id`'s parent, if any.
    pub fn parent_of(&self, id: &NodeId) -> Option<Reference> {
        self.references(id, false)
            .into_iter()
            .find(|(ty, _)| ty.is_hierarchical())
            .and_then(|(ty, parent)| {
                let parent = self.graph.node_weight(parent)?.node_id.clone();
                Some(Reference::new(ty, parent, id.clone()))
            })
    }

    /// Edges touching `id` in one direction, sorted by creation order of the
    /// other endpoint.
    fn references(&self, id: &NodeId, forward: bool) -> Vec<(ReferenceType, NodeHandle)> {
        let Some(handle) = self.handle_of(id) else {
            return Vec::new();
        };
        let direction = if forward {
            Direction::Outgoing
        } else {
            Direction::Incoming
        };

        let mut refs: Vec<_> = self
            .graph
            .edges_directed(handle, direction)
            .map(|edge| {
                let other = if forward { edge.target() } else { edge.source() };
                (*edge.weight(), other)
            })
            .collect();
        refs.sort_by_key(|(_, other)| self.graph.node_weight(*other).map(|n| n.seq));
        refs
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Removes a node and every reference touching it.
    ///
    /// Children are not removed; deleting a node that still organizes
    /// others leaves those children without a parent.
    pub fn delete_node(&mut self, id: &NodeId) -> Result<UaNode, GraphError> {
        let handle = self
            .id_index
            .remove(id)
            .ok_or_else(|| GraphError::NotFound(id.clone()))?;

        let node = self
            .graph
            .remove_node(handle)
            .ok_or_else(|| GraphError::NotFound(id.clone()))?;

        if let Some(handles) = self.name_index.get_mut(&node.browse_name) {
            handles.retain(|h| *h != handle);
            if handles.is_empty() {
                self.name_index.remove(&node.browse_name);
            }
        }
        if self.root == Some(handle) {
            self.root = None;
        }

        debug!("Deleted {} {}", node.node_class(), node.node_id);
        Ok(node)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Services
    // ─────────────────────────────────────────────────────────────────────────

    /// Lists the references of a node as browse records.
    pub fn browse(&self, id: &NodeId, direction: BrowseDirection) -> BrowseResult {
        if !self.contains(id) {
            return BrowseResult::bad(StatusCode::BadNodeIdUnknown);
        }

        let mut references = Vec::new();
        let mut collect = |forward: bool| {
            for (ty, other) in self.references(id, forward) {
                if let Some(node) = self.graph.node_weight(other) {
                    references.push(ReferenceDescription {
                        reference_type: ty,
                        is_forward: forward,
                        node_id: node.node_id.clone(),
                        browse_name: node.browse_name.clone(),
                        display_name: node.display_name.clone(),
                        node_class: node.node_class(),
                    });
                }
            }
        };

        if direction.includes_forward() {
            collect(true);
        }
        if direction.includes_inverse() {
            collect(false);
        }

        BrowseResult::good(references)
    }

    /// Reads the current value of a variable.
    pub fn read_value(&self, id: &NodeId) -> Result<Variant, StatusCode> {
        let node = self.find_node(id).ok_or(StatusCode::BadNodeIdUnknown)?;
        match &node.body {
            NodeBody::Variable { binding, .. } => Ok(binding.read()),
            _ => Err(StatusCode::BadAttributeIdInvalid),
        }
    }

    /// Writes a variable through its binding.
    ///
    /// The value is coerced to the declared data type first; a value that
    /// cannot be coerced is rejected with `BadTypeMismatch` and the binding
    /// is not touched.
    pub fn write_value(&self, id: &NodeId, value: &Variant) -> StatusCode {
        let Some(node) = self.find_node(id) else {
            return StatusCode::BadNodeIdUnknown;
        };
        let NodeBody::Variable { data_type, binding } = &node.body else {
            return StatusCode::BadAttributeIdInvalid;
        };
        if !binding.is_writable() {
            return StatusCode::BadNotWritable;
        }
        match value.coerce(*data_type) {
            Some(coerced) => binding.write(coerced),
            None => StatusCode::BadTypeMismatch,
        }
    }

    /// Validates a method call and detaches it from the graph.
    pub fn prepare_call(
        &self,
        method_id: &NodeId,
        inputs: &[Variant],
    ) -> Result<PreparedCall, StatusCode> {
        let node = self
            .find_node(method_id)
            .ok_or(StatusCode::BadNodeIdUnknown)?;
        node.method()
            .ok_or(StatusCode::BadMethodInvalid)?
            .prepare(inputs)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────────────────

    pub fn root(&self) -> Option<&UaNode> {
        self.root.and_then(|h| self.graph.node_weight(h))
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of references.
    pub fn reference_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Iterates over all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &UaNode> {
        self.graph.node_weights()
    }

    /// Returns all references with resolved endpoints.
    pub fn export_references(&self) -> Vec<Reference> {
        self.graph
            .edge_references()
            .filter_map(|edge| {
                let source = self.graph.node_weight(edge.source())?.node_id.clone();
                let target = self.graph.node_weight(edge.target())?.node_id.clone();
                Some(Reference::new(*edge.weight(), source, target))
            })
            .collect()
    }

    /// Returns address-space statistics.
    pub fn stats(&self) -> AddressSpaceStats {
        let mut stats = AddressSpaceStats {
            node_count: self.node_count(),
            reference_count: self.reference_count(),
            ..AddressSpaceStats::default()
        };
        for node in self.nodes() {
            match node.node_class() {
                NodeClass::Object => stats.objects += 1,
                NodeClass::Variable => stats.variables += 1,
                NodeClass::Method => stats.methods += 1,
            }
        }
        stats
    }
}

/// Address-space statistics for the info endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpaceStats {
    pub node_count: usize,
    pub reference_count: usize,
    pub objects: usize,
    pub variables: usize,
    pub methods: usize,
}
