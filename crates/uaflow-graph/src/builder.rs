//! Address-space builder: standard folders plus an optional model seed.
//!
//! The builder handles a two-phase process:
//! 1. Add the namespace-0 skeleton (Root, Objects, Types, Views, Server)
//! 2. Place seed nodes, resolving parents across passes so the seed file
//!    may list nodes in any order

use crate::binding::{SharedValue, VariableBinding};
use crate::error::{GraphError, SeedError};
use crate::graph::AddressSpace;
use crate::node::{NodeBody, UaNode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use uaflow_core::{DataType, NodeId, ReferenceType, Variant};

/// A static node declared by a model seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedNode {
    pub node_id: NodeId,
    pub browse_name: String,
    pub parent: NodeId,

    /// Defaults to Organizes for objects and HasComponent for variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_type: Option<ReferenceType>,

    /// Present for variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Variant>,

    #[serde(default)]
    pub writable: bool,
}

impl SeedNode {
    fn into_node(self) -> (NodeId, ReferenceType, UaNode) {
        let body = match self.data_type {
            Some(data_type) => {
                let value = self.value.unwrap_or_default();
                let binding = if self.writable {
                    VariableBinding::stored(SharedValue::new(value))
                } else {
                    VariableBinding::constant(value)
                };
                NodeBody::Variable { data_type, binding }
            }
            None => NodeBody::Object,
        };
        let reference_type = self.reference_type.unwrap_or(match body {
            NodeBody::Object => ReferenceType::Organizes,
            _ => ReferenceType::HasComponent,
        });
        (
            self.parent,
            reference_type,
            UaNode::new(self.node_id, self.browse_name, body),
        )
    }
}

/// Static model content loaded before vendor construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSeed {
    #[serde(default)]
    pub nodes: Vec<SeedNode>,
}

impl ModelSeed {
    /// Loads a seed from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SeedError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Builds a fresh [`AddressSpace`].
#[derive(Debug, Default)]
pub struct AddressSpaceBuilder {
    seed: ModelSeed,
}

impl AddressSpaceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: ModelSeed) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> Result<AddressSpace, SeedError> {
        let mut space = AddressSpace::new();
        add_standard_nodes(&mut space)?;

        let mut pending = self.seed.nodes;
        let total = pending.len();

        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();

            for seed in pending {
                if space.contains(&seed.parent) {
                    let (parent, reference_type, node) = seed.into_node();
                    space.add_child(&parent, reference_type, node)?;
                } else {
                    deferred.push(seed);
                }
            }

            if deferred.len() == before {
                // No progress: the first remaining parent can never resolve.
                let orphan = deferred.swap_remove(0);
                return Err(GraphError::ParentNotFound(orphan.parent).into());
            }
            debug!("Seed pass placed {} nodes", before - deferred.len());
            pending = deferred;
        }

        if total > 0 {
            info!("Loaded {} seed nodes", total);
        }
        Ok(space)
    }
}

fn add_standard_nodes(space: &mut AddressSpace) -> Result<(), GraphError> {
    space.add_root(NodeId::ROOT_FOLDER, "Root")?;
    space.add_object(&NodeId::ROOT_FOLDER, NodeId::OBJECTS_FOLDER, "Objects")?;
    space.add_object(&NodeId::ROOT_FOLDER, NodeId::TYPES_FOLDER, "Types")?;
    space.add_object(&NodeId::ROOT_FOLDER, NodeId::VIEWS_FOLDER, "Views")?;
    space.add_object(&NodeId::OBJECTS_FOLDER, NodeId::SERVER, "Server")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use uaflow_core::{BrowseDirection, NodeClass};

    #[test]
    fn test_standard_nodes() {
        let space = AddressSpaceBuilder::new().build().unwrap();
        assert_eq!(space.node_count(), 5);
        assert_eq!(space.root().map(|n| &n.node_id), Some(&NodeId::ROOT_FOLDER));

        let objects = space.browse(&NodeId::OBJECTS_FOLDER, BrowseDirection::Forward);
        assert_eq!(objects.references.len(), 1);
        assert_eq!(objects.references[0].browse_name, "Server");
    }

    #[test]
    fn test_seed_resolves_out_of_order_parents() {
        let seed = ModelSeed::from_json(
            r#"{"nodes": [
                {"nodeId": "ns=3;s=Pump", "browseName": "Pump", "parent": "ns=3;s=Line1"},
                {"nodeId": "ns=3;s=Line1", "browseName": "Line1", "parent": "ns=0;i=85"},
                {"nodeId": "ns=3;s=Speed", "browseName": "Speed", "parent": "ns=3;s=Pump",
                 "dataType": "Double", "value": {"dataType": "Double", "value": 1450.0}}
            ]}"#,
        )
        .unwrap();

        let space = AddressSpaceBuilder::new().with_seed(seed).build().unwrap();
        let pump = NodeId::string(3, "Pump");
        let speed = NodeId::string(3, "Speed");

        assert_eq!(
            space.parent_of(&pump).map(|r| r.source),
            Some(NodeId::string(3, "Line1"))
        );
        assert_eq!(
            space.find_node(&speed).map(|n| n.node_class()),
            Some(NodeClass::Variable)
        );
        assert_eq!(space.read_value(&speed), Ok(Variant::Double(1450.0)));
        assert_eq!(
            space.parent_of(&speed).map(|r| r.reference_type),
            Some(ReferenceType::HasComponent)
        );
    }

    #[test]
    fn test_seed_with_orphan_fails() {
        let seed = ModelSeed {
            nodes: vec![SeedNode {
                node_id: NodeId::string(3, "Lost"),
                browse_name: "Lost".into(),
                parent: NodeId::string(3, "Nowhere"),
                reference_type: None,
                data_type: None,
                value: None,
                writable: false,
            }],
        };
        let err = AddressSpaceBuilder::new().with_seed(seed).build().unwrap_err();
        assert!(matches!(err, SeedError::Graph(GraphError::ParentNotFound(_))));
    }

    #[test]
    fn test_seed_duplicate_of_standard_node_fails() {
        let seed = ModelSeed::from_json(
            r#"{"nodes": [{"nodeId": "ns=0;i=2253", "browseName": "Server", "parent": "ns=0;i=85"}]}"#,
        )
        .unwrap();
        let err = AddressSpaceBuilder::new().with_seed(seed).build().unwrap_err();
        assert!(matches!(
            err,
            SeedError::Graph(GraphError::DuplicateIdentifier(_))
        ));
    }

    #[test]
    fn test_seed_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"nodes": [{{"nodeId": "ns=2;s=Site", "browseName": "Site", "parent": "i=85"}}]}}"#
        )
        .unwrap();

        let seed = ModelSeed::from_path(file.path()).unwrap();
        assert_eq!(seed.nodes.len(), 1);

        let missing = ModelSeed::from_path(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(SeedError::Io(_))));
    }
}
