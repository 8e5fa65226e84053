//! Browse records returned by the address space.

use crate::node::{NodeClass, ReferenceType};
use crate::node_id::NodeId;
use crate::variant::StatusCode;
use serde::{Deserialize, Serialize};

/// Which references of a node a browse returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BrowseDirection {
    #[default]
    Forward,
    Inverse,
    Both,
}

impl BrowseDirection {
    pub fn includes_forward(self) -> bool {
        matches!(self, Self::Forward | Self::Both)
    }

    pub fn includes_inverse(self) -> bool {
        matches!(self, Self::Inverse | Self::Both)
    }
}

/// One reference discovered while browsing a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceDescription {
    pub reference_type: ReferenceType,
    pub is_forward: bool,
    /// The node on the far side of the reference.
    pub node_id: NodeId,
    pub browse_name: String,
    pub display_name: String,
    pub node_class: NodeClass,
}

/// The references found for one browsed node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseResult {
    pub status_code: StatusCode,
    pub references: Vec<ReferenceDescription>,
}

impl BrowseResult {
    pub fn good(references: Vec<ReferenceDescription>) -> Self {
        Self {
            status_code: StatusCode::Good,
            references,
        }
    }

    pub fn bad(status_code: StatusCode) -> Self {
        Self {
            status_code,
            references: Vec::new(),
        }
    }
}
