//! References between address-space nodes.
//!
//! Inside the graph a reference is just its [`ReferenceType`] stored on a
//! directed edge. [`Reference`] is the owned, exportable form used for
//! queries and structural checks.

use serde::{Deserialize, Serialize};
use std::fmt;
use uaflow_core::{NodeId, ReferenceType};

/// A directed reference with both endpoints resolved to node ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub reference_type: ReferenceType,
    pub source: NodeId,
    pub target: NodeId,
}

impl Reference {
    pub fn new(reference_type: ReferenceType, source: NodeId, target: NodeId) -> Self {
        Self {
            reference_type,
            source,
            target,
        }
    }

    /// The endpoint that is not `from`, or `None` if `from` is neither end.
    pub fn other_end(&self, from: &NodeId) -> Option<&NodeId> {
        if &self.source == from {
            Some(&self.target)
        } else if &self.target == from {
            Some(&self.source)
        } else {
            None
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} --{}--> {}",
            self.source, self.reference_type, self.target
        )
    }
}
