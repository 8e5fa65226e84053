//! Node metadata shared between the address space and its clients.

use crate::variant::{DataType, Variant};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The class of a node in the address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeClass {
    Object,
    Variable,
    Method,
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Object => "Object",
            Self::Variable => "Variable",
            Self::Method => "Method",
        };
        write!(f, "{}", s)
    }
}

/// The type of a directed reference between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceType {
    /// Folder-style organization (Objects organizes VendorName).
    Organizes,

    /// Part-of relationship (VendorName has the component Counter).
    HasComponent,

    /// Property attachment.
    HasProperty,
}

impl ReferenceType {
    /// Hierarchical references define a node's parent.
    pub fn is_hierarchical(self) -> bool {
        matches!(
            self,
            Self::Organizes | Self::HasComponent | Self::HasProperty
        )
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Organizes => "Organizes",
            Self::HasComponent => "HasComponent",
            Self::HasProperty => "HasProperty",
        };
        write!(f, "{}", s)
    }
}

/// Describes one input or output argument of a method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Argument {
    pub name: String,
    pub description: String,
    pub data_type: DataType,
    /// -1 for scalars, 1 for one-dimensional arrays.
    pub value_rank: i32,
}

impl Argument {
    pub fn scalar(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            data_type,
            value_rank: -1,
        }
    }

    pub fn array(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            value_rank: 1,
            ..Self::scalar(name, data_type)
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn is_array(&self) -> bool {
        self.value_rank >= 1
    }

    /// Checks that `value` has exactly the shape this argument declares.
    pub fn matches(&self, value: &Variant) -> bool {
        match value {
            Variant::Array(items) if self.is_array() => items
                .iter()
                .all(|item| item.data_type() == Some(self.data_type)),
            _ if self.is_array() => false,
            scalar => scalar.data_type() == Some(self.data_type),
        }
    }

    /// Converts `value` into this argument's declared type, if possible.
    pub fn coerce(&self, value: &Variant) -> Option<Variant> {
        if self.matches(value) {
            return Some(value.clone());
        }
        match value {
            Variant::Array(items) if self.is_array() => items
                .iter()
                .map(|item| item.coerce(self.data_type))
                .collect::<Option<Vec<_>>>()
                .map(Variant::Array),
            Variant::Array(_) => None,
            _ if self.is_array() => None,
            scalar => scalar.coerce(self.data_type),
        }
    }
}
