//! Namespace-qualified node identifiers.
//!
//! Identifiers use the familiar textual form `ns=<index>;<type>=<value>`
//! where `<type>` is `i` (numeric) or `s` (string). The namespace prefix
//! may be omitted, in which case namespace 0 is assumed.

use crate::error::NodeIdError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The key part of a node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identifier {
    Numeric(u32),
    String(String),
}

/// A node identifier, unique within one address space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId {
    pub namespace: u16,
    pub identifier: Identifier,
}

impl NodeId {
    /// `ns=0;i=84`, the top of every address space.
    pub const ROOT_FOLDER: NodeId = NodeId::numeric(0, 84);
    /// `ns=0;i=85`, the default browse root.
    pub const OBJECTS_FOLDER: NodeId = NodeId::numeric(0, 85);
    pub const TYPES_FOLDER: NodeId = NodeId::numeric(0, 86);
    pub const VIEWS_FOLDER: NodeId = NodeId::numeric(0, 87);
    pub const SERVER: NodeId = NodeId::numeric(0, 2253);

    pub const fn numeric(namespace: u16, value: u32) -> Self {
        Self {
            namespace,
            identifier: Identifier::Numeric(value),
        }
    }

    pub fn string(namespace: u16, value: impl Into<String>) -> Self {
        Self {
            namespace,
            identifier: Identifier::String(value.into()),
        }
    }

    /// Returns the string key, if this is a string identifier.
    pub fn as_str(&self) -> Option<&str> {
        match &self.identifier {
            Identifier::String(s) => Some(s),
            Identifier::Numeric(_) => None,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identifier {
            Identifier::Numeric(n) => write!(f, "ns={};i={}", self.namespace, n),
            Identifier::String(s) => write!(f, "ns={};s={}", self.namespace, s),
        }
    }
}

impl FromStr for NodeId {
    type Err = NodeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(NodeIdError::Empty);
        }

        let (namespace, rest) = match s.strip_prefix("ns=") {
            Some(tail) => {
                let (ns, rest) = tail
                    .split_once(';')
                    .ok_or_else(|| NodeIdError::InvalidNamespace(s.to_string()))?;
                let ns = ns
                    .parse::<u16>()
                    .map_err(|_| NodeIdError::InvalidNamespace(s.to_string()))?;
                (ns, rest)
            }
            None => (0, s),
        };

        if let Some(value) = rest.strip_prefix("i=") {
            let n = value
                .parse::<u32>()
                .map_err(|_| NodeIdError::InvalidNumeric(s.to_string()))?;
            Ok(Self::numeric(namespace, n))
        } else if let Some(value) = rest.strip_prefix("s=") {
            if value.is_empty() {
                return Err(NodeIdError::Empty);
            }
            Ok(Self::string(namespace, value))
        } else {
            Err(NodeIdError::UnsupportedIdentifier(s.to_string()))
        }
    }
}

impl TryFrom<String> for NodeId {
    type Error = NodeIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_and_string() {
        let objects: NodeId = "ns=0;i=85".parse().unwrap();
        assert_eq!(objects, NodeId::OBJECTS_FOLDER);

        let line: NodeId = "ns=3;s=Line1".parse().unwrap();
        assert_eq!(line.namespace, 3);
        assert_eq!(line.as_str(), Some("Line1"));
    }

    #[test]
    fn test_namespace_defaults_to_zero() {
        let id: NodeId = "i=2253".parse().unwrap();
        assert_eq!(id, NodeId::SERVER);
    }

    #[test]
    fn test_string_key_may_contain_separators() {
        let id: NodeId = "ns=4;s=Equipment.1.Pump;A".parse().unwrap();
        assert_eq!(id.as_str(), Some("Equipment.1.Pump;A"));
        assert_eq!(id.to_string(), "ns=4;s=Equipment.1.Pump;A");
    }

    #[test]
    fn test_rejects_malformed_ids() {
        assert_eq!("".parse::<NodeId>(), Err(NodeIdError::Empty));
        assert!(matches!(
            "ns=x;i=1".parse::<NodeId>(),
            Err(NodeIdError::InvalidNamespace(_))
        ));
        assert!(matches!(
            "ns=1;i=abc".parse::<NodeId>(),
            Err(NodeIdError::InvalidNumeric(_))
        ));
        assert!(matches!(
            "ns=1;g=09087e75-8e5e-499b-954f-f2a9603db28a".parse::<NodeId>(),
            Err(NodeIdError::UnsupportedIdentifier(_))
        ));
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&NodeId::string(4, "VendorName")).unwrap();
        assert_eq!(json, "\"ns=4;s=VendorName\"");

        let back: NodeId = serde_json::from_str("\"ns=0;i=84\"").unwrap();
        assert_eq!(back, NodeId::ROOT_FOLDER);
    }
}
