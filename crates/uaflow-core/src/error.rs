//! Error types for identifier parsing and message decoding.

use thiserror::Error;

/// Failure to parse a textual node identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeIdError {
    #[error("empty node id")]
    Empty,

    #[error("invalid namespace index in '{0}'")]
    InvalidNamespace(String),

    #[error("invalid numeric identifier in '{0}'")]
    InvalidNumeric(String),

    #[error("unsupported identifier type in '{0}'")]
    UnsupportedIdentifier(String),
}

/// Failure to decode an inbound flow message payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    #[error("'{kind}' message is missing field '{field}'")]
    MissingField { kind: String, field: &'static str },

    #[error("field '{field}' has the wrong type: expected {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
}

impl MessageError {
    pub fn missing(kind: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField {
            kind: kind.into(),
            field,
        }
    }
}
