use serde::Serialize;
use std::fmt;
use uaflow_core::{Fill, Shape, StatusIndicator};

/// Outcome of the latest browse, as shown to monitoring collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "items", rename_all = "camelCase")]
pub enum BrowseStatus {
    NoItems,
    Items(usize),
    /// The latest browse failed with this many items collected.
    Error(usize),
}

impl BrowseStatus {
    pub fn indicator(&self) -> StatusIndicator {
        let text = self.to_string();
        match self {
            Self::NoItems => StatusIndicator::new(Fill::Gray, Shape::Dot, text),
            Self::Items(_) => StatusIndicator::new(Fill::Green, Shape::Dot, text),
            Self::Error(_) => StatusIndicator::new(Fill::Red, Shape::Dot, text),
        }
    }
}

impl fmt::Display for BrowseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoItems => write!(f, "no Items"),
            Self::Items(n) => write!(f, "Items: {}", n),
            Self::Error(n) => write!(f, "Error Items: {}", n),
        }
    }
}
