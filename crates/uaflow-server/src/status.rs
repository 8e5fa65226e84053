use serde::Serialize;
use std::fmt;
use uaflow_core::{Fill, Shape, StatusIndicator};

/// Health of the server node, as shown to monitoring collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "camelCase")]
pub enum ServerStatus {
    NotRunning,
    Running,
    /// The last lifecycle operation failed.
    Error(String),
}

impl ServerStatus {
    pub fn indicator(&self) -> StatusIndicator {
        match self {
            Self::NotRunning => StatusIndicator::new(Fill::Red, Shape::Ring, "Not running"),
            Self::Running => StatusIndicator::new(Fill::Green, Shape::Dot, "running"),
            Self::Error(_) => StatusIndicator::new(Fill::Gray, Shape::Dot, "not running"),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(message) => write!(f, "Error: {}", message),
            other => write!(f, "{}", other.indicator().text),
        }
    }
}
