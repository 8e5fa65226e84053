use thiserror::Error;
use uaflow_core::{NodeId, NodeIdError};

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("node id already in use: {0}")]
    DuplicateIdentifier(NodeId),

    #[error("parent node not found: {0}")]
    ParentNotFound(NodeId),

    #[error("node not found: {0}")]
    NotFound(NodeId),

    #[error("address space already has a root node")]
    RootExists,
}

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("failed to read model seed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed model seed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid node id in model seed: {0}")]
    NodeId(#[from] NodeIdError),

    #[error("model seed rejected: {0}")]
    Graph(#[from] GraphError),
}
