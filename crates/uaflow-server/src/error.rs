use crate::lifecycle::ServerState;
use std::net::SocketAddr;
use thiserror::Error;
use uaflow_graph::{GraphError, SeedError};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to build address space: {0}")]
    Seed(#[from] SeedError),

    #[error("failed to construct vendor model: {0}")]
    Model(#[from] GraphError),

    #[error("failed to bind endpoint on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("endpoint is already running")]
    AlreadyRunning,

    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: ServerState,
    },

    #[error("server is not ready")]
    NotReady,
}

impl ServerError {
    /// Whether the error happened while bringing a server instance up.
    pub fn is_initialization(&self) -> bool {
        matches!(
            self,
            Self::Seed(_) | Self::Model(_) | Self::Bind { .. } | Self::AlreadyRunning
        )
    }
}
