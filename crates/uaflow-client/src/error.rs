use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("server error {code}: {message}")]
    Rpc { code: i32, message: String },

    #[error("response carried neither result nor error")]
    EmptyResponse,

    #[error("connection closed by server")]
    Closed,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

/// The steps of a browse session, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseStep {
    Connect,
    OpenSession,
    Browse,
    CloseSession,
}

impl fmt::Display for BrowseStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connect => "connect",
            Self::OpenSession => "open session",
            Self::Browse => "browse",
            Self::CloseSession => "close session",
        };
        write!(f, "{}", s)
    }
}

/// A browse session step failed.
#[derive(Error, Debug)]
#[error("{step} failed: {source}")]
pub struct BrowseError {
    pub step: BrowseStep,
    #[source]
    pub source: ClientError,
}

impl BrowseError {
    pub fn new(step: BrowseStep, source: ClientError) -> Self {
        Self { step, source }
    }
}
