//! The protocol capability a browse session runs against.

use crate::error::ClientError;
use async_trait::async_trait;
use uaflow_core::{BrowseResult, NodeId};

/// Connects to an endpoint and speaks the session protocol.
///
/// A client is created per browse session and never reused.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    type Connection: Send;
    type Session: Send + Sync;

    async fn connect(&self, endpoint_url: &str) -> Result<Self::Connection, ClientError>;

    async fn open_session(
        &self,
        connection: &mut Self::Connection,
    ) -> Result<Self::Session, ClientError>;

    /// Browses the forward references of `root`.
    async fn browse(
        &self,
        connection: &mut Self::Connection,
        session: &Self::Session,
        root: &NodeId,
    ) -> Result<Vec<BrowseResult>, ClientError>;

    async fn close_session(
        &self,
        connection: &mut Self::Connection,
        session: Self::Session,
    ) -> Result<(), ClientError>;
}

/// Builds a fresh client for each browse session.
pub trait ClientFactory: Send + Sync {
    type Client: ProtocolClient;

    fn create(&self) -> Self::Client;
}

impl<F, C> ClientFactory for F
where
    F: Fn() -> C + Send + Sync,
    C: ProtocolClient,
{
    type Client = C;

    fn create(&self) -> C {
        self()
    }
}
