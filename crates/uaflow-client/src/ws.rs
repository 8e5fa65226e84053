//! WebSocket JSON-RPC client.

use crate::client::ProtocolClient;
use crate::error::ClientError;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::debug;
use uaflow_core::protocol::{
    methods, BrowseParams, BrowseResponse, CreateSessionParams, Request, Response,
    SessionCreated, SessionParams,
};
use uaflow_core::{BrowseDirection, BrowseResult, NodeId};

/// One open WebSocket connection.
pub struct WsConnection {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    next_id: u64,
}

impl WsConnection {
    /// Opens a connection to `url`.
    pub async fn open(url: &str) -> Result<Self, ClientError> {
        let (socket, _) = connect_async(url).await?;
        debug!("Connected to {}", url);
        Ok(Self { socket, next_id: 1 })
    }

    /// Sends one request and waits for its response.
    pub async fn request<P, R>(&mut self, method: &str, params: P) -> Result<R, ClientError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id = self.next_id;
        self.next_id += 1;

        let request = Request::new(id, method, params);
        self.socket
            .send(Message::Text(serde_json::to_string(&request)?))
            .await?;

        loop {
            let msg = self.socket.next().await.ok_or(ClientError::Closed)??;
            match msg {
                Message::Text(text) => {
                    let response: Response = serde_json::from_str(&text)?;
                    if response.id.as_ref().and_then(|v| v.as_u64()) != Some(id) {
                        debug!("Skipping response to another request");
                        continue;
                    }
                    if let Some(error) = response.error {
                        return Err(ClientError::Rpc {
                            code: error.code,
                            message: error.message,
                        });
                    }
                    let result = response.result.ok_or(ClientError::EmptyResponse)?;
                    return Ok(serde_json::from_value(result)?);
                }
                Message::Ping(data) => self.socket.send(Message::Pong(data)).await?,
                Message::Close(_) => return Err(ClientError::Closed),
                _ => {}
            }
        }
    }

    /// Sends a Close frame; later requests fail.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        self.socket.close(None).await?;
        Ok(())
    }
}

/// A session opened on a [`WsConnection`].
#[derive(Debug, Clone)]
pub struct WsSession {
    pub session_id: String,
}

/// [`ProtocolClient`] over the uaflow WebSocket endpoint.
#[derive(Debug, Clone)]
pub struct WsProtocolClient {
    client_name: String,
}

impl Default for WsProtocolClient {
    fn default() -> Self {
        Self::new("uaflow-browser")
    }
}

impl WsProtocolClient {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }
}

#[async_trait]
impl ProtocolClient for WsProtocolClient {
    type Connection = WsConnection;
    type Session = WsSession;

    async fn connect(&self, endpoint_url: &str) -> Result<WsConnection, ClientError> {
        WsConnection::open(endpoint_url).await
    }

    async fn open_session(&self, connection: &mut WsConnection) -> Result<WsSession, ClientError> {
        let created: SessionCreated = connection
            .request(
                methods::SESSION_CREATE,
                CreateSessionParams {
                    client_name: Some(self.client_name.clone()),
                },
            )
            .await?;
        debug!("Opened session {}", created.session_id);
        Ok(WsSession {
            session_id: created.session_id,
        })
    }

    async fn browse(
        &self,
        connection: &mut WsConnection,
        session: &WsSession,
        root: &NodeId,
    ) -> Result<Vec<BrowseResult>, ClientError> {
        let response: BrowseResponse = connection
            .request(
                methods::BROWSE,
                BrowseParams {
                    session_id: session.session_id.clone(),
                    nodes_to_browse: vec![root.clone()],
                    direction: BrowseDirection::Forward,
                },
            )
            .await?;
        Ok(response.results)
    }

    async fn close_session(
        &self,
        connection: &mut WsConnection,
        session: WsSession,
    ) -> Result<(), ClientError> {
        let closed: Result<serde_json::Value, _> = connection
            .request(
                methods::SESSION_CLOSE,
                SessionParams {
                    session_id: session.session_id,
                },
            )
            .await;
        // The socket is closed even when the session close was refused.
        let disconnected = connection.close().await;
        closed?;
        disconnected
    }
}
