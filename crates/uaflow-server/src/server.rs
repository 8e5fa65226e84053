//! WebSocket endpoint implementation.
//!
//! Handles client connections and routes JSON-RPC messages to handlers.
//! Sessions are scoped to the connection that created them.

use crate::error::ServerError;
use crate::handlers::{
    handle_browse, handle_call, handle_info, handle_read, handle_session_close,
    handle_session_create, handle_write, Sessions,
};
use crate::runtime::{BuildInfo, Endpoint, ServerConfig, ServerRuntime, SharedAddressSpace};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, RwLock};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uaflow_core::protocol::{
    methods, BrowseParams, CallParams, CreateSessionParams, ReadParams, Request, Response,
    SessionParams, WriteParams,
};
use uaflow_graph::{AddressSpace, AddressSpaceBuilder};

/// Bound on the WebSocket upgrade of a new connection.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// How long live connections get to close after shutdown is signalled.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Runtime that serves each instance over a WebSocket endpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsRuntime;

#[async_trait]
impl ServerRuntime for WsRuntime {
    async fn create(&self, config: &ServerConfig) -> Result<Box<dyn Endpoint>, ServerError> {
        let space = AddressSpaceBuilder::new()
            .with_seed(config.seed.clone())
            .build()?;
        Ok(Box::new(WsEndpoint::new(
            config.addr(),
            space,
            BuildInfo::for_config(config),
        )))
    }
}

/// State shared by every connection of one endpoint.
#[derive(Clone)]
struct ConnectionContext {
    space: SharedAddressSpace,
    build_info: Arc<BuildInfo>,
}

struct Running {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// A WebSocket JSON-RPC endpoint serving one address space.
pub struct WsEndpoint {
    addr: SocketAddr,
    space: SharedAddressSpace,
    build_info: Arc<BuildInfo>,
    running: Option<Running>,
}

impl WsEndpoint {
    pub fn new(addr: SocketAddr, space: AddressSpace, build_info: BuildInfo) -> Self {
        Self {
            addr,
            space: Arc::new(RwLock::new(space)),
            build_info: Arc::new(build_info),
            running: None,
        }
    }

    /// The bound address while listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }
}

#[async_trait]
impl Endpoint for WsEndpoint {
    fn address_space(&self) -> SharedAddressSpace {
        self.space.clone()
    }

    async fn start(&mut self) -> Result<String, ServerError> {
        if self.running.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.addr,
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            addr: self.addr,
            source,
        })?;
        info!("Endpoint listening on {}", local_addr);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let context = ConnectionContext {
            space: self.space.clone(),
            build_info: self.build_info.clone(),
        };
        let task = tokio::spawn(accept_loop(listener, context, shutdown_rx));

        self.running = Some(Running {
            local_addr,
            shutdown_tx,
            task,
        });
        Ok(endpoint_url(local_addr))
    }

    async fn shutdown(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        let _ = running.shutdown_tx.send(true);
        if let Err(e) = running.task.await {
            warn!("Endpoint task ended abnormally: {}", e);
        }
        info!("Endpoint on {} closed", running.local_addr);
    }

    fn url(&self) -> Option<String> {
        self.local_addr().map(endpoint_url)
    }
}

impl Drop for WsEndpoint {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.shutdown_tx.send(true);
            running.task.abort();
        }
    }
}

fn endpoint_url(addr: SocketAddr) -> String {
    format!("ws://{}", addr)
}

/// Accepts connections until shutdown is signalled, then waits up to
/// [`CLOSE_GRACE`] for live connections to close before aborting them.
async fn accept_loop(
    listener: TcpListener,
    context: ConnectionContext,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    debug!("New connection from {}", addr);
                    let context = context.clone();
                    let shutdown = shutdown.clone();
                    connections.spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, context, shutdown).await {
                            error!("Connection error from {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            },
        }
    }

    drop(listener);
    let drained = timeout(CLOSE_GRACE, async {
        while connections.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        warn!("Aborting {} connections that did not close", connections.len());
        connections.shutdown().await;
    }
}

/// Handles a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    context: ConnectionContext,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = tokio::select! {
        upgraded = timeout(HANDSHAKE_TIMEOUT, accept_async(stream)) => upgraded??,
        _ = shutdown.changed() => {
            debug!("Dropping {} before handshake completed", addr);
            return Ok(());
        }
    };
    info!("WebSocket connection established with {}", addr);

    let (mut write, mut read) = ws_stream.split();
    let mut sessions = Sessions::new();

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = process_message(&text, &context, &mut sessions).await;
                        let json = serde_json::to_string(&response)?;
                        write.send(Message::Text(json)).await?;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        write.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!("Client {} disconnected", addr);
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("Message error from {}: {}", addr, e);
                        break;
                    }
                    None => break,
                    _ => {}
                }
            }

            _ = shutdown.changed() => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }
        }
    }

    if !sessions.is_empty() {
        debug!("Dropping {} open sessions of {}", sessions.len(), addr);
    }
    info!("Connection closed: {}", addr);
    Ok(())
}

fn parse<T: DeserializeOwned>(params: Value) -> Result<T, serde_json::Error> {
    let params = if params.is_null() {
        Value::Object(Default::default())
    } else {
        params
    };
    serde_json::from_value(params)
}

/// Processes a JSON-RPC message and returns a response.
async fn process_message(
    text: &str,
    context: &ConnectionContext,
    sessions: &mut Sessions,
) -> Response {
    let request: Request = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(_) => return Response::parse_error(),
    };

    let id = request.id.clone();
    let method = request.method.as_str();
    let space = context.space.clone();

    debug!("Processing method: {}", method);

    match method {
        methods::SERVER_INFO => handle_info(space, &context.build_info, id).await,

        methods::SESSION_CREATE => match parse::<CreateSessionParams>(request.params) {
            Ok(params) => handle_session_create(sessions, &context.build_info, id, params),
            Err(e) => Response::invalid_params(id, e.to_string()),
        },

        methods::SESSION_CLOSE => match parse::<SessionParams>(request.params) {
            Ok(params) if !sessions.contains(&params.session_id) => Response::session_required(id),
            Ok(params) => handle_session_close(sessions, id, params),
            Err(e) => Response::invalid_params(id, e.to_string()),
        },

        methods::BROWSE => match parse::<BrowseParams>(request.params) {
            Ok(params) if !sessions.contains(&params.session_id) => Response::session_required(id),
            Ok(params) => handle_browse(space, id, params).await,
            Err(e) => Response::invalid_params(id, e.to_string()),
        },

        methods::READ => match parse::<ReadParams>(request.params) {
            Ok(params) if !sessions.contains(&params.session_id) => Response::session_required(id),
            Ok(params) => handle_read(space, id, params).await,
            Err(e) => Response::invalid_params(id, e.to_string()),
        },

        methods::WRITE => match parse::<WriteParams>(request.params) {
            Ok(params) if !sessions.contains(&params.session_id) => Response::session_required(id),
            Ok(params) => handle_write(space, id, params).await,
            Err(e) => Response::invalid_params(id, e.to_string()),
        },

        methods::CALL => match parse::<CallParams>(request.params) {
            Ok(params) if !sessions.contains(&params.session_id) => Response::session_required(id),
            Ok(params) => handle_call(space, id, params).await,
            Err(e) => Response::invalid_params(id, e.to_string()),
        },

        _ => Response::method_not_found(id, method),
    }
}
