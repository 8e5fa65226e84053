//! Server lifecycle: start, shutdown and restart-in-place.
//!
//! ```text
//! Uninitialized ──start──▶ Initializing ──▶ Ready
//!       ▲                       │             │
//!       └──── (init failure) ───┘        shutdown/restart
//!       └──────────────── ShuttingDown ◀──────┘
//! ```
//!
//! The lifecycle owns the endpoint, and through it the address space, of
//! the current instance. External callers only reach the address space
//! while the state is `Ready`.

use crate::error::ServerError;
use crate::model::{DynamicCategory, ProcessValues, VendorModel};
use crate::runtime::{Endpoint, ServerConfig, ServerRuntime, SharedAddressSpace};
use crate::server::WsRuntime;
use crate::status::ServerStatus;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uaflow_core::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ServerState {
    Uninitialized,
    Initializing,
    Ready,
    ShuttingDown,
}

/// One live server instance.
struct Instance {
    endpoint: Box<dyn Endpoint>,
    model: VendorModel,
    url: String,
}

/// Owns the current server instance and drives its state machine.
pub struct ServerLifecycle {
    runtime: Arc<dyn ServerRuntime>,
    config: ServerConfig,
    state: ServerState,
    instance: Option<Instance>,
    values: ProcessValues,
    status_tx: watch::Sender<ServerStatus>,
    generation: u64,
}

impl ServerLifecycle {
    pub fn new(runtime: Arc<dyn ServerRuntime>, config: ServerConfig) -> Self {
        let (status_tx, _) = watch::channel(ServerStatus::NotRunning);
        Self {
            runtime,
            config,
            state: ServerState::Uninitialized,
            instance: None,
            values: ProcessValues::default(),
            status_tx,
            generation: 0,
        }
    }

    /// A lifecycle serving over the WebSocket endpoint.
    pub fn websocket(config: ServerConfig) -> Self {
        Self::new(Arc::new(WsRuntime), config)
    }

    /// Builds a new instance and starts listening.
    ///
    /// On failure the lifecycle is back in `Uninitialized` with nothing
    /// left reachable. There is no automatic retry.
    pub async fn start(&mut self) -> Result<(), ServerError> {
        if self.state != ServerState::Uninitialized {
            return Err(ServerError::InvalidState {
                operation: "start",
                state: self.state,
            });
        }

        info!(
            "Creating server '{}' on {}",
            self.config.name,
            self.config.addr()
        );
        let created = self.runtime.create(&self.config).await;
        let mut endpoint = match created {
            Ok(endpoint) => endpoint,
            Err(e) => return Err(self.fail(e)),
        };
        self.state = ServerState::Initializing;

        let space = endpoint.address_space();
        let constructed = {
            let mut space = space.write().await;
            let model = VendorModel::construct(&mut space, &self.values);
            if model.is_ok() {
                VendorModel::verify_placement(&space);
            }
            model
        };
        let model = match constructed {
            Ok(model) => model,
            Err(e) => return Err(self.fail(e.into())),
        };

        let url = match endpoint.start().await {
            Ok(url) => url,
            Err(e) => return Err(self.fail(e)),
        };

        self.instance = Some(Instance {
            endpoint,
            model,
            url: url.clone(),
        });
        self.generation += 1;
        self.state = ServerState::Ready;
        self.status_tx.send_replace(ServerStatus::Running);
        info!("Server ready at {} (instance {})", url, self.generation);
        Ok(())
    }

    fn fail(&mut self, err: ServerError) -> ServerError {
        error!("Server initialization failed: {}", err);
        self.state = ServerState::Uninitialized;
        self.status_tx
            .send_replace(ServerStatus::Error(err.to_string()));
        err
    }

    /// Shuts the current instance down and starts a fresh one.
    ///
    /// The new instance has a new address space and fresh counters.
    pub async fn restart(&mut self) -> Result<(), ServerError> {
        match self.state {
            ServerState::Initializing => Err(ServerError::InvalidState {
                operation: "restart",
                state: self.state,
            }),
            ServerState::Uninitialized => self.start().await,
            ServerState::Ready | ServerState::ShuttingDown => {
                warn!("Restarting server");
                self.shutdown().await;
                self.start().await
            }
        }
    }

    /// Releases the endpoint and the address space. Idempotent.
    pub async fn shutdown(&mut self) {
        let Some(mut instance) = self.instance.take() else {
            debug!("Shutdown requested with no running server");
            return;
        };

        self.state = ServerState::ShuttingDown;
        info!("Shutting down server at {}", instance.url);
        instance.endpoint.shutdown().await;

        self.state = ServerState::Uninitialized;
        self.status_tx.send_replace(ServerStatus::NotRunning);
        info!("Server stopped");
    }

    pub fn is_ready(&self) -> bool {
        self.state == ServerState::Ready
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// How many instances have reached `Ready`.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The address space of the ready instance.
    pub fn address_space(&self) -> Option<SharedAddressSpace> {
        self.ready_instance().map(|i| i.endpoint.address_space())
    }

    pub fn endpoint_url(&self) -> Option<&str> {
        self.ready_instance().map(|i| i.url.as_str())
    }

    pub fn model(&self) -> Option<&VendorModel> {
        self.ready_instance().map(|i| &i.model)
    }

    pub fn process_values(&self) -> &ProcessValues {
        &self.values
    }

    pub fn status(&self) -> ServerStatus {
        self.status_tx.borrow().clone()
    }

    /// Subscribes to status changes.
    pub fn subscribe(&self) -> watch::Receiver<ServerStatus> {
        self.status_tx.subscribe()
    }

    fn ready_instance(&self) -> Option<&Instance> {
        self.instance.as_ref().filter(|_| self.is_ready())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Gated mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Adds a dynamic node under its category folder.
    pub async fn add_dynamic(
        &mut self,
        category: DynamicCategory,
        node_name: &str,
    ) -> Result<NodeId, ServerError> {
        if !self.is_ready() {
            return Err(ServerError::NotReady);
        }
        let Some(instance) = self.instance.as_mut() else {
            return Err(ServerError::NotReady);
        };
        let space = instance.endpoint.address_space();
        let mut space = space.write().await;
        Ok(instance.model.add(&mut space, category, node_name)?)
    }

    /// Deletes a node by id.
    pub async fn delete_node(&mut self, node_id: &NodeId) -> Result<(), ServerError> {
        let space = self.address_space().ok_or(ServerError::NotReady)?;
        let mut space = space.write().await;
        space.delete_node(node_id)?;
        Ok(())
    }
}

impl std::fmt::Debug for ServerLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerLifecycle")
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("url", &self.instance.as_ref().map(|i| &i.url))
            .finish()
    }
}
