//! The endpoint capability consumed by the server lifecycle.
//!
//! A [`ServerRuntime`] allocates an [`Endpoint`] for one server instance.
//! The endpoint owns the address space of that instance; the lifecycle
//! populates it and then starts listening.

use crate::error::ServerError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::sync::RwLock;
use uaflow_graph::{AddressSpace, ModelSeed};

/// Shared address space across connections and the lifecycle.
pub type SharedAddressSpace = Arc<RwLock<AddressSpace>>;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 53880;

/// Settings for one server instance.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Product name prefix reported in the build info.
    pub name: String,

    /// Address to bind to.
    pub bind: IpAddr,

    /// Port to bind to; 0 lets the OS pick one.
    pub port: u16,

    /// Static nodes loaded before the vendor model.
    pub seed: ModelSeed,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            seed: ModelSeed::default(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

/// Build information reported by `server.info` and `session.create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub product_name: String,
    pub build_number: String,
    pub build_date: DateTime<Utc>,
    pub software_version: String,
}

impl BuildInfo {
    pub fn for_config(config: &ServerConfig) -> Self {
        Self {
            product_name: format!("{}OPC UA server", config.name),
            build_number: "112".to_string(),
            build_date: Utc::now(),
            software_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Allocates endpoints.
#[async_trait]
pub trait ServerRuntime: Send + Sync {
    /// Builds a fresh address space from the config's seed and wraps it in
    /// an endpoint that is not listening yet.
    async fn create(&self, config: &ServerConfig) -> Result<Box<dyn Endpoint>, ServerError>;
}

/// One listening endpoint and the address space it serves.
#[async_trait]
pub trait Endpoint: Send + Sync {
    fn address_space(&self) -> SharedAddressSpace;

    /// Starts listening and returns the endpoint URL.
    async fn start(&mut self) -> Result<String, ServerError>;

    /// Stops listening and drops live connections. Safe to call twice.
    async fn shutdown(&mut self);

    /// The endpoint URL while listening.
    fn url(&self) -> Option<String>;
}
