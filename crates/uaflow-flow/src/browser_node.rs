//! The browser node: browses an endpoint per inbound message.

use crate::config::BrowserSection;
use crate::node::FlowNode;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;
use uaflow_client::{BrowseController, BrowseStatus, ClientFactory, WsProtocolClient};
use uaflow_core::FlowMessage;

pub struct BrowserNode<F: ClientFactory> {
    controller: BrowseController<F>,
    status_task: Option<JoinHandle<()>>,
}

impl<F: ClientFactory> BrowserNode<F> {
    pub fn new(controller: BrowseController<F>) -> Self {
        Self {
            controller,
            status_task: None,
        }
    }

    pub fn controller(&self) -> &BrowseController<F> {
        &self.controller
    }
}

impl BrowserNode<fn() -> WsProtocolClient> {
    /// A node browsing the configured WebSocket endpoint.
    pub fn websocket(config: &BrowserSection) -> Self {
        let factory: fn() -> WsProtocolClient = WsProtocolClient::default;
        Self::new(
            BrowseController::new(factory, config.endpoint.clone())
                .with_topic(config.topic.clone())
                .with_step_timeout(config.step_timeout()),
        )
    }
}

#[async_trait]
impl<F: ClientFactory> FlowNode for BrowserNode<F> {
    async fn on_start(&mut self) -> Result<Vec<FlowMessage>> {
        self.status_task = Some(tokio::spawn(log_status(self.controller.subscribe())));
        Ok(self.controller.prime().await.into_iter().collect())
    }

    async fn on_input(&mut self, message: FlowMessage) -> Vec<FlowMessage> {
        vec![self.controller.on_input(message).await]
    }

    async fn on_close(&mut self) {
        if let Some(task) = self.status_task.take() {
            task.abort();
        }
    }
}

async fn log_status(mut status: watch::Receiver<BrowseStatus>) {
    while status.changed().await.is_ok() {
        let indicator = status.borrow_and_update().indicator();
        info!(
            "Browser status: {} ({:?} {:?})",
            indicator.text, indicator.fill, indicator.shape
        );
    }
}
