//! The server node: hosts the endpoint and applies inbound commands.

use crate::node::FlowNode;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uaflow_core::FlowMessage;
use uaflow_server::{CommandDispatcher, Effect, ServerConfig, ServerLifecycle, ServerStatus};

pub struct ServerNode {
    dispatcher: CommandDispatcher,
    status_task: Option<JoinHandle<()>>,
}

impl ServerNode {
    pub fn new(lifecycle: ServerLifecycle) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(Arc::new(Mutex::new(lifecycle))),
            status_task: None,
        }
    }

    /// A node serving over the WebSocket endpoint.
    pub fn websocket(config: ServerConfig) -> Self {
        Self::new(ServerLifecycle::websocket(config))
    }

    pub fn lifecycle(&self) -> Arc<Mutex<ServerLifecycle>> {
        self.dispatcher.lifecycle()
    }
}

#[async_trait]
impl FlowNode for ServerNode {
    async fn on_start(&mut self) -> Result<Vec<FlowMessage>> {
        let lifecycle = self.dispatcher.lifecycle();
        let mut lifecycle = lifecycle.lock().await;
        self.status_task = Some(tokio::spawn(log_status(lifecycle.subscribe())));

        lifecycle.start().await?;
        if let Some(url) = lifecycle.endpoint_url() {
            info!("Server endpoint {}", url);
        }
        Ok(Vec::new())
    }

    async fn on_input(&mut self, message: FlowMessage) -> Vec<FlowMessage> {
        let outcome = self.dispatcher.dispatch(message).await;
        if let Effect::Failed(e) = &outcome.effect {
            warn!("Message not applied: {}", e);
        }
        outcome.forward.into_iter().collect()
    }

    async fn on_close(&mut self) {
        self.dispatcher.lifecycle().lock().await.shutdown().await;
        if let Some(task) = self.status_task.take() {
            task.abort();
        }
    }
}

async fn log_status(mut status: watch::Receiver<ServerStatus>) {
    while status.changed().await.is_ok() {
        let indicator = status.borrow_and_update().indicator();
        info!(
            "Server status: {} ({:?} {:?})",
            indicator.text, indicator.fill, indicator.shape
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node() -> ServerNode {
        ServerNode::websocket(ServerConfig {
            name: "Plant".into(),
            port: 0,
            ..ServerConfig::default()
        })
    }

    #[tokio::test]
    async fn test_messages_before_start_are_dropped() {
        let mut node = node();
        let out = node
            .on_input(FlowMessage::new(json!({"opcuaCommand": "addEquipment", "nodeName": "Pump"})))
            .await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_commands_forward_message() {
        let mut node = node();
        node.on_start().await.unwrap();

        let command = FlowMessage::new(json!({"opcuaCommand": "addEquipment", "nodeName": "Pump"}));
        let out = node.on_input(command.clone()).await;
        assert_eq!(out, vec![command]);

        let lifecycle = node.lifecycle();
        assert_eq!(
            lifecycle.lock().await.model().map(|m| m.equipment_counter()),
            Some(1)
        );

        node.on_close().await;
        assert!(!lifecycle.lock().await.is_ready());
    }
}
