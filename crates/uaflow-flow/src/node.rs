use anyhow::Result;
use async_trait::async_trait;
use uaflow_core::FlowMessage;

/// A node hosted in the flow.
///
/// The host calls `on_start` once, `on_input` per inbound message and
/// `on_close` when the input ends. Returned messages are sent downstream
/// in order.
#[async_trait]
pub trait FlowNode: Send {
    async fn on_start(&mut self) -> Result<Vec<FlowMessage>> {
        Ok(Vec::new())
    }

    async fn on_input(&mut self, message: FlowMessage) -> Vec<FlowMessage>;

    async fn on_close(&mut self) {}
}
