//! Chooses browse roots and republishes the collected items.

use crate::client::ClientFactory;
use crate::error::BrowseError;
use crate::session::{BrowseSession, DEFAULT_STEP_TIMEOUT};
use crate::status::BrowseStatus;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uaflow_core::{BrowseRequest, FlowMessage, NodeId, NodeIdError, ReferenceDescription};

/// Root used when nothing else selects one: the Objects folder.
pub const DEFAULT_ROOT: NodeId = NodeId::OBJECTS_FOLDER;

/// Runs one browse session per trigger against a fixed endpoint.
pub struct BrowseController<F: ClientFactory> {
    factory: F,
    endpoint_url: String,
    /// Configured topic; wins over per-message topics.
    topic: Option<String>,
    step_timeout: Duration,
    items: Vec<ReferenceDescription>,
    status_tx: watch::Sender<BrowseStatus>,
}

impl<F: ClientFactory> BrowseController<F> {
    pub fn new(factory: F, endpoint_url: impl Into<String>) -> Self {
        let (status_tx, _) = watch::channel(BrowseStatus::NoItems);
        Self {
            factory,
            endpoint_url: endpoint_url.into(),
            topic: None,
            step_timeout: DEFAULT_STEP_TIMEOUT,
            items: Vec::new(),
            status_tx,
        }
    }

    pub fn with_topic(mut self, topic: Option<String>) -> Self {
        self.topic = topic.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_step_timeout(mut self, step_timeout: Duration) -> Self {
        self.step_timeout = step_timeout;
        self
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Items collected by the latest browse.
    pub fn items(&self) -> &[ReferenceDescription] {
        &self.items
    }

    pub fn status(&self) -> BrowseStatus {
        *self.status_tx.borrow()
    }

    /// Subscribes to status changes.
    pub fn subscribe(&self) -> watch::Receiver<BrowseStatus> {
        self.status_tx.subscribe()
    }

    /// Picks the root for the next browse.
    ///
    /// Order:
    /// 1. the root item of a `browse` action
    /// 2. the default root, for any other action
    /// 3. the configured topic
    /// 4. the message topic
    /// 5. the default root
    pub fn select_root(&self, message: &FlowMessage) -> Result<NodeId, NodeIdError> {
        let request = BrowseRequest::decode(message);
        let root = match &request {
            BrowseRequest::Action { .. } => request.explicit_root(),
            BrowseRequest::Topic(topic) => self.topic.as_deref().or(topic.as_deref()),
        };

        match root {
            Some(root) => {
                debug!("Browse root {}", root);
                root.parse()
            }
            None => {
                debug!("Browse to root Objects");
                Ok(DEFAULT_ROOT)
            }
        }
    }

    /// Handles one inbound message and returns the message to send on.
    ///
    /// The outbound message is the inbound one with `payload` replaced by
    /// the collected items and `endpoint` set. A failed browse yields an
    /// empty payload.
    pub async fn on_input(&mut self, mut message: FlowMessage) -> FlowMessage {
        self.items.clear();

        match self.select_root(&message) {
            Ok(root) => {
                if let Err(e) = self.browse(&root).await {
                    error!("Browse from {} failed: {}", root, e);
                }
            }
            Err(e) => {
                error!("Invalid browse root: {}", e);
                self.status_tx.send_replace(BrowseStatus::Error(0));
            }
        }

        self.decorate(&mut message);
        message
    }

    /// Runs the start-up browse from the configured topic or the default
    /// root.
    pub async fn prime(&mut self) -> Option<FlowMessage> {
        let root = match self.topic.as_deref().map(str::parse::<NodeId>) {
            Some(Ok(root)) => root,
            Some(Err(e)) => {
                warn!("Configured topic is not a node id ({}); using Objects", e);
                DEFAULT_ROOT
            }
            None => DEFAULT_ROOT,
        };

        match self.browse(&root).await {
            Ok(()) => {
                let mut message = FlowMessage::default();
                self.decorate(&mut message);
                Some(message)
            }
            Err(e) => {
                error!("Start-up browse failed: {}", e);
                None
            }
        }
    }

    /// Replaces the items with a fresh browse from `root`.
    ///
    /// Fails only when no items were collected. A close failure keeps the
    /// items but still marks the status as an error.
    async fn browse(&mut self, root: &NodeId) -> Result<(), BrowseError> {
        self.items.clear();

        let session = BrowseSession::new(self.factory.create(), self.endpoint_url.clone())
            .with_step_timeout(self.step_timeout);

        let outcome = match session.run(root).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.status_tx.send_replace(BrowseStatus::Error(0));
                return Err(e);
            }
        };

        self.items = outcome.items;
        let count = self.items.len();
        info!("Browse loading items done: {}", count);

        let status = match (outcome.close_error, count) {
            (Some(_), n) => BrowseStatus::Error(n),
            (None, 0) => BrowseStatus::NoItems,
            (None, n) => BrowseStatus::Items(n),
        };
        self.status_tx.send_replace(status);
        Ok(())
    }

    fn decorate(&self, message: &mut FlowMessage) {
        message.payload = serde_json::to_value(&self.items).unwrap_or(Value::Array(Vec::new()));
        message
            .extra
            .insert("endpoint".to_string(), Value::String(self.endpoint_url.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BrowseStep;
    use crate::session::tests::{reference, MockClient};
    use serde_json::json;
    use uaflow_core::BrowseResult;

    fn controller(client: MockClient) -> BrowseController<impl ClientFactory<Client = MockClient>> {
        BrowseController::new(move || client.clone(), "ws://plant:4840")
    }

    fn items_client() -> MockClient {
        MockClient {
            results: vec![BrowseResult::good(vec![reference("Line1"), reference("Line2")])],
            ..MockClient::default()
        }
    }

    #[test]
    fn test_root_precedence() {
        let configured = controller(MockClient::default()).with_topic(Some("ns=3;s=Line1".into()));
        let bare = controller(MockClient::default());

        let no_topic = FlowMessage::new(json!(true));
        assert_eq!(
            configured.select_root(&no_topic).unwrap(),
            NodeId::string(3, "Line1")
        );
        assert_eq!(bare.select_root(&no_topic).unwrap(), DEFAULT_ROOT);

        let action = FlowMessage::new(json!({
            "actiontype": "browse",
            "root": {"item": {"nodeId": "ns=4;s=Equipment3"}}
        }));
        assert_eq!(
            configured.select_root(&action).unwrap(),
            NodeId::string(4, "Equipment3")
        );

        // A configured topic beats the message topic.
        let topic = FlowMessage::new(json!(true)).with_topic("ns=5;s=Other");
        assert_eq!(
            configured.select_root(&topic).unwrap(),
            NodeId::string(3, "Line1")
        );
        assert_eq!(bare.select_root(&topic).unwrap(), NodeId::string(5, "Other"));

        // Any action without a root browses the default root.
        let refresh = FlowMessage::new(json!({"actiontype": "refresh"})).with_topic("ns=5;s=Other");
        assert_eq!(configured.select_root(&refresh).unwrap(), DEFAULT_ROOT);
    }

    #[tokio::test]
    async fn test_on_input_replaces_items() {
        let client = items_client();
        let mut controller = controller(client.clone());

        let inbound = FlowMessage::new(json!("go")).with_topic("ns=3;s=Line");
        let outbound = controller.on_input(inbound).await;

        assert_eq!(outbound.topic.as_deref(), Some("ns=3;s=Line"));
        assert_eq!(outbound.payload.as_array().map(Vec::len), Some(2));
        assert_eq!(outbound.payload[0]["browseName"], "Line1");
        assert_eq!(outbound.extra["endpoint"], "ws://plant:4840");
        assert_eq!(controller.status(), BrowseStatus::Items(2));
        assert!(client.calls().contains(&"browse ns=3;s=Line".to_string()));

        // A second trigger does not merge with the first.
        controller.on_input(FlowMessage::default()).await;
        assert_eq!(controller.items().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_browse_emits_empty_payload() {
        let mut controller = controller(MockClient {
            fail_at: Some(BrowseStep::OpenSession),
            ..items_client()
        });
        let mut status = controller.subscribe();

        let outbound = controller.on_input(FlowMessage::default()).await;
        assert_eq!(outbound.payload, json!([]));
        assert_eq!(*status.borrow_and_update(), BrowseStatus::Error(0));
    }

    #[tokio::test]
    async fn test_close_failure_keeps_items() {
        let mut controller = controller(MockClient {
            fail_at: Some(BrowseStep::CloseSession),
            ..items_client()
        });

        let outbound = controller.on_input(FlowMessage::default()).await;
        assert_eq!(outbound.payload.as_array().map(Vec::len), Some(2));
        assert_eq!(controller.status(), BrowseStatus::Error(2));
    }

    #[tokio::test]
    async fn test_invalid_root() {
        let client = items_client();
        let mut controller = controller(client.clone());
        let outbound = controller
            .on_input(FlowMessage::default().with_topic("not a node"))
            .await;
        assert_eq!(outbound.payload, json!([]));
        assert_eq!(controller.status(), BrowseStatus::Error(0));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_prime() {
        let mut controller = controller(items_client());
        let message = controller.prime().await.unwrap();
        assert_eq!(message.payload.as_array().map(Vec::len), Some(2));
        assert_eq!(controller.status(), BrowseStatus::Items(2));

        let mut failing = controller_failing();
        assert!(failing.prime().await.is_none());
        assert_eq!(failing.status(), BrowseStatus::Error(0));
    }

    #[tokio::test]
    async fn test_prime_emits_items_when_close_fails() {
        let mut controller = controller(MockClient {
            fail_at: Some(BrowseStep::CloseSession),
            ..items_client()
        });

        let message = controller.prime().await.unwrap();
        assert_eq!(message.payload.as_array().map(Vec::len), Some(2));
        assert_eq!(message.extra["endpoint"], "ws://plant:4840");
        assert_eq!(controller.status(), BrowseStatus::Error(2));
    }

    fn controller_failing() -> BrowseController<impl ClientFactory<Client = MockClient>> {
        controller(MockClient {
            fail_at: Some(BrowseStep::Connect),
            ..MockClient::default()
        })
    }
}
