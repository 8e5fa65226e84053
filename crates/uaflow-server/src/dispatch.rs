//! Inbound flow messages applied to the live server.
//!
//! One message is handled per [`CommandDispatcher::dispatch`] call. The
//! lifecycle mutex is held for the whole call, so the ready check and any
//! address-space access form one critical section.

use crate::error::ServerError;
use crate::lifecycle::ServerLifecycle;
use crate::model::DynamicCategory;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uaflow_core::{
    FlowMessage, MessageError, NodeId, NodeIdError, ServerCommand, ServerPayload,
    VariableMessage, Variant,
};
use uaflow_graph::GraphError;

/// Variable name accepted by variable-update messages.
pub const COUNTER_VARIABLE: &str = "Counter";

/// Why a processed message had no effect.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("invalid message: {0}")]
    InvalidMessage(#[from] MessageError),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("invalid value for variable {name}")]
    InvalidValue { name: String },

    #[error("invalid node id {node_id:?}: {source}")]
    InvalidNodeId {
        node_id: String,
        #[source]
        source: NodeIdError,
    },

    #[error("can not find node {0}")]
    NodeNotFound(NodeId),

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// What a dispatched message did.
#[derive(Debug)]
pub enum Effect {
    /// The server was not ready; nothing was touched.
    NotReady,
    /// No recognized discriminant.
    PassThrough,
    CounterUpdated(f64),
    /// A variable message for a name without a binding.
    VariableIgnored(String),
    Restarted,
    NodeAdded(NodeId),
    NodeDeleted(NodeId),
    Failed(DispatchError),
}

/// The result of one dispatch.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub effect: Effect,
    /// The message to send downstream, exactly once.
    pub forward: Option<FlowMessage>,
}

impl DispatchOutcome {
    fn dropped() -> Self {
        Self {
            effect: Effect::NotReady,
            forward: None,
        }
    }

    fn forwarded(message: FlowMessage, effect: Effect) -> Self {
        Self {
            effect,
            forward: Some(message),
        }
    }

    /// Whether the message reached a ready server.
    pub fn processed(&self) -> bool {
        !matches!(self.effect, Effect::NotReady)
    }
}

/// Applies inbound messages to the lifecycle it shares.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    lifecycle: Arc<Mutex<ServerLifecycle>>,
}

impl CommandDispatcher {
    pub fn new(lifecycle: Arc<Mutex<ServerLifecycle>>) -> Self {
        Self { lifecycle }
    }

    pub fn lifecycle(&self) -> Arc<Mutex<ServerLifecycle>> {
        self.lifecycle.clone()
    }

    /// Handles one inbound message.
    ///
    /// Messages arriving before the server is ready are dropped and not
    /// forwarded. Every processed message is forwarded unchanged, whatever
    /// its effect.
    pub async fn dispatch(&self, message: FlowMessage) -> DispatchOutcome {
        let mut lifecycle = self.lifecycle.lock().await;

        if !lifecycle.is_ready() {
            debug!("Server not ready; dropping message");
            return DispatchOutcome::dropped();
        }

        let effect = match ServerPayload::decode(&message.payload) {
            Ok(ServerPayload::Variable(variable)) => apply_variable(&lifecycle, variable),
            Ok(ServerPayload::Command(command)) => execute(&mut lifecycle, command).await,
            Ok(ServerPayload::PassThrough) => Effect::PassThrough,
            Err(e) => {
                error!("Rejected message: {}", e);
                Effect::Failed(e.into())
            }
        };

        DispatchOutcome::forwarded(message, effect)
    }
}

fn apply_variable(lifecycle: &ServerLifecycle, variable: VariableMessage) -> Effect {
    let (name, values) = match variable {
        VariableMessage::Variable { name, values } => (name, values),
        VariableMessage::Unsupported(kind) => {
            debug!("Ignoring message type {}", kind);
            return Effect::PassThrough;
        }
    };

    if name != COUNTER_VARIABLE {
        debug!("Ignoring update for unbound variable {}", name);
        return Effect::VariableIgnored(name);
    }

    let value = values.first().map(Variant::from_json).and_then(|v| v.to_f64());
    match value {
        Some(value) => {
            lifecycle.process_values().counter.set(value);
            debug!("Counter set to {}", value);
            Effect::CounterUpdated(value)
        }
        None => {
            warn!("Counter update without a numeric value: {:?}", values);
            Effect::Failed(DispatchError::InvalidValue { name })
        }
    }
}

async fn execute(lifecycle: &mut ServerLifecycle, command: ServerCommand) -> Effect {
    match command {
        ServerCommand::Restart => match lifecycle.restart().await {
            Ok(()) => {
                info!("Restart OPC UA server done");
                Effect::Restarted
            }
            Err(e) => {
                error!("Can not restart OPC UA server: {}", e);
                Effect::Failed(e.into())
            }
        },

        ServerCommand::AddEquipment { node_name } => {
            add(lifecycle, DynamicCategory::Equipment, &node_name).await
        }

        ServerCommand::AddPhysicalAsset { node_name } => {
            add(lifecycle, DynamicCategory::PhysicalAsset, &node_name).await
        }

        ServerCommand::DeleteNode { node_id } => delete(lifecycle, node_id).await,

        ServerCommand::Unknown(command) => {
            error!("Unknown OPC UA command: {}", command);
            Effect::Failed(DispatchError::UnknownCommand(command))
        }
    }
}

async fn add(lifecycle: &mut ServerLifecycle, category: DynamicCategory, node_name: &str) -> Effect {
    match lifecycle.add_dynamic(category, node_name).await {
        Ok(node_id) => {
            info!("Added {:?} node {}", category, node_id);
            Effect::NodeAdded(node_id)
        }
        Err(ServerError::Model(GraphError::DuplicateIdentifier(id))) => {
            error!("Invariant violated: derived node id {} already exists", id);
            Effect::Failed(ServerError::Model(GraphError::DuplicateIdentifier(id)).into())
        }
        Err(ServerError::Model(GraphError::ParentNotFound(parent))) => {
            error!("{:?} folder {} not found", category, parent);
            Effect::Failed(DispatchError::NodeNotFound(parent))
        }
        Err(e) => {
            error!("Can not add {:?} node: {}", category, e);
            Effect::Failed(e.into())
        }
    }
}

async fn delete(lifecycle: &mut ServerLifecycle, node_id: String) -> Effect {
    let id: NodeId = match node_id.parse() {
        Ok(id) => id,
        Err(source) => {
            warn!("Can not delete {:?}: {}", node_id, source);
            return Effect::Failed(DispatchError::InvalidNodeId { node_id, source });
        }
    };

    match lifecycle.delete_node(&id).await {
        Ok(()) => {
            info!("Deleted node {}", id);
            Effect::NodeDeleted(id)
        }
        Err(ServerError::Model(GraphError::NotFound(id))) => {
            warn!("Can not find node {}", id);
            Effect::Failed(DispatchError::NodeNotFound(id))
        }
        Err(e) => {
            error!("Can not delete node {}: {}", id, e);
            Effect::Failed(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{counter, equipment};
    use crate::runtime::ServerConfig;
    use serde_json::json;

    fn message(payload: serde_json::Value) -> FlowMessage {
        FlowMessage::new(payload).with_topic("plant")
    }

    async fn ready() -> CommandDispatcher {
        let mut lifecycle = ServerLifecycle::websocket(ServerConfig {
            port: 0,
            ..ServerConfig::default()
        });
        lifecycle.start().await.unwrap();
        CommandDispatcher::new(Arc::new(Mutex::new(lifecycle)))
    }

    async fn node_count(dispatcher: &CommandDispatcher) -> usize {
        let lifecycle = dispatcher.lifecycle.lock().await;
        let space = lifecycle.address_space().unwrap();
        let count = space.read().await.node_count();
        count
    }

    #[tokio::test]
    async fn test_not_ready_drops_message() {
        let lifecycle = ServerLifecycle::websocket(ServerConfig::default());
        let dispatcher = CommandDispatcher::new(Arc::new(Mutex::new(lifecycle)));

        let outcome = dispatcher
            .dispatch(message(json!({"opcuaCommand": "addEquipment", "nodeName": "Pump"})))
            .await;
        assert!(!outcome.processed());
        assert!(outcome.forward.is_none());
    }

    #[tokio::test]
    async fn test_add_equipment_and_forward() {
        let dispatcher = ready().await;
        let inbound = message(json!({"opcuaCommand": "addEquipment", "nodeName": "Pump"}));

        let outcome = dispatcher.dispatch(inbound.clone()).await;
        assert_eq!(outcome.forward, Some(inbound));
        let Effect::NodeAdded(id) = outcome.effect else {
            panic!("expected a new node");
        };

        let lifecycle = dispatcher.lifecycle.lock().await;
        let space = lifecycle.address_space().unwrap();
        let space = space.read().await;
        assert_eq!(space.find_node(&id).unwrap().browse_name, "Pump1");
        assert_eq!(space.parent_of(&id).unwrap().source, equipment());
    }

    #[tokio::test]
    async fn test_counter_update() {
        let dispatcher = ready().await;
        let outcome = dispatcher
            .dispatch(message(json!({
                "messageType": "Variable",
                "variableName": "Counter",
                "variableValue": [42]
            })))
            .await;
        assert!(matches!(outcome.effect, Effect::CounterUpdated(v) if v == 42.0));

        let lifecycle = dispatcher.lifecycle.lock().await;
        let space = lifecycle.address_space().unwrap();
        assert_eq!(
            space.read().await.read_value(&counter()),
            Ok(Variant::Double(42.0))
        );
    }

    #[tokio::test]
    async fn test_unknown_variable_is_ignored() {
        let dispatcher = ready().await;
        let outcome = dispatcher
            .dispatch(message(json!({
                "messageType": "Variable",
                "variableName": "Pressure",
                "variableValue": [1]
            })))
            .await;
        assert!(matches!(outcome.effect, Effect::VariableIgnored(ref n) if n == "Pressure"));
        assert!(outcome.forward.is_some());
    }

    #[tokio::test]
    async fn test_unknown_command_is_forwarded() {
        let dispatcher = ready().await;
        let before = node_count(&dispatcher).await;

        let outcome = dispatcher
            .dispatch(message(json!({"opcuaCommand": "explode"})))
            .await;
        assert!(matches!(
            outcome.effect,
            Effect::Failed(DispatchError::UnknownCommand(ref c)) if c == "explode"
        ));
        assert!(outcome.forward.is_some());
        assert_eq!(node_count(&dispatcher).await, before);
    }

    #[tokio::test]
    async fn test_delete_missing_node_leaves_graph_unchanged() {
        let dispatcher = ready().await;
        let before = node_count(&dispatcher).await;

        let outcome = dispatcher
            .dispatch(message(json!({"opcuaCommand": "deleteNode", "nodeId": "ns=4;s=Ghost"})))
            .await;
        assert!(matches!(
            outcome.effect,
            Effect::Failed(DispatchError::NodeNotFound(_))
        ));
        assert!(outcome.forward.is_some());
        assert_eq!(node_count(&dispatcher).await, before);
    }

    #[tokio::test]
    async fn test_delete_existing_node() {
        let dispatcher = ready().await;
        let Effect::NodeAdded(id) = dispatcher
            .dispatch(message(json!({"opcuaCommand": "addPhysicalAsset", "nodeName": "Tank"})))
            .await
            .effect
        else {
            panic!("expected a new node");
        };

        let outcome = dispatcher
            .dispatch(message(json!({"opcuaCommand": "deleteNode", "nodeId": id.to_string()})))
            .await;
        assert!(matches!(outcome.effect, Effect::NodeDeleted(ref d) if *d == id));
    }

    #[tokio::test]
    async fn test_restart_resets_dynamic_nodes() {
        let dispatcher = ready().await;
        let Effect::NodeAdded(id) = dispatcher
            .dispatch(message(json!({"opcuaCommand": "addEquipment", "nodeName": "Pump"})))
            .await
            .effect
        else {
            panic!("expected a new node");
        };

        let outcome = dispatcher
            .dispatch(message(json!({"opcuaCommand": "restartOPCUAServer"})))
            .await;
        assert!(matches!(outcome.effect, Effect::Restarted));

        let lifecycle = dispatcher.lifecycle.lock().await;
        assert_eq!(lifecycle.model().unwrap().equipment_counter(), 0);
        let space = lifecycle.address_space().unwrap();
        assert!(space.read().await.find_node(&id).is_none());
    }

    #[tokio::test]
    async fn test_pass_through_and_missing_fields() {
        let dispatcher = ready().await;

        let plain = dispatcher.dispatch(message(json!(17))).await;
        assert!(matches!(plain.effect, Effect::PassThrough));
        assert!(plain.forward.is_some());

        let missing = dispatcher
            .dispatch(message(json!({"opcuaCommand": "addEquipment"})))
            .await;
        assert!(matches!(
            missing.effect,
            Effect::Failed(DispatchError::InvalidMessage(_))
        ));
        assert!(missing.forward.is_some());
    }
}
