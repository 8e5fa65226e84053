//! Flow messages exchanged with the upstream workflow.
//!
//! A flow message is a JSON object with an optional `topic`, a `payload`
//! and any number of extra fields that are carried through untouched.
//! The payload is decoded into a tagged variant per consumer:
//!
//! - the server node reads [`ServerPayload`] (variable updates and commands)
//! - the browser node reads [`BrowseRequest`] (browse actions and topics)

use crate::error::MessageError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A message travelling through the flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    #[serde(default)]
    pub payload: Value,

    /// Fields other than `topic` and `payload`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FlowMessage {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            ..Self::default()
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// The topic, if present and non-empty.
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref().filter(|t| !t.trim().is_empty())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server payloads
// ─────────────────────────────────────────────────────────────────────────────

/// A variable-update message (`messageType` discriminant).
#[derive(Debug, Clone, PartialEq)]
pub enum VariableMessage {
    /// `messageType: "Variable"`.
    Variable { name: String, values: Vec<Value> },
    /// Any other `messageType`; accepted and ignored.
    Unsupported(String),
}

/// A structural command (`opcuaCommand` discriminant).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCommand {
    Restart,
    AddEquipment { node_name: String },
    AddPhysicalAsset { node_name: String },
    DeleteNode { node_id: String },
    Unknown(String),
}

impl ServerCommand {
    pub const RESTART: &'static str = "restartOPCUAServer";
    pub const ADD_EQUIPMENT: &'static str = "addEquipment";
    pub const ADD_PHYSICAL_ASSET: &'static str = "addPhysicalAsset";
    pub const DELETE_NODE: &'static str = "deleteNode";

    fn decode(object: &Map<String, Value>, command: &str) -> Result<Self, MessageError> {
        Ok(match command {
            Self::RESTART => Self::Restart,
            Self::ADD_EQUIPMENT => Self::AddEquipment {
                node_name: required_str(object, command, "nodeName")?,
            },
            Self::ADD_PHYSICAL_ASSET => Self::AddPhysicalAsset {
                node_name: required_str(object, command, "nodeName")?,
            },
            Self::DELETE_NODE => Self::DeleteNode {
                node_id: required_str(object, command, "nodeId")?,
            },
            other => Self::Unknown(other.to_string()),
        })
    }
}

/// What the server node makes of an inbound payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerPayload {
    Variable(VariableMessage),
    Command(ServerCommand),
    /// Neither discriminant present; forwarded untouched.
    PassThrough,
}

impl ServerPayload {
    /// Decodes a payload by its discriminant field.
    ///
    /// `messageType` is checked before `opcuaCommand`; a payload carrying
    /// both is a variable message.
    pub fn decode(payload: &Value) -> Result<Self, MessageError> {
        let Some(object) = payload.as_object() else {
            return Ok(Self::PassThrough);
        };

        if let Some(kind) = object.get("messageType") {
            let kind = kind.as_str().ok_or(MessageError::InvalidField {
                field: "messageType",
                expected: "string",
            })?;
            return Ok(Self::Variable(match kind {
                "Variable" => {
                    let name = required_str(object, kind, "variableName")?;
                    let values = match object.get("variableValue") {
                        Some(Value::Array(values)) => values.clone(),
                        Some(Value::Null) | None => Vec::new(),
                        Some(single) => vec![single.clone()],
                    };
                    VariableMessage::Variable { name, values }
                }
                other => VariableMessage::Unsupported(other.to_string()),
            }));
        }

        if let Some(command) = object.get("opcuaCommand") {
            let command = command.as_str().ok_or(MessageError::InvalidField {
                field: "opcuaCommand",
                expected: "string",
            })?;
            return ServerCommand::decode(object, command).map(Self::Command);
        }

        Ok(Self::PassThrough)
    }
}

fn required_str(
    object: &Map<String, Value>,
    kind: &str,
    field: &'static str,
) -> Result<String, MessageError> {
    match object.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(MessageError::InvalidField {
            field,
            expected: "string",
        }),
        None => Err(MessageError::missing(kind, field)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Browse requests
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ActionPayload {
    actiontype: Value,
    #[serde(default)]
    root: Option<ActionRoot>,
}

#[derive(Debug, Deserialize)]
struct ActionRoot {
    #[serde(default)]
    item: Option<ActionItem>,
}

#[derive(Debug, Deserialize)]
struct ActionItem {
    #[serde(default, rename = "nodeId")]
    node_id: Option<String>,
}

/// What the browser node makes of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseRequest {
    /// The payload carries an `actiontype`.
    Action { action: String, root: Option<String> },
    /// No action; only the message topic (if any) is available.
    Topic(Option<String>),
}

impl BrowseRequest {
    pub const BROWSE: &'static str = "browse";

    pub fn decode(message: &FlowMessage) -> Self {
        let is_action = message
            .payload
            .as_object()
            .is_some_and(|o| o.contains_key("actiontype"));

        if is_action {
            if let Ok(action) = serde_json::from_value::<ActionPayload>(message.payload.clone()) {
                let root = action
                    .root
                    .and_then(|r| r.item)
                    .and_then(|i| i.node_id)
                    .filter(|id| !id.trim().is_empty());
                let action = match action.actiontype {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                return Self::Action { action, root };
            }
            return Self::Action {
                action: String::new(),
                root: None,
            };
        }

        Self::Topic(message.topic().map(str::to_string))
    }

    /// The explicit root of a `browse` action, if one was given.
    pub fn explicit_root(&self) -> Option<&str> {
        match self {
            Self::Action { action, root } if action == Self::BROWSE => root.as_deref(),
            _ => None,
        }
    }
}
