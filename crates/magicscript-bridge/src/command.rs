//! Bridge call wire format and the internal command set
//!
//! Calls arrive from the scripting runtime as JSON objects tagged by
//! `method`, e.g.
//!
//! ```json
//! {"method": "createNode", "type": "ButtonNode", "nodeId": "b1", "props": {"text": "Ok"}}
//! {"method": "addChildNode", "nodeId": "b1", "parentId": "g1"}
//! {"method": "addEventHandler", "event": "onClick", "nodeId": "b1"}
//! ```
//!
//! Each call converts into exactly one [`Command`] executed on the affine task.

use magicscript_core::plane::PLANE_TYPE;
use magicscript_core::{
    EventKind, NodeId, NodeKind, NodeSnapshot, Plane, PlaneConfig, PlaneError, PlaneEventKind,
    Pose, Properties,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::oneshot;

use crate::error::CommandError;
use crate::lifecycle::HostEvent;

/// A call as sent by the scripting runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum BridgeCall {
    /// `create<NodeType>(props, nodeId)`
    CreateNode {
        #[serde(rename = "type")]
        node_type: String,
        #[serde(rename = "nodeId")]
        node_id: NodeId,
        #[serde(default)]
        props: Value,
    },
    AddChildNode {
        #[serde(rename = "nodeId")]
        node_id: NodeId,
        #[serde(rename = "parentId")]
        parent_id: NodeId,
    },
    /// Attach under the scene root
    AddChildNodeToContainer {
        #[serde(rename = "nodeId")]
        node_id: NodeId,
    },
    RemoveChildNode {
        #[serde(rename = "nodeId")]
        node_id: NodeId,
        #[serde(rename = "parentId")]
        parent_id: NodeId,
    },
    RemoveChildNodeFromRoot {
        #[serde(rename = "nodeId")]
        node_id: NodeId,
    },
    UpdateNode {
        #[serde(rename = "nodeId")]
        node_id: NodeId,
        #[serde(default)]
        props: Value,
    },
    ClearScene,
    /// `addOn<EventKind>EventHandler(nodeId)`
    AddEventHandler {
        event: String,
        #[serde(rename = "nodeId")]
        node_id: NodeId,
    },
    StartDetecting {
        #[serde(default)]
        config: Value,
    },
    StopDetecting,
    ResetPlanes,
    AddPlaneEventHandler {
        event: String,
    },
    HostEvent {
        event: HostEvent,
    },
    /// Widget event reported by the native side
    NativeEvent(NativeEvent),
    /// AR toolkit finished loading
    ArReady,
    PlanesUpdated {
        planes: Vec<Plane>,
    },
    PlaneTapped {
        plane: Plane,
        point: [f32; 3],
    },
    RegisterAnchor {
        uuid: String,
    },
}

/// Widget interaction reported by the native side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeEvent {
    #[serde(rename = "nodeId")]
    pub node_id: NodeId,
    /// Event name (`onClick`, `onTextChanged`, ...)
    pub event: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

/// Summary of the scene returned by snapshot queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSummary {
    pub roots: Vec<NodeId>,
    pub node_count: usize,
    pub ar_ready: bool,
    pub detecting: bool,
    pub root_anchor: Option<Pose>,
}

/// Work executed on the affine task
#[derive(Debug)]
pub enum Command {
    Create {
        kind: NodeKind,
        props: Properties,
        id: NodeId,
    },
    AddChild {
        id: NodeId,
        parent: NodeId,
    },
    AddToRoot {
        id: NodeId,
    },
    RemoveChild {
        id: NodeId,
        parent: NodeId,
    },
    RemoveFromRoot {
        id: NodeId,
    },
    Update {
        id: NodeId,
        props: Properties,
    },
    Clear,
    Subscribe {
        id: NodeId,
        kind: EventKind,
    },
    /// `None` uses the configured default plane types
    StartDetecting(Option<PlaneConfig>),
    StopDetecting,
    ResetPlanes,
    SubscribePlanes(PlaneEventKind),
    Host(HostEvent),
    Fire {
        id: NodeId,
        kind: EventKind,
        args: Map<String, Value>,
    },
    ArReady,
    PlanesUpdated(Vec<Plane>),
    PlaneTapped {
        plane: Plane,
        point: [f32; 3],
    },
    RegisterAnchor(String),
    FindNode {
        id: NodeId,
        reply: oneshot::Sender<Option<NodeSnapshot>>,
    },
    GetAllPlanes {
        config: PlaneConfig,
        reply: oneshot::Sender<Result<Vec<Plane>, PlaneError>>,
    },
    Snapshot {
        reply: oneshot::Sender<SceneSummary>,
    },
}

impl Command {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::Create { .. } => "create",
            Command::AddChild { .. } => "addChild",
            Command::AddToRoot { .. } => "addToRoot",
            Command::RemoveChild { .. } => "removeChild",
            Command::RemoveFromRoot { .. } => "removeFromRoot",
            Command::Update { .. } => "update",
            Command::Clear => "clear",
            Command::Subscribe { .. } => "subscribe",
            Command::StartDetecting(_) => "startDetecting",
            Command::StopDetecting => "stopDetecting",
            Command::ResetPlanes => "resetPlanes",
            Command::SubscribePlanes(_) => "subscribePlanes",
            Command::Host(_) => "host",
            Command::Fire { .. } => "fire",
            Command::ArReady => "arReady",
            Command::PlanesUpdated(_) => "planesUpdated",
            Command::PlaneTapped { .. } => "planeTapped",
            Command::RegisterAnchor(_) => "registerAnchor",
            Command::FindNode { .. } => "findNode",
            Command::GetAllPlanes { .. } => "getAllPlanes",
            Command::Snapshot { .. } => "snapshot",
        }
    }
}

impl TryFrom<BridgeCall> for Command {
    type Error = CommandError;

    fn try_from(call: BridgeCall) -> Result<Self, Self::Error> {
        let command = match call {
            BridgeCall::CreateNode {
                node_type,
                node_id,
                props,
            } => Command::Create {
                kind: NodeKind::from_type_name(&node_type)
                    .ok_or(CommandError::UnknownNodeType(node_type))?,
                props: Properties::from_json(props)?,
                id: node_id,
            },
            BridgeCall::AddChildNode { node_id, parent_id } => Command::AddChild {
                id: node_id,
                parent: parent_id,
            },
            BridgeCall::AddChildNodeToContainer { node_id } => Command::AddToRoot { id: node_id },
            BridgeCall::RemoveChildNode { node_id, parent_id } => Command::RemoveChild {
                id: node_id,
                parent: parent_id,
            },
            BridgeCall::RemoveChildNodeFromRoot { node_id } => {
                Command::RemoveFromRoot { id: node_id }
            }
            BridgeCall::UpdateNode { node_id, props } => Command::Update {
                id: node_id,
                props: Properties::from_json(props)?,
            },
            BridgeCall::ClearScene => Command::Clear,
            BridgeCall::AddEventHandler { event, node_id } => Command::Subscribe {
                id: node_id,
                kind: EventKind::parse(&event).ok_or(CommandError::UnknownEvent(event))?,
            },
            BridgeCall::StartDetecting { config } => {
                let props = Properties::from_json(config)?;
                Command::StartDetecting(
                    props
                        .contains(PLANE_TYPE)
                        .then(|| PlaneConfig::from_props(&props)),
                )
            }
            BridgeCall::StopDetecting => Command::StopDetecting,
            BridgeCall::ResetPlanes => Command::ResetPlanes,
            BridgeCall::AddPlaneEventHandler { event } => Command::SubscribePlanes(
                PlaneEventKind::parse(&event).ok_or(CommandError::UnknownEvent(event))?,
            ),
            BridgeCall::HostEvent { event } => Command::Host(event),
            BridgeCall::NativeEvent(native) => Command::Fire {
                kind: EventKind::parse(&native.event)
                    .ok_or(CommandError::UnknownEvent(native.event))?,
                id: native.node_id,
                args: native.args,
            },
            BridgeCall::ArReady => Command::ArReady,
            BridgeCall::PlanesUpdated { planes } => Command::PlanesUpdated(planes),
            BridgeCall::PlaneTapped { plane, point } => Command::PlaneTapped { plane, point },
            BridgeCall::RegisterAnchor { uuid } => Command::RegisterAnchor(uuid),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Result<Command, CommandError> {
        let call: BridgeCall = serde_json::from_value(value).unwrap();
        Command::try_from(call)
    }

    #[test]
    fn test_create_call_parses() {
        let command = parse(json!({
            "method": "createNode",
            "type": "ButtonNode",
            "nodeId": "b1",
            "props": {"text": "Ok"}
        }))
        .unwrap();

        match command {
            Command::Create { kind, props, id } => {
                assert_eq!(kind, NodeKind::Button);
                assert_eq!(props.read_str("text"), Some("Ok"));
                assert_eq!(id, NodeId::from("b1"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_names_are_rejected() {
        assert_eq!(
            parse(json!({"method": "createNode", "type": "HologramNode", "nodeId": "x"})).unwrap_err(),
            CommandError::UnknownNodeType("HologramNode".to_string())
        );
        assert_eq!(
            parse(json!({"method": "addEventHandler", "event": "onWobble", "nodeId": "x"})).unwrap_err(),
            CommandError::UnknownEvent("onWobble".to_string())
        );
        assert!(matches!(
            parse(json!({"method": "updateNode", "nodeId": "x", "props": [1]})),
            Err(CommandError::Properties(_))
        ));
    }

    #[test]
    fn test_event_handler_method_names() {
        let command = parse(json!({
            "method": "addEventHandler",
            "event": "addOnToggleChangedEventHandler",
            "nodeId": "t1"
        }))
        .unwrap();
        assert!(matches!(
            command,
            Command::Subscribe { kind: EventKind::ToggleChanged, .. }
        ));

        let command = parse(json!({"method": "addPlaneEventHandler", "event": "onPlaneDetected"})).unwrap();
        assert!(matches!(command, Command::SubscribePlanes(PlaneEventKind::Added)));
    }

    #[test]
    fn test_start_detecting_config() {
        let command = parse(json!({"method": "startDetecting"})).unwrap();
        assert!(matches!(command, Command::StartDetecting(None)));

        let command = parse(json!({
            "method": "startDetecting",
            "config": {"planeType": ["vertical"]}
        }))
        .unwrap();
        match command {
            Command::StartDetecting(Some(config)) => {
                assert_eq!(config, PlaneConfig::from_names(&["vertical"]))
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_host_and_native_events_parse() {
        let command = parse(json!({"method": "hostEvent", "event": {"type": "pause"}})).unwrap();
        assert!(matches!(command, Command::Host(HostEvent::Pause)));

        let command = parse(json!({
            "method": "nativeEvent",
            "nodeId": "e1",
            "event": "onTextChanged",
            "args": {"text": "abc"}
        }))
        .unwrap();
        match command {
            Command::Fire { id, kind, args } => {
                assert_eq!(id, NodeId::from("e1"));
                assert_eq!(kind, EventKind::TextChanged);
                assert_eq!(args["text"], "abc");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
