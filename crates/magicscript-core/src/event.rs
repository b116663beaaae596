//! Event kinds and outbound event payloads

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::node::NodeId;

pub const ARG_NODE_ID: &str = "nodeId";
pub const ARG_TEXT: &str = "text";
pub const ARG_TOGGLE_ACTIVE: &str = "On";
pub const ARG_SELECTED_ITEMS: &str = "selectedItemsIndexes";
pub const ARG_SLIDER_VALUE: &str = "Value";
pub const ARG_COLOR: &str = "color";
pub const ARG_DATE: &str = "date";
pub const ARG_TIME: &str = "time";
pub const ARG_SCROLL_VALUE: &str = "ScrollValue";
pub const ARG_CONFIRMATION_ANGLE: &str = "Angle";
pub const ARG_FILE_PATH: &str = "filePath";
pub const ARG_ERROR: &str = "error";

/// Behaviour a node kind can declare, required by event subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    /// Click, press, focus and enable/disable notifications
    Interactive,
    TextInput,
    Toggle,
    Slider,
    Selection,
    Scrolling,
    ColorPicking,
    DatePicking,
    TimePicking,
    Dialog,
    Confirmation,
    VideoPlayback,
    FilePicking,
}

/// Node event a script can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "onActivate")]
    Activate,
    #[serde(rename = "onClick")]
    Click,
    #[serde(rename = "onPress")]
    Press,
    #[serde(rename = "onLongPress")]
    LongPress,
    #[serde(rename = "onRelease")]
    Release,
    #[serde(rename = "onFocusGained")]
    FocusGained,
    #[serde(rename = "onFocusLost")]
    FocusLost,
    #[serde(rename = "onEnabled")]
    Enabled,
    #[serde(rename = "onDisabled")]
    Disabled,
    #[serde(rename = "onUpdate")]
    Update,
    #[serde(rename = "onDelete")]
    Delete,
    #[serde(rename = "onTextChanged")]
    TextChanged,
    #[serde(rename = "onToggleChanged")]
    ToggleChanged,
    #[serde(rename = "onVideoPrepared")]
    VideoPrepared,
    #[serde(rename = "onSelectionChanged")]
    SelectionChanged,
    #[serde(rename = "onSliderChanged")]
    SliderChanged,
    #[serde(rename = "onColorConfirmed")]
    ColorConfirmed,
    #[serde(rename = "onColorCanceled")]
    ColorCanceled,
    #[serde(rename = "onColorChanged")]
    ColorChanged,
    #[serde(rename = "onDateChanged")]
    DateChanged,
    #[serde(rename = "onDateConfirmed")]
    DateConfirmed,
    #[serde(rename = "onTimeChanged")]
    TimeChanged,
    #[serde(rename = "onTimeConfirmed")]
    TimeConfirmed,
    #[serde(rename = "onScrollChanged")]
    ScrollChanged,
    #[serde(rename = "onDialogConfirmed")]
    DialogConfirmed,
    #[serde(rename = "onDialogCanceled")]
    DialogCanceled,
    #[serde(rename = "onDialogTimeExpired")]
    DialogTimeExpired,
    #[serde(rename = "onConfirmationCompleted")]
    ConfirmationCompleted,
    #[serde(rename = "onConfirmationUpdated")]
    ConfirmationUpdated,
    #[serde(rename = "onConfirmationCanceled")]
    ConfirmationCanceled,
    #[serde(rename = "onFileSelected")]
    FileSelected,
}

impl EventKind {
    pub const ALL: &'static [EventKind] = &[
        EventKind::Activate,
        EventKind::Click,
        EventKind::Press,
        EventKind::LongPress,
        EventKind::Release,
        EventKind::FocusGained,
        EventKind::FocusLost,
        EventKind::Enabled,
        EventKind::Disabled,
        EventKind::Update,
        EventKind::Delete,
        EventKind::TextChanged,
        EventKind::ToggleChanged,
        EventKind::VideoPrepared,
        EventKind::SelectionChanged,
        EventKind::SliderChanged,
        EventKind::ColorConfirmed,
        EventKind::ColorCanceled,
        EventKind::ColorChanged,
        EventKind::DateChanged,
        EventKind::DateConfirmed,
        EventKind::TimeChanged,
        EventKind::TimeConfirmed,
        EventKind::ScrollChanged,
        EventKind::DialogConfirmed,
        EventKind::DialogCanceled,
        EventKind::DialogTimeExpired,
        EventKind::ConfirmationCompleted,
        EventKind::ConfirmationUpdated,
        EventKind::ConfirmationCanceled,
        EventKind::FileSelected,
    ];

    /// Name of the event as delivered to scripts
    pub fn event_name(&self) -> &'static str {
        match self {
            EventKind::Activate => "onActivate",
            EventKind::Click => "onClick",
            EventKind::Press => "onPress",
            EventKind::LongPress => "onLongPress",
            EventKind::Release => "onRelease",
            EventKind::FocusGained => "onFocusGained",
            EventKind::FocusLost => "onFocusLost",
            EventKind::Enabled => "onEnabled",
            EventKind::Disabled => "onDisabled",
            EventKind::Update => "onUpdate",
            EventKind::Delete => "onDelete",
            EventKind::TextChanged => "onTextChanged",
            EventKind::ToggleChanged => "onToggleChanged",
            EventKind::VideoPrepared => "onVideoPrepared",
            EventKind::SelectionChanged => "onSelectionChanged",
            EventKind::SliderChanged => "onSliderChanged",
            EventKind::ColorConfirmed => "onColorConfirmed",
            EventKind::ColorCanceled => "onColorCanceled",
            EventKind::ColorChanged => "onColorChanged",
            EventKind::DateChanged => "onDateChanged",
            EventKind::DateConfirmed => "onDateConfirmed",
            EventKind::TimeChanged => "onTimeChanged",
            EventKind::TimeConfirmed => "onTimeConfirmed",
            EventKind::ScrollChanged => "onScrollChanged",
            EventKind::DialogConfirmed => "onDialogConfirmed",
            EventKind::DialogCanceled => "onDialogCanceled",
            EventKind::DialogTimeExpired => "onDialogTimeExpired",
            EventKind::ConfirmationCompleted => "onConfirmationCompleted",
            EventKind::ConfirmationUpdated => "onConfirmationUpdated",
            EventKind::ConfirmationCanceled => "onConfirmationCanceled",
            EventKind::FileSelected => "onFileSelected",
        }
    }

    /// Parse either the event name (`onClick`) or the bridge method name
    /// (`addOnClickEventHandler`)
    pub fn parse(name: &str) -> Option<EventKind> {
        let name = name
            .strip_prefix("add")
            .and_then(|n| n.strip_suffix("EventHandler"))
            .map(|n| n.replacen("On", "on", 1))
            .unwrap_or_else(|| name.to_string());
        EventKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.event_name() == name)
    }

    /// Capability a node needs before a handler for this event can be attached
    pub fn required_capability(&self) -> Option<Capability> {
        match self {
            EventKind::Update | EventKind::Delete => None,
            EventKind::Activate
            | EventKind::Click
            | EventKind::Press
            | EventKind::LongPress
            | EventKind::Release
            | EventKind::FocusGained
            | EventKind::FocusLost
            | EventKind::Enabled
            | EventKind::Disabled => Some(Capability::Interactive),
            EventKind::TextChanged => Some(Capability::TextInput),
            EventKind::ToggleChanged => Some(Capability::Toggle),
            EventKind::VideoPrepared => Some(Capability::VideoPlayback),
            EventKind::SelectionChanged => Some(Capability::Selection),
            EventKind::SliderChanged => Some(Capability::Slider),
            EventKind::ColorConfirmed | EventKind::ColorCanceled | EventKind::ColorChanged => {
                Some(Capability::ColorPicking)
            }
            EventKind::DateChanged | EventKind::DateConfirmed => Some(Capability::DatePicking),
            EventKind::TimeChanged | EventKind::TimeConfirmed => Some(Capability::TimePicking),
            EventKind::ScrollChanged => Some(Capability::Scrolling),
            EventKind::DialogConfirmed | EventKind::DialogCanceled | EventKind::DialogTimeExpired => {
                Some(Capability::Dialog)
            }
            EventKind::ConfirmationCompleted
            | EventKind::ConfirmationUpdated
            | EventKind::ConfirmationCanceled => Some(Capability::Confirmation),
            EventKind::FileSelected => Some(Capability::FilePicking),
        }
    }

    /// Additional event names emitted together with this one
    ///
    /// Activation is reported to scripts as both `onActivate` and `onClick`.
    pub fn aliases(&self) -> &'static [EventKind] {
        match self {
            EventKind::Activate => &[EventKind::Click],
            _ => &[],
        }
    }

    /// Listener slot this event occupies on a node
    ///
    /// Activate and click share the node's single click listener, so
    /// subscribing to one replaces the other.
    pub fn listener_slot(&self) -> EventKind {
        match self {
            EventKind::Activate => EventKind::Click,
            other => *other,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.event_name())
    }
}

/// Event delivered to the scripting side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneEvent {
    /// Script-facing event name (`onClick`, `onPlaneDetected`, ...)
    pub name: String,
    /// Source node, absent for AR-world events
    #[serde(default, rename = "nodeId", skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    /// Event arguments
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl SceneEvent {
    /// Node event, `args` gets the `nodeId` key
    pub fn for_node(kind: EventKind, node_id: &NodeId, mut args: Map<String, Value>) -> Self {
        args.insert(ARG_NODE_ID.to_string(), Value::String(node_id.0.clone()));
        Self {
            name: kind.event_name().to_string(),
            node_id: Some(node_id.clone()),
            args,
        }
    }

    /// Event that is not tied to a node
    pub fn global(name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            node_id: None,
            args,
        }
    }

    /// Build failure report for a node that could not be created
    pub fn build_error(node_id: &NodeId, message: impl Into<String>) -> Self {
        let mut args = Map::new();
        args.insert(ARG_NODE_ID.to_string(), Value::String(node_id.0.clone()));
        args.insert(ARG_ERROR.to_string(), Value::String(message.into()));
        Self {
            name: "onError".to_string(),
            node_id: Some(node_id.clone()),
            args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_names() {
        assert_eq!(EventKind::parse("onClick"), Some(EventKind::Click));
        assert_eq!(
            EventKind::parse("addOnTextChangedEventHandler"),
            Some(EventKind::TextChanged)
        );
        assert_eq!(
            EventKind::parse("addOnDialogTimeExpiredEventHandler"),
            Some(EventKind::DialogTimeExpired)
        );
        assert_eq!(EventKind::parse("onWobble"), None);
    }

    #[test]
    fn test_activate_shares_click_slot() {
        assert_eq!(EventKind::Activate.listener_slot(), EventKind::Click);
        assert_eq!(EventKind::Click.listener_slot(), EventKind::Click);
        assert_eq!(EventKind::Activate.aliases(), &[EventKind::Click]);
    }

    #[test]
    fn test_serde_names_match_event_names() {
        for kind in EventKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, Value::String(kind.event_name().to_string()));
        }
    }

    #[test]
    fn test_node_event_carries_node_id() {
        let event = SceneEvent::for_node(EventKind::Press, &NodeId::from("b1"), Map::new());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["name"], "onPress");
        assert_eq!(json["nodeId"], "b1");
        assert_eq!(json["args"]["nodeId"], "b1");
    }
}
