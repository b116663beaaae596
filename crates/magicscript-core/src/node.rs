//! Scene nodes and their build lifecycle
//!
//! A node is created from a kind tag and an initial property map, built once
//! (resources resolved through a [`ResourceLoader`]), then registered and
//! attached by the [`crate::SceneRegistry`]. Widget-specific behaviour is
//! described by [`Capabilities`] instead of a type hierarchy.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::BuildError;
use crate::event::Capability;
use crate::props::Properties;
use crate::resource::{required_resources, ResourceHandle, ResourceLoader};

pub const PROP_LOCAL_POSITION: &str = "localPosition";
pub const PROP_LOCAL_SCALE: &str = "localScale";
pub const PROP_LOCAL_ROTATION: &str = "localRotation";
pub const PROP_VISIBLE: &str = "visible";
pub const PROP_ENABLED: &str = "enabled";
pub const PROP_ANCHOR_UUID: &str = "anchorUuid";

/// Unique identifier for a node, supplied by the scripting side
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Widget type of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Group,
    Button,
    Image,
    Text,
    TextEdit,
    Model,
    Video,
    ScrollBar,
    ScrollView,
    Slider,
    Spinner,
    CircleConfirmation,
    Toggle,
    ToggleGroup,
    ProgressBar,
    Line,
    GridLayout,
    LinearLayout,
    RectLayout,
    DropdownList,
    DropdownListItem,
    ColorPicker,
    WebView,
    ListView,
    ListViewItem,
    DatePicker,
    TimePicker,
    Dialog,
    Tab,
    Panel,
    Content,
    PageView,
    Audio,
    FilePicker,
}

impl NodeKind {
    pub const ALL: &'static [NodeKind] = &[
        NodeKind::Group,
        NodeKind::Button,
        NodeKind::Image,
        NodeKind::Text,
        NodeKind::TextEdit,
        NodeKind::Model,
        NodeKind::Video,
        NodeKind::ScrollBar,
        NodeKind::ScrollView,
        NodeKind::Slider,
        NodeKind::Spinner,
        NodeKind::CircleConfirmation,
        NodeKind::Toggle,
        NodeKind::ToggleGroup,
        NodeKind::ProgressBar,
        NodeKind::Line,
        NodeKind::GridLayout,
        NodeKind::LinearLayout,
        NodeKind::RectLayout,
        NodeKind::DropdownList,
        NodeKind::DropdownListItem,
        NodeKind::ColorPicker,
        NodeKind::WebView,
        NodeKind::ListView,
        NodeKind::ListViewItem,
        NodeKind::DatePicker,
        NodeKind::TimePicker,
        NodeKind::Dialog,
        NodeKind::Tab,
        NodeKind::Panel,
        NodeKind::Content,
        NodeKind::PageView,
        NodeKind::Audio,
        NodeKind::FilePicker,
    ];

    /// Name used by the scripting side (`create<Name>Node`)
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Group => "group",
            NodeKind::Button => "button",
            NodeKind::Image => "image",
            NodeKind::Text => "text",
            NodeKind::TextEdit => "textEdit",
            NodeKind::Model => "model",
            NodeKind::Video => "video",
            NodeKind::ScrollBar => "scrollBar",
            NodeKind::ScrollView => "scrollView",
            NodeKind::Slider => "slider",
            NodeKind::Spinner => "spinner",
            NodeKind::CircleConfirmation => "circleConfirmation",
            NodeKind::Toggle => "toggle",
            NodeKind::ToggleGroup => "toggleGroup",
            NodeKind::ProgressBar => "progressBar",
            NodeKind::Line => "line",
            NodeKind::GridLayout => "gridLayout",
            NodeKind::LinearLayout => "linearLayout",
            NodeKind::RectLayout => "rectLayout",
            NodeKind::DropdownList => "dropdownList",
            NodeKind::DropdownListItem => "dropdownListItem",
            NodeKind::ColorPicker => "colorPicker",
            NodeKind::WebView => "webView",
            NodeKind::ListView => "listView",
            NodeKind::ListViewItem => "listViewItem",
            NodeKind::DatePicker => "datePicker",
            NodeKind::TimePicker => "timePicker",
            NodeKind::Dialog => "dialog",
            NodeKind::Tab => "tab",
            NodeKind::Panel => "panel",
            NodeKind::Content => "content",
            NodeKind::PageView => "pageView",
            NodeKind::Audio => "audio",
            NodeKind::FilePicker => "filePicker",
        }
    }

    /// Parse a node type name as used in bridge calls
    ///
    /// Accepts `"ButtonNode"`, `"createButtonNode"`, `"button"` and the like.
    pub fn from_type_name(name: &str) -> Option<NodeKind> {
        let name = name.strip_prefix("create").unwrap_or(name);
        let name = name.strip_suffix("Node").unwrap_or(name);
        NodeKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
    }

    /// Whether children attached to this node have their position managed by it
    pub fn is_layout(&self) -> bool {
        matches!(
            self,
            NodeKind::GridLayout
                | NodeKind::LinearLayout
                | NodeKind::RectLayout
                | NodeKind::PageView
                | NodeKind::ListView
        )
    }

    /// Capabilities of this node kind
    pub fn capabilities(&self) -> Capabilities {
        use Capability::*;

        let (has_renderable, text_bearing, media, supported): (bool, bool, bool, &'static [Capability]) =
            match self {
                NodeKind::Group | NodeKind::Content | NodeKind::Panel | NodeKind::ToggleGroup => {
                    (false, false, false, &[])
                }
                NodeKind::GridLayout | NodeKind::LinearLayout | NodeKind::RectLayout => {
                    (false, false, false, &[Interactive])
                }
                NodeKind::PageView => (false, false, false, &[]),
                NodeKind::Model | NodeKind::Line => (true, false, false, &[]),
                NodeKind::Audio => (false, false, true, &[]),
                NodeKind::Video => (true, false, true, &[VideoPlayback]),
                NodeKind::Button | NodeKind::Text | NodeKind::Tab | NodeKind::DropdownListItem => {
                    (true, true, false, &[Interactive])
                }
                NodeKind::ListViewItem | NodeKind::Spinner | NodeKind::ProgressBar | NodeKind::ScrollBar
                | NodeKind::WebView | NodeKind::ListView => (true, false, false, &[Interactive]),
                NodeKind::Image => (true, false, false, &[Interactive]),
                NodeKind::TextEdit => (true, true, false, &[Interactive, TextInput]),
                NodeKind::Toggle => (true, true, false, &[Interactive, Toggle]),
                NodeKind::Slider => (true, false, false, &[Interactive, Slider]),
                NodeKind::ScrollView => (true, false, false, &[Interactive, Scrolling]),
                NodeKind::DropdownList => (true, true, false, &[Interactive, Selection]),
                NodeKind::ColorPicker => (true, false, false, &[Interactive, ColorPicking]),
                NodeKind::DatePicker => (true, true, false, &[Interactive, DatePicking]),
                NodeKind::TimePicker => (true, true, false, &[Interactive, TimePicking]),
                NodeKind::Dialog => (true, true, false, &[Interactive, Dialog]),
                NodeKind::CircleConfirmation => (true, false, false, &[Interactive, Confirmation]),
                NodeKind::FilePicker => (true, true, false, &[Interactive, FilePicking]),
            };

        let build_time_keys: &'static [&'static str] = match self {
            NodeKind::Image => &["filePath", "icon"],
            NodeKind::Model => &["modelPath"],
            NodeKind::Video => &["videoPath"],
            NodeKind::Audio => &["fileName"],
            _ if text_bearing => &["fontFamily"],
            _ => &[],
        };

        Capabilities {
            has_renderable,
            text_bearing,
            media,
            supported,
            build_time_keys,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a node kind can do, queried instead of its concrete type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// The node displays a renderable (view, model, video surface)
    pub has_renderable: bool,
    /// The node renders text and therefore needs a font
    pub text_bearing: bool,
    /// The node owns a pooled media player
    pub media: bool,
    supported: &'static [Capability],
    /// Properties that can only be applied by rebuilding the renderable
    pub build_time_keys: &'static [&'static str],
}

impl Capabilities {
    pub fn supports(&self, capability: Capability) -> bool {
        self.supported.contains(&capability)
    }

    pub fn is_build_time_key(&self, key: &str) -> bool {
        self.build_time_keys.contains(&key)
    }
}

/// Lifecycle state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    /// Constructed, no resources allocated
    Created,
    /// Resources resolved, not yet visible to the registry
    Built,
    /// Visible through lookups, not part of the rendered tree
    Registered,
    /// Reachable from the root set or an anchor
    Attached,
    /// Terminal
    Destroyed,
}

/// Local transform of a node relative to its parent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: [f32; 3],
    pub scale: [f32; 3],
    /// Quaternion (x, y, z, w)
    pub rotation: [f32; 4],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            scale: [1.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Result of applying a property delta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    /// The renderable was rebuilt because a build-time-only property changed
    pub rebuilt: bool,
    /// The `visible` flag changed
    pub visibility_changed: bool,
}

/// A node in the scene tree
#[derive(Debug, Clone)]
pub struct Node {
    id: Option<NodeId>,
    kind: NodeKind,
    state: NodeState,
    properties: Properties,
    transform: Transform,
    visible: bool,
    enabled: bool,
    anchor_uuid: Option<String>,
    resources: Vec<ResourceHandle>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    layout_managed: bool,
    renderable_requested: bool,
    paused: bool,
    request_code: Option<u8>,
}

impl Node {
    /// Create a node with its initial properties (nothing is allocated yet)
    pub fn new(kind: NodeKind, properties: Properties) -> Self {
        trace!(kind = %kind, props = properties.len(), "Created node");
        Self {
            id: None,
            kind,
            state: NodeState::Created,
            properties,
            transform: Transform::default(),
            visible: true,
            enabled: true,
            anchor_uuid: None,
            resources: Vec::new(),
            parent: None,
            children: Vec::new(),
            layout_managed: false,
            renderable_requested: false,
            paused: false,
            request_code: None,
        }
    }

    /// Resolve resources and apply the initial properties
    ///
    /// Must be called exactly once before registration.
    pub fn build(&mut self, loader: &dyn ResourceLoader) -> Result<(), BuildError> {
        match self.state {
            NodeState::Created => {}
            NodeState::Destroyed => return Err(BuildError::Destroyed),
            _ => return Err(BuildError::AlreadyBuilt),
        }

        self.resources = resolve_all(self.kind, &self.properties, loader)?;
        if self.kind.capabilities().supports(Capability::FilePicking) {
            self.request_code = Some((Uuid::new_v4().as_u128() & 0xFF) as u8);
        }

        let props = self.properties.clone();
        self.apply_properties(&props);
        self.state = NodeState::Built;
        debug!(kind = %self.kind, resources = self.resources.len(), "Built node");
        Ok(())
    }

    /// Apply a property delta
    ///
    /// When the delta changes a build-time-only property the resources are
    /// resolved again first; on failure nothing is changed.
    pub fn update(
        &mut self,
        delta: &Properties,
        loader: &dyn ResourceLoader,
    ) -> Result<UpdateOutcome, BuildError> {
        if self.state == NodeState::Destroyed {
            return Err(BuildError::Destroyed);
        }

        let capabilities = self.kind.capabilities();
        let needs_rebuild = self.state != NodeState::Created
            && delta.keys().any(|key| {
                capabilities.is_build_time_key(key) && self.properties.get(key) != delta.get(key)
            });

        let mut merged = self.properties.clone();
        merged.merge(delta);

        if needs_rebuild {
            let resources = resolve_all(self.kind, &merged, loader)?;
            self.resources = resources;
            // renderable has to be requested again with the new resources
            self.renderable_requested = false;
            debug!(kind = %self.kind, "Rebuilt node renderable");
        }
        self.properties = merged;

        let was_visible = self.visible;
        let remaining = delta.without(capabilities.build_time_keys);
        self.apply_properties(&remaining);

        Ok(UpdateOutcome {
            rebuilt: needs_rebuild,
            visibility_changed: was_visible != self.visible,
        })
    }

    /// Mark the renderable as requested from the rendering toolkit
    pub fn attach_renderable(&mut self) -> bool {
        if !self.kind.capabilities().has_renderable || self.renderable_requested {
            return false;
        }
        self.renderable_requested = true;
        true
    }

    pub fn pause(&mut self) {
        if self.kind.capabilities().media {
            self.paused = true;
        }
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Release resources, terminal
    pub fn destroy(&mut self) {
        self.resources.clear();
        self.parent = None;
        self.children.clear();
        self.state = NodeState::Destroyed;
    }

    pub fn id(&self) -> Option<&NodeId> {
        self.id.as_ref()
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn capabilities(&self) -> Capabilities {
        self.kind.capabilities()
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn is_built(&self) -> bool {
        !matches!(self.state, NodeState::Created | NodeState::Destroyed)
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Returns the value of a property
    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn anchor_uuid(&self) -> Option<&str> {
        self.anchor_uuid.as_deref()
    }

    pub fn resources(&self) -> &[ResourceHandle] {
        &self.resources
    }

    pub fn parent(&self) -> Option<&NodeId> {
        self.parent.as_ref()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn renderable_requested(&self) -> bool {
        self.renderable_requested
    }

    pub fn request_code(&self) -> Option<u8> {
        self.request_code
    }

    /// Serializable view of the node
    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id.clone(),
            kind: self.kind,
            state: self.state,
            parent: self.parent.clone(),
            children: self.children.clone(),
            properties: self.properties.clone(),
            transform: self.transform,
            visible: self.visible,
            enabled: self.enabled,
        }
    }

    pub(crate) fn set_registered(&mut self, id: NodeId) {
        self.id = Some(id);
        self.state = NodeState::Registered;
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>, layout_managed: bool) {
        self.parent = parent;
        self.layout_managed = layout_managed;
    }

    pub(crate) fn set_attached(&mut self, attached: bool) {
        if self.state == NodeState::Destroyed {
            return;
        }
        self.state = if attached {
            NodeState::Attached
        } else {
            NodeState::Registered
        };
    }

    pub(crate) fn push_child(&mut self, child: NodeId) {
        self.children.push(child);
    }

    pub(crate) fn remove_child(&mut self, child: &NodeId) {
        self.children.retain(|c| c != child);
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn apply_properties(&mut self, props: &Properties) {
        // position is owned by the parent layout
        if !self.layout_managed {
            if let Some(position) = props.read_vec3(PROP_LOCAL_POSITION) {
                self.transform.position = position;
            }
        }
        if let Some(scale) = props.read_vec3(PROP_LOCAL_SCALE) {
            self.transform.scale = scale;
        }
        if let Some(rotation) = props.read_quat(PROP_LOCAL_ROTATION) {
            self.transform.rotation = rotation;
        }
        if let Some(visible) = props.read_bool(PROP_VISIBLE) {
            self.visible = visible;
        }
        if let Some(enabled) = props.read_bool(PROP_ENABLED) {
            self.enabled = enabled;
        }
        if let Some(anchor) = props.read_str(PROP_ANCHOR_UUID) {
            self.anchor_uuid = (!anchor.is_empty()).then(|| anchor.to_string());
        }
    }
}

fn resolve_all(
    kind: NodeKind,
    props: &Properties,
    loader: &dyn ResourceLoader,
) -> Result<Vec<ResourceHandle>, BuildError> {
    required_resources(kind, props)?
        .iter()
        .map(|resource| loader.resolve(resource))
        .collect()
}

/// Serializable view of a node for query responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: Option<NodeId>,
    pub kind: NodeKind,
    pub state: NodeState,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub properties: Properties,
    pub transform: Transform,
    pub visible: bool,
    pub enabled: bool,
}
