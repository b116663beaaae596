//! Scene engine: everything the affine task owns
//!
//! The engine applies one [`Command`] at a time. Errors caused by external
//! timing (unknown ids on update/remove/subscribe) are logged and dropped;
//! caller bugs (duplicate ids, use after destroy) are logged as errors. No
//! command is retried.

use magicscript_core::event::ARG_FILE_PATH;
use magicscript_core::{
    EventKind, Node, NodeId, NodeKind, PlaneConfig, PlaneDetector, Pose, Properties, RegistryError,
    ResourceKind, ResourceLoader, SceneEvent, SceneRegistry,
};
use serde_json::{Map, Value};
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::command::{Command, SceneSummary};
use crate::lifecycle::{activity_result_targets, HostEvent, LifecycleCoordinator, RESULT_OK};
use crate::media::{MediaAction, MediaPool};
use crate::router::{EventRouter, EventSink};

/// Engine settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of pooled media players
    pub media_pool_size: usize,
    /// Anchor the scene root on the first plane tap
    pub place_root_on_tap: bool,
    /// Plane types used when detection starts without a configuration
    pub plane_types: PlaneConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            media_pool_size: 8,
            place_root_on_tap: true,
            plane_types: PlaneConfig::all(),
        }
    }
}

/// Owns the registry and its collaborators
pub struct SceneEngine {
    registry: SceneRegistry,
    router: EventRouter,
    planes: PlaneDetector,
    media: MediaPool,
    lifecycle: LifecycleCoordinator,
    loader: Arc<dyn ResourceLoader>,
    config: EngineConfig,
}

impl SceneEngine {
    pub fn new(
        config: EngineConfig,
        loader: Arc<dyn ResourceLoader>,
        sink: impl EventSink + 'static,
    ) -> Self {
        let mut registry = SceneRegistry::new();
        registry.set_plane_placement(config.place_root_on_tap);

        Self {
            registry,
            router: EventRouter::new(sink),
            planes: PlaneDetector::new(),
            media: MediaPool::new(config.media_pool_size),
            lifecycle: LifecycleCoordinator::new(),
            loader,
            config,
        }
    }

    pub fn registry(&self) -> &SceneRegistry {
        &self.registry
    }

    pub fn planes(&self) -> &PlaneDetector {
        &self.planes
    }

    pub fn media(&self) -> &MediaPool {
        &self.media
    }

    pub fn lifecycle(&self) -> &LifecycleCoordinator {
        &self.lifecycle
    }

    /// Execute one command; `Break` once the host has been destroyed
    pub fn apply(&mut self, command: Command) -> ControlFlow<()> {
        debug!(command = command.name(), "Applying command");

        match command {
            Command::Create { kind, props, id } => self.create(kind, props, id),
            Command::AddChild { id, parent } => {
                if let Err(e) = self.registry.attach_to_parent(&id, &parent) {
                    error!(node = %id, parent = %parent, error = %e, "Failed to add child node");
                }
            }
            Command::AddToRoot { id } => {
                if let Err(e) = self.registry.attach_to_root(&id) {
                    error!(node = %id, error = %e, "Failed to add node to container");
                }
            }
            Command::RemoveChild { id, parent } => {
                debug!(node = %id, parent = %parent, "Removing child node");
                self.remove(&id);
            }
            Command::RemoveFromRoot { id } => self.remove(&id),
            Command::Update { id, props } => self.update(&id, &props),
            Command::Clear => match self.registry.clear() {
                Ok(removed) => self.retire(&removed),
                Err(e) => error!(error = %e, "Failed to clear scene"),
            },
            Command::Subscribe { id, kind } => {
                self.router.subscribe_forward(&self.registry, &id, kind);
            }
            Command::StartDetecting(config) => {
                let config = config.unwrap_or_else(|| self.config.plane_types.clone());
                self.planes.start_detecting(config);
            }
            Command::StopDetecting => self.planes.stop_detecting(),
            Command::ResetPlanes => self.planes.reset(),
            Command::SubscribePlanes(kind) => self.router.subscribe_planes(kind),
            Command::Host(event) => return self.host(event),
            Command::Fire { id, kind, args } => {
                self.router.fire(&id, kind, args);
            }
            Command::ArReady => {
                self.registry.mark_ar_ready();
            }
            Command::PlanesUpdated(planes) => {
                for event in self.planes.on_planes_update(planes) {
                    self.router.fire_plane(&event);
                }
            }
            Command::PlaneTapped { plane, point } => {
                let event = self.planes.on_plane_tapped(plane, point);
                self.router.fire_plane(&event);
                self.registry.on_plane_tapped(Pose::at(point));
            }
            Command::RegisterAnchor(uuid) => self.registry.register_anchor(uuid),
            Command::FindNode { id, reply } => {
                let _ = reply.send(self.registry.find(&id).map(Node::snapshot));
            }
            Command::GetAllPlanes { config, reply } => {
                let _ = reply.send(self.planes.all_planes(&config));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.summary());
            }
        }

        ControlFlow::Continue(())
    }

    pub fn summary(&self) -> SceneSummary {
        SceneSummary {
            roots: self.registry.roots().to_vec(),
            node_count: self.registry.len(),
            ar_ready: self.registry.is_ar_ready(),
            detecting: self.planes.is_detecting(),
            root_anchor: self.registry.root_anchor().copied(),
        }
    }

    fn create(&mut self, kind: NodeKind, props: Properties, id: NodeId) {
        let mut node = Node::new(kind, props);
        if let Err(e) = node.build(self.loader.as_ref()) {
            error!(node = %id, kind = %kind, error = %e, "Failed to build node");
            self.router.emit(SceneEvent::build_error(&id, e.to_string()));
            return;
        }

        let media = media_source(&node);
        let action = MediaAction::from_props(node.properties());

        if let Err(e) = self.registry.register(node, id.clone()) {
            error!(node = %id, kind = %kind, error = %e, "Failed to register node");
            return;
        }

        if let Some(source) = media {
            match self.media.acquire(&id, source) {
                Ok(()) => {
                    if let Some(action) = action {
                        if let Err(e) = self.media.apply(&id, action) {
                            debug!(node = %id, error = %e, "Media action ignored");
                        }
                    }
                }
                Err(e) => warn!(node = %id, error = %e, "Node registered without a media player"),
            }
        }
    }

    fn update(&mut self, id: &NodeId, props: &Properties) {
        match self.registry.update(id, props, self.loader.as_ref()) {
            Ok(Some(outcome)) => {
                if outcome.rebuilt {
                    if let Some(source) = self.registry.find(id).and_then(media_source) {
                        if let Err(e) = self.media.acquire(id, source) {
                            warn!(node = %id, error = %e, "Failed to reload media source");
                        }
                    }
                }
                if let Some(action) = MediaAction::from_props(props) {
                    if let Err(e) = self.media.apply(id, action) {
                        debug!(node = %id, error = %e, "Media action ignored");
                    }
                }
                self.router.fire(id, EventKind::Update, Map::new());
            }
            Ok(None) => {}
            Err(RegistryError::Build(e)) => {
                error!(node = %id, error = %e, "Failed to rebuild node");
                self.router.emit(SceneEvent::build_error(id, e.to_string()));
            }
            Err(e) => error!(node = %id, error = %e, "Failed to update node"),
        }
    }

    fn remove(&mut self, id: &NodeId) {
        match self.registry.remove(id) {
            Ok(removed) => self.retire(&removed),
            Err(e) => error!(node = %id, error = %e, "Failed to remove node"),
        }
    }

    /// Delete events, handler cleanup and media release for removed nodes
    fn retire(&mut self, removed: &[NodeId]) {
        for id in removed {
            self.router.fire(id, EventKind::Delete, Map::new());
            self.router.forget(id);
            self.media.release(id);
        }
    }

    fn host(&mut self, event: HostEvent) -> ControlFlow<()> {
        let result = self.lifecycle.handle(
            &event,
            &mut [&mut self.registry, &mut self.media, &mut self.planes],
        );
        if let Err(e) = result {
            error!(event = event.name(), error = %e, "Host event rejected");
            return ControlFlow::Continue(());
        }

        match event {
            HostEvent::Destroy => {
                self.router.clear();
                info!("Scene engine shut down");
                return ControlFlow::Break(());
            }
            HostEvent::ActivityResult {
                request_code,
                result_code,
                data,
            } => self.activity_result(request_code, result_code, data),
            HostEvent::NewIntent { .. } | HostEvent::Resume | HostEvent::Pause => {}
        }
        ControlFlow::Continue(())
    }

    fn activity_result(&mut self, request_code: i32, result_code: i32, data: Option<String>) {
        let targets = activity_result_targets(&self.registry, request_code);
        if targets.is_empty() {
            debug!(request_code, "No node waiting for activity result");
            return;
        }

        let path = match data {
            Some(path) if result_code == RESULT_OK => path,
            _ => {
                debug!(request_code, result_code, "File selection canceled");
                return;
            }
        };

        for id in targets {
            let mut args = Map::new();
            args.insert(ARG_FILE_PATH.to_string(), Value::String(path.clone()));
            self.router.fire(&id, EventKind::FileSelected, args);
        }
    }
}

/// Resolved media location of a video or audio node
fn media_source(node: &Node) -> Option<String> {
    if !node.capabilities().media {
        return None;
    }
    node.resources()
        .iter()
        .find(|r| matches!(r.kind, ResourceKind::Video | ResourceKind::Audio))
        .map(|r| r.resolved.clone())
}

impl std::fmt::Debug for SceneEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneEngine")
            .field("nodes", &self.registry.len())
            .field("router", &self.router)
            .field("media", &self.media.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::PlayerState;
    use magicscript_core::{FsResourceLoader, NodeState, Plane, PlaneEventKind, PlaneType};
    use serde_json::json;
    use tokio::sync::mpsc;

    fn engine() -> (SceneEngine, mpsc::UnboundedReceiver<SceneEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let loader = Arc::new(FsResourceLoader::new("/nonexistent"));
        (SceneEngine::new(EngineConfig::default(), loader, tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SceneEvent>) -> Vec<SceneEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn create(kind: NodeKind, id: &str, props: Value) -> Command {
        Command::Create {
            kind,
            props: Properties::from_json(props).unwrap(),
            id: NodeId::from(id),
        }
    }

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    #[test]
    fn test_create_attach_and_click() {
        let (mut engine, mut rx) = engine();
        let _ = engine.apply(create(NodeKind::Button, "b1", json!({"text": "Ok"})));
        let _ = engine.apply(Command::AddToRoot { id: id("b1") });
        let _ = engine.apply(Command::Subscribe {
            id: id("b1"),
            kind: EventKind::Click,
        });
        let _ = engine.apply(Command::Fire {
            id: id("b1"),
            kind: EventKind::Click,
            args: Map::new(),
        });

        assert_eq!(engine.registry().find(&id("b1")).unwrap().state(), NodeState::Attached);
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "onClick");
    }

    #[test]
    fn test_build_failure_reports_error_event() {
        let (mut engine, mut rx) = engine();
        let _ = engine.apply(create(NodeKind::Model, "m1", json!({"modelPath": "fox.glb"})));

        assert!(engine.registry().find(&id("m1")).is_none());
        let events = drain(&mut rx);
        assert_eq!(events[0].name, "onError");
        assert_eq!(events[0].args["nodeId"], "m1");
    }

    #[test]
    fn test_update_and_remove_events() {
        let (mut engine, mut rx) = engine();
        let _ = engine.apply(create(NodeKind::Group, "g1", json!({})));
        let _ = engine.apply(create(NodeKind::Group, "g2", json!({})));
        let _ = engine.apply(Command::AddToRoot { id: id("g1") });
        let _ = engine.apply(Command::AddChild {
            id: id("g2"),
            parent: id("g1"),
        });
        for (node, kind) in [("g1", EventKind::Update), ("g1", EventKind::Delete), ("g2", EventKind::Delete)] {
            let _ = engine.apply(Command::Subscribe { id: id(node), kind });
        }

        let _ = engine.apply(Command::Update {
            id: id("g1"),
            props: Properties::from_json(json!({"visible": false})).unwrap(),
        });
        let _ = engine.apply(Command::RemoveFromRoot { id: id("g1") });

        let names: Vec<(String, Value)> = drain(&mut rx)
            .into_iter()
            .map(|e| (e.name, e.args["nodeId"].clone()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("onUpdate".to_string(), json!("g1")),
                ("onDelete".to_string(), json!("g2")),
                ("onDelete".to_string(), json!("g1")),
            ]
        );
        assert!(engine.registry().is_empty());

        // handlers were dropped with the node
        let _ = engine.apply(create(NodeKind::Group, "g1", json!({})));
        let _ = engine.apply(Command::RemoveFromRoot { id: id("g1") });
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_media_follows_host_lifecycle() {
        let (mut engine, _rx) = engine();
        let _ = engine.apply(create(
            NodeKind::Video,
            "v1",
            json!({"videoPath": "https://example.com/clip.mp4", "action": "start"}),
        ));
        assert_eq!(engine.media().state(&id("v1")), Some(PlayerState::Playing));

        let _ = engine.apply(Command::Host(HostEvent::Pause));
        assert_eq!(engine.media().state(&id("v1")), Some(PlayerState::Paused));
        assert!(engine.registry().find(&id("v1")).unwrap().is_paused());

        let _ = engine.apply(Command::Host(HostEvent::Resume));
        assert_eq!(engine.media().state(&id("v1")), Some(PlayerState::Playing));

        let _ = engine.apply(Command::RemoveFromRoot { id: id("v1") });
        assert!(engine.media().is_empty());
    }

    #[test]
    fn test_destroy_breaks_and_rejects_later_commands() {
        let (mut engine, _rx) = engine();
        let _ = engine.apply(create(NodeKind::Group, "g1", json!({})));

        assert_eq!(engine.apply(Command::Host(HostEvent::Destroy)), ControlFlow::Break(()));
        assert!(engine.registry().is_destroyed());
        assert!(engine.lifecycle().is_destroyed());

        let _ = engine.apply(create(NodeKind::Group, "g2", json!({})));
        assert!(engine.registry().find(&id("g2")).is_none());
        assert_eq!(
            engine.apply(Command::Host(HostEvent::Resume)),
            ControlFlow::Continue(())
        );
    }

    #[test]
    fn test_activity_result_selects_file() {
        let (mut engine, mut rx) = engine();
        let _ = engine.apply(create(NodeKind::FilePicker, "fp", json!({})));
        let _ = engine.apply(Command::Subscribe {
            id: id("fp"),
            kind: EventKind::FileSelected,
        });
        let code = engine
            .registry()
            .find(&id("fp"))
            .and_then(|n| n.request_code())
            .unwrap();

        let _ = engine.apply(Command::Host(HostEvent::ActivityResult {
            request_code: i32::from(code),
            result_code: 0,
            data: Some("/tmp/a.png".to_string()),
        }));
        assert!(drain(&mut rx).is_empty());

        let _ = engine.apply(Command::Host(HostEvent::ActivityResult {
            request_code: i32::from(code),
            result_code: RESULT_OK,
            data: Some("/tmp/a.png".to_string()),
        }));
        let events = drain(&mut rx);
        assert_eq!(events[0].name, "onFileSelected");
        assert_eq!(events[0].args["filePath"], "/tmp/a.png");
    }

    #[test]
    fn test_plane_events_and_root_placement() {
        let (mut engine, mut rx) = engine();
        let _ = engine.apply(Command::StartDetecting(None));
        let _ = engine.apply(Command::SubscribePlanes(PlaneEventKind::Added));
        let _ = engine.apply(Command::SubscribePlanes(PlaneEventKind::Tapped));

        let floor = Plane {
            id: "floor".to_string(),
            plane_type: PlaneType::HorizontalUpward,
            center: [0.0, 0.0, 0.0],
            vertices: Vec::new(),
        };
        let _ = engine.apply(Command::PlanesUpdated(vec![floor.clone()]));
        let _ = engine.apply(Command::PlaneTapped {
            plane: floor,
            point: [0.5, 0.0, -1.0],
        });

        let names: Vec<String> = drain(&mut rx).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["onPlaneDetected", "onPlaneTapped"]);
        assert_eq!(engine.summary().root_anchor.unwrap().position, [0.5, 0.0, -1.0]);
    }
}
