//! Per-node event routing
//!
//! Each node holds at most one handler per listener slot. Handlers run on
//! the affine task and return the events to deliver; the router hands those
//! to the [`EventSink`] without waiting for any acknowledgement.

use magicscript_core::{EventKind, NodeId, PlaneEvent, PlaneEventKind, SceneEvent, SceneRegistry};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, trace, warn};

/// Event handler installed for a node
pub type Handler = Box<dyn FnMut(&NodeId, &Map<String, Value>) -> Vec<SceneEvent> + Send>;

/// Outbound destination for scene events
pub trait EventSink: Send {
    fn emit(&self, event: SceneEvent);
}

impl EventSink for broadcast::Sender<SceneEvent> {
    fn emit(&self, event: SceneEvent) {
        // no subscribers connected yet
        if self.send(event).is_err() {
            trace!("Scene event dropped, no receivers");
        }
    }
}

impl EventSink for mpsc::UnboundedSender<SceneEvent> {
    fn emit(&self, event: SceneEvent) {
        let _ = self.send(event);
    }
}

struct Subscription {
    kind: EventKind,
    handler: Handler,
}

/// Routes widget and AR-world events to the sink
pub struct EventRouter {
    handlers: HashMap<NodeId, HashMap<EventKind, Subscription>>,
    plane_subscriptions: HashSet<PlaneEventKind>,
    sink: Box<dyn EventSink>,
}

impl EventRouter {
    pub fn new(sink: impl EventSink + 'static) -> Self {
        Self {
            handlers: HashMap::new(),
            plane_subscriptions: HashSet::new(),
            sink: Box::new(sink),
        }
    }

    /// Install `handler` for `kind` on `id`, replacing the previous one
    ///
    /// Unknown nodes and nodes lacking the required capability are ignored.
    pub fn subscribe(
        &mut self,
        registry: &SceneRegistry,
        id: &NodeId,
        kind: EventKind,
        handler: Handler,
    ) -> bool {
        let node = match registry.find(id) {
            Some(node) => node,
            None => {
                warn!(node = %id, event = %kind, "Cannot add event handler: node not found");
                return false;
            }
        };

        if let Some(capability) = kind.required_capability() {
            if !node.capabilities().supports(capability) {
                debug!(
                    node = %id,
                    kind = %node.kind(),
                    event = %kind,
                    "Node does not support event, handler ignored"
                );
                return false;
            }
        }

        let slot = kind.listener_slot();
        let replaced = self
            .handlers
            .entry(id.clone())
            .or_default()
            .insert(slot, Subscription { kind, handler })
            .is_some();
        debug!(node = %id, event = %kind, replaced, "Event handler added");
        true
    }

    /// Install the default handler forwarding the payload under the event name
    pub fn subscribe_forward(&mut self, registry: &SceneRegistry, id: &NodeId, kind: EventKind) -> bool {
        let handler: Handler = Box::new(move |node_id, args| {
            std::iter::once(kind)
                .chain(kind.aliases().iter().copied())
                .map(|k| SceneEvent::for_node(k, node_id, args.clone()))
                .collect()
        });
        self.subscribe(registry, id, kind, handler)
    }

    /// Run the handler for `kind` on `id`, returns how many events were emitted
    pub fn fire(&mut self, id: &NodeId, kind: EventKind, args: Map<String, Value>) -> usize {
        let subscription = match self
            .handlers
            .get_mut(id)
            .and_then(|slots| slots.get_mut(&kind.listener_slot()))
        {
            Some(subscription) => subscription,
            None => {
                trace!(node = %id, event = %kind, "No handler for event");
                return 0;
            }
        };

        let events = (subscription.handler)(id, &args);
        let count = events.len();
        for event in events {
            self.sink.emit(event);
        }
        count
    }

    /// Event kind currently subscribed in the slot used by `kind`
    pub fn subscribed(&self, id: &NodeId, kind: EventKind) -> Option<EventKind> {
        self.handlers
            .get(id)
            .and_then(|slots| slots.get(&kind.listener_slot()))
            .map(|s| s.kind)
    }

    pub fn subscribe_planes(&mut self, kind: PlaneEventKind) {
        if self.plane_subscriptions.insert(kind) {
            debug!(event = %kind, "Plane event handler added");
        }
    }

    /// Deliver a plane event when scripts subscribed to its kind
    pub fn fire_plane(&mut self, event: &PlaneEvent) -> bool {
        if !self.plane_subscriptions.contains(&event.kind) {
            return false;
        }
        self.sink.emit(event.to_scene_event());
        true
    }

    /// Drop every handler of `id`
    pub fn forget(&mut self, id: &NodeId) -> usize {
        self.handlers.remove(id).map(|slots| slots.len()).unwrap_or(0)
    }

    /// Drop all node and plane handlers
    pub fn clear(&mut self) {
        self.handlers.clear();
        self.plane_subscriptions.clear();
    }

    /// Send an event that is not produced by a handler
    pub fn emit(&self, event: SceneEvent) {
        self.sink.emit(event);
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("nodes", &self.handlers.len())
            .field("plane_subscriptions", &self.plane_subscriptions)
            .finish()
    }
}
