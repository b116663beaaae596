//! Scene registry: id -> node mapping, root set and tree invariants
//!
//! The registry is a plain single-owner structure. It is not synchronised;
//! the bridge confines it to one task and serialises every mutation there.
//!
//! Invariants:
//! - ids are unique while registered, and may be reused after removal
//! - a node has at most one location: a parent node, the root set, or an AR anchor
//! - attaching never creates a cycle
//! - removing a node removes and destroys its whole subtree, children first

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::RegistryError;
use crate::node::{Node, NodeId, NodeState, UpdateOutcome};
use crate::props::Properties;
use crate::resource::ResourceLoader;

/// Where a node ended up after an attach call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachTarget {
    Root,
    Parent(NodeId),
    /// AR anchor named by the node's `anchorUuid`
    Anchor(String),
}

/// World pose of an AR anchor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: [f32; 3],
    pub rotation: [f32; 4],
}

impl Pose {
    pub fn at(position: [f32; 3]) -> Self {
        Self {
            position,
            rotation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Registry of live scene nodes
#[derive(Debug, Default)]
pub struct SceneRegistry {
    /// All registered nodes indexed by id
    nodes: HashMap<String, Node>,
    /// Nodes attached directly under the scene root, in insertion order
    roots: Vec<NodeId>,
    /// AR anchors known to the scene and the nodes attached to each
    anchors: HashMap<String, Vec<NodeId>>,
    /// Pose the scene root is anchored at, once placed
    root_anchor: Option<Pose>,
    /// Whether the next plane tap places the scene root
    plane_placement: bool,
    /// AR toolkit loaded, renderables can be requested
    ar_ready: bool,
    destroyed: bool,
}

impl SceneRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node under `id`, the node stays inert until attached
    pub fn register(&mut self, mut node: Node, id: NodeId) -> Result<(), RegistryError> {
        self.ensure_alive()?;

        if self.nodes.contains_key(&id.0) {
            return Err(RegistryError::DuplicateId(id.0));
        }
        if node.state() == NodeState::Destroyed {
            return Err(RegistryError::Build(crate::error::BuildError::Destroyed));
        }
        if !node.is_built() {
            debug!(node = %id, "Registering node that has not been built");
        }

        node.set_registered(id.clone());
        if self.ar_ready {
            node.attach_renderable();
        }

        debug!(node = %id, kind = %node.kind(), "Registered node");
        self.nodes.insert(id.0, node);
        Ok(())
    }

    /// Append `id` to the children of `parent_id`, moving it if already attached
    pub fn attach_to_parent(
        &mut self,
        id: &NodeId,
        parent_id: &NodeId,
    ) -> Result<AttachTarget, RegistryError> {
        self.ensure_alive()?;
        self.ensure_known(id)?;

        if let Some(anchor) = self.try_attach_to_anchor(id) {
            return Ok(anchor);
        }

        self.ensure_known(parent_id)?;
        if id == parent_id || self.is_ancestor(id, parent_id) {
            return Err(RegistryError::Cycle {
                child: id.0.clone(),
                parent: parent_id.0.clone(),
            });
        }

        self.unlink(id);

        let (layout, parent_visible) = match self.nodes.get_mut(&parent_id.0) {
            Some(parent) => {
                parent.push_child(id.clone());
                (parent.kind().is_layout(), parent.is_visible())
            }
            None => return Err(RegistryError::UnknownNode(parent_id.0.clone())),
        };
        if let Some(node) = self.nodes.get_mut(&id.0) {
            node.set_parent(Some(parent_id.clone()), layout);
        }
        if !parent_visible {
            self.set_subtree_visible(id, false);
        }
        self.refresh_attachment(id);

        debug!(node = %id, parent = %parent_id, "Attached node to parent");
        Ok(AttachTarget::Parent(parent_id.clone()))
    }

    /// Add `id` to the root set
    pub fn attach_to_root(&mut self, id: &NodeId) -> Result<AttachTarget, RegistryError> {
        self.ensure_alive()?;
        self.ensure_known(id)?;

        if let Some(anchor) = self.try_attach_to_anchor(id) {
            return Ok(anchor);
        }
        if self.roots.contains(id) {
            return Ok(AttachTarget::Root);
        }

        self.unlink(id);
        self.roots.push(id.clone());
        self.refresh_attachment(id);

        debug!(node = %id, "Attached node to root");
        Ok(AttachTarget::Root)
    }

    /// Unlink `id` from its parent, root set or anchor, keeping it registered
    ///
    /// Returns whether the node was attached anywhere.
    pub fn detach(&mut self, id: &NodeId) -> Result<bool, RegistryError> {
        self.ensure_alive()?;
        self.ensure_known(id)?;
        let was_linked = self.unlink(id);
        self.refresh_attachment(id);
        Ok(was_linked)
    }

    /// Remove `id` and its whole subtree, returning the removed ids bottom-up
    ///
    /// Unknown ids are a no-op.
    pub fn remove(&mut self, id: &NodeId) -> Result<Vec<NodeId>, RegistryError> {
        self.ensure_alive()?;

        if !self.nodes.contains_key(&id.0) {
            warn!(node = %id, "Cannot remove node: not found");
            return Ok(Vec::new());
        }

        self.unlink(id);
        let removed = self.destroy_subtree(id);
        info!(node = %id, removed = removed.len(), remaining = self.nodes.len(), "Removed node");
        Ok(removed)
    }

    /// Apply a property delta to `id`
    ///
    /// Unknown ids are logged and ignored (`Ok(None)`): updates can race with
    /// removals issued earlier by the script.
    pub fn update(
        &mut self,
        id: &NodeId,
        delta: &Properties,
        loader: &dyn ResourceLoader,
    ) -> Result<Option<UpdateOutcome>, RegistryError> {
        self.ensure_alive()?;

        let node = match self.nodes.get_mut(&id.0) {
            Some(node) => node,
            None => {
                warn!(node = %id, "Cannot update node: not found");
                return Ok(None);
            }
        };

        let outcome = node.update(delta, loader)?;
        let visible = node.is_visible();
        if outcome.rebuilt && self.ar_ready {
            node.attach_renderable();
        }
        if outcome.visibility_changed {
            for child in self.descendants(id) {
                if let Some(child) = self.nodes.get_mut(&child.0) {
                    child.set_visible(visible);
                }
            }
        }

        debug!(node = %id, rebuilt = outcome.rebuilt, "Updated node");
        Ok(Some(outcome))
    }

    /// Remove and destroy every node, returning the removed ids
    ///
    /// Idempotent; anchors stay known but lose their attached nodes.
    pub fn clear(&mut self) -> Result<Vec<NodeId>, RegistryError> {
        self.ensure_alive()?;
        Ok(self.clear_all())
    }

    /// Look up a node, never fails
    pub fn find(&self, id: &NodeId) -> Option<&Node> {
        if self.destroyed {
            return None;
        }
        self.nodes.get(&id.0)
    }

    pub fn find_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        if self.destroyed {
            return None;
        }
        self.nodes.get_mut(&id.0)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.find(id).is_some()
    }

    pub fn parent_of(&self, id: &NodeId) -> Option<&NodeId> {
        self.find(id).and_then(|node| node.parent())
    }

    pub fn children_of(&self, id: &NodeId) -> Vec<&Node> {
        self.find(id)
            .map(|node| {
                node.children()
                    .iter()
                    .filter_map(|child| self.nodes.get(&child.0))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Root set in insertion order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Nodes attached to an AR anchor
    pub fn anchored(&self, uuid: &str) -> &[NodeId] {
        self.anchors.get(uuid).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|k| k.as_str())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All descendants of `id` in depth-first pre-order
    pub fn descendants(&self, id: &NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self
            .nodes
            .get(&id.0)
            .map(|n| n.children().iter().rev().cloned().collect())
            .unwrap_or_default();

        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(&current.0) {
                stack.extend(node.children().iter().rev().cloned());
            }
            result.push(current);
        }
        result
    }

    /// Make an AR anchor available as an attachment target
    pub fn register_anchor(&mut self, uuid: impl Into<String>) {
        self.anchors.entry(uuid.into()).or_default();
    }

    /// Forget an AR anchor, nodes attached to it become detached
    pub fn remove_anchor(&mut self, uuid: &str) -> Vec<NodeId> {
        let detached = self.anchors.remove(uuid).unwrap_or_default();
        for id in &detached {
            self.refresh_attachment(id);
        }
        detached
    }

    /// The AR toolkit finished loading; request renderables of every node
    ///
    /// Returns how many renderables were requested.
    pub fn mark_ar_ready(&mut self) -> usize {
        self.ar_ready = true;
        let requested = self
            .nodes
            .values_mut()
            .filter_map(|node| node.attach_renderable().then_some(()))
            .count();
        info!(requested, "AR ready, renderables requested");
        requested
    }

    pub fn is_ar_ready(&self) -> bool {
        self.ar_ready
    }

    /// Enable or disable placing the scene root with the next plane tap
    pub fn set_plane_placement(&mut self, enabled: bool) {
        self.plane_placement = enabled;
    }

    pub fn plane_placement(&self) -> bool {
        self.plane_placement
    }

    /// A detected plane was tapped; anchors the root there while placement is on
    pub fn on_plane_tapped(&mut self, pose: Pose) -> bool {
        if !self.plane_placement {
            return false;
        }
        self.plane_placement = false;
        self.root_anchor = Some(pose);
        info!(position = ?pose.position, "Scene root anchored on plane");
        true
    }

    pub fn root_anchor(&self) -> Option<&Pose> {
        self.root_anchor.as_ref()
    }

    pub fn pause_all(&mut self) {
        self.nodes.values_mut().for_each(Node::pause);
    }

    pub fn resume_all(&mut self) {
        self.nodes.values_mut().for_each(Node::resume);
    }

    /// Clear the registry and refuse every later mutation
    pub fn destroy(&mut self) -> Vec<NodeId> {
        if self.destroyed {
            return Vec::new();
        }
        let removed = self.clear_all();
        self.anchors.clear();
        self.root_anchor = None;
        self.destroyed = true;
        info!(removed = removed.len(), "Scene registry destroyed");
        removed
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn ensure_alive(&self) -> Result<(), RegistryError> {
        if self.destroyed {
            Err(RegistryError::Destroyed)
        } else {
            Ok(())
        }
    }

    fn ensure_known(&self, id: &NodeId) -> Result<(), RegistryError> {
        if self.nodes.contains_key(&id.0) {
            Ok(())
        } else {
            Err(RegistryError::UnknownNode(id.0.clone()))
        }
    }

    fn clear_all(&mut self) -> Vec<NodeId> {
        let mut removed = Vec::new();

        for root in std::mem::take(&mut self.roots) {
            removed.extend(self.destroy_subtree(&root));
        }
        for attached in std::mem::take(&mut self.anchors).into_iter() {
            let (uuid, ids) = attached;
            for id in ids {
                removed.extend(self.destroy_subtree(&id));
            }
            self.anchors.insert(uuid, Vec::new());
        }
        // registered but never attached
        for (_, mut node) in self.nodes.drain() {
            if let Some(id) = node.id().cloned() {
                removed.push(id);
            }
            node.destroy();
        }

        if !removed.is_empty() {
            info!(removed = removed.len(), "Cleared scene");
        }
        removed
    }

    /// Route a node carrying `anchorUuid` to its AR anchor when that anchor exists
    fn try_attach_to_anchor(&mut self, id: &NodeId) -> Option<AttachTarget> {
        let uuid = self.nodes.get(&id.0)?.anchor_uuid()?.to_string();
        if !self.anchors.contains_key(&uuid) {
            debug!(node = %id, anchor = %uuid, "Anchor not found, using requested target");
            return None;
        }

        self.unlink(id);
        if let Some(list) = self.anchors.get_mut(&uuid) {
            list.push(id.clone());
        }
        self.refresh_attachment(id);
        debug!(node = %id, anchor = %uuid, "Attached node to anchor");
        Some(AttachTarget::Anchor(uuid))
    }

    /// Remove `id` from wherever it is attached
    fn unlink(&mut self, id: &NodeId) -> bool {
        let parent = self.nodes.get_mut(&id.0).and_then(|node| {
            let parent = node.parent().cloned();
            node.set_parent(None, false);
            parent
        });

        if let Some(parent_id) = parent {
            if let Some(parent) = self.nodes.get_mut(&parent_id.0) {
                parent.remove_child(id);
            }
            return true;
        }

        let before = self.roots.len();
        self.roots.retain(|root| root != id);
        if self.roots.len() != before {
            return true;
        }

        let mut linked = false;
        for list in self.anchors.values_mut() {
            let before = list.len();
            list.retain(|n| n != id);
            linked |= list.len() != before;
        }
        linked
    }

    /// Whether `ancestor` is on the parent chain of `id`
    fn is_ancestor(&self, ancestor: &NodeId, id: &NodeId) -> bool {
        let mut current = self.nodes.get(&id.0).and_then(|n| n.parent());
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.nodes.get(&parent.0).and_then(|n| n.parent());
        }
        false
    }

    /// Whether `id` is reachable from the root set or an anchor
    fn is_reachable(&self, id: &NodeId) -> bool {
        let mut top = id;
        while let Some(parent) = self.nodes.get(&top.0).and_then(|n| n.parent()) {
            top = parent;
        }
        self.roots.contains(top) || self.anchors.values().any(|list| list.contains(top))
    }

    /// Recompute the attached state of `id` and its subtree
    fn refresh_attachment(&mut self, id: &NodeId) {
        let attached = self.is_reachable(id);
        let mut subtree = self.descendants(id);
        subtree.push(id.clone());
        for node_id in subtree {
            if let Some(node) = self.nodes.get_mut(&node_id.0) {
                node.set_attached(attached);
            }
        }
    }

    fn set_subtree_visible(&mut self, id: &NodeId, visible: bool) {
        let mut subtree = self.descendants(id);
        subtree.push(id.clone());
        for node_id in subtree {
            if let Some(node) = self.nodes.get_mut(&node_id.0) {
                node.set_visible(visible);
            }
        }
    }

    /// Remove `id` and its descendants from the map, children first
    fn destroy_subtree(&mut self, id: &NodeId) -> Vec<NodeId> {
        let mut order = self.descendants(id);
        order.reverse();
        order.push(id.clone());

        let mut removed = Vec::with_capacity(order.len());
        for node_id in order {
            if let Some(mut node) = self.nodes.remove(&node_id.0) {
                node.destroy();
                removed.push(node_id);
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::tests::StubLoader;
    use crate::node::NodeKind;
    use serde_json::json;

    fn built(kind: NodeKind) -> Node {
        let mut node = Node::new(kind, Properties::new());
        node.build(&StubLoader::new()).unwrap();
        node
    }

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    fn registry_with(ids: &[&str]) -> SceneRegistry {
        let mut registry = SceneRegistry::new();
        for node_id in ids {
            registry.register(built(NodeKind::Group), id(node_id)).unwrap();
        }
        registry
    }

    #[test]
    fn test_register_and_find() {
        let registry = registry_with(&["a", "b", "c"]);
        for node_id in ["a", "b", "c"] {
            let node = registry.find(&id(node_id)).unwrap();
            assert_eq!(node.id(), Some(&id(node_id)));
            assert_eq!(node.state(), NodeState::Registered);
        }
        assert!(registry.find(&id("d")).is_none());
    }

    #[test]
    fn test_duplicate_id_keeps_existing_node() {
        let mut registry = SceneRegistry::new();
        registry.register(built(NodeKind::Group), id("n1")).unwrap();

        let result = registry.register(built(NodeKind::Button), id("n1"));
        assert_eq!(result, Err(RegistryError::DuplicateId("n1".to_string())));
        assert_eq!(registry.find(&id("n1")).unwrap().kind(), NodeKind::Group);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = registry_with(&["a"]);
        assert_eq!(registry.remove(&id("a")).unwrap(), vec![id("a")]);
        assert!(registry.find(&id("a")).is_none());
        assert!(registry.remove(&id("a")).unwrap().is_empty());
    }

    #[test]
    fn test_remove_parent_removes_descendants_bottom_up() {
        let mut registry = registry_with(&["root", "a", "b"]);
        registry.attach_to_root(&id("root")).unwrap();
        registry.attach_to_parent(&id("a"), &id("root")).unwrap();
        registry.attach_to_parent(&id("b"), &id("a")).unwrap();

        let removed = registry.remove(&id("a")).unwrap();
        assert_eq!(removed, vec![id("b"), id("a")]);
        assert!(registry.find(&id("a")).is_none());
        assert!(registry.find(&id("b")).is_none());
        assert!(registry.find(&id("root")).unwrap().children().is_empty());
    }

    #[test]
    fn test_reattach_moves_child_to_end_of_new_parent() {
        let mut registry = registry_with(&["p1", "p2", "x", "child"]);
        registry.attach_to_parent(&id("x"), &id("p2")).unwrap();
        registry.attach_to_parent(&id("child"), &id("p1")).unwrap();
        registry.attach_to_parent(&id("child"), &id("p2")).unwrap();

        assert!(registry.find(&id("p1")).unwrap().children().is_empty());
        assert_eq!(registry.find(&id("p2")).unwrap().children(), &[id("x"), id("child")]);
        assert_eq!(registry.parent_of(&id("child")), Some(&id("p2")));
    }

    #[test]
    fn test_attach_unknown_ids_fail() {
        let mut registry = registry_with(&["a"]);
        assert_eq!(
            registry.attach_to_parent(&id("a"), &id("missing")),
            Err(RegistryError::UnknownNode("missing".to_string()))
        );
        assert_eq!(
            registry.attach_to_root(&id("missing")),
            Err(RegistryError::UnknownNode("missing".to_string()))
        );
    }

    #[test]
    fn test_attach_rejects_cycles() {
        let mut registry = registry_with(&["a", "b"]);
        registry.attach_to_parent(&id("b"), &id("a")).unwrap();

        assert!(matches!(
            registry.attach_to_parent(&id("a"), &id("b")),
            Err(RegistryError::Cycle { .. })
        ));
        assert!(matches!(
            registry.attach_to_parent(&id("a"), &id("a")),
            Err(RegistryError::Cycle { .. })
        ));
    }

    #[test]
    fn test_root_reattach_is_noop_and_moves_from_parent() {
        let mut registry = registry_with(&["p", "c"]);
        registry.attach_to_parent(&id("c"), &id("p")).unwrap();
        registry.attach_to_root(&id("c")).unwrap();
        registry.attach_to_root(&id("c")).unwrap();

        assert_eq!(registry.roots(), &[id("c")]);
        assert!(registry.find(&id("p")).unwrap().children().is_empty());
        assert_eq!(registry.find(&id("c")).unwrap().state(), NodeState::Attached);
    }

    #[test]
    fn test_attached_state_follows_reachability() {
        let mut registry = registry_with(&["p", "c"]);
        registry.attach_to_parent(&id("c"), &id("p")).unwrap();
        assert_eq!(registry.find(&id("c")).unwrap().state(), NodeState::Registered);

        registry.attach_to_root(&id("p")).unwrap();
        assert_eq!(registry.find(&id("c")).unwrap().state(), NodeState::Attached);

        registry.detach(&id("p")).unwrap();
        assert_eq!(registry.find(&id("c")).unwrap().state(), NodeState::Registered);
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut registry = registry_with(&["a", "b", "loose"]);
        registry.attach_to_root(&id("a")).unwrap();
        registry.attach_to_parent(&id("b"), &id("a")).unwrap();

        let removed = registry.clear().unwrap();
        assert_eq!(removed.len(), 3);
        for node_id in ["a", "b", "loose"] {
            assert!(registry.find(&id(node_id)).is_none());
        }
        assert!(registry.roots().is_empty());
        assert!(registry.clear().unwrap().is_empty());

        // still usable after clear
        registry.register(built(NodeKind::Group), id("a")).unwrap();
        assert!(registry.contains(&id("a")));
    }

    #[test]
    fn test_update_unknown_is_silent() {
        let mut registry = SceneRegistry::new();
        let delta = Properties::from_json(json!({"color": "red"})).unwrap();
        assert_eq!(registry.update(&id("ghost"), &delta, &StubLoader::new()), Ok(None));
    }

    #[test]
    fn test_scenario_register_update_remove() {
        let mut registry = SceneRegistry::new();
        let loader = StubLoader::new();
        registry.register(built(NodeKind::Button), id("n1")).unwrap();
        registry.attach_to_root(&id("n1")).unwrap();

        let delta = Properties::from_json(json!({"color": "red"})).unwrap();
        assert!(registry.update(&id("n1"), &delta, &loader).unwrap().is_some());
        assert_eq!(
            registry.find(&id("n1")).unwrap().property("color"),
            Some(&json!("red"))
        );

        registry.remove(&id("n1")).unwrap();
        assert!(registry.find(&id("n1")).is_none());
        assert_eq!(registry.update(&id("n1"), &delta, &loader), Ok(None));
        assert!(registry.roots().is_empty());
    }

    #[test]
    fn test_visibility_propagates_to_descendants() {
        let mut registry = registry_with(&["p", "c"]);
        registry.attach_to_parent(&id("c"), &id("p")).unwrap();
        let loader = StubLoader::new();

        let hide = Properties::from_json(json!({"visible": false})).unwrap();
        registry.update(&id("p"), &hide, &loader).unwrap();
        assert!(!registry.find(&id("c")).unwrap().is_visible());

        let show = Properties::from_json(json!({"visible": true})).unwrap();
        registry.update(&id("p"), &show, &loader).unwrap();
        assert!(registry.find(&id("c")).unwrap().is_visible());
    }

    #[test]
    fn test_anchor_routing() {
        let mut registry = SceneRegistry::new();
        let mut node = Node::new(
            NodeKind::Group,
            Properties::from_json(json!({"anchorUuid": "anchor-1"})).unwrap(),
        );
        node.build(&StubLoader::new()).unwrap();
        registry.register(node, id("n")).unwrap();

        // unknown anchor falls back to the requested target
        assert_eq!(registry.attach_to_root(&id("n")).unwrap(), AttachTarget::Root);

        registry.register_anchor("anchor-1");
        assert_eq!(
            registry.attach_to_root(&id("n")).unwrap(),
            AttachTarget::Anchor("anchor-1".to_string())
        );
        assert!(registry.roots().is_empty());
        assert_eq!(registry.anchored("anchor-1"), &[id("n")]);

        registry.remove_anchor("anchor-1");
        assert_eq!(registry.find(&id("n")).unwrap().state(), NodeState::Registered);
    }

    #[test]
    fn test_ar_ready_requests_renderables() {
        let mut registry = SceneRegistry::new();
        registry.register(built(NodeKind::Button), id("b")).unwrap();
        registry.register(built(NodeKind::Group), id("g")).unwrap();

        assert_eq!(registry.mark_ar_ready(), 1);
        assert!(registry.find(&id("b")).unwrap().renderable_requested());

        registry.register(built(NodeKind::Image), id("i")).unwrap();
        assert!(registry.find(&id("i")).unwrap().renderable_requested());
    }

    #[test]
    fn test_plane_tap_places_root_once() {
        let mut registry = SceneRegistry::new();
        assert!(!registry.on_plane_tapped(Pose::at([1.0, 0.0, 0.0])));

        registry.set_plane_placement(true);
        assert!(registry.on_plane_tapped(Pose::at([1.0, 0.0, 0.0])));
        assert!(!registry.on_plane_tapped(Pose::at([2.0, 0.0, 0.0])));
        assert_eq!(registry.root_anchor().unwrap().position, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_destroyed_registry_rejects_mutations() {
        let mut registry = registry_with(&["a"]);
        assert_eq!(registry.destroy(), vec![id("a")]);

        assert_eq!(
            registry.register(built(NodeKind::Group), id("b")),
            Err(RegistryError::Destroyed)
        );
        assert_eq!(registry.remove(&id("a")), Err(RegistryError::Destroyed));
        assert_eq!(registry.clear(), Err(RegistryError::Destroyed));
        assert!(registry.find(&id("a")).is_none());
    }
}
