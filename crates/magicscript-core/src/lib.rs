//! MagicScript Core - Scene node model and registry
//!
//! This crate provides the foundational types for the MagicScript bridge:
//! - Property maps received from the scripting side
//! - Scene nodes with their build/update/destroy lifecycle
//! - The scene registry owning the id -> node mapping and the root set
//! - Event kinds and outbound event payloads
//! - AR plane tracking state

pub mod error;
pub mod event;
pub mod node;
pub mod plane;
pub mod props;
pub mod registry;
pub mod resource;

pub use error::{BuildError, PlaneError, PropertyError, RegistryError};
pub use event::{Capability, EventKind, SceneEvent};
pub use node::{Capabilities, Node, NodeId, NodeKind, NodeSnapshot, NodeState, Transform, UpdateOutcome};
pub use plane::{Plane, PlaneConfig, PlaneDetector, PlaneEvent, PlaneEventKind, PlaneType};
pub use props::Properties;
pub use registry::{AttachTarget, Pose, SceneRegistry};
pub use resource::{FsResourceLoader, ResourceHandle, ResourceKind, ResourceLoader, ResourceRef};
