//! Error taxonomy shared by the registry, node builders and plane tracking

use thiserror::Error;

use crate::resource::ResourceKind;

/// Errors raised by [`crate::SceneRegistry`] operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Node id already registered: {0}")]
    DuplicateId(String),
    #[error("Unknown node: {0}")]
    UnknownNode(String),
    #[error("Attaching {child} under {parent} would create a cycle")]
    Cycle { child: String, parent: String },
    #[error("Scene registry has been destroyed")]
    Destroyed,
    #[error("Build failed: {0}")]
    Build(#[from] BuildError),
}

/// Errors raised while allocating a node's resources
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("Node has already been built")]
    AlreadyBuilt,
    #[error("Node has been destroyed")]
    Destroyed,
    #[error("Missing {kind} resource: {location}")]
    MissingResource { kind: ResourceKind, location: String },
    #[error("Invalid property {key}: {reason}")]
    InvalidProperty { key: String, reason: String },
}

/// Errors raised when reading a property map
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropertyError {
    #[error("Properties must be a JSON object, got {0}")]
    NotAnObject(String),
}

/// Errors reported to `getAllPlanes` callers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaneError {
    #[error("You have to enable planes detection with startDetecting method!")]
    NotDetecting,
    #[error("There are no planes detected yet")]
    NoPlanes,
}
