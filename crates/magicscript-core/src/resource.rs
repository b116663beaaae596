//! External resources a node needs before it can be rendered
//!
//! Fonts, models, textures and media files are resolved through a
//! [`ResourceLoader`] when a node is built. The loader is an opaque service,
//! the registry only cares whether resolution succeeded.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::error::BuildError;
use crate::node::NodeKind;
use crate::props::Properties;

/// Font families that are always available on the host
const SYSTEM_FONTS: &[&str] = &["default", "system"];

/// Kind of external resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Font,
    Model,
    Texture,
    Icon,
    Video,
    Audio,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResourceKind::Font => "font",
            ResourceKind::Model => "model",
            ResourceKind::Texture => "texture",
            ResourceKind::Icon => "icon",
            ResourceKind::Video => "video",
            ResourceKind::Audio => "audio",
        };
        f.write_str(name)
    }
}

/// Reference to a resource as named in a node's properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub location: String,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, location: impl Into<String>) -> Self {
        Self {
            kind,
            location: location.into(),
        }
    }
}

/// A resolved resource owned by a built node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHandle {
    pub id: Uuid,
    pub kind: ResourceKind,
    /// Resolved location (absolute path or URL)
    pub resolved: String,
}

impl ResourceHandle {
    pub fn new(kind: ResourceKind, resolved: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            resolved: resolved.into(),
        }
    }
}

/// Resolves resource references into handles
pub trait ResourceLoader: Send + Sync {
    fn resolve(&self, resource: &ResourceRef) -> Result<ResourceHandle, BuildError>;
}

/// Loader resolving relative paths against a base directory
#[derive(Debug, Clone)]
pub struct FsResourceLoader {
    base_dir: PathBuf,
}

impl FsResourceLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl ResourceLoader for FsResourceLoader {
    fn resolve(&self, resource: &ResourceRef) -> Result<ResourceHandle, BuildError> {
        let location = resource.location.as_str();

        if resource.kind == ResourceKind::Font && SYSTEM_FONTS.contains(&location) {
            return Ok(ResourceHandle::new(ResourceKind::Font, location));
        }

        if is_remote(location) {
            return Ok(ResourceHandle::new(resource.kind, location));
        }

        if !is_contained(location) {
            debug!(kind = %resource.kind, location, "Resource location outside base directory");
            return Err(BuildError::MissingResource {
                kind: resource.kind,
                location: location.to_string(),
            });
        }

        let path = self.base_dir.join(location.trim_start_matches("./"));
        if path.exists() {
            debug!(kind = %resource.kind, path = %path.display(), "Resolved resource");
            Ok(ResourceHandle::new(resource.kind, path.display().to_string()))
        } else {
            Err(BuildError::MissingResource {
                kind: resource.kind,
                location: location.to_string(),
            })
        }
    }
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://")
        || location.starts_with("https://")
        || location.starts_with("res://")
}

/// Relative location that stays below the base directory
fn is_contained(location: &str) -> bool {
    Path::new(location).components().all(|c| {
        !matches!(
            c,
            Component::RootDir | Component::Prefix(_) | Component::ParentDir
        )
    })
}

/// Resources a node of `kind` needs, read from its properties
///
/// Missing mandatory locations are reported as [`BuildError::InvalidProperty`].
pub fn required_resources(kind: NodeKind, props: &Properties) -> Result<Vec<ResourceRef>, BuildError> {
    let mut refs = Vec::new();

    if kind.capabilities().text_bearing {
        let family = props.read_str("fontFamily").unwrap_or("default");
        refs.push(ResourceRef::new(ResourceKind::Font, family));
    }

    match kind {
        NodeKind::Image => {
            if let Some(path) = props.read_str("filePath") {
                refs.push(ResourceRef::new(ResourceKind::Texture, path));
            } else if let Some(icon) = props.read_str("icon") {
                refs.push(ResourceRef::new(ResourceKind::Icon, icon));
            }
        }
        NodeKind::Model => {
            refs.push(ResourceRef::new(ResourceKind::Model, mandatory(props, "modelPath")?));
        }
        NodeKind::Video => {
            refs.push(ResourceRef::new(ResourceKind::Video, mandatory(props, "videoPath")?));
        }
        NodeKind::Audio => {
            refs.push(ResourceRef::new(ResourceKind::Audio, mandatory(props, "fileName")?));
        }
        _ => {}
    }

    Ok(refs)
}

fn mandatory<'a>(props: &'a Properties, key: &str) -> Result<&'a str, BuildError> {
    props.read_str(key).ok_or_else(|| BuildError::InvalidProperty {
        key: key.to_string(),
        reason: "required string property is missing".to_string(),
    })
}
