//! Scene authoring adapter contract.
//!
//! The drop controller never touches a scene graph directly. Everything it needs from the
//! host (instantiating referenced assets, attaching physics capabilities, reading transforms,
//! writing output files) goes through [`SceneAuthoring`] and [`OutputScene`]. Transforms cross
//! the seam as `mint` types so adapters are free to use any math library.
use std::fmt;
use std::path::Path;

use crate::bounds::Bounds3;
use crate::error::{Error, Result};

pub mod memory;
pub mod setup;

use setup::{GroundPlane, PhysicsSceneSettings, SphereLight, UpAxis};

/// Absolute, `/`-separated path of a node in a scene graph.
///
/// Segment names are identifiers: ASCII letters, digits and `_`, not starting with a digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct NodePath(String);

impl NodePath {
    pub fn root() -> Self {
        Self("/".to_owned())
    }

    /// Parses an absolute node path.
    pub fn parse(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if path == "/" {
            return Ok(Self::root());
        }
        let Some(rest) = path.strip_prefix('/') else {
            return Err(Error::invalid(format!("node path '{path}' must be absolute")));
        };
        for segment in rest.split('/') {
            if !is_identifier(segment) {
                return Err(Error::invalid(format!(
                    "node path '{path}' has invalid segment '{segment}'"
                )));
            }
        }
        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Last segment of the path, empty for the root.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    pub fn parent(&self) -> Option<NodePath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_owned())),
            None => None,
        }
    }

    /// Appends a single segment.
    pub fn child(&self, name: &str) -> Result<NodePath> {
        if !is_identifier(name) {
            return Err(Error::invalid(format!("invalid node name '{name}'")));
        }
        if self.is_root() {
            Ok(Self(format!("/{name}")))
        } else {
            Ok(Self(format!("{}/{name}", self.0)))
        }
    }

    /// Appends a segment known to be a valid identifier.
    pub(crate) fn join_trusted(&self, name: &str) -> NodePath {
        debug_assert!(is_identifier(name), "invalid node name '{name}'");
        if self.is_root() {
            Self(format!("/{name}"))
        } else {
            Self(format!("{}/{name}", self.0))
        }
    }

    /// Returns true if `self` equals `ancestor` or lies below it.
    pub fn is_within(&self, ancestor: &NodePath) -> bool {
        if ancestor.is_root() || self == ancestor {
            return true;
        }
        self.0
            .strip_prefix(ancestor.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for NodePath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        NodePath::parse(value)
    }
}

impl TryFrom<&str> for NodePath {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        NodePath::parse(value)
    }
}

impl From<NodePath> for String {
    fn from(value: NodePath) -> Self {
        value.0
    }
}

/// Type of node created by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeKind {
    /// Transformable node.
    Xform,
    /// Grouping node without a transform of its own.
    Scope,
}

/// Collision geometry approximation attached to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub enum CollisionApproximation {
    /// Use the authored mesh as-is.
    #[default]
    None,
    MeshSimplification,
    ConvexHull,
}

impl CollisionApproximation {
    /// Token used by scene description formats.
    pub fn as_token(&self) -> &'static str {
        match self {
            CollisionApproximation::None => "none",
            CollisionApproximation::MeshSimplification => "meshSimplification",
            CollisionApproximation::ConvexHull => "convexHull",
        }
    }
}

/// Scene graph and physics capabilities the drop controller relies on.
///
/// All operations may fail with [`Error::SceneAuthoring`]. Implementations own the
/// lifetime of the actual graph nodes; the controller only issues creation and removal.
pub trait SceneAuthoring {
    /// Handle to an output scene file opened by [`SceneAuthoring::create_output_file`].
    type Output: OutputScene;

    /// Opens `asset` in isolation and returns the world bound of its root.
    ///
    /// Must not touch the primary scene.
    fn open_asset_bounds(&self, asset: &Path) -> Result<Bounds3>;

    /// Defines `parent/name` referencing the external `asset` and returns its path.
    /// Missing ancestors are created.
    fn instantiate_reference(
        &mut self,
        parent: &NodePath,
        name: &str,
        asset: &Path,
        kind: NodeKind,
    ) -> Result<NodePath>;

    fn apply_rigid_body(&mut self, node: &NodePath) -> Result<()>;

    fn apply_collision(
        &mut self,
        node: &NodePath,
        approximation: CollisionApproximation,
    ) -> Result<()>;

    /// Removes `path` and everything below it. Removing a missing path is not an error.
    fn remove_subtree(&mut self, path: &NodePath) -> Result<()>;

    /// Replaces the local transform of `node` with a translation and optional scale.
    fn set_local_transform(
        &mut self,
        node: &NodePath,
        translation: mint::Vector3<f32>,
        scale: Option<mint::Vector3<f32>>,
    ) -> Result<()>;

    /// Translation component of the current local transform of `node`.
    fn local_translation(&self, node: &NodePath) -> Result<mint::Vector3<f32>>;

    /// Current world transform of `node`.
    fn world_transform(&self, node: &NodePath) -> Result<mint::ColumnMatrix4<f32>>;

    /// Direct children of `path` in graph order. A missing path has no children.
    fn children(&self, path: &NodePath) -> Result<Vec<NodePath>>;

    /// Opens or creates the scene file at `path`. `Ok(None)` if the file cannot be created.
    fn create_output_file(&mut self, path: &Path) -> Result<Option<Self::Output>>;

    /// Persists and closes an output file.
    fn save_and_close(&mut self, file: Self::Output) -> Result<()>;

    fn set_up_axis(&mut self, axis: UpAxis) -> Result<()>;

    /// Defines (or redefines) a sphere light at `path`.
    fn define_sphere_light(&mut self, path: &NodePath, light: &SphereLight) -> Result<()>;

    /// Defines (or redefines) the physics scene at `path`.
    fn define_physics_scene(
        &mut self,
        path: &NodePath,
        settings: &PhysicsSceneSettings,
    ) -> Result<()>;

    /// Adds a static ground plane with collision at `path`.
    fn add_ground_plane(&mut self, path: &NodePath, plane: &GroundPlane) -> Result<()>;
}

/// A scene file being written by an export.
pub trait OutputScene {
    /// Removes all content from the file.
    fn clear(&mut self) -> Result<()>;

    /// Defines a node, optionally referencing an external asset.
    fn define_node(&mut self, path: &NodePath, kind: NodeKind, reference: Option<&Path>)
        -> Result<()>;

    /// Sets a translate-only transform on a defined node.
    fn set_translate(&mut self, path: &NodePath, translation: mint::Vector3<f32>) -> Result<()>;

    /// Sets a single combined matrix transform on a defined node.
    fn set_transform(&mut self, path: &NodePath, matrix: mint::ColumnMatrix4<f32>) -> Result<()>;

    /// Marks `path` as the file's default entry point.
    fn set_default_root(&mut self, path: &NodePath) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_absolute_identifier_paths() {
        let p = NodePath::parse("/World/PartDropper/Part_12").expect("valid path");
        assert_eq!(p.name(), "Part_12");
        assert_eq!(p.parent().unwrap().as_str(), "/World/PartDropper");
        assert_eq!(NodePath::parse("/World").unwrap().parent(), Some(NodePath::root()));
        assert!(NodePath::root().parent().is_none());
    }

    #[test]
    fn parse_rejects_relative_and_malformed_paths() {
        assert!(NodePath::parse("World").is_err());
        assert!(NodePath::parse("/World//Parts").is_err());
        assert!(NodePath::parse("/World/").is_err());
        assert!(NodePath::parse("/World/1st").is_err());
        assert!(NodePath::parse("/World/part-1").is_err());
    }

    #[test]
    fn child_joins_segments() {
        let root = NodePath::root();
        let world = root.child("World").unwrap();
        assert_eq!(world.as_str(), "/World");
        assert_eq!(world.child("Parts").unwrap().as_str(), "/World/Parts");
        assert!(world.child("a/b").is_err());
    }

    #[test]
    fn is_within_respects_segment_boundaries() {
        let parts = NodePath::parse("/World/Parts").unwrap();
        assert!(NodePath::parse("/World/Parts/Part_1").unwrap().is_within(&parts));
        assert!(parts.is_within(&parts));
        assert!(!NodePath::parse("/World/PartsExtra").unwrap().is_within(&parts));
        assert!(parts.is_within(&NodePath::root()));
    }

    #[test]
    fn collision_tokens_match_schema_names() {
        assert_eq!(CollisionApproximation::None.as_token(), "none");
        assert_eq!(
            CollisionApproximation::MeshSimplification.as_token(),
            "meshSimplification"
        );
        assert_eq!(CollisionApproximation::ConvexHull.as_token(), "convexHull");
    }
}
