//! In-memory [`SceneAuthoring`] implementation.
//!
//! [`MemoryScene`] keeps a node tree, a registry of asset bounds standing in for asset files,
//! and the layers written by exports. It performs no simulation: hosts (or tests) move
//! rigid bodies with [`MemoryScene::set_translation`] between controller ticks.
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use glam::{Mat4, Quat, Vec3};

use crate::bounds::Bounds3;
use crate::error::{Error, Result};
use crate::scene::setup::{GroundPlane, PhysicsSceneSettings, SphereLight, UpAxis};
use crate::scene::{CollisionApproximation, NodeKind, NodePath, OutputScene, SceneAuthoring};

/// Adapter operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    OpenAsset,
    Instantiate,
    ApplyPhysics,
    SetTransform,
    ReadTransform,
    Remove,
    CreateOutput,
    Save,
}

/// Payload authored on a node besides its transform.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NodeContent {
    #[default]
    Empty,
    Light(SphereLight),
    Physics(PhysicsSceneSettings),
    Ground(GroundPlane),
}

/// A node of the in-memory scene graph.
#[derive(Debug, Clone)]
pub struct MemoryNode {
    pub kind: NodeKind,
    pub reference: Option<PathBuf>,
    pub translation: Vec3,
    pub scale: Vec3,
    pub rigid_body: bool,
    pub collision: Option<CollisionApproximation>,
    pub content: NodeContent,
    children: Vec<NodePath>,
}

impl MemoryNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            reference: None,
            translation: Vec3::ZERO,
            scale: Vec3::ONE,
            rigid_body: false,
            collision: None,
            content: NodeContent::Empty,
            children: Vec::new(),
        }
    }

    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, Quat::IDENTITY, self.translation)
    }

    pub fn children(&self) -> &[NodePath] {
        &self.children
    }
}

/// Transform authored on a node of a [`SceneLayer`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LayerTransform {
    #[default]
    Identity,
    Translate(Vec3),
    Matrix(Mat4),
}

/// A node written to an output layer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerNode {
    pub path: NodePath,
    pub kind: NodeKind,
    pub reference: Option<PathBuf>,
    pub transform: LayerTransform,
}

/// Contents of a saved output file.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SceneLayer {
    pub default_root: Option<NodePath>,
    /// Nodes in definition order.
    pub nodes: Vec<LayerNode>,
}

impl SceneLayer {
    pub fn node(&self, path: &NodePath) -> Option<&LayerNode> {
        self.nodes.iter().find(|n| &n.path == path)
    }

    fn node_mut(&mut self, path: &NodePath) -> Result<&mut LayerNode> {
        self.nodes
            .iter_mut()
            .find(|n| &n.path == path)
            .ok_or_else(|| Error::SceneAuthoring(format!("output node '{path}' is not defined")))
    }
}

/// Output file handle returned by [`MemoryScene::create_output_file`].
#[derive(Debug)]
pub struct MemoryOutput {
    path: PathBuf,
    layer: SceneLayer,
}

impl MemoryOutput {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layer(&self) -> &SceneLayer {
        &self.layer
    }
}

impl OutputScene for MemoryOutput {
    fn clear(&mut self) -> Result<()> {
        self.layer = SceneLayer::default();
        Ok(())
    }

    fn define_node(
        &mut self,
        path: &NodePath,
        kind: NodeKind,
        reference: Option<&Path>,
    ) -> Result<()> {
        let reference = reference.map(Path::to_path_buf);
        if let Ok(node) = self.layer.node_mut(path) {
            node.kind = kind;
            node.reference = reference;
            return Ok(());
        }
        self.layer.nodes.push(LayerNode {
            path: path.clone(),
            kind,
            reference,
            transform: LayerTransform::Identity,
        });
        Ok(())
    }

    fn set_translate(&mut self, path: &NodePath, translation: mint::Vector3<f32>) -> Result<()> {
        self.layer.node_mut(path)?.transform = LayerTransform::Translate(translation.into());
        Ok(())
    }

    fn set_transform(&mut self, path: &NodePath, matrix: mint::ColumnMatrix4<f32>) -> Result<()> {
        self.layer.node_mut(path)?.transform = LayerTransform::Matrix(matrix.into());
        Ok(())
    }

    fn set_default_root(&mut self, path: &NodePath) -> Result<()> {
        self.layer.node_mut(path)?;
        self.layer.default_root = Some(path.clone());
        Ok(())
    }
}

/// In-memory scene graph with registered asset bounds.
#[derive(Debug)]
pub struct MemoryScene {
    assets: HashMap<PathBuf, Bounds3>,
    nodes: HashMap<NodePath, MemoryNode>,
    up_axis: UpAxis,
    files: HashMap<PathBuf, SceneLayer>,
    read_only: HashSet<PathBuf>,
    failures: HashSet<FailPoint>,
    one_shot: RefCell<HashSet<FailPoint>>,
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryScene {
    /// Creates a scene containing only the root node.
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(NodePath::root(), MemoryNode::new(NodeKind::Scope));
        Self {
            assets: HashMap::new(),
            nodes,
            up_axis: UpAxis::Y,
            files: HashMap::new(),
            read_only: HashSet::new(),
            failures: HashSet::new(),
            one_shot: RefCell::new(HashSet::new()),
        }
    }

    /// Registers an asset file and the bound its root reports.
    pub fn register_asset(&mut self, path: impl Into<PathBuf>, bounds: Bounds3) {
        self.assets.insert(path.into(), bounds);
    }

    /// Builder form of [`MemoryScene::register_asset`].
    pub fn with_asset(mut self, path: impl Into<PathBuf>, bounds: Bounds3) -> Self {
        self.register_asset(path, bounds);
        self
    }

    /// Makes every call of the given operation fail until [`MemoryScene::clear_failures`].
    pub fn fail_at(&mut self, point: FailPoint) {
        self.failures.insert(point);
    }

    /// Makes only the next call of the given operation fail.
    pub fn fail_once(&mut self, point: FailPoint) {
        self.one_shot.get_mut().insert(point);
    }

    pub fn clear_failures(&mut self) {
        self.failures.clear();
        self.one_shot.get_mut().clear();
    }

    /// Makes [`SceneAuthoring::create_output_file`] return `Ok(None)` for `path`.
    pub fn deny_output(&mut self, path: impl Into<PathBuf>) {
        self.read_only.insert(path.into());
    }

    pub fn node(&self, path: &NodePath) -> Option<&MemoryNode> {
        self.nodes.get(path)
    }

    pub fn contains(&self, path: &NodePath) -> bool {
        self.nodes.contains_key(path)
    }

    /// Number of nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn up_axis(&self) -> UpAxis {
        self.up_axis
    }

    /// Moves a node, as a physics step would.
    pub fn set_translation(&mut self, path: &NodePath, translation: Vec3) -> Result<()> {
        self.node_mut(path)?.translation = translation;
        Ok(())
    }

    /// World-space position of a node's origin.
    pub fn world_position(&self, path: &NodePath) -> Result<Vec3> {
        Ok(self.world_matrix(path)?.w_axis.truncate())
    }

    /// Layer persisted by the last [`SceneAuthoring::save_and_close`] for `path`.
    pub fn saved_file(&self, path: &Path) -> Option<&SceneLayer> {
        self.files.get(path)
    }

    pub fn saved_file_count(&self) -> usize {
        self.files.len()
    }

    fn check(&self, point: FailPoint) -> Result<()> {
        if self.failures.contains(&point) || self.one_shot.borrow_mut().remove(&point) {
            return Err(Error::SceneAuthoring(format!("injected failure at {point:?}")));
        }
        Ok(())
    }

    fn node_mut(&mut self, path: &NodePath) -> Result<&mut MemoryNode> {
        self.nodes
            .get_mut(path)
            .ok_or_else(|| Error::SceneAuthoring(format!("node '{path}' does not exist")))
    }

    fn existing(&self, path: &NodePath) -> Result<&MemoryNode> {
        self.nodes
            .get(path)
            .ok_or_else(|| Error::SceneAuthoring(format!("node '{path}' does not exist")))
    }

    /// Returns the node at `path`, creating it (and missing ancestors as scopes) if needed.
    fn ensure(&mut self, path: &NodePath, kind: NodeKind) -> &mut MemoryNode {
        if !self.nodes.contains_key(path) {
            if let Some(parent) = path.parent() {
                self.ensure(&parent, NodeKind::Scope)
                    .children
                    .push(path.clone());
            }
        }
        self.nodes
            .entry(path.clone())
            .or_insert_with(|| MemoryNode::new(kind))
    }

    /// Replaces whatever lives at `path` with a fresh node.
    fn redefine(&mut self, path: &NodePath, kind: NodeKind) -> &mut MemoryNode {
        self.remove(path);
        self.ensure(path, kind)
    }

    fn remove(&mut self, path: &NodePath) {
        let Some(node) = self.nodes.remove(path) else {
            return;
        };
        for child in node.children {
            self.remove(&child);
        }
        if let Some(parent) = path.parent().and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| c != path);
        }
    }

    fn world_matrix(&self, path: &NodePath) -> Result<Mat4> {
        let mut matrix = self.existing(path)?.local_matrix();
        let mut cursor = path.parent();
        while let Some(p) = cursor {
            if let Some(node) = self.nodes.get(&p) {
                matrix = node.local_matrix() * matrix;
            }
            cursor = p.parent();
        }
        Ok(matrix)
    }
}

impl SceneAuthoring for MemoryScene {
    type Output = MemoryOutput;

    fn open_asset_bounds(&self, asset: &Path) -> Result<Bounds3> {
        self.check(FailPoint::OpenAsset)?;
        self.assets
            .get(asset)
            .copied()
            .ok_or_else(|| Error::asset_load(asset, "file not found"))
    }

    fn instantiate_reference(
        &mut self,
        parent: &NodePath,
        name: &str,
        asset: &Path,
        kind: NodeKind,
    ) -> Result<NodePath> {
        self.check(FailPoint::Instantiate)?;
        let path = parent.child(name)?;
        let node = self.redefine(&path, kind);
        node.reference = Some(asset.to_path_buf());
        Ok(path)
    }

    fn apply_rigid_body(&mut self, node: &NodePath) -> Result<()> {
        self.check(FailPoint::ApplyPhysics)?;
        self.node_mut(node)?.rigid_body = true;
        Ok(())
    }

    fn apply_collision(
        &mut self,
        node: &NodePath,
        approximation: CollisionApproximation,
    ) -> Result<()> {
        self.check(FailPoint::ApplyPhysics)?;
        self.node_mut(node)?.collision = Some(approximation);
        Ok(())
    }

    fn remove_subtree(&mut self, path: &NodePath) -> Result<()> {
        self.check(FailPoint::Remove)?;
        if path.is_root() {
            return Err(Error::SceneAuthoring("cannot remove the root node".into()));
        }
        self.remove(path);
        Ok(())
    }

    fn set_local_transform(
        &mut self,
        node: &NodePath,
        translation: mint::Vector3<f32>,
        scale: Option<mint::Vector3<f32>>,
    ) -> Result<()> {
        self.check(FailPoint::SetTransform)?;
        let node = self.node_mut(node)?;
        node.translation = translation.into();
        node.scale = scale.map(Vec3::from).unwrap_or(Vec3::ONE);
        Ok(())
    }

    fn local_translation(&self, node: &NodePath) -> Result<mint::Vector3<f32>> {
        self.check(FailPoint::ReadTransform)?;
        Ok(self.existing(node)?.translation.into())
    }

    fn world_transform(&self, node: &NodePath) -> Result<mint::ColumnMatrix4<f32>> {
        self.check(FailPoint::ReadTransform)?;
        Ok(self.world_matrix(node)?.into())
    }

    fn children(&self, path: &NodePath) -> Result<Vec<NodePath>> {
        Ok(self
            .nodes
            .get(path)
            .map(|n| n.children.clone())
            .unwrap_or_default())
    }

    fn create_output_file(&mut self, path: &Path) -> Result<Option<Self::Output>> {
        self.check(FailPoint::CreateOutput)?;
        if self.read_only.contains(path) {
            return Ok(None);
        }
        Ok(Some(MemoryOutput {
            path: path.to_path_buf(),
            layer: self.files.get(path).cloned().unwrap_or_default(),
        }))
    }

    fn save_and_close(&mut self, file: Self::Output) -> Result<()> {
        self.check(FailPoint::Save)?;
        self.files.insert(file.path, file.layer);
        Ok(())
    }

    fn set_up_axis(&mut self, axis: UpAxis) -> Result<()> {
        self.up_axis = axis;
        Ok(())
    }

    fn define_sphere_light(&mut self, path: &NodePath, light: &SphereLight) -> Result<()> {
        let node = self.redefine(path, NodeKind::Xform);
        node.translation = light.translation;
        node.content = NodeContent::Light(light.clone());
        Ok(())
    }

    fn define_physics_scene(
        &mut self,
        path: &NodePath,
        settings: &PhysicsSceneSettings,
    ) -> Result<()> {
        let node = self.redefine(path, NodeKind::Scope);
        node.content = NodeContent::Physics(settings.clone());
        Ok(())
    }

    fn add_ground_plane(&mut self, path: &NodePath, plane: &GroundPlane) -> Result<()> {
        let node = self.redefine(path, NodeKind::Xform);
        node.translation = plane.position;
        node.collision = Some(CollisionApproximation::None);
        node.content = NodeContent::Ground(plane.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> NodePath {
        NodePath::parse(s).expect("valid path")
    }

    #[test]
    fn instantiate_creates_missing_ancestors() {
        let mut scene = MemoryScene::new();
        let node = scene
            .instantiate_reference(
                &path("/World/Parts"),
                "Part_1",
                Path::new("part.usd"),
                NodeKind::Xform,
            )
            .unwrap();
        assert_eq!(node.as_str(), "/World/Parts/Part_1");
        assert!(scene.contains(&path("/World")));
        assert_eq!(
            scene.children(&path("/World/Parts")).unwrap(),
            vec![node.clone()]
        );
        assert_eq!(
            scene.node(&node).unwrap().reference.as_deref(),
            Some(Path::new("part.usd"))
        );
    }

    #[test]
    fn remove_subtree_is_idempotent_and_detaches() {
        let mut scene = MemoryScene::new();
        let parts = path("/World/Parts");
        for name in ["Part_1", "Part_2"] {
            scene
                .instantiate_reference(&parts, name, Path::new("p.usd"), NodeKind::Xform)
                .unwrap();
        }
        scene.remove_subtree(&parts).unwrap();
        scene.remove_subtree(&parts).unwrap();
        assert!(!scene.contains(&path("/World/Parts/Part_1")));
        assert!(scene.children(&path("/World")).unwrap().is_empty());
        assert_eq!(scene.node_count(), 2);
    }

    #[test]
    fn children_keep_creation_order() {
        let mut scene = MemoryScene::new();
        let parts = path("/Parts");
        for name in ["Part_3", "Part_1", "Part_2"] {
            scene
                .instantiate_reference(&parts, name, Path::new("p.usd"), NodeKind::Xform)
                .unwrap();
        }
        let names: Vec<_> = scene
            .children(&parts)
            .unwrap()
            .iter()
            .map(|p| p.name().to_owned())
            .collect();
        assert_eq!(names, ["Part_3", "Part_1", "Part_2"]);
    }

    #[test]
    fn world_transform_composes_ancestors() {
        let mut scene = MemoryScene::new();
        let parent = scene
            .instantiate_reference(&NodePath::root(), "Rig", Path::new("r.usd"), NodeKind::Xform)
            .unwrap();
        scene
            .set_local_transform(
                &parent,
                Vec3::new(10.0, 0.0, 0.0).into(),
                Some(Vec3::splat(2.0).into()),
            )
            .unwrap();
        let child = scene
            .instantiate_reference(&parent, "Child", Path::new("c.usd"), NodeKind::Xform)
            .unwrap();
        scene
            .set_local_transform(&child, Vec3::new(0.0, 0.0, 5.0).into(), None)
            .unwrap();

        let world: Mat4 = scene.world_transform(&child).unwrap().into();
        assert_eq!(world.w_axis.truncate(), Vec3::new(10.0, 0.0, 10.0));
        assert_eq!(scene.world_position(&child).unwrap(), Vec3::new(10.0, 0.0, 10.0));
    }

    #[test]
    fn unknown_asset_fails_with_asset_load() {
        let scene = MemoryScene::new();
        let err = scene.open_asset_bounds(Path::new("missing.usd")).unwrap_err();
        assert!(matches!(err, Error::AssetLoad { .. }));
    }

    #[test]
    fn injected_failures_surface_as_scene_authoring_errors() {
        let mut scene = MemoryScene::new();
        scene.fail_at(FailPoint::Instantiate);
        let err = scene
            .instantiate_reference(&NodePath::root(), "A", Path::new("a.usd"), NodeKind::Xform)
            .unwrap_err();
        assert!(matches!(err, Error::SceneAuthoring(_)));
        scene.clear_failures();
        assert!(scene
            .instantiate_reference(&NodePath::root(), "A", Path::new("a.usd"), NodeKind::Xform)
            .is_ok());
    }

    #[test]
    fn one_shot_failure_affects_only_the_next_call() {
        let mut scene = MemoryScene::new();
        scene.fail_once(FailPoint::Instantiate);
        assert!(scene
            .instantiate_reference(&NodePath::root(), "A", Path::new("a.usd"), NodeKind::Xform)
            .is_err());
        assert!(!scene.contains(&path("/A")));
        assert!(scene
            .instantiate_reference(&NodePath::root(), "A", Path::new("a.usd"), NodeKind::Xform)
            .is_ok());
    }

    #[test]
    fn redefine_keeps_single_child_entry() {
        let mut scene = MemoryScene::new();
        let parent = path("/World");
        for _ in 0..3 {
            scene
                .instantiate_reference(&parent, "Container", Path::new("c.usd"), NodeKind::Xform)
                .unwrap();
        }
        assert_eq!(
            scene.children(&parent).unwrap(),
            vec![path("/World/Container")]
        );
        assert_eq!(scene.node(&parent).unwrap().kind, NodeKind::Scope);
    }

    #[test]
    fn output_file_reopens_saved_content() {
        let mut scene = MemoryScene::new();
        let file_path = Path::new("out.usd");
        let mut file = scene.create_output_file(file_path).unwrap().unwrap();
        file.define_node(&path("/World"), NodeKind::Xform, None).unwrap();
        file.set_default_root(&path("/World")).unwrap();
        scene.save_and_close(file).unwrap();

        let reopened = scene.create_output_file(file_path).unwrap().unwrap();
        assert_eq!(reopened.layer().nodes.len(), 1);
        assert_eq!(reopened.layer().default_root, Some(path("/World")));
    }

    #[test]
    fn output_transform_requires_defined_node() {
        let mut scene = MemoryScene::new();
        let mut file = scene.create_output_file(Path::new("o.usd")).unwrap().unwrap();
        assert!(file
            .set_translate(&path("/World"), Vec3::ZERO.into())
            .is_err());
        scene.deny_output("locked.usd");
        assert!(scene
            .create_output_file(Path::new("locked.usd"))
            .unwrap()
            .is_none());
    }
}
