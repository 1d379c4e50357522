//! Flattened export: writes the container and the settled parts, baked to world space,
//! into a standalone scene file.
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::dropper::config::SceneLayout;
use crate::dropper::{Container, Part};
use crate::error::{Error, Result};
use crate::scene::{NodeKind, NodePath, OutputScene, SceneAuthoring};

/// Extensions accepted as-is by [`normalize_scene_path`].
pub const SCENE_EXTENSIONS: [&str; 3] = ["usd", "usda", "usdc"];

/// Name of the root node of exported files.
pub const EXPORT_ROOT_NAME: &str = "World";

/// Result of a flattened export.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    /// Path actually written, after extension normalization.
    pub path: PathBuf,
    /// Number of part nodes written.
    pub part_count: usize,
}

/// Lower-cases a known scene extension, or appends `default_extension` otherwise.
pub fn normalize_scene_path(path: &Path, default_extension: &str) -> PathBuf {
    let known = |ext: &str| {
        ext.eq_ignore_ascii_case(default_extension)
            || SCENE_EXTENSIONS.iter().any(|k| k.eq_ignore_ascii_case(ext))
    };
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if known(ext) => path.with_extension(ext.to_ascii_lowercase()),
        _ => {
            let mut s = OsString::from(path.as_os_str());
            s.push(".");
            s.push(default_extension);
            PathBuf::from(s)
        }
    }
}

/// Writes the flattened arrangement to `output`, replacing any previous content.
///
/// Layout of the written file:
/// - `/World`: plain transform root, the file's default entry point
/// - `/World/Container`: references the container asset, translated by its placement offset
/// - `/World/Parts/<name>`: one node per part instance in graph order, referencing the part
///   asset with the instance's world transform as a single matrix
///
/// `part` is only required when part instances exist.
pub fn flatten_into<S: SceneAuthoring>(
    scene: &mut S,
    layout: &SceneLayout,
    container: &Container,
    part: Option<&Part>,
    output: &Path,
) -> Result<ExportSummary> {
    let sources = scene.children(&layout.parts_path())?;
    let part = match (part, sources.is_empty()) {
        (Some(part), _) => Some(part),
        (None, true) => None,
        (None, false) => {
            return Err(Error::invalid(
                "part instances exist but no part asset is configured",
            ))
        }
    };

    let Some(mut file) = scene.create_output_file(output)? else {
        return Err(Error::SceneAuthoring(format!(
            "cannot create output file '{}'",
            output.display()
        )));
    };
    file.clear()?;

    let root = NodePath::root().join_trusted(EXPORT_ROOT_NAME);
    file.define_node(&root, NodeKind::Xform, None)?;

    let container_node = root.join_trusted("Container");
    file.define_node(&container_node, NodeKind::Xform, Some(container.asset.path()))?;
    file.set_translate(&container_node, container.offset.into())?;

    if let Some(part) = part.filter(|_| !sources.is_empty()) {
        let parts_node = root.join_trusted("Parts");
        file.define_node(&parts_node, NodeKind::Scope, None)?;
        for source in &sources {
            let world = scene.world_transform(source)?;
            let node = parts_node.join_trusted(source.name());
            file.define_node(&node, NodeKind::Xform, Some(part.asset.path()))?;
            file.set_transform(&node, world)?;
        }
    }

    file.set_default_root(&root)?;
    scene.save_and_close(file)?;

    Ok(ExportSummary {
        path: output.to_path_buf(),
        part_count: sources.len(),
    })
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};

    use super::*;
    use crate::bounds::Bounds3;
    use crate::probe::AssetRef;
    use crate::scene::memory::{LayerTransform, MemoryScene};

    #[test]
    fn known_extensions_are_lowercased() {
        assert_eq!(
            normalize_scene_path(Path::new("out/scene.USDA"), "usd"),
            PathBuf::from("out/scene.usda")
        );
        assert_eq!(
            normalize_scene_path(Path::new("scene.usdc"), "usd"),
            PathBuf::from("scene.usdc")
        );
    }

    #[test]
    fn missing_or_foreign_extension_gets_default_appended() {
        assert_eq!(
            normalize_scene_path(Path::new("out/scene"), "usd"),
            PathBuf::from("out/scene.usd")
        );
        assert_eq!(
            normalize_scene_path(Path::new("scene.v2"), "usda"),
            PathBuf::from("scene.v2.usda")
        );
    }

    fn fixture() -> (MemoryScene, Container, Part) {
        let scene = MemoryScene::new()
            .with_asset("bin.usd", Bounds3::from_min_size(Vec3::ZERO, Vec3::splat(20.0)))
            .with_asset("bolt.usd", Bounds3::from_min_size(Vec3::ZERO, Vec3::ONE));
        let container = Container {
            asset: AssetRef::probe(&scene, "bin.usd").unwrap(),
            offset: Vec3::new(-10.0, -10.0, 0.0),
            node: NodePath::parse("/World/PartDropper/Container").unwrap(),
        };
        let part = Part {
            asset: AssetRef::probe(&scene, "bolt.usd").unwrap(),
        };
        (scene, container, part)
    }

    #[test]
    fn parts_are_written_with_baked_world_matrices() {
        let (mut scene, container, part) = fixture();
        let layout = SceneLayout::default();
        let parts = layout.parts_path();
        for (name, z) in [("Part_1", 3.0), ("Part_2", 4.5)] {
            let node = scene
                .instantiate_reference(&parts, name, part.asset.path(), NodeKind::Xform)
                .unwrap();
            scene
                .set_local_transform(
                    &node,
                    Vec3::new(1.0, 2.0, z).into(),
                    Some(Vec3::splat(2.0).into()),
                )
                .unwrap();
        }

        let out = Path::new("flat.usd");
        let summary = flatten_into(&mut scene, &layout, &container, Some(&part), out).unwrap();
        assert_eq!(summary.part_count, 2);

        let layer = scene.saved_file(out).expect("file saved");
        let root = NodePath::parse("/World").unwrap();
        assert_eq!(layer.default_root.as_ref(), Some(&root));

        let container_node = layer
            .node(&NodePath::parse("/World/Container").unwrap())
            .unwrap();
        assert_eq!(container_node.reference.as_deref(), Some(Path::new("bin.usd")));
        assert_eq!(
            container_node.transform,
            LayerTransform::Translate(Vec3::new(-10.0, -10.0, 0.0))
        );

        let second = layer
            .node(&NodePath::parse("/World/Parts/Part_2").unwrap())
            .unwrap();
        let expected = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            glam::Quat::IDENTITY,
            Vec3::new(1.0, 2.0, 4.5),
        );
        assert_eq!(second.transform, LayerTransform::Matrix(expected));
        assert_eq!(second.reference.as_deref(), Some(Path::new("bolt.usd")));
    }

    #[test]
    fn existing_file_is_overwritten() {
        let (mut scene, container, part) = fixture();
        let layout = SceneLayout::default();
        let out = Path::new("flat.usd");
        scene
            .instantiate_reference(&layout.parts_path(), "Part_1", part.asset.path(), NodeKind::Xform)
            .unwrap();
        flatten_into(&mut scene, &layout, &container, Some(&part), out).unwrap();
        assert_eq!(scene.saved_file(out).unwrap().nodes.len(), 4);

        scene.remove_subtree(&layout.parts_path()).unwrap();
        flatten_into(&mut scene, &layout, &container, Some(&part), out).unwrap();
        let layer = scene.saved_file(out).unwrap();
        assert_eq!(layer.nodes.len(), 2);
        assert!(layer
            .node(&NodePath::parse("/World/Parts/Part_1").unwrap())
            .is_none());
    }

    #[test]
    fn instances_without_part_asset_are_rejected() {
        let (mut scene, container, part) = fixture();
        let layout = SceneLayout::default();
        scene
            .instantiate_reference(&layout.parts_path(), "Part_1", part.asset.path(), NodeKind::Xform)
            .unwrap();
        let err = flatten_into(&mut scene, &layout, &container, None, Path::new("x.usd"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(scene.saved_file_count(), 0);
    }

    #[test]
    fn denied_output_is_a_scene_authoring_error() {
        let (mut scene, container, part) = fixture();
        scene.deny_output("locked.usd");
        let err = flatten_into(
            &mut scene,
            &SceneLayout::default(),
            &container,
            Some(&part),
            Path::new("locked.usd"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::SceneAuthoring(_)));
    }
}
