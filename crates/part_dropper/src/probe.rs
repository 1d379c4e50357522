//! Geometry probe: computes the bound of an asset file without touching the primary scene.
use std::path::{Path, PathBuf};

use glam::Vec3;
use tracing::debug;

use crate::bounds::Bounds3;
use crate::error::{Error, Result};
use crate::scene::SceneAuthoring;

/// Opens `path` in isolation through the adapter and returns the world bound of its root.
///
/// Fails with [`Error::AssetLoad`] if the path is empty, cannot be opened, or holds no
/// bounded geometry.
pub fn compute_bounds<S>(scene: &S, path: &Path) -> Result<Bounds3>
where
    S: SceneAuthoring + ?Sized,
{
    if path.as_os_str().is_empty() {
        return Err(Error::asset_load(path, "empty asset path"));
    }
    let bounds = scene.open_asset_bounds(path).map_err(|e| match e {
        Error::AssetLoad { .. } => e,
        other => Error::asset_load(path, other.to_string()),
    })?;
    if !bounds.is_bounded() {
        return Err(Error::asset_load(path, "asset contains no bounded geometry"));
    }
    debug!(
        "Probed '{}': min={:?} max={:?}.",
        path.display(),
        bounds.min,
        bounds.max
    );
    Ok(bounds)
}

/// An asset file together with its bound, computed once when the reference is created.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRef {
    path: PathBuf,
    bounds: Bounds3,
}

impl AssetRef {
    /// Probes `path` and caches the result.
    pub fn probe<S>(scene: &S, path: impl Into<PathBuf>) -> Result<Self>
    where
        S: SceneAuthoring + ?Sized,
    {
        let path = path.into();
        let bounds = compute_bounds(scene, &path)?;
        Ok(Self { path, bounds })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bounds(&self) -> Bounds3 {
        self.bounds
    }

    pub fn size(&self) -> Vec3 {
        self.bounds.size()
    }

    pub fn midpoint(&self) -> Vec3 {
        self.bounds.midpoint()
    }

    /// File name component of the path, for display.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::memory::{FailPoint, MemoryScene};

    fn scene() -> MemoryScene {
        MemoryScene::new()
            .with_asset(
                "/assets/bin.usd",
                Bounds3::from_min_size(Vec3::new(-50.0, -50.0, 5.0), Vec3::new(100.0, 100.0, 50.0)),
            )
            .with_asset("/assets/empty.usd", Bounds3::EMPTY)
    }

    #[test]
    fn probe_caches_size_and_midpoint() {
        let asset = AssetRef::probe(&scene(), "/assets/bin.usd").unwrap();
        assert_eq!(asset.size(), Vec3::new(100.0, 100.0, 50.0));
        assert_eq!(asset.midpoint(), Vec3::new(0.0, 0.0, 30.0));
        assert_eq!(asset.file_name(), Some("bin.usd"));
    }

    #[test]
    fn unbounded_asset_is_an_asset_load_error() {
        let err = compute_bounds(&scene(), Path::new("/assets/empty.usd")).unwrap_err();
        assert!(matches!(err, Error::AssetLoad { .. }));
    }

    #[test]
    fn empty_path_is_rejected_before_opening() {
        let err = compute_bounds(&scene(), Path::new("")).unwrap_err();
        assert!(matches!(err, Error::AssetLoad { ref reason, .. } if reason == "empty asset path"));
    }

    #[test]
    fn adapter_failures_are_reported_as_asset_load() {
        let mut scene = scene();
        scene.fail_at(FailPoint::OpenAsset);
        let err = compute_bounds(&scene, Path::new("/assets/bin.usd")).unwrap_err();
        assert!(matches!(err, Error::AssetLoad { .. }));
    }
}
