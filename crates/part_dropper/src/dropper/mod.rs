//! Incremental drop-and-settle controller: spawns parts above a container one at a time and
//! waits for each to settle before spawning the next.
use glam::Vec3;

use crate::probe::AssetRef;
use crate::scene::NodePath;

pub mod config;
pub mod controller;
pub mod events;
pub mod export;
pub mod state;

pub const DEFAULT_TARGET_PART_COUNT: u32 = 100;
pub const DEFAULT_DROP_INTERVAL_MS: u64 = 100;
pub const DEFAULT_SPAWN_CLEARANCE: f32 = 30.0;
pub const DEFAULT_STILLNESS_THRESHOLD: f32 = 0.1;
pub const DEFAULT_EXPORT_EXTENSION: &str = "usd";

/// The volume parts are dropped into.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub asset: AssetRef,
    /// Translation that centers the container horizontally on the origin and puts its
    /// bottom face at ground level.
    pub offset: Vec3,
    /// Node instantiated for the container in the primary scene.
    pub node: NodePath,
}

impl Container {
    pub(crate) fn placement_offset(asset: &AssetRef, ground_level: f32) -> Vec3 {
        let bounds = asset.bounds();
        let mid = bounds.midpoint();
        Vec3::new(-mid.x, -mid.y, ground_level - bounds.min.z)
    }

    pub fn size(&self) -> Vec3 {
        self.asset.size()
    }
}

/// The asset that gets dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub asset: AssetRef,
}

impl Part {
    pub fn size(&self) -> Vec3 {
        self.asset.size()
    }

    pub fn midpoint(&self) -> Vec3 {
        self.asset.midpoint()
    }
}
