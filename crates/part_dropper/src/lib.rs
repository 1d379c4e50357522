#![forbid(unsafe_code)]
//! part_dropper: Drop rigid-body parts into a container until a target count is reached,
//! then flatten the arrangement into a standalone scene file.
//!
//! Modules:
//! - scene: the authoring seam a host scene graph implements, plus an in-memory scene
//! - probe: world-space bounds of asset files
//! - dropper: configuration, drop session state machine, events and flattened export
//!
//! The controller never simulates physics itself. The host steps its simulation and calls
//! [`dropper::controller::PartDropper::update`] once per tick.
pub mod bounds;
pub mod dropper;
pub mod error;
pub mod probe;
pub mod scene;

/// Convenient re-exports for common types. Import with `use part_dropper::prelude::*;`.
pub mod prelude {
    pub use crate::bounds::Bounds3;
    pub use crate::dropper::config::{DropConfig, ReassignPolicy, SceneLayout, SettlePolicy};
    pub use crate::dropper::controller::PartDropper;
    pub use crate::dropper::events::{DropEvent, EventSink, FnSink, StopReason, VecSink};
    pub use crate::dropper::export::{normalize_scene_path, ExportSummary};
    pub use crate::dropper::state::{DropSessionState, PartInstance, UpdateResult};
    pub use crate::dropper::{Container, Part};
    pub use crate::error::{Error, Result};
    pub use crate::probe::{compute_bounds, AssetRef};
    pub use crate::scene::memory::{FailPoint, MemoryScene, SceneLayer};
    pub use crate::scene::setup::{
        GroundPlane, PhysicsSceneSettings, SceneSetup, SphereLight, UpAxis,
    };
    pub use crate::scene::{
        CollisionApproximation, NodeKind, NodePath, OutputScene, SceneAuthoring,
    };
}
