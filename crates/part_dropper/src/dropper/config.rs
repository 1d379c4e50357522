//! Configuration for a [`crate::dropper::controller::PartDropper`].
use crate::dropper::{
    DEFAULT_DROP_INTERVAL_MS, DEFAULT_EXPORT_EXTENSION, DEFAULT_SPAWN_CLEARANCE,
    DEFAULT_STILLNESS_THRESHOLD, DEFAULT_TARGET_PART_COUNT,
};
use crate::error::{Error, Result};
use crate::scene::setup::SceneSetup;
use crate::scene::{CollisionApproximation, NodePath};

/// Decides when the watched part counts as settled once a poll is due.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SettlePolicy {
    /// Advance as soon as the poll interval has elapsed, whatever the displacement.
    #[default]
    Elapsed,
    /// Advance only when the displacement since the previous poll is below `threshold`.
    /// A part that never comes to rest blocks the session.
    Stillness { threshold: f32 },
}

impl SettlePolicy {
    /// Stillness policy with the default threshold.
    pub fn stillness() -> Self {
        SettlePolicy::Stillness {
            threshold: DEFAULT_STILLNESS_THRESHOLD,
        }
    }

    pub fn is_settled(&self, displacement: f32) -> bool {
        match *self {
            SettlePolicy::Elapsed => true,
            SettlePolicy::Stillness { threshold } => displacement < threshold,
        }
    }
}

/// What happens to a running session when the container, part or scale factor changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReassignPolicy {
    #[default]
    StopSession,
    /// Keep dropping on the freshly seeded instance.
    KeepDropping,
}

/// Scene graph locations used by the dropper.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SceneLayout {
    /// Parent of scene-wide nodes (light, physics scene).
    pub world: NodePath,
    /// Parent of everything the dropper owns.
    pub root: NodePath,
}

impl Default for SceneLayout {
    fn default() -> Self {
        let world = NodePath::root().join_trusted("World");
        let root = world.join_trusted("PartDropper");
        Self { world, root }
    }
}

impl SceneLayout {
    pub fn container_path(&self) -> NodePath {
        self.root.join_trusted("Container")
    }

    pub fn parts_path(&self) -> NodePath {
        self.root.join_trusted("Parts")
    }

    /// Name of the `index`-th spawned part (1-based).
    pub fn part_name(index: u32) -> String {
        format!("Part_{index}")
    }

    pub fn part_path(&self, index: u32) -> NodePath {
        self.parts_path().join_trusted(&Self::part_name(index))
    }

    pub fn ground_plane_path(&self) -> NodePath {
        self.root.join_trusted("GroundPlane")
    }

    pub fn light_path(&self) -> NodePath {
        self.world.join_trusted("SphereLight")
    }

    pub fn physics_scene_path(&self) -> NodePath {
        self.world.join_trusted("physicsScene")
    }
}

/// Configuration for a drop session and the scene it authors.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct DropConfig {
    /// Number of parts after which a session stops by itself.
    pub target_part_count: u32,
    /// Minimum spacing between position polls in milliseconds.
    pub drop_interval_ms: u64,
    /// Gap between the container top and a freshly spawned part.
    pub spawn_clearance: f32,
    /// Height of the container's bottom face.
    pub ground_level: f32,
    /// Uniform scale applied to spawned parts.
    pub part_scale_factor: f32,
    pub settle_policy: SettlePolicy,
    pub on_reassign: ReassignPolicy,
    pub container_collision: CollisionApproximation,
    pub part_collision: CollisionApproximation,
    pub layout: SceneLayout,
    /// Extension (without dot) appended to export paths lacking a scene extension.
    pub export_extension: String,
    pub setup: SceneSetup,
}

impl Default for DropConfig {
    fn default() -> Self {
        Self {
            target_part_count: DEFAULT_TARGET_PART_COUNT,
            drop_interval_ms: DEFAULT_DROP_INTERVAL_MS,
            spawn_clearance: DEFAULT_SPAWN_CLEARANCE,
            ground_level: 0.0,
            part_scale_factor: 1.0,
            settle_policy: SettlePolicy::Elapsed,
            on_reassign: ReassignPolicy::StopSession,
            container_collision: CollisionApproximation::MeshSimplification,
            part_collision: CollisionApproximation::ConvexHull,
            layout: SceneLayout::default(),
            export_extension: DEFAULT_EXPORT_EXTENSION.to_owned(),
            setup: SceneSetup::default(),
        }
    }
}

impl DropConfig {
    /// Creates a new [`DropConfig`] with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the target part count.
    pub fn with_target_part_count(mut self, target_part_count: u32) -> Self {
        self.target_part_count = target_part_count;
        self
    }

    /// Sets the minimum poll spacing.
    pub fn with_drop_interval_ms(mut self, drop_interval_ms: u64) -> Self {
        self.drop_interval_ms = drop_interval_ms;
        self
    }

    pub fn with_spawn_clearance(mut self, spawn_clearance: f32) -> Self {
        self.spawn_clearance = spawn_clearance;
        self
    }

    pub fn with_ground_level(mut self, ground_level: f32) -> Self {
        self.ground_level = ground_level;
        self
    }

    pub fn with_part_scale_factor(mut self, part_scale_factor: f32) -> Self {
        self.part_scale_factor = part_scale_factor;
        self
    }

    /// Sets the settle policy.
    pub fn with_settle_policy(mut self, settle_policy: SettlePolicy) -> Self {
        self.settle_policy = settle_policy;
        self
    }

    pub fn with_reassign_policy(mut self, on_reassign: ReassignPolicy) -> Self {
        self.on_reassign = on_reassign;
        self
    }

    pub fn with_collision(
        mut self,
        container: CollisionApproximation,
        part: CollisionApproximation,
    ) -> Self {
        self.container_collision = container;
        self.part_collision = part;
        self
    }

    pub fn with_layout(mut self, layout: SceneLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_export_extension(mut self, extension: impl Into<String>) -> Self {
        self.export_extension = extension.into();
        self
    }

    pub fn with_setup(mut self, setup: SceneSetup) -> Self {
        self.setup = setup;
        self
    }

    /// Validates the configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        validate_scale_factor(self.part_scale_factor)?;
        if !self.spawn_clearance.is_finite() {
            return Err(Error::invalid("spawn_clearance must be finite"));
        }
        if !self.ground_level.is_finite() {
            return Err(Error::invalid("ground_level must be finite"));
        }
        if let SettlePolicy::Stillness { threshold } = self.settle_policy {
            if !threshold.is_finite() || threshold <= 0.0 {
                return Err(Error::invalid("stillness threshold must be > 0"));
            }
        }
        if self.layout.root.is_root() {
            return Err(Error::invalid("layout root must not be the scene root"));
        }
        let ext = &self.export_extension;
        if ext.is_empty() || ext.contains(['.', '/', '\\']) {
            return Err(Error::invalid(format!(
                "export_extension '{ext}' must be a bare extension"
            )));
        }
        self.setup.validate()
    }
}

pub(crate) fn validate_scale_factor(value: f32) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::invalid(format!(
            "part scale factor must be finite and > 0, got {value}"
        )));
    }
    Ok(())
}
