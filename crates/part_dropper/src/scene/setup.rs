//! Descriptors for preparing a primary scene before dropping: up axis, light,
//! physics scene and ground plane.
use glam::Vec3;

/// Scene up axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UpAxis {
    Y,
    #[default]
    Z,
}

/// A spherical area light.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct SphereLight {
    pub radius: f32,
    pub intensity: f32,
    pub translation: Vec3,
}

impl Default for SphereLight {
    fn default() -> Self {
        Self {
            radius: 150.0,
            intensity: 30_000.0,
            translation: Vec3::new(650.0, 0.0, 1150.0),
        }
    }
}

/// Physics scene parameters handed to the host simulation.
///
/// Units follow the scene (centimeters by default, hence a gravity magnitude of 981).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct PhysicsSceneSettings {
    pub gravity_direction: Vec3,
    pub gravity_magnitude: f32,
    /// GPU temp buffer capacity in bytes.
    pub gpu_temp_buffer_capacity: u64,
    /// GPU heap capacity in bytes.
    pub gpu_heap_capacity: u64,
    pub gpu_found_lost_pairs_capacity: u32,
    pub gpu_max_rigid_patch_count: u32,
}

impl Default for PhysicsSceneSettings {
    fn default() -> Self {
        Self {
            gravity_direction: Vec3::NEG_Z,
            gravity_magnitude: 981.0,
            gpu_temp_buffer_capacity: 16 * 1024 * 1024 * 2,
            gpu_heap_capacity: 64 * 1024 * 1024 * 2,
            gpu_found_lost_pairs_capacity: 256 * 1024 * 2,
            gpu_max_rigid_patch_count: 1_000_000,
        }
    }
}

/// A static collision plane the container rests on.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct GroundPlane {
    pub axis: UpAxis,
    /// Edge length of the visual plane.
    pub size: f32,
    pub position: Vec3,
    /// Display color (linear RGB).
    pub color: Vec3,
}

impl Default for GroundPlane {
    fn default() -> Self {
        Self {
            axis: UpAxis::Z,
            size: 750.0,
            position: Vec3::ZERO,
            color: Vec3::splat(0.5),
        }
    }
}

/// Everything [`crate::dropper::controller::PartDropper::create_scene`] authors.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct SceneSetup {
    pub up_axis: UpAxis,
    pub light: SphereLight,
    pub physics: PhysicsSceneSettings,
    pub ground: GroundPlane,
}

impl SceneSetup {
    /// Validates the setup, returning an error if invalid.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::Error;

        if !self.physics.gravity_magnitude.is_finite() || self.physics.gravity_magnitude < 0.0 {
            return Err(Error::invalid("gravity_magnitude must be finite and >= 0"));
        }
        if !self.physics.gravity_direction.is_finite()
            || self.physics.gravity_direction.length_squared() == 0.0
        {
            return Err(Error::invalid("gravity_direction must be a finite non-zero vector"));
        }
        if !self.ground.size.is_finite() || self.ground.size <= 0.0 {
            return Err(Error::invalid("ground plane size must be > 0"));
        }
        if !self.light.radius.is_finite() || self.light.radius < 0.0 {
            return Err(Error::invalid("light radius must be >= 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_z_up_scene_with_downward_gravity() {
        let setup = SceneSetup::default();
        assert_eq!(setup.up_axis, UpAxis::Z);
        assert_eq!(setup.physics.gravity_direction, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(setup.physics.gravity_magnitude, 981.0);
        assert_eq!(setup.ground.size, 750.0);
        assert!(setup.validate().is_ok());
    }

    #[test]
    fn zero_gravity_direction_is_rejected() {
        let mut setup = SceneSetup::default();
        setup.physics.gravity_direction = Vec3::ZERO;
        assert!(setup.validate().is_err());
    }
}
