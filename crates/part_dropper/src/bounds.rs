//! Axis-aligned bounding boxes in 3D.
use glam::Vec3;

/// An axis-aligned box described by its minimum and maximum corners.
///
/// An empty box has `min > max` on at least one axis. [`Bounds3::EMPTY`] is the
/// identity for [`Bounds3::union`] and [`Bounds3::include_point`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Bounds3 {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Bounds3 {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Creates a box from two opposite corners given in any order.
    pub fn from_corners(a: impl Into<Vec3>, b: impl Into<Vec3>) -> Self {
        let (a, b) = (a.into(), b.into());
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Creates a box of the given `size` whose minimum corner is at `min`.
    pub fn from_min_size(min: impl Into<Vec3>, size: impl Into<Vec3>) -> Self {
        let min = min.into();
        Self::from_corners(min, min + size.into())
    }

    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    /// Returns true if both corners are finite and the box is not empty.
    pub fn is_bounded(&self) -> bool {
        !self.is_empty() && self.min.is_finite() && self.max.is_finite()
    }

    /// Extents of the box. Zero for an empty box.
    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn midpoint(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            (self.min + self.max) * 0.5
        }
    }

    pub fn include_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(&self, other: &Bounds3) -> Bounds3 {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Bounds3 {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Returns the box translated by `offset`.
    pub fn translated(&self, offset: Vec3) -> Bounds3 {
        if self.is_empty() {
            return *self;
        }
        Bounds3 {
            min: self.min + offset,
            max: self.max + offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_are_normalized() {
        let b = Bounds3::from_corners(Vec3::new(5.0, -1.0, 2.0), Vec3::new(-5.0, 1.0, 0.0));
        assert_eq!(b.min, Vec3::new(-5.0, -1.0, 0.0));
        assert_eq!(b.max, Vec3::new(5.0, 1.0, 2.0));
        assert_eq!(b.size(), Vec3::new(10.0, 2.0, 2.0));
        assert_eq!(b.midpoint(), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn empty_box_has_zero_size_and_is_not_bounded() {
        let b = Bounds3::EMPTY;
        assert!(b.is_empty());
        assert!(!b.is_bounded());
        assert_eq!(b.size(), Vec3::ZERO);
        assert_eq!(Bounds3::default(), Bounds3::EMPTY);
    }

    #[test]
    fn union_ignores_empty_operands() {
        let a = Bounds3::from_min_size(Vec3::ZERO, Vec3::ONE);
        assert_eq!(a.union(&Bounds3::EMPTY), a);
        assert_eq!(Bounds3::EMPTY.union(&a), a);

        let b = Bounds3::from_min_size(Vec3::splat(2.0), Vec3::ONE);
        let u = a.union(&b);
        assert_eq!(u.min, Vec3::ZERO);
        assert_eq!(u.max, Vec3::splat(3.0));
    }

    #[test]
    fn include_point_grows_from_empty() {
        let mut b = Bounds3::EMPTY;
        b.include_point(Vec3::new(1.0, 2.0, 3.0));
        b.include_point(Vec3::new(-1.0, 0.0, 5.0));
        assert!(b.is_bounded());
        assert_eq!(b.min, Vec3::new(-1.0, 0.0, 3.0));
        assert_eq!(b.max, Vec3::new(1.0, 2.0, 5.0));
    }

    #[test]
    fn translated_moves_both_corners() {
        let b = Bounds3::from_min_size(Vec3::new(-5.0, -5.0, 2.0), Vec3::new(10.0, 10.0, 4.0));
        let t = b.translated(Vec3::new(0.0, 0.0, -2.0));
        assert_eq!(t.min.z, 0.0);
        assert_eq!(t.size(), b.size());
    }
}
