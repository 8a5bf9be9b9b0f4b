//! Axis-aligned boxes for octant and mesh bounds

use crate::core::types::Vec3;

/// Axis-aligned bounding box
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Cube around `center` with edge length `size`
    pub fn from_center_size(center: Vec3, size: f32) -> Self {
        let half = Vec3::splat(size * 0.5);
        Self::new(center - half, center + half)
    }

    /// Tightest box around `points`; `None` when there are none
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |aabb, p| {
            Self::new(aabb.min.min(p), aabb.max.max(p))
        }))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Edge lengths
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Center of the child octant `index` (bit 0 = +x, bit 1 = +y, bit 2 = +z)
    pub fn octant_center(&self, index: u8) -> Vec3 {
        let quarter = self.extent() * 0.25;
        let sign = |bit: u8| if index & bit != 0 { 1.0 } else { -1.0 };
        self.center() + Vec3::new(sign(1), sign(2), sign(4)) * quarter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_from_center() {
        let cube = Aabb::from_center_size(Vec3::new(1.0, 0.0, 0.0), 2.0);
        assert_eq!(cube.min, Vec3::new(0.0, -1.0, -1.0));
        assert_eq!(cube.max, Vec3::new(2.0, 1.0, 1.0));
        assert_eq!(cube.center(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(cube.extent(), Vec3::splat(2.0));
    }

    #[test]
    fn test_bounds_of_points() {
        let bounds = Aabb::from_points([Vec3::new(1.0, -2.0, 0.0), Vec3::new(-1.0, 3.0, 0.5)]).unwrap();
        assert_eq!(bounds.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 3.0, 0.5));
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_octant_centers() {
        let parent = Aabb::new(Vec3::ZERO, Vec3::splat(4.0));
        assert_eq!(parent.octant_center(0), Vec3::ONE);
        assert_eq!(parent.octant_center(7), Vec3::splat(3.0));
        assert_eq!(parent.octant_center(1), Vec3::new(3.0, 1.0, 1.0));
        assert_eq!(parent.octant_center(6), Vec3::new(1.0, 3.0, 3.0));
    }
}
