use num_traits::{Bounded, Num};

use super::Vector3;

/// Axis-aligned bounding box.
///
/// The default box is empty (`min` at the type's maximum, `max` at its
/// minimum) so the first [`include`](Aabb::include) snaps it to that point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb<T> {
    pub min: Vector3<T>,
    pub max: Vector3<T>,
}

impl<T: Bounded + Copy> Default for Aabb<T> {
    fn default() -> Self {
        Self {
            min: Vector3::splat(T::max_value()),
            max: Vector3::splat(T::min_value()),
        }
    }
}

impl<T: Copy + PartialOrd> Aabb<T> {
    pub const fn new(min: Vector3<T>, max: Vector3<T>) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vector3<T>>) -> Self
    where
        T: Bounded,
    {
        let mut aabb = Self::default();
        aabb.include_all(points);
        aabb
    }

    pub fn include(&mut self, point: Vector3<T>) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn include_all(&mut self, points: impl IntoIterator<Item = Vector3<T>>) {
        for point in points {
            self.include(point);
        }
    }

    /// True until at least one point has been included.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn contains(&self, point: Vector3<T>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }
}

impl<T: Copy + Num> Aabb<T> {
    pub fn width(&self) -> T {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> T {
        self.max.y - self.min.y
    }

    pub fn depth(&self) -> T {
        self.max.z - self.min.z
    }

    pub fn volume(&self) -> T {
        self.width() * self.height() * self.depth()
    }

    pub fn center(&self) -> Vector3<T> {
        (self.min + self.max) / (T::one() + T::one())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector3f;

    #[test]
    fn two_points_give_componentwise_extent() {
        let aabb = Aabb::from_points([Vector3f::new(-1.0, 2.0, 0.0), Vector3f::new(3.0, -4.0, 5.0)]);
        assert_eq!(aabb.min, Vector3f::new(-1.0, -4.0, 0.0));
        assert_eq!(aabb.max, Vector3f::new(3.0, 2.0, 5.0));
        assert_eq!(aabb.volume(), 4.0 * 6.0 * 5.0);
        assert_eq!(aabb.center(), Vector3f::new(1.0, -1.0, 2.5));
    }

    #[test]
    fn default_is_empty_until_first_point() {
        let mut aabb = Aabb::<f32>::default();
        assert!(aabb.is_empty());
        aabb.include(Vector3f::new(1.0, 1.0, 1.0));
        assert!(!aabb.is_empty());
        assert_eq!(aabb.min, aabb.max);
    }

    #[test]
    fn integer_boxes_work() {
        let aabb = Aabb::from_points([Vector3::new(0, 0, 0), Vector3::new(2, 3, 4)]);
        assert_eq!(aabb.volume(), 24);
        assert!(aabb.contains(Vector3::new(1, 1, 1)));
        assert!(!aabb.contains(Vector3::new(1, 5, 1)));
    }
}
