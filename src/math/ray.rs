//! Rays for picking and intersection tests.
//!
//! The triangle test is Möller–Trumbore. A miss is an ordinary outcome and
//! comes back as `None`, not as an error.
//!
//! # Example
//!
//! ```
//! use vantage::math::{Culling, Ray, Vector3f};
//!
//! let ray = Ray::new(Vector3f::new(0.0, 0.0, -1.0), Vector3f::new(0.0, 0.0, 1.0));
//! let t = ray.intersect_triangle(
//!     Vector3f::new(-1.0, -1.0, 0.0),
//!     Vector3f::new(1.0, -1.0, 0.0),
//!     Vector3f::new(0.0, 1.0, 0.0),
//!     Culling::None,
//! );
//! assert!((t.unwrap() - 1.0).abs() < 1e-6);
//! ```

use super::{Aabb, Matrix4, Vector2f, Vector3f, Vector4f};

/// Determinants smaller than this are treated as a ray parallel to the triangle.
const TRIANGLE_EPSILON: f32 = 1e-6;

/// Which triangle faces a ray can hit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Culling {
    /// Hit triangles from either side.
    #[default]
    None,
    /// Only hit triangles whose winding faces the ray (positive determinant).
    Back,
}

/// A half-line with a normalized direction.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Ray {
    pub origin: Vector3f,
    pub direction: Vector3f,
}

impl Ray {
    /// Creates a ray; `direction` is normalized (a zero direction stays zero).
    pub fn new(origin: Vector3f, direction: Vector3f) -> Self {
        Self {
            origin,
            direction: direction.normalized_or_zero(),
        }
    }

    /// Picking ray through a pixel.
    ///
    /// `inverse_view_projection` is the inverse of `projection * view`. Pixel
    /// coordinates have `y` growing downwards.
    pub fn from_screen(pixel: Vector2f, viewport: Vector2f, inverse_view_projection: &Matrix4) -> Self {
        let ndc_x = 2.0 * pixel.x / viewport.x - 1.0;
        let ndc_y = 1.0 - 2.0 * pixel.y / viewport.y;

        let unproject = |z: f32| {
            let world = *inverse_view_projection * Vector4f::new(ndc_x, ndc_y, z, 1.0);
            world.truncate() / world.w
        };

        let near = unproject(-1.0);
        let far = unproject(1.0);
        Self::new(near, far - near)
    }

    #[inline]
    pub fn point_at(&self, t: f32) -> Vector3f {
        self.origin + self.direction * t
    }

    /// Distance along the ray to the triangle `v0 v1 v2`, or `None` on a miss.
    ///
    /// With [`Culling::None`] the sign of the determinant is ignored. With
    /// [`Culling::Back`] only a positive determinant counts, and the division is
    /// deferred until a hit is certain.
    pub fn intersect_triangle(&self, v0: Vector3f, v1: Vector3f, v2: Vector3f, culling: Culling) -> Option<f32> {
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        let pvec = self.direction.cross(edge2);
        let det = edge1.dot(pvec);
        let tvec = self.origin - v0;

        match culling {
            Culling::Back => {
                if det < TRIANGLE_EPSILON {
                    return None;
                }

                let u = tvec.dot(pvec);
                if u < 0.0 || u > det {
                    return None;
                }

                let qvec = tvec.cross(edge1);
                let v = self.direction.dot(qvec);
                if v < 0.0 || u + v > det {
                    return None;
                }

                Some(edge2.dot(qvec) / det)
            }
            Culling::None => {
                if det.abs() < TRIANGLE_EPSILON {
                    return None;
                }

                let inv_det = 1.0 / det;
                let u = tvec.dot(pvec) * inv_det;
                if !(0.0..=1.0).contains(&u) {
                    return None;
                }

                let qvec = tvec.cross(edge1);
                let v = self.direction.dot(qvec) * inv_det;
                if v < 0.0 || u + v > 1.0 {
                    return None;
                }

                Some(edge2.dot(qvec) * inv_det)
            }
        }
    }

    /// Double-sided triangle test, see [`intersect_triangle`](Self::intersect_triangle).
    pub fn triangle_intersects(&self, v0: Vector3f, v1: Vector3f, v2: Vector3f) -> Option<f32> {
        self.intersect_triangle(v0, v1, v2, Culling::None)
    }

    /// Slab test against a box.
    ///
    /// Returns the nearest non-negative entry distance, or the exit distance when
    /// the origin is inside the box.
    pub fn intersect_aabb(&self, aabb: &Aabb<f32>) -> Option<f32> {
        let origin = self.origin.to_array();
        let direction = self.direction.to_array();
        let min = aabb.min.to_array();
        let max = aabb.max.to_array();

        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            if direction[axis].abs() < f32::EPSILON {
                if origin[axis] < min[axis] || origin[axis] > max[axis] {
                    return None;
                }
                continue;
            }

            let inv_dir = 1.0 / direction[axis];
            let mut t1 = (min[axis] - origin[axis]) * inv_dir;
            let mut t2 = (max[axis] - origin[axis]) * inv_dir;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }

            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }

        if t_min > 0.0 {
            Some(t_min)
        } else if t_max > 0.0 {
            Some(t_max)
        } else {
            None
        }
    }
}
