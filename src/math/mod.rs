//! Math primitives used by the transform, camera and mesh code.
//!
//! Everything here is a plain value type. The matrix convention is column storage
//! (`cols[col][row]`) with column vectors, so a product `a * b` applies `b` first.
//! Rotations follow a left-handed frame where [`Quaternion::forward`] is `+Z`,
//! [`Quaternion::up`] is `+Y` and [`Quaternion::right`] is `+X`.
//!
//! Degenerate inputs are the caller's problem: normalizing a zero vector yields
//! NaNs, and inverting a singular matrix silently returns the identity.

mod aabb;
mod angle;
mod matrix;
mod quaternion;
mod ray;
mod rect;
mod vector;

pub use aabb::Aabb;
pub use angle::Angle;
pub use matrix::Matrix4;
pub use quaternion::Quaternion;
pub use ray::{Culling, Ray};
pub use rect::Rect;
pub use vector::{Vector2, Vector2f, Vector2i, Vector2u, Vector3, Vector3f, Vector4, Vector4f};

/// Tolerance used by [`approx_eq`].
pub const EPSILON: f32 = 1e-4;

/// Returns true when `a` and `b` differ by less than [`EPSILON`].
pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}
