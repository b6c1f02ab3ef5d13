//! Unit quaternions for rotations.
//!
//! Quaternions compose with `*` as the Hamilton product: `a * b` applies `b`
//! first, then `a`. Anything built by composing or interpolating should be
//! renormalized before it is used as a rotation, otherwise error accumulates
//! frame over frame. [`Transform`](crate::Transform) does this for you.
//!
//! ```
//! use vantage::math::{Angle, Quaternion, Vector3f};
//!
//! let half_turn = Quaternion::from_axis_angle(Vector3f::Y, Angle::degrees(180.0));
//! let forward = half_turn.forward();
//! assert!((forward.z + 1.0).abs() < 1e-5);
//! ```

use std::ops::{Mul, MulAssign};

use super::{Angle, Matrix4, Vector3f, Vector4f};

/// Interpolation falls back to [`Quaternion::nlerp`] when the inputs are this
/// close to collinear.
const SLERP_THRESHOLD: f32 = 1e-3;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `angle` around `axis`. The axis must be normalized.
    pub fn from_axis_angle(axis: Vector3f, angle: Angle) -> Self {
        let (sin, cos) = (angle.as_radians() / 2.0).sin_cos();
        Self::new(axis.x * sin, axis.y * sin, axis.z * sin, cos)
    }

    /// Extracts the rotation held in the upper 3x3 block of `m`.
    ///
    /// Uses the trace when it is positive, otherwise the branch for the largest
    /// diagonal element, and renormalizes the result.
    pub fn from_matrix(m: &Matrix4) -> Self {
        let m = m.to_cols_array_2d();
        let trace = m[0][0] + m[1][1] + m[2][2];

        let q = if trace > 0.0 {
            let s = 0.5 / (trace + 1.0).sqrt();
            Self::new(
                (m[1][2] - m[2][1]) * s,
                (m[2][0] - m[0][2]) * s,
                (m[0][1] - m[1][0]) * s,
                0.25 / s,
            )
        } else if m[0][0] > m[1][1] && m[0][0] > m[2][2] {
            let s = 2.0 * (1.0 + m[0][0] - m[1][1] - m[2][2]).sqrt();
            Self::new(
                0.25 * s,
                (m[1][0] + m[0][1]) / s,
                (m[2][0] + m[0][2]) / s,
                (m[1][2] - m[2][1]) / s,
            )
        } else if m[1][1] > m[2][2] {
            let s = 2.0 * (1.0 + m[1][1] - m[0][0] - m[2][2]).sqrt();
            Self::new(
                (m[1][0] + m[0][1]) / s,
                0.25 * s,
                (m[2][1] + m[1][2]) / s,
                (m[2][0] - m[0][2]) / s,
            )
        } else {
            let s = 2.0 * (1.0 + m[2][2] - m[0][0] - m[1][1]).sqrt();
            Self::new(
                (m[2][0] + m[0][2]) / s,
                (m[1][2] + m[2][1]) / s,
                0.25 * s,
                (m[0][1] - m[1][0]) / s,
            )
        };

        q.normalized()
    }

    pub fn dot(self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z + self.w * rhs.w
    }

    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn normalized(self) -> Self {
        self * (1.0 / self.length())
    }

    /// Inverse rotation. Divides by the squared length, so it is a true inverse
    /// even for quaternions that have drifted off unit length.
    pub fn conjugate(self) -> Self {
        let length_squared = self.length_squared();
        Self::new(
            -self.x / length_squared,
            -self.y / length_squared,
            -self.z / length_squared,
            self.w / length_squared,
        )
    }

    /// Normalized linear interpolation along the shortest arc.
    pub fn nlerp(self, dest: Self, factor: f32) -> Self {
        let dest = if self.dot(dest) < 0.0 { -dest } else { dest };
        let a = Vector4f::from(self);
        let b = Vector4f::from(dest);
        Self::from(a.lerp(b, factor)).normalized()
    }

    /// Spherical interpolation along the shortest arc.
    pub fn slerp(self, dest: Self, factor: f32) -> Self {
        let mut cos = self.dot(dest);
        let mut dest = dest;
        if cos < 0.0 {
            cos = -cos;
            dest = -dest;
        }

        if cos.abs() >= 1.0 - SLERP_THRESHOLD {
            return self.nlerp(dest, factor);
        }

        let sin = (1.0 - cos * cos).sqrt();
        let angle = sin.atan2(cos);
        let inv_sin = 1.0 / sin;

        let src_factor = ((1.0 - factor) * angle).sin() * inv_sin;
        let dest_factor = (factor * angle).sin() * inv_sin;

        self * src_factor + dest * dest_factor
    }

    /// Rotation matrix for this (unit) quaternion.
    pub fn to_rotation_matrix(self) -> Matrix4 {
        let Self { x, y, z, w } = self;

        let forward = Vector3f::new(
            2.0 * (x * z - w * y),
            2.0 * (y * z + w * x),
            1.0 - 2.0 * (x * x + y * y),
        );
        let up = Vector3f::new(
            2.0 * (x * y + w * z),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z - w * x),
        );
        let right = Vector3f::new(
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y - w * z),
            2.0 * (x * z + w * y),
        );

        Matrix4::rotation_from_vectors(forward, up, right)
    }

    pub fn forward(self) -> Vector3f {
        Vector3f::Z.rotate(self)
    }

    pub fn back(self) -> Vector3f {
        (-Vector3f::Z).rotate(self)
    }

    pub fn up(self) -> Vector3f {
        Vector3f::Y.rotate(self)
    }

    pub fn down(self) -> Vector3f {
        (-Vector3f::Y).rotate(self)
    }

    pub fn right(self) -> Vector3f {
        Vector3f::X.rotate(self)
    }

    pub fn left(self) -> Vector3f {
        (-Vector3f::X).rotate(self)
    }
}

impl Mul for Quaternion {
    type Output = Self;

    fn mul(self, r: Self) -> Self {
        Self::new(
            self.x * r.w + self.w * r.x + self.y * r.z - self.z * r.y,
            self.y * r.w + self.w * r.y + self.z * r.x - self.x * r.z,
            self.z * r.w + self.w * r.z + self.x * r.y - self.y * r.x,
            self.w * r.w - self.x * r.x - self.y * r.y - self.z * r.z,
        )
    }
}

impl MulAssign for Quaternion {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl Mul<f32> for Quaternion {
    type Output = Self;

    fn mul(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s, self.w * s)
    }
}

impl std::ops::Add for Quaternion {
    type Output = Self;

    fn add(self, r: Self) -> Self {
        Self::new(self.x + r.x, self.y + r.y, self.z + r.z, self.w + r.w)
    }
}

impl std::ops::Neg for Quaternion {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z, -self.w)
    }
}

impl From<Quaternion> for Vector4f {
    fn from(q: Quaternion) -> Self {
        Vector4f::new(q.x, q.y, q.z, q.w)
    }
}

impl From<Vector4f> for Quaternion {
    fn from(v: Vector4f) -> Self {
        Self::new(v.x, v.y, v.z, v.w)
    }
}

impl From<glam::Quat> for Quaternion {
    fn from(q: glam::Quat) -> Self {
        Self::new(q.x, q.y, q.z, q.w)
    }
}

impl From<Quaternion> for glam::Quat {
    fn from(q: Quaternion) -> Self {
        glam::Quat::from_xyzw(q.x, q.y, q.z, q.w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quat_close(a: Quaternion, b: Quaternion) -> bool {
        // q and -q are the same rotation
        let d = a.dot(b).abs();
        (d - 1.0).abs() < 1e-4
    }

    #[test]
    fn conjugate_undoes_rotation() {
        let q = Quaternion::from_axis_angle(Vector3f::new(0.0, 0.6, 0.8), Angle::degrees(73.0));
        let id = (q * q.conjugate()).normalized();
        assert!(quat_close(id, Quaternion::IDENTITY));

        let v = Vector3f::new(1.0, -2.0, 0.5);
        assert!(v.rotate(q).rotate(q.conjugate()).distance(v) < 1e-5);
    }

    #[test]
    fn conjugate_inverts_non_unit_quaternion() {
        let q = Quaternion::new(1.0, 2.0, 3.0, 4.0);
        let id = q * q.conjugate();
        assert!(quat_close(id.normalized(), Quaternion::IDENTITY));
        assert!((id.w - 1.0).abs() < 1e-5);
    }

    #[test]
    fn hamilton_product_matches_glam() {
        let a = Quaternion::from_axis_angle(Vector3f::X, Angle::degrees(30.0));
        let b = Quaternion::from_axis_angle(Vector3f::new(0.0, 1.0, 1.0).normalized(), Angle::degrees(-110.0));
        let ours = a * b;
        let theirs = glam::Quat::from(a) * glam::Quat::from(b);
        assert!(quat_close(ours, theirs.into()));
    }

    #[test]
    fn half_turn_about_up_reverses_forward() {
        let q = Quaternion::from_axis_angle(Vector3f::Y, Angle::degrees(180.0));
        assert!(q.forward().distance(-Vector3f::Z) < 1e-5);
        assert!(q.right().distance(-Vector3f::X) < 1e-5);
        assert!(q.up().distance(Vector3f::Y) < 1e-5);
    }

    #[test]
    fn rotation_matrix_agrees_with_vector_rotation() {
        let q = Quaternion::from_axis_angle(Vector3f::new(1.0, 1.0, 0.0).normalized(), Angle::degrees(40.0));
        let m = q.to_rotation_matrix();
        let v = Vector3f::new(0.2, 3.0, -1.0);
        assert!(m.transform_point(v).distance(v.rotate(q)) < 1e-5);
    }

    #[test]
    fn matrix_round_trip_covers_every_branch() {
        let cases = [
            (Vector3f::Y, 10.0),
            (Vector3f::X, 170.0),
            (Vector3f::Y, 170.0),
            (Vector3f::Z, 170.0),
            (Vector3f::new(1.0, 2.0, 3.0).normalized(), 200.0),
        ];
        for (axis, degrees) in cases {
            let q = Quaternion::from_axis_angle(axis, Angle::degrees(degrees));
            let back = Quaternion::from_matrix(&q.to_rotation_matrix());
            assert!(quat_close(q, back), "axis {axis} at {degrees} degrees");
        }
    }

    #[test]
    fn slerp_takes_the_short_way() {
        let a = Quaternion::IDENTITY;
        let b = Quaternion::from_axis_angle(Vector3f::Y, Angle::degrees(90.0));
        let mid = a.slerp(b, 0.5);
        let expected = Quaternion::from_axis_angle(Vector3f::Y, Angle::degrees(45.0));
        assert!(quat_close(mid, expected));

        // same rotation with the sign flipped must give the same result
        let mid_neg = a.slerp(-b, 0.5);
        assert!(quat_close(mid_neg, expected));
    }

    #[test]
    fn slerp_falls_back_for_nearly_equal_inputs() {
        let a = Quaternion::from_axis_angle(Vector3f::Z, Angle::degrees(10.0));
        let b = Quaternion::from_axis_angle(Vector3f::Z, Angle::degrees(10.01));
        let mid = a.slerp(b, 0.5);
        assert!((mid.length() - 1.0).abs() < 1e-5);
        assert!(quat_close(mid, a.nlerp(b, 0.5)));
    }

    #[test]
    fn nlerp_endpoints() {
        let a = Quaternion::from_axis_angle(Vector3f::X, Angle::degrees(20.0));
        let b = Quaternion::from_axis_angle(Vector3f::X, Angle::degrees(80.0));
        assert!(quat_close(a.nlerp(b, 0.0), a));
        assert!(quat_close(a.nlerp(b, 1.0), b));
    }
}
