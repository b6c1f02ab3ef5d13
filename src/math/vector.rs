//! Two, three and four component vectors.
//!
//! The vectors are generic over their component type so integer vectors can be
//! used for pixel sizes and grid coordinates, but everything that needs a square
//! root (lengths, normalization, rotation) is only provided for `f32`.
//!
//! All three types are `#[repr(C)]` and the `f32` versions are [`bytemuck::Pod`],
//! so they can be placed directly inside vertex and uniform structs.
//!
//! ```
//! use vantage::math::Vector3f;
//!
//! let a = Vector3f::new(1.0, 0.0, 0.0);
//! let b = Vector3f::new(0.0, 1.0, 0.0);
//! assert_eq!(a.cross(b), Vector3f::new(0.0, 0.0, 1.0));
//! assert_eq!((a + b).dot(a), 1.0);
//! ```

use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use num_traits::One;

use super::Quaternion;

/// A two component vector.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector2<T> {
    pub x: T,
    pub y: T,
}

/// A three component vector.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector3<T> {
    pub x: T,
    pub y: T,
    pub z: T,
}

/// A four component vector.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector4<T> {
    pub x: T,
    pub y: T,
    pub z: T,
    pub w: T,
}

pub type Vector2f = Vector2<f32>;
pub type Vector2i = Vector2<i32>;
pub type Vector2u = Vector2<u32>;
pub type Vector3f = Vector3<f32>;
pub type Vector4f = Vector4<f32>;

fn partial_min<T: PartialOrd>(a: T, b: T) -> T {
    if b < a { b } else { a }
}

fn partial_max<T: PartialOrd>(a: T, b: T) -> T {
    if b > a { b } else { a }
}

macro_rules! impl_vector {
    ($name:ident { $($field:ident),+ }, $len:literal) => {
        impl<T> $name<T> {
            pub const fn new($($field: T),+) -> Self {
                Self { $($field),+ }
            }
        }

        impl<T: Copy> $name<T> {
            /// Creates a vector with every component set to `value`.
            pub const fn splat(value: T) -> Self {
                Self { $($field: value),+ }
            }

            pub fn to_array(self) -> [T; $len] {
                [$(self.$field),+]
            }
        }

        impl<T: Copy + PartialOrd> $name<T> {
            /// Componentwise minimum.
            pub fn min(self, rhs: Self) -> Self {
                Self { $($field: partial_min(self.$field, rhs.$field)),+ }
            }

            /// Componentwise maximum.
            pub fn max(self, rhs: Self) -> Self {
                Self { $($field: partial_max(self.$field, rhs.$field)),+ }
            }
        }

        impl<T> $name<T>
        where
            T: Copy + Add<Output = T> + Sub<Output = T> + Mul<Output = T>,
        {
            /// Linear interpolation towards `rhs`; `factor` 0 gives `self`, 1 gives `rhs`.
            pub fn lerp(self, rhs: Self, factor: T) -> Self {
                (rhs - self) * factor + self
            }
        }

        impl<T: Copy + Add<Output = T>> Add for $name<T> {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                Self { $($field: self.$field + rhs.$field),+ }
            }
        }

        impl<T: Copy + Sub<Output = T>> Sub for $name<T> {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self {
                Self { $($field: self.$field - rhs.$field),+ }
            }
        }

        impl<T: Copy + Mul<Output = T>> Mul<T> for $name<T> {
            type Output = Self;

            fn mul(self, rhs: T) -> Self {
                Self { $($field: self.$field * rhs),+ }
            }
        }

        impl<T: Copy + Div<Output = T>> Div<T> for $name<T> {
            type Output = Self;

            fn div(self, rhs: T) -> Self {
                Self { $($field: self.$field / rhs),+ }
            }
        }

        impl<T: Copy + Neg<Output = T>> Neg for $name<T> {
            type Output = Self;

            fn neg(self) -> Self {
                Self { $($field: -self.$field),+ }
            }
        }

        impl<T: Copy + AddAssign> AddAssign for $name<T> {
            fn add_assign(&mut self, rhs: Self) {
                $(self.$field += rhs.$field;)+
            }
        }

        impl<T: Copy + SubAssign> SubAssign for $name<T> {
            fn sub_assign(&mut self, rhs: Self) {
                $(self.$field -= rhs.$field;)+
            }
        }

        impl<T: Copy + MulAssign> MulAssign<T> for $name<T> {
            fn mul_assign(&mut self, rhs: T) {
                $(self.$field *= rhs;)+
            }
        }

        impl<T: Copy + DivAssign> DivAssign<T> for $name<T> {
            fn div_assign(&mut self, rhs: T) {
                $(self.$field /= rhs;)+
            }
        }

        impl<T> From<[T; $len]> for $name<T> {
            fn from([$($field),+]: [T; $len]) -> Self {
                Self { $($field),+ }
            }
        }

        impl<T> From<$name<T>> for [T; $len] {
            fn from(v: $name<T>) -> Self {
                [$(v.$field),+]
            }
        }

        // SAFETY: `#[repr(C)]` struct made only of `f32` fields, no padding.
        unsafe impl bytemuck::Zeroable for $name<f32> {}
        // SAFETY: see above; every bit pattern is a valid `f32`.
        unsafe impl bytemuck::Pod for $name<f32> {}
    };
}

impl_vector!(Vector2 { x, y }, 2);
impl_vector!(Vector3 { x, y, z }, 3);
impl_vector!(Vector4 { x, y, z, w }, 4);

impl<T: Copy + Add<Output = T> + Mul<Output = T> + Sub<Output = T>> Vector2<T> {
    pub fn dot(self, rhs: Self) -> T {
        self.x * rhs.x + self.y * rhs.y
    }

    /// The z component of the 3D cross product of the two vectors.
    pub fn cross(self, rhs: Self) -> T {
        self.x * rhs.y - self.y * rhs.x
    }
}

impl<T: Copy + Add<Output = T> + Mul<Output = T> + Sub<Output = T>> Vector3<T> {
    pub fn dot(self, rhs: Self) -> T {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn cross(self, rhs: Self) -> Self {
        Self {
            x: self.y * rhs.z - self.z * rhs.y,
            y: self.z * rhs.x - self.x * rhs.z,
            z: self.x * rhs.y - self.y * rhs.x,
        }
    }
}

impl<T: Copy + Add<Output = T> + Mul<Output = T>> Vector4<T> {
    pub fn dot(self, rhs: Self) -> T {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z + self.w * rhs.w
    }
}

impl<T: Copy + PartialOrd> Vector3<T> {
    /// Largest component.
    pub fn max_element(self) -> T {
        partial_max(self.x, partial_max(self.y, self.z))
    }

    /// Smallest component.
    pub fn min_element(self) -> T {
        partial_min(self.x, partial_min(self.y, self.z))
    }
}

impl<T: Copy> Vector3<T> {
    pub fn truncate(self) -> Vector2<T> {
        Vector2::new(self.x, self.y)
    }

    pub fn extend(self, w: T) -> Vector4<T> {
        Vector4::new(self.x, self.y, self.z, w)
    }
}

impl<T: Copy> Vector4<T> {
    pub fn truncate(self) -> Vector3<T> {
        Vector3::new(self.x, self.y, self.z)
    }
}

impl Vector2<f32> {
    pub const ZERO: Self = Self::new(0.0, 0.0);
    pub const X: Self = Self::new(1.0, 0.0);
    pub const Y: Self = Self::new(0.0, 1.0);

    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction. The vector must not be zero.
    pub fn normalized(self) -> Self {
        self / self.length()
    }

    /// Rotates counter-clockwise by `angle` radians.
    pub fn rotate(self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }
}

impl Vector3<f32> {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);
    pub const X: Self = Self::new(1.0, 0.0, 0.0);
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction. The vector must not be zero.
    pub fn normalized(self) -> Self {
        self / self.length()
    }

    /// Unit vector in the same direction, or zero for a zero-length vector.
    pub fn normalized_or_zero(self) -> Self {
        let length = self.length();
        if length > 0.0 { self / length } else { Self::ZERO }
    }

    pub fn distance(self, to: Self) -> f32 {
        (to - self).length()
    }

    /// Shortest distance from this point to the segment `start..end`.
    pub fn distance_to_segment(self, start: Self, end: Self) -> f32 {
        let segment = end - start;
        let length_squared = segment.length_squared();
        if length_squared == 0.0 {
            return self.distance(start);
        }

        let t = (self - start).dot(segment) / length_squared;
        if t < 0.0 {
            self.distance(start)
        } else if t > 1.0 {
            self.distance(end)
        } else {
            self.distance(start + segment * t)
        }
    }

    /// Reflects this vector about a plane with the given unit normal.
    pub fn reflect(self, normal: Self) -> Self {
        self - normal * (self.dot(normal) * 2.0)
    }

    /// Rotates around a unit `axis` by `angle` radians (Rodrigues' formula).
    pub fn rotate_around(self, axis: Self, angle: f32) -> Self {
        let (sin, cos) = (-angle).sin_cos();
        self.cross(axis * sin) + self * cos + axis * self.dot(axis * (1.0 - cos))
    }

    /// Rotates by a unit quaternion, i.e. `q * v * q⁻¹`.
    pub fn rotate(self, rotation: Quaternion) -> Self {
        let u = Self::new(rotation.x, rotation.y, rotation.z);
        let t = u.cross(self) * 2.0;
        self + t * rotation.w + u.cross(t)
    }
}

impl Vector4<f32> {
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction. The vector must not be zero.
    pub fn normalized(self) -> Self {
        self / self.length()
    }
}

impl<T: Copy + One> From<Vector3<T>> for Vector4<T> {
    /// Promotes a point to homogeneous coordinates (`w = 1`).
    fn from(v: Vector3<T>) -> Self {
        Self::new(v.x, v.y, v.z, T::one())
    }
}

impl From<glam::Vec2> for Vector2f {
    fn from(v: glam::Vec2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<Vector2f> for glam::Vec2 {
    fn from(v: Vector2f) -> Self {
        glam::Vec2::new(v.x, v.y)
    }
}

impl From<glam::Vec3> for Vector3f {
    fn from(v: glam::Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<Vector3f> for glam::Vec3 {
    fn from(v: Vector3f) -> Self {
        glam::Vec3::new(v.x, v.y, v.z)
    }
}

impl From<glam::Vec4> for Vector4f {
    fn from(v: glam::Vec4) -> Self {
        Self::new(v.x, v.y, v.z, v.w)
    }
}

impl From<Vector4f> for glam::Vec4 {
    fn from(v: Vector4f) -> Self {
        glam::Vec4::new(v.x, v.y, v.z, v.w)
    }
}

impl std::fmt::Display for Vector3f {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5}, {:.5})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::approx_eq;

    #[test]
    fn cross_follows_right_hand_rule() {
        assert_eq!(Vector3f::X.cross(Vector3f::Y), Vector3f::Z);
        assert_eq!(Vector3f::Y.cross(Vector3f::Z), Vector3f::X);
        assert_eq!(Vector2f::X.cross(Vector2f::Y), 1.0);
    }

    #[test]
    fn componentwise_min_max_work_for_integers() {
        let a = Vector3::new(1, -4, 7);
        let b = Vector3::new(-2, 3, 7);
        assert_eq!(a.min(b), Vector3::new(-2, -4, 7));
        assert_eq!(a.max(b), Vector3::new(1, 3, 7));
        assert_eq!(a.max_element(), 7);
        assert_eq!(b.min_element(), -2);
    }

    #[test]
    fn lerp_hits_endpoints_and_midpoint() {
        let a = Vector3f::new(0.0, 2.0, -4.0);
        let b = Vector3f::new(10.0, 4.0, 4.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Vector3f::new(5.0, 3.0, 0.0));
    }

    #[test]
    fn normalized_has_unit_length() {
        let v = Vector3f::new(3.0, -4.0, 12.0).normalized();
        assert!(approx_eq(v.length(), 1.0));
        assert!(approx_eq(Vector2f::new(-3.0, 4.0).normalized().y, 0.8));
    }

    #[test]
    fn distance_to_segment_clamps_to_endpoints() {
        let start = Vector3f::ZERO;
        let end = Vector3f::new(10.0, 0.0, 0.0);
        assert!(approx_eq(Vector3f::new(5.0, 3.0, 0.0).distance_to_segment(start, end), 3.0));
        assert!(approx_eq(Vector3f::new(-4.0, 3.0, 0.0).distance_to_segment(start, end), 5.0));
        assert!(approx_eq(Vector3f::new(1.0, 1.0, 0.0).distance_to_segment(end, end), 9.0554));
    }

    #[test]
    fn quaternion_rotation_matches_axis_angle_rotation() {
        let axis = Vector3f::new(1.0, 2.0, -1.0).normalized();
        let q = Quaternion::from_axis_angle(axis, crate::math::Angle::degrees(50.0));
        let v = Vector3f::new(0.3, -2.0, 5.0);

        let by_quat = v.rotate(q);
        let by_axis = v.rotate_around(axis, 50.0_f32.to_radians());
        assert!(by_quat.distance(by_axis) < 1e-4);
    }

    #[test]
    fn reflect_flips_normal_component() {
        let v = Vector3f::new(1.0, -1.0, 0.0);
        assert_eq!(v.reflect(Vector3f::Y), Vector3f::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn point_promotes_with_unit_w() {
        let v: Vector4f = Vector3f::new(1.0, 2.0, 3.0).into();
        assert_eq!(v.w, 1.0);
    }
}
