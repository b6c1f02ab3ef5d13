use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// An angle stored in radians.
///
/// Using a dedicated type keeps degrees and radians from being mixed up at call
/// sites such as `Transform::rotate(Vector3f::Y, Angle::degrees(180.0))`.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Angle(f32);

impl Angle {
    pub const ZERO: Self = Self(0.0);

    pub const fn radians(radians: f32) -> Self {
        Self(radians)
    }

    pub fn degrees(degrees: f32) -> Self {
        Self(degrees.to_radians())
    }

    pub const fn as_radians(self) -> f32 {
        self.0
    }

    pub fn as_degrees(self) -> f32 {
        self.0.to_degrees()
    }

    pub fn sin(self) -> f32 {
        self.0.sin()
    }

    pub fn cos(self) -> f32 {
        self.0.cos()
    }

    pub fn tan(self) -> f32 {
        self.0.tan()
    }
}

impl Add for Angle {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Angle {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<f32> for Angle {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self(self.0 * rhs)
    }
}

impl Div<f32> for Angle {
    type Output = Self;

    fn div(self, rhs: f32) -> Self {
        Self(self.0 / rhs)
    }
}

impl Neg for Angle {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl AddAssign for Angle {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Angle {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}
