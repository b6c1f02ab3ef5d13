//! 4x4 matrices.
//!
//! [`Matrix4`] stores its elements as `cols[col][row]` and treats vectors as
//! columns. The product `a * b` is the ordinary matrix product, so a chain like
//! `projection * view * model` applies `model` first. Translation lives in the
//! fourth column, which is also how `glam` and WGSL lay out a `mat4x4<f32>`, so
//! [`Matrix4::to_cols_array_2d`] can go straight into a uniform buffer.
//!
//! Projection matrices use the `[-1, 1]` clip depth range; the model shader
//! remaps depth before rasterization.

use std::ops::{Mul, MulAssign};

use super::{Angle, Rect, Vector2f, Vector3f, Vector4f};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix4 {
    cols: [[f32; 4]; 4],
}

impl Default for Matrix4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix4 {
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub const ZERO: Self = Self { cols: [[0.0; 4]; 4] };

    pub const fn from_cols_array_2d(cols: [[f32; 4]; 4]) -> Self {
        Self { cols }
    }

    /// Builds a matrix from elements written out row by row.
    pub fn from_rows(rows: [[f32; 4]; 4]) -> Self {
        Self { cols: rows }.transpose()
    }

    /// Builds a matrix whose upper 3x3 block is given row by row; the rest is identity.
    pub fn from_rows_3x3(rows: [[f32; 3]; 3]) -> Self {
        let mut m = Self::IDENTITY;
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                m.cols[c][r] = *value;
            }
        }
        m
    }

    pub const fn to_cols_array_2d(&self) -> [[f32; 4]; 4] {
        self.cols
    }

    /// Element at `row`, `col`.
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.cols[col][row]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.cols[col][row] = value;
    }

    pub fn col(&self, col: usize) -> Vector4f {
        self.cols[col].into()
    }

    pub fn row(&self, row: usize) -> Vector4f {
        Vector4f::new(
            self.cols[0][row],
            self.cols[1][row],
            self.cols[2][row],
            self.cols[3][row],
        )
    }

    pub fn scale(scale: Vector3f) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[0][0] = scale.x;
        m.cols[1][1] = scale.y;
        m.cols[2][2] = scale.z;
        m
    }

    pub fn translation(offset: Vector3f) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[3][0] = offset.x;
        m.cols[3][1] = offset.y;
        m.cols[3][2] = offset.z;
        m
    }

    /// Euler rotation applied as X, then Y, then Z (`Rz * Ry * Rx`).
    ///
    /// The Y term turns `+X` towards `+Z`.
    pub fn rotation_euler(x: Angle, y: Angle, z: Angle) -> Self {
        let mut rx = Self::IDENTITY;
        let mut ry = Self::IDENTITY;
        let mut rz = Self::IDENTITY;

        let (sin, cos) = x.as_radians().sin_cos();
        rx.cols[1][1] = cos;
        rx.cols[2][1] = -sin;
        rx.cols[1][2] = sin;
        rx.cols[2][2] = cos;

        let (sin, cos) = y.as_radians().sin_cos();
        ry.cols[0][0] = cos;
        ry.cols[2][0] = -sin;
        ry.cols[0][2] = sin;
        ry.cols[2][2] = cos;

        let (sin, cos) = z.as_radians().sin_cos();
        rz.cols[0][0] = cos;
        rz.cols[1][0] = -sin;
        rz.cols[0][1] = sin;
        rz.cols[1][1] = cos;

        rz * ry * rx
    }

    /// Matrix whose rows are `right`, `up` and `forward`.
    pub fn rotation_from_vectors(forward: Vector3f, up: Vector3f, right: Vector3f) -> Self {
        Self::from_rows_3x3([
            [right.x, right.y, right.z],
            [up.x, up.y, up.z],
            [forward.x, forward.y, forward.z],
        ])
    }

    /// Orthonormal basis looking along `forward`, with `up` as the rough up hint.
    pub fn rotation_from_direction(forward: Vector3f, up: Vector3f) -> Self {
        let n = forward.normalized();
        let u = up.normalized().cross(n);
        let v = n.cross(u);
        Self::rotation_from_vectors(n, v, u)
    }

    /// Perspective projection looking down `+Z`.
    pub fn perspective(fov: Angle, aspect: f32, near: f32, far: f32) -> Self {
        let tan_half = (fov.as_radians() / 2.0).tan();
        let range = near - far;

        let mut m = Self::ZERO;
        m.cols[0][0] = 1.0 / (tan_half * aspect);
        m.cols[1][1] = 1.0 / tan_half;
        m.cols[2][2] = (-near - far) / range;
        m.cols[2][3] = 1.0;
        m.cols[3][2] = 2.0 * far * near / range;
        m
    }

    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        let width = right - left;
        let height = top - bottom;
        let depth = far - near;

        let mut m = Self::IDENTITY;
        m.cols[0][0] = 2.0 / width;
        m.cols[3][0] = -(right + left) / width;
        m.cols[1][1] = 2.0 / height;
        m.cols[3][1] = -(top + bottom) / height;
        m.cols[2][2] = -2.0 / depth;
        m.cols[3][2] = -(far + near) / depth;
        m
    }

    pub fn transpose(&self) -> Self {
        let mut m = Self::ZERO;
        for c in 0..4 {
            for r in 0..4 {
                m.cols[c][r] = self.cols[r][c];
            }
        }
        m
    }

    pub fn determinant(&self) -> f32 {
        let [s, c] = self.minors();
        s[0] * c[5] - s[1] * c[4] + s[2] * c[3] + s[3] * c[2] - s[4] * c[1] + s[5] * c[0]
    }

    /// 2x2 sub-determinants of the top and bottom halves, shared by
    /// [`determinant`](Self::determinant) and [`inverse`](Self::inverse).
    fn minors(&self) -> [[f32; 6]; 2] {
        let a = &self.cols;
        [
            [
                a[0][0] * a[1][1] - a[1][0] * a[0][1],
                a[0][0] * a[1][2] - a[1][0] * a[0][2],
                a[0][0] * a[1][3] - a[1][0] * a[0][3],
                a[0][1] * a[1][2] - a[1][1] * a[0][2],
                a[0][1] * a[1][3] - a[1][1] * a[0][3],
                a[0][2] * a[1][3] - a[1][2] * a[0][3],
            ],
            [
                a[2][0] * a[3][1] - a[3][0] * a[2][1],
                a[2][0] * a[3][2] - a[3][0] * a[2][2],
                a[2][0] * a[3][3] - a[3][0] * a[2][3],
                a[2][1] * a[3][2] - a[3][1] * a[2][2],
                a[2][1] * a[3][3] - a[3][1] * a[2][3],
                a[2][2] * a[3][3] - a[3][2] * a[2][3],
            ],
        ]
    }

    /// General inverse through the adjugate.
    ///
    /// Returns the identity when the determinant is exactly zero; there is no
    /// tolerance, so nearly singular input produces very large elements instead.
    pub fn inverse(&self) -> Self {
        let [s, c] = self.minors();
        let det = s[0] * c[5] - s[1] * c[4] + s[2] * c[3] + s[3] * c[2] - s[4] * c[1] + s[5] * c[0];
        if det == 0.0 {
            return Self::IDENTITY;
        }

        let a = &self.cols;
        let inv = 1.0 / det;
        let cols = [
            [
                (a[1][1] * c[5] - a[1][2] * c[4] + a[1][3] * c[3]) * inv,
                (-a[0][1] * c[5] + a[0][2] * c[4] - a[0][3] * c[3]) * inv,
                (a[3][1] * s[5] - a[3][2] * s[4] + a[3][3] * s[3]) * inv,
                (-a[2][1] * s[5] + a[2][2] * s[4] - a[2][3] * s[3]) * inv,
            ],
            [
                (-a[1][0] * c[5] + a[1][2] * c[2] - a[1][3] * c[1]) * inv,
                (a[0][0] * c[5] - a[0][2] * c[2] + a[0][3] * c[1]) * inv,
                (-a[3][0] * s[5] + a[3][2] * s[2] - a[3][3] * s[1]) * inv,
                (a[2][0] * s[5] - a[2][2] * s[2] + a[2][3] * s[1]) * inv,
            ],
            [
                (a[1][0] * c[4] - a[1][1] * c[2] + a[1][3] * c[0]) * inv,
                (-a[0][0] * c[4] + a[0][1] * c[2] - a[0][3] * c[0]) * inv,
                (a[3][0] * s[4] - a[3][1] * s[2] + a[3][3] * s[0]) * inv,
                (-a[2][0] * s[4] + a[2][1] * s[2] - a[2][3] * s[0]) * inv,
            ],
            [
                (-a[1][0] * c[3] + a[1][1] * c[1] - a[1][2] * c[0]) * inv,
                (a[0][0] * c[3] - a[0][1] * c[1] + a[0][2] * c[0]) * inv,
                (-a[3][0] * s[3] + a[3][1] * s[1] - a[3][2] * s[0]) * inv,
                (a[2][0] * s[3] - a[2][1] * s[1] + a[2][2] * s[0]) * inv,
            ],
        ];
        Self { cols }
    }

    /// Transforms a point, dividing by the resulting `w`.
    pub fn transform_point(&self, p: Vector3f) -> Vector3f {
        let v = *self * Vector4f::new(p.x, p.y, p.z, 1.0);
        Vector3f::new(v.x, v.y, v.z) / v.w
    }

    /// Transforms a point assuming the bottom row is `0 0 0 1`; no divide.
    pub fn transform_point_affine(&self, p: Vector3f) -> Vector3f {
        let v = *self * Vector4f::new(p.x, p.y, p.z, 1.0);
        Vector3f::new(v.x, v.y, v.z)
    }

    /// Transforms a direction; translation is ignored.
    pub fn transform_vector(&self, d: Vector3f) -> Vector3f {
        let v = *self * Vector4f::new(d.x, d.y, d.z, 0.0);
        Vector3f::new(v.x, v.y, v.z)
    }

    /// Transforms a point on the `z = 0` plane.
    pub fn transform_point_2d(&self, p: Vector2f) -> Vector2f {
        let v = self.transform_point(Vector3f::new(p.x, p.y, 0.0));
        Vector2f::new(v.x, v.y)
    }

    /// Bounding rectangle of the four transformed corners of `rect`.
    pub fn transform_rect(&self, rect: &Rect<f32>) -> Rect<f32> {
        let corners = [
            Vector2f::new(rect.left, rect.top),
            Vector2f::new(rect.right, rect.top),
            Vector2f::new(rect.right, rect.bottom),
            Vector2f::new(rect.left, rect.bottom),
        ];
        Rect::from_points(corners.into_iter().map(|p| self.transform_point_2d(p)))
    }
}

impl Mul for Matrix4 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let mut m = Self::ZERO;
        for c in 0..4 {
            for r in 0..4 {
                m.cols[c][r] = (0..4).map(|k| self.cols[k][r] * rhs.cols[c][k]).sum();
            }
        }
        m
    }
}

impl MulAssign for Matrix4 {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl Mul<f32> for Matrix4 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self {
            cols: self.cols.map(|col| col.map(|e| e * rhs)),
        }
    }
}

impl Mul<Vector4f> for Matrix4 {
    type Output = Vector4f;

    fn mul(self, v: Vector4f) -> Vector4f {
        let v = v.to_array();
        let row = |r: usize| (0..4).map(|c| self.cols[c][r] * v[c]).sum::<f32>();
        Vector4f::new(row(0), row(1), row(2), row(3))
    }
}

impl From<glam::Mat4> for Matrix4 {
    fn from(m: glam::Mat4) -> Self {
        Self::from_cols_array_2d(m.to_cols_array_2d())
    }
}

impl From<Matrix4> for glam::Mat4 {
    fn from(m: Matrix4) -> Self {
        glam::Mat4::from_cols_array_2d(&m.cols)
    }
}

impl std::fmt::Display for Matrix4 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for r in 0..4 {
            let row = self.row(r);
            writeln!(f, "[{:>10.5} {:>10.5} {:>10.5} {:>10.5}]", row.x, row.y, row.z, row.w)?;
        }
        Ok(())
    }
}
