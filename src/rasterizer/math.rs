//! Homogeneous vector/matrix math for the rasterizer
//!
//! Conventions:
//! - `Vec4` with w = 1 is a point, w = 0 is a direction
//! - `Mat4` is row-major and applied to column vectors (`m.apply(v) == M * v`)
//! - `a * b` applies `b` first, then `a`

use std::ops::{Add, Mul, Neg, Sub};
use serde::{Serialize, Deserialize};

use crate::error::RasterError;

/// Determinants smaller than this are treated as singular
const SINGULAR_EPSILON: f32 = 1e-8;

/// Homogeneous 4-component vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vec4 {
    pub const ZERO: Vec4 = Vec4 { x: 0.0, y: 0.0, z: 0.0, w: 0.0 };
    pub const UP: Vec4 = Vec4 { x: 0.0, y: 1.0, z: 0.0, w: 0.0 };

    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Position (w = 1)
    pub fn point(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z, w: 1.0 }
    }

    /// Direction (w = 0)
    pub fn direction(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z, w: 0.0 }
    }

    /// Opaque RGB color in 0-255 range
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { x: r, y: g, z: b, w: 255.0 }
    }

    /// Same xyz, w forced to 1
    pub fn to_point(self) -> Self {
        Self { w: 1.0, ..self }
    }

    /// Same xyz, w forced to 0
    pub fn to_direction(self) -> Self {
        Self { w: 0.0, ..self }
    }

    /// Dot product over xyz. Both operands are treated as directions.
    pub fn dot(self, other: Vec4) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product over xyz; the result is a direction
    pub fn cross(self, other: Vec4) -> Vec4 {
        Vec4 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
            w: 0.0,
        }
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit direction with the same xyz heading. The zero vector stays zero.
    pub fn normalize(self) -> Vec4 {
        let l = self.length();
        if l == 0.0 {
            return Vec4::ZERO;
        }
        Vec4::direction(self.x / l, self.y / l, self.z / l)
    }

    /// Scale all four components
    pub fn scale(self, s: f32) -> Vec4 {
        Vec4 {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
            w: self.w * s,
        }
    }

    /// Clamp every component into [lo, hi]
    pub fn clamp(self, lo: f32, hi: f32) -> Vec4 {
        Vec4 {
            x: self.x.clamp(lo, hi),
            y: self.y.clamp(lo, hi),
            z: self.z.clamp(lo, hi),
            w: self.w.clamp(lo, hi),
        }
    }

    pub fn approx_eq(self, other: Vec4, eps: f32) -> bool {
        (self.x - other.x).abs() < eps
            && (self.y - other.y).abs() < eps
            && (self.z - other.z).abs() < eps
            && (self.w - other.w).abs() < eps
    }
}

impl Add for Vec4 {
    type Output = Vec4;
    fn add(self, other: Vec4) -> Vec4 {
        Vec4 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
            w: self.w + other.w,
        }
    }
}

impl Sub for Vec4 {
    type Output = Vec4;
    fn sub(self, other: Vec4) -> Vec4 {
        Vec4 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
            w: self.w - other.w,
        }
    }
}

impl Mul<f32> for Vec4 {
    type Output = Vec4;
    fn mul(self, s: f32) -> Vec4 {
        self.scale(s)
    }
}

impl Neg for Vec4 {
    type Output = Vec4;
    fn neg(self) -> Vec4 {
        self.scale(-1.0)
    }
}

/// Linear interpolation between two scalars
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Component-wise linear interpolation between two vectors
pub fn lerp_v(a: Vec4, b: Vec4, t: f32) -> Vec4 {
    Vec4 {
        x: lerp(a.x, b.x, t),
        y: lerp(a.y, b.y, t),
        z: lerp(a.z, b.z, t),
        w: lerp(a.w, b.w, t),
    }
}

// ============================================================================
// Matrices
// ============================================================================

/// Row-major 4x4 matrix, `e[row][col]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mat4 {
    pub e: [[f32; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mat4 {
    pub fn from_rows(e: [[f32; 4]; 4]) -> Self {
        Self { e }
    }

    pub fn identity() -> Self {
        Self::from_rows([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn translation(t: Vec4) -> Self {
        Self::from_rows([
            [1.0, 0.0, 0.0, t.x],
            [0.0, 1.0, 0.0, t.y],
            [0.0, 0.0, 1.0, t.z],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn scaling(s: Vec4) -> Self {
        Self::from_rows([
            [s.x, 0.0, 0.0, 0.0],
            [0.0, s.y, 0.0, 0.0],
            [0.0, 0.0, s.z, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Rotation by `angle` radians around `axis` (right-handed)
    pub fn rotation(axis: Vec4, angle: f32) -> Self {
        Self::from_quat(Quat::from_axis_angle(axis, angle))
    }

    pub fn from_quat(q: Quat) -> Self {
        q.to_mat4()
    }

    /// Apply a translation after this transform
    pub fn translate(self, t: Vec4) -> Self {
        Self::translation(t) * self
    }

    /// Apply a scale after this transform
    pub fn scale(self, s: Vec4) -> Self {
        Self::scaling(s) * self
    }

    /// Apply a rotation after this transform
    pub fn rotate(self, axis: Vec4, angle: f32) -> Self {
        Self::rotation(axis, angle) * self
    }

    /// Matrix-vector product `M * v`
    pub fn apply(&self, v: Vec4) -> Vec4 {
        let r = |i: usize| {
            self.e[i][0] * v.x + self.e[i][1] * v.y + self.e[i][2] * v.z + self.e[i][3] * v.w
        };
        Vec4::new(r(0), r(1), r(2), r(3))
    }

    pub fn transpose(&self) -> Self {
        let mut m = [[0.0; 4]; 4];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = self.e[j][i];
            }
        }
        Self::from_rows(m)
    }

    /// Determinant and cofactor matrix, shared by `determinant` and `inverse`
    fn cofactors(&self) -> (f32, [[f32; 4]; 4]) {
        let m = &self.e;
        let s0 = m[0][0] * m[1][1] - m[1][0] * m[0][1];
        let s1 = m[0][0] * m[1][2] - m[1][0] * m[0][2];
        let s2 = m[0][0] * m[1][3] - m[1][0] * m[0][3];
        let s3 = m[0][1] * m[1][2] - m[1][1] * m[0][2];
        let s4 = m[0][1] * m[1][3] - m[1][1] * m[0][3];
        let s5 = m[0][2] * m[1][3] - m[1][2] * m[0][3];

        let c5 = m[2][2] * m[3][3] - m[3][2] * m[2][3];
        let c4 = m[2][1] * m[3][3] - m[3][1] * m[2][3];
        let c3 = m[2][1] * m[3][2] - m[3][1] * m[2][2];
        let c2 = m[2][0] * m[3][3] - m[3][0] * m[2][3];
        let c1 = m[2][0] * m[3][2] - m[3][0] * m[2][2];
        let c0 = m[2][0] * m[3][1] - m[3][0] * m[2][1];

        let det = s0 * c5 - s1 * c4 + s2 * c3 + s3 * c2 - s4 * c1 + s5 * c0;

        // Adjugate (transposed cofactors)
        let adj = [
            [
                m[1][1] * c5 - m[1][2] * c4 + m[1][3] * c3,
                -m[0][1] * c5 + m[0][2] * c4 - m[0][3] * c3,
                m[3][1] * s5 - m[3][2] * s4 + m[3][3] * s3,
                -m[2][1] * s5 + m[2][2] * s4 - m[2][3] * s3,
            ],
            [
                -m[1][0] * c5 + m[1][2] * c2 - m[1][3] * c1,
                m[0][0] * c5 - m[0][2] * c2 + m[0][3] * c1,
                -m[3][0] * s5 + m[3][2] * s2 - m[3][3] * s1,
                m[2][0] * s5 - m[2][2] * s2 + m[2][3] * s1,
            ],
            [
                m[1][0] * c4 - m[1][1] * c2 + m[1][3] * c0,
                -m[0][0] * c4 + m[0][1] * c2 - m[0][3] * c0,
                m[3][0] * s4 - m[3][1] * s2 + m[3][3] * s0,
                -m[2][0] * s4 + m[2][1] * s2 - m[2][3] * s0,
            ],
            [
                -m[1][0] * c3 + m[1][1] * c1 - m[1][2] * c0,
                m[0][0] * c3 - m[0][1] * c1 + m[0][2] * c0,
                -m[3][0] * s3 + m[3][1] * s1 - m[3][2] * s0,
                m[2][0] * s3 - m[2][1] * s1 + m[2][2] * s0,
            ],
        ];

        (det, adj)
    }

    pub fn determinant(&self) -> f32 {
        self.cofactors().0
    }

    /// Inverse matrix, or `SingularMatrix` when the determinant is ~0
    pub fn inverse(&self) -> Result<Mat4, RasterError> {
        let (det, adj) = self.cofactors();
        if det.abs() < SINGULAR_EPSILON {
            return Err(RasterError::SingularMatrix { determinant: det });
        }
        let inv_det = 1.0 / det;
        let mut m = adj;
        for row in m.iter_mut() {
            for value in row.iter_mut() {
                *value *= inv_det;
            }
        }
        Ok(Self::from_rows(m))
    }

    /// Inverse-transpose, for transforming normals
    pub fn normal_matrix(&self) -> Result<Mat4, RasterError> {
        Ok(self.inverse()?.transpose())
    }

    /// World-to-camera transform. Camera looks down its local -Z.
    pub fn look_at(eye: Vec4, target: Vec4, up: Vec4) -> Self {
        let f = (target - eye).normalize();
        let s = f.cross(up).normalize();
        let u = s.cross(f);
        let eye = eye.to_direction();
        Self::from_rows([
            [s.x, s.y, s.z, -s.dot(eye)],
            [u.x, u.y, u.z, -u.dot(eye)],
            [-f.x, -f.y, -f.z, f.dot(eye)],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Perspective projection. Near plane maps to NDC z = +1, far to z = -1,
    /// so larger depth values are closer to the viewer.
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let t = 1.0 / (fov_y * 0.5).tan();
        Self::from_rows([
            [t / aspect, 0.0, 0.0, 0.0],
            [0.0, t, 0.0, 0.0],
            [0.0, 0.0, -(far + near) / (near - far), -2.0 * far * near / (near - far)],
            [0.0, 0.0, -1.0, 0.0],
        ])
    }

    /// Orthographic projection with the same depth convention as `perspective`
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        Self::from_rows([
            [2.0 / (right - left), 0.0, 0.0, -(right + left) / (right - left)],
            [0.0, 2.0 / (top - bottom), 0.0, -(top + bottom) / (top - bottom)],
            [0.0, 0.0, 2.0 / (far - near), (far + near) / (far - near)],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// NDC [-1,1]^2 to screen [0,width]x[0,height]; z is left untouched
    pub fn viewport(width: f32, height: f32) -> Self {
        Self::from_rows([
            [width * 0.5, 0.0, 0.0, width * 0.5],
            [0.0, height * 0.5, 0.0, height * 0.5],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn approx_eq(&self, other: &Mat4, eps: f32) -> bool {
        self.e
            .iter()
            .flatten()
            .zip(other.e.iter().flatten())
            .all(|(a, b)| (a - b).abs() < eps)
    }
}

impl Mul for Mat4 {
    type Output = Mat4;
    fn mul(self, rhs: Mat4) -> Mat4 {
        let mut m = [[0.0; 4]; 4];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = (0..4).map(|k| self.e[i][k] * rhs.e[k][j]).sum();
            }
        }
        Mat4::from_rows(m)
    }
}

impl Mul<Vec4> for Mat4 {
    type Output = Vec4;
    fn mul(self, v: Vec4) -> Vec4 {
        self.apply(v)
    }
}

impl Add for Mat4 {
    type Output = Mat4;
    fn add(self, rhs: Mat4) -> Mat4 {
        let mut m = self.e;
        for (row, other) in m.iter_mut().zip(rhs.e.iter()) {
            for (a, b) in row.iter_mut().zip(other.iter()) {
                *a += b;
            }
        }
        Mat4::from_rows(m)
    }
}

impl Sub for Mat4 {
    type Output = Mat4;
    fn sub(self, rhs: Mat4) -> Mat4 {
        let mut m = self.e;
        for (row, other) in m.iter_mut().zip(rhs.e.iter()) {
            for (a, b) in row.iter_mut().zip(other.iter()) {
                *a -= b;
            }
        }
        Mat4::from_rows(m)
    }
}

// ============================================================================
// Quaternions
// ============================================================================

/// Unit quaternion used for rotations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Quat = Quat { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    pub fn from_axis_angle(axis: Vec4, angle: f32) -> Self {
        let a = axis.normalize();
        let (s, c) = (angle * 0.5).sin_cos();
        Self {
            x: a.x * s,
            y: a.y * s,
            z: a.z * s,
            w: c,
        }
    }

    /// Rotate a vector (w is preserved)
    pub fn rotate(self, v: Vec4) -> Vec4 {
        let r = self.to_mat4().apply(v);
        Vec4 { w: v.w, ..r }
    }

    pub fn to_mat4(self) -> Mat4 {
        let Quat { x, y, z, w } = self;
        Mat4::from_rows([
            [1.0 - 2.0 * (y * y + z * z), 2.0 * (x * y - w * z), 2.0 * (x * z + w * y), 0.0],
            [2.0 * (x * y + w * z), 1.0 - 2.0 * (x * x + z * z), 2.0 * (y * z - w * x), 0.0],
            [2.0 * (x * z - w * y), 2.0 * (y * z + w * x), 1.0 - 2.0 * (x * x + y * y), 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }
}

impl Mul for Quat {
    type Output = Quat;
    /// Hamilton product: `a * b` rotates by `b` first
    fn mul(self, b: Quat) -> Quat {
        let a = self;
        Quat {
            w: a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
            x: a.w * b.x + a.x * b.w + a.y * b.z - a.z * b.y,
            y: a.w * b.y - a.x * b.z + a.y * b.w + a.z * b.x,
            z: a.w * b.z + a.x * b.y - a.y * b.x + a.z * b.w,
        }
    }
}
