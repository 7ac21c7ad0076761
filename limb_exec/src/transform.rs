//! # Rigid transforms
//!
//! A [`Transform`] is a 4x4 homogeneous transform made of a 3x3 rotation and a
//! translation column, with `[0, 0, 0, 1]` as the bottom row. Composition is
//! matrix multiplication, so `a * b` applies `b` in the frame of `a`.
//!
//! Element-wise differences between transforms are not rigid transforms, and
//! are represented by the separate [`TransformDelta`] type.
//!
//! Transforms serialise to a [`MatrixRecord`], a row-major
//! `{rows, cols, data}` record.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Matrix3, Matrix4, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::ops::{Add, Mul, Sub};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Default per-element tolerance used by [`Transform::approx_eq_default`].
pub const DEFAULT_EPSILON: f64 = 1e-10;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors that can occur converting a [`MatrixRecord`] into a [`Transform`].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TransformRecordError {
    #[error("Expected a 4x4 record, found {rows}x{cols}")]
    WrongShape { rows: usize, cols: usize },

    #[error("Record declares {rows}x{cols} elements but holds {len}")]
    WrongLength { rows: usize, cols: usize, len: usize },

    #[error("Record element {index} is not finite ({value})")]
    NonFinite { index: usize, value: f64 },
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A 4x4 homogeneous rigid transform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MatrixRecord", into = "MatrixRecord")]
pub struct Transform {
    mat: Matrix4<f64>,
}

/// Element-wise difference (or sum) of transforms.
///
/// Not guaranteed to be a rigid transform, so it cannot be composed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformDelta {
    mat: Matrix4<f64>,
}

/// Generic serialised matrix record, data is row-major.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatrixRecord {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Transform {
    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            mat: Matrix4::identity(),
        }
    }

    /// Wrap a raw homogeneous matrix.
    ///
    /// The caller is responsible for the matrix being rigid.
    pub fn from_matrix(mat: Matrix4<f64>) -> Self {
        Self { mat }
    }

    /// Build a transform from 16 row-major elements.
    pub fn from_row_major(data: &[f64; 16]) -> Self {
        Self {
            mat: Matrix4::from_row_slice(data),
        }
    }

    /// A pure translation.
    pub fn from_translation(x: f64, y: f64, z: f64) -> Self {
        let mut mat = Matrix4::identity();
        mat[(0, 3)] = x;
        mat[(1, 3)] = y;
        mat[(2, 3)] = z;
        Self { mat }
    }

    pub fn from_translation_vec(trans: &Vector3<f64>) -> Self {
        Self::from_translation(trans[0], trans[1], trans[2])
    }

    /// A pure rotation from three angles in degrees.
    ///
    /// The result is `Rz(rz) * Ry(ry) * Rx(rx)`, i.e. the first argument
    /// rotates about the z axis and the last about the x axis.
    pub fn from_rotation(rz: f64, ry: f64, rx: f64) -> Self {
        Self::from_rotation_matrix(&(rot_z(rz) * rot_y(ry) * rot_x(rx)))
    }

    /// A pure rotation from a 3x3 rotation matrix.
    pub fn from_rotation_matrix(rot: &Matrix3<f64>) -> Self {
        let mut mat = Matrix4::identity();
        for r in 0..3 {
            for c in 0..3 {
                mat[(r, c)] = rot[(r, c)];
            }
        }
        Self { mat }
    }

    /// Build a transform from a rotation and a translation.
    pub fn from_parts(rot: &Matrix3<f64>, trans: &Vector3<f64>) -> Self {
        let mut t = Self::from_rotation_matrix(rot);
        t.set_translation(trans);
        t
    }

    /// The underlying homogeneous matrix.
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.mat
    }

    /// Get the element at the given row and column.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.mat[(row, col)]
    }

    pub fn translation(&self) -> Vector3<f64> {
        Vector3::new(self.mat[(0, 3)], self.mat[(1, 3)], self.mat[(2, 3)])
    }

    pub fn translation_x(&self) -> f64 {
        self.mat[(0, 3)]
    }

    pub fn translation_y(&self) -> f64 {
        self.mat[(1, 3)]
    }

    pub fn translation_z(&self) -> f64 {
        self.mat[(2, 3)]
    }

    /// Translation projected onto the XY plane.
    pub fn translation_planar(&self) -> Vector2<f64> {
        Vector2::new(self.mat[(0, 3)], self.mat[(1, 3)])
    }

    /// Length of the translation component.
    pub fn translation_length(&self) -> f64 {
        self.translation().norm()
    }

    /// Replace the translation component.
    pub fn set_translation(&mut self, trans: &Vector3<f64>) {
        for r in 0..3 {
            self.mat[(r, 3)] = trans[r];
        }
    }

    /// The 3x3 rotation component.
    pub fn rotation(&self) -> Matrix3<f64> {
        let m = &self.mat;
        Matrix3::new(
            m[(0, 0)], m[(0, 1)], m[(0, 2)],
            m[(1, 0)], m[(1, 1)], m[(1, 2)],
            m[(2, 0)], m[(2, 1)], m[(2, 2)],
        )
    }

    /// The given column of the rotation component.
    pub fn rotation_column(&self, col: usize) -> Vector3<f64> {
        Vector3::new(self.mat[(0, col)], self.mat[(1, col)], self.mat[(2, col)])
    }

    /// Compose `self` followed by `other` (`self * other`).
    pub fn compose(&self, other: &Transform) -> Transform {
        Transform {
            mat: self.mat * other.mat,
        }
    }

    /// The inverse of a rigid transform, `[R^T, -R^T t]`.
    pub fn inverse(&self) -> Transform {
        let rot_t = self.rotation().transpose();
        let trans = -(rot_t * self.translation());
        Transform::from_parts(&rot_t, &trans)
    }

    /// True if every element differs from the matching element in `other` by
    /// strictly less than `epsilon`.
    pub fn approx_eq(&self, other: &Transform, epsilon: f64) -> bool {
        self.mat
            .iter()
            .zip(other.mat.iter())
            .all(|(a, b)| (a - b).abs() < epsilon)
    }

    pub fn approx_eq_default(&self, other: &Transform) -> bool {
        self.approx_eq(other, DEFAULT_EPSILON)
    }

    /// Returns the 16 elements in row-major order.
    pub fn to_row_major(&self) -> [f64; 16] {
        let mut data = [0f64; 16];
        for r in 0..4 {
            for c in 0..4 {
                data[r * 4 + c] = self.mat[(r, c)];
            }
        }
        data
    }

    /// View this transform as a delta, for element-wise arithmetic.
    pub fn as_delta(&self) -> TransformDelta {
        TransformDelta { mat: self.mat }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        self.compose(&rhs)
    }
}

impl<'a> Mul<&'a Transform> for &'a Transform {
    type Output = Transform;

    fn mul(self, rhs: &Transform) -> Transform {
        self.compose(rhs)
    }
}

impl Sub for Transform {
    type Output = TransformDelta;

    fn sub(self, rhs: Transform) -> TransformDelta {
        TransformDelta {
            mat: self.mat - rhs.mat,
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..4 {
            writeln!(
                f,
                "[{:>12.6} {:>12.6} {:>12.6} {:>12.6}]",
                self.mat[(r, 0)],
                self.mat[(r, 1)],
                self.mat[(r, 2)],
                self.mat[(r, 3)]
            )?;
        }
        Ok(())
    }
}

impl TransformDelta {
    pub fn zero() -> Self {
        Self {
            mat: Matrix4::zeros(),
        }
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.mat
    }

    /// Translation part of the delta.
    pub fn translation(&self) -> Vector3<f64> {
        Vector3::new(self.mat[(0, 3)], self.mat[(1, 3)], self.mat[(2, 3)])
    }

    /// Largest absolute element of the delta.
    pub fn max_abs(&self) -> f64 {
        self.mat.iter().fold(0f64, |acc, v| acc.max(v.abs()))
    }
}

impl Add for TransformDelta {
    type Output = TransformDelta;

    fn add(self, rhs: TransformDelta) -> TransformDelta {
        TransformDelta {
            mat: self.mat + rhs.mat,
        }
    }
}

impl Sub for TransformDelta {
    type Output = TransformDelta;

    fn sub(self, rhs: TransformDelta) -> TransformDelta {
        TransformDelta {
            mat: self.mat - rhs.mat,
        }
    }
}

impl MatrixRecord {
    /// True if the declared shape matches the number of elements.
    pub fn is_consistent(&self) -> bool {
        self.rows * self.cols == self.data.len()
    }
}

impl From<Transform> for MatrixRecord {
    fn from(t: Transform) -> Self {
        MatrixRecord {
            rows: 4,
            cols: 4,
            data: t.to_row_major().to_vec(),
        }
    }
}

impl TryFrom<MatrixRecord> for Transform {
    type Error = TransformRecordError;

    fn try_from(rec: MatrixRecord) -> Result<Self, Self::Error> {
        if rec.rows != 4 || rec.cols != 4 {
            return Err(TransformRecordError::WrongShape {
                rows: rec.rows,
                cols: rec.cols,
            });
        }

        if !rec.is_consistent() {
            return Err(TransformRecordError::WrongLength {
                rows: rec.rows,
                cols: rec.cols,
                len: rec.data.len(),
            });
        }

        if let Some((index, value)) = rec.data.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(TransformRecordError::NonFinite {
                index,
                value: *value,
            });
        }

        let mut data = [0f64; 16];
        data.copy_from_slice(&rec.data);

        Ok(Transform::from_row_major(&data))
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Rotation about the x axis by `deg` degrees.
pub fn rot_x(deg: f64) -> Matrix3<f64> {
    let (s, c) = deg.to_radians().sin_cos();
    Matrix3::new(
        1.0, 0.0, 0.0,
        0.0, c, -s,
        0.0, s, c,
    )
}

/// Rotation about the y axis by `deg` degrees.
pub fn rot_y(deg: f64) -> Matrix3<f64> {
    let (s, c) = deg.to_radians().sin_cos();
    Matrix3::new(
        c, 0.0, s,
        0.0, 1.0, 0.0,
        -s, 0.0, c,
    )
}

/// Rotation about the z axis by `deg` degrees.
pub fn rot_z(deg: f64) -> Matrix3<f64> {
    let (s, c) = deg.to_radians().sin_cos();
    Matrix3::new(
        c, -s, 0.0,
        s, c, 0.0,
        0.0, 0.0, 1.0,
    )
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
