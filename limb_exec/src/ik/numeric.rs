//! # Numeric solver boundary
//!
//! Numeric inverse kinematics solvers are driven through a fixed buffer
//! layout, so that native solvers can be plugged in through a C ABI. All
//! angles in a [`NumericIkRequest`] are radians:
//!
//! | Buffer           | Length    | Contents                              |
//! |------------------|-----------|---------------------------------------|
//! | `dh_params`      | 4 * n     | `(d, theta, r, alpha)` per link       |
//! | `upper_limits`   | n         | Maximum joint angles                  |
//! | `lower_limits`   | n         | Minimum joint angles                  |
//! | `initial_angles` | n         | Seed joint angles                     |
//! | `target`         | 16        | Row-major target transform            |
//!
//! The solver returns `n` joint angles in radians.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::fmt::Debug;

use crate::link::{JointLimits, Link};
use crate::transform::Transform;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of values per link in the DH buffer.
pub const DH_STRIDE: usize = 4;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum NumericIkError {
    #[error("The request buffers do not match the link count of {0}")]
    InvalidLayout(usize),

    #[error("The solver did not converge after {iterations} iterations")]
    NoConvergence { iterations: usize },

    #[error("The solver hit a singular configuration")]
    Singular,

    #[error("The native solver failed with status {0}")]
    Native(i32),
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A numeric inverse kinematics solver.
pub trait NumericIkSolver: Debug + Send + Sync {
    /// Solve the request, returning one angle in radians per link.
    fn solve(&self, request: &NumericIkRequest) -> Result<Vec<f64>, NumericIkError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Flat buffers passed to a numeric solver.
#[derive(Clone, Debug, PartialEq)]
pub struct NumericIkRequest {
    pub link_count: usize,
    pub dh_params: Vec<f64>,
    pub upper_limits: Vec<f64>,
    pub lower_limits: Vec<f64>,
    pub initial_angles: Vec<f64>,
    pub target: [f64; 16],
}

/// Signature of a native solver.
///
/// Returns zero on success, in which case `link_count` angles have been
/// written to `angles_out`.
pub type NativeIkFn = unsafe extern "C" fn(
    link_count: usize,
    dh_params: *const f64,
    upper_limits: *const f64,
    lower_limits: *const f64,
    initial_angles: *const f64,
    target: *const f64,
    angles_out: *mut f64,
) -> i32;

/// Numeric solver backed by a native function.
#[derive(Clone, Copy, Debug)]
pub struct ExternSolver {
    solve_fn: NativeIkFn,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl NumericIkRequest {
    /// Lay out a request, converting the degree valued inputs to radians.
    ///
    /// Inputs must already have been checked to have one entry per link.
    pub fn new(
        links: &[Link],
        current_angles_deg: &[f64],
        joint_limits: &[JointLimits],
        target: &Transform,
    ) -> Self {
        let dh_params = links
            .iter()
            .flat_map(|l| {
                let p = l.dh_param;
                vec![p.d, p.theta.to_radians(), p.r, p.alpha.to_radians()]
            })
            .collect();

        Self {
            link_count: links.len(),
            dh_params,
            upper_limits: joint_limits.iter().map(|l| l.maximum().to_radians()).collect(),
            lower_limits: joint_limits.iter().map(|l| l.minimum().to_radians()).collect(),
            initial_angles: current_angles_deg.iter().map(|a| a.to_radians()).collect(),
            target: target.to_row_major(),
        }
    }

    /// Check every buffer has the length implied by `link_count`.
    pub fn check_layout(&self) -> Result<(), NumericIkError> {
        let n = self.link_count;

        if self.dh_params.len() != n * DH_STRIDE
            || self.upper_limits.len() != n
            || self.lower_limits.len() != n
            || self.initial_angles.len() != n
        {
            return Err(NumericIkError::InvalidLayout(n));
        }

        Ok(())
    }

    /// The `(d, theta, r, alpha)` values of link `i`.
    pub fn dh_row(&self, i: usize) -> &[f64] {
        &self.dh_params[i * DH_STRIDE..(i + 1) * DH_STRIDE]
    }
}

impl ExternSolver {
    /// Wrap a native solver.
    ///
    /// # Safety
    ///
    /// `solve_fn` must only read the buffer lengths described in the module
    /// docs, and must write exactly `link_count` values to `angles_out`.
    pub unsafe fn new(solve_fn: NativeIkFn) -> Self {
        Self { solve_fn }
    }
}

impl NumericIkSolver for ExternSolver {
    fn solve(&self, request: &NumericIkRequest) -> Result<Vec<f64>, NumericIkError> {
        request.check_layout()?;

        let mut angles = vec![0f64; request.link_count];

        // Buffer lengths are checked above and the function contract is
        // guaranteed by the caller of `ExternSolver::new`.
        let status = unsafe {
            (self.solve_fn)(
                request.link_count,
                request.dh_params.as_ptr(),
                request.upper_limits.as_ptr(),
                request.lower_limits.as_ptr(),
                request.initial_angles.as_ptr(),
                request.target.as_ptr(),
                angles.as_mut_ptr(),
            )
        };

        match status {
            0 => Ok(angles),
            s => Err(NumericIkError::Native(s)),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
