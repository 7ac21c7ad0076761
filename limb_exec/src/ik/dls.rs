//! # Damped least squares solver
//!
//! A pure Rust [`NumericIkSolver`] for revolute chains. Each iteration takes
//! the geometric Jacobian of the chain and steps the joints by
//! `J^T (J J^T + lambda^2 I)^-1 e`, where `e` stacks the position error and
//! the orientation error of the tip.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use nalgebra::{DMatrix, DVector, Vector3};
use serde::{Deserialize, Serialize};

use super::{NumericIkError, NumericIkRequest, NumericIkSolver};
use crate::dh::DhParam;
use crate::transform::Transform;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Damped least squares solver settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DlsSolver {
    /// Iterations before giving up.
    pub max_iterations: usize,

    /// Damping factor lambda.
    pub damping: f64,

    /// Position error at which the solution is accepted, in chain length
    /// units.
    pub position_tolerance: f64,

    /// Orientation error at which the solution is accepted, in radians.
    pub orientation_tolerance: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for DlsSolver {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            damping: 0.5,
            position_tolerance: 1e-10,
            orientation_tolerance: 1e-10,
        }
    }
}

impl NumericIkSolver for DlsSolver {
    fn solve(&self, request: &NumericIkRequest) -> Result<Vec<f64>, NumericIkError> {
        request.check_layout()?;

        let n = request.link_count;
        let target = Transform::from_row_major(&request.target);
        let mut q = DVector::from_column_slice(&request.initial_angles);
        let damping_sq = self.damping * self.damping;

        for iteration in 0..self.max_iterations {
            let frames = frames(request, &q);
            let tip = &frames[n];

            let (pos_err, rot_err) = pose_error(tip, &target);

            if pos_err.norm() < self.position_tolerance && rot_err.norm() < self.orientation_tolerance
            {
                trace!("DLS converged after {} iterations", iteration);
                return Ok(q.iter().copied().collect());
            }

            let jac = jacobian(&frames);
            let err = DVector::from_iterator(6, pos_err.iter().chain(rot_err.iter()).copied());

            let jjt = &jac * jac.transpose() + DMatrix::identity(6, 6) * damping_sq;
            let w = jjt.lu().solve(&err).ok_or(NumericIkError::Singular)?;
            q += jac.transpose() * w;

            for i in 0..n {
                q[i] = q[i].max(request.lower_limits[i]).min(request.upper_limits[i]);
            }
        }

        Err(NumericIkError::NoConvergence {
            iterations: self.max_iterations,
        })
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Cumulative frames of the chain, `frames[0]` is the base and `frames[n]` the
/// tip.
fn frames(request: &NumericIkRequest, q: &DVector<f64>) -> Vec<Transform> {
    let mut frames = Vec::with_capacity(request.link_count + 1);
    let mut acc = Transform::identity();
    frames.push(acc);

    for i in 0..request.link_count {
        let row = request.dh_row(i);
        let param = DhParam::new(
            row[0],
            (row[1] + q[i]).to_degrees(),
            row[2],
            row[3].to_degrees(),
        );

        acc = acc * param.to_transform();
        frames.push(acc);
    }

    frames
}

/// Geometric Jacobian of a revolute chain.
///
/// Joint `i` rotates about the z axis of `frames[i]`.
fn jacobian(frames: &[Transform]) -> DMatrix<f64> {
    let n = frames.len() - 1;
    let tip = frames[n].translation();
    let mut jac = DMatrix::zeros(6, n);

    for i in 0..n {
        let z = frames[i].rotation_column(2);
        let lin = z.cross(&(tip - frames[i].translation()));

        for r in 0..3 {
            jac[(r, i)] = lin[r];
            jac[(r + 3, i)] = z[r];
        }
    }

    jac
}

/// Position and orientation error of `current` relative to `target`.
fn pose_error(current: &Transform, target: &Transform) -> (Vector3<f64>, Vector3<f64>) {
    let pos = target.translation() - current.translation();

    let rot = (0..3).fold(Vector3::<f64>::zeros(), |acc, c| {
        acc + current.rotation_column(c).cross(&target.rotation_column(c))
    }) * 0.5;

    (pos, rot)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::fk;
    use crate::link::{JointLimits, Link};

    fn solve_for(links: &[Link], goal: &[f64], seed: &[f64]) -> Result<Vec<f64>, NumericIkError> {
        let limits = vec![JointLimits::NO_LIMIT; links.len()];
        let target = fk::solve(links, goal).unwrap();
        let request = NumericIkRequest::new(links, seed, &limits, &target);

        DlsSolver::default().solve(&request)
    }

    #[test]
    fn test_planar_two_link() {
        let links = vec![
            Link::revolute(DhParam::new(0.0, 0.0, 10.0, 0.0)),
            Link::revolute(DhParam::new(0.0, 0.0, 10.0, 0.0)),
        ];

        let angles: Vec<f64> = solve_for(&links, &[30.0, 45.0], &[20.0, 30.0])
            .unwrap()
            .iter()
            .map(|a| a.to_degrees())
            .collect();

        assert!((angles[0] - 30.0).abs() < 1e-6, "{:?}", angles);
        assert!((angles[1] - 45.0).abs() < 1e-6, "{:?}", angles);
    }

    #[test]
    fn test_spatial_four_link() {
        let links = vec![
            Link::revolute(DhParam::new(10.0, 0.0, 0.0, 90.0)),
            Link::revolute(DhParam::new(0.0, 0.0, 20.0, 0.0)),
            Link::revolute(DhParam::new(0.0, 0.0, 15.0, -90.0)),
            Link::revolute(DhParam::new(5.0, 0.0, 0.0, 0.0)),
        ];
        let goal = [20.0, -30.0, 45.0, 10.0];

        let angles: Vec<f64> = solve_for(&links, &goal, &[15.0, -25.0, 40.0, 5.0])
            .unwrap()
            .iter()
            .map(|a| a.to_degrees())
            .collect();

        let reached = fk::solve(&links, &angles).unwrap();
        let target = fk::solve(&links, &goal).unwrap();
        assert!(reached.approx_eq(&target, 1e-6), "{}\n{}", reached, target);
    }

    #[test]
    fn test_jacobian_matches_finite_difference() {
        let links = vec![
            Link::revolute(DhParam::new(10.0, 0.0, 0.0, 90.0)),
            Link::revolute(DhParam::new(0.0, 0.0, 20.0, 0.0)),
        ];
        let limits = vec![JointLimits::NO_LIMIT; 2];
        let q = [0.3f64, -0.2];
        let request = NumericIkRequest::new(
            &links,
            &[q[0].to_degrees(), q[1].to_degrees()],
            &limits,
            &Transform::identity(),
        );

        let qv = DVector::from_column_slice(&q);
        let jac = jacobian(&frames(&request, &qv));

        let h = 1e-7;
        for i in 0..2 {
            let mut qp = qv.clone();
            qp[i] += h;
            let fp = frames(&request, &qp);
            let f0 = frames(&request, &qv);
            let dp = (fp[2].translation() - f0[2].translation()) / h;

            for r in 0..3 {
                assert!((dp[r] - jac[(r, i)]).abs() < 1e-4, "joint {} row {}", i, r);
            }
        }
    }

    #[test]
    fn test_unreachable_does_not_converge() {
        let links = vec![
            Link::revolute(DhParam::new(0.0, 0.0, 10.0, 0.0)),
            Link::revolute(DhParam::new(0.0, 0.0, 10.0, 0.0)),
        ];
        let limits = vec![JointLimits::NO_LIMIT; 2];
        let target = Transform::from_translation(50.0, 0.0, 0.0);
        let request = NumericIkRequest::new(&links, &[10.0, 10.0], &limits, &target);

        let solver = DlsSolver {
            max_iterations: 50,
            ..DlsSolver::default()
        };

        assert_eq!(
            solver.solve(&request),
            Err(NumericIkError::NoConvergence { iterations: 50 })
        );
    }
}
