//! # Inverse kinematics
//!
//! The [`IkDispatcher`] picks a strategy once, from the shape of the chain it
//! is built for:
//!
//! - Chains of exactly three links use the closed form solver in
//!   [`three_dof`].
//! - Every other chain is handed to a [`NumericIkSolver`], which works in
//!   radians over flat buffers. Degrees are converted on the way in and on the
//!   way out.
//!
//! The three link rule only looks at the link count. A three link chain that
//! is not an arm of the supported shape is rejected with
//! [`IkError::UnsupportedChain`] rather than being passed on to the numeric
//! solver.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod dls;
mod numeric;
pub mod three_dof;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::link::{JointLimits, Link, LinkType};
use crate::transform::Transform;

pub use dls::*;
pub use numeric::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of links handled by the closed form solver.
pub const THREE_DOF_LINKS: usize = 3;

/// Solutions this far outside a limit are pulled back onto it instead of
/// being rejected.
pub const LIMIT_TOLERANCE_DEG: f64 = 1e-6;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors that can occur while solving inverse kinematics.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum IkError {
    #[error(
        "Expected matching non-empty inputs, found {links} links, {angles} joint angles and \
        {limits} joint limits"
    )]
    DimensionMismatch {
        links: usize,
        angles: usize,
        limits: usize,
    },

    #[error("The solver was built for {expected} links but was given {found}")]
    LinkCountChanged { expected: usize, found: usize },

    #[error("No solution within the joint limits: {0}")]
    Unreachable(String),

    #[error("The chain is not supported by this solver: {0}")]
    UnsupportedChain(String),
}

/// Strategy used by the dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IkStrategy {
    /// Closed form geometric solution for three link arms.
    ThreeDof,

    /// External numeric solver.
    Numeric,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Routes inverse kinematics requests for one chain to the right solver.
#[derive(Clone, Debug)]
pub struct IkDispatcher {
    strategy: IkStrategy,
    link_count: usize,
    numeric: Arc<dyn NumericIkSolver>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl IkStrategy {
    /// Strategy used for a chain with the given number of links.
    pub fn for_link_count(link_count: usize) -> Self {
        match link_count {
            THREE_DOF_LINKS => IkStrategy::ThreeDof,
            _ => IkStrategy::Numeric,
        }
    }
}

impl IkDispatcher {
    /// Create a new dispatcher for the given chain.
    pub fn new(links: &[Link], numeric: Arc<dyn NumericIkSolver>) -> Self {
        let strategy = IkStrategy::for_link_count(links.len());

        debug!(
            "IK for {} link chain will use the {:?} strategy",
            links.len(),
            strategy
        );

        Self {
            strategy,
            link_count: links.len(),
            numeric,
        }
    }

    pub fn strategy(&self) -> IkStrategy {
        self.strategy
    }

    /// Find joint angles, in degrees, that place the tip of the chain at
    /// `target`.
    ///
    /// When more than one solution exists the one closest to `current_angles`
    /// is returned. Every returned angle is within its joint limits.
    pub fn solve(
        &self,
        links: &[Link],
        current_angles: &[f64],
        joint_limits: &[JointLimits],
        target: &Transform,
    ) -> Result<Vec<f64>, IkError> {
        if links.is_empty()
            || links.len() != current_angles.len()
            || links.len() != joint_limits.len()
        {
            return Err(IkError::DimensionMismatch {
                links: links.len(),
                angles: current_angles.len(),
                limits: joint_limits.len(),
            });
        }

        if links.len() != self.link_count {
            return Err(IkError::LinkCountChanged {
                expected: self.link_count,
                found: links.len(),
            });
        }

        trace!(
            "Solving IK ({:?}) for target at {:?}",
            self.strategy,
            target.translation().as_slice()
        );

        match self.strategy {
            IkStrategy::ThreeDof => three_dof::solve(links, current_angles, joint_limits, target),
            IkStrategy::Numeric => self.solve_numeric(links, current_angles, joint_limits, target),
        }
    }

    fn solve_numeric(
        &self,
        links: &[Link],
        current_angles: &[f64],
        joint_limits: &[JointLimits],
        target: &Transform,
    ) -> Result<Vec<f64>, IkError> {
        if let Some(i) = links.iter().position(|l| l.link_type != LinkType::Revolute) {
            return Err(IkError::UnsupportedChain(format!(
                "link {} is not revolute, the numeric solver only drives revolute joints",
                i
            )));
        }

        let request = NumericIkRequest::new(links, current_angles, joint_limits, target);

        let angles_rad = self
            .numeric
            .solve(&request)
            .map_err(|e| IkError::Unreachable(e.to_string()))?;

        if angles_rad.len() != links.len() {
            return Err(IkError::Unreachable(format!(
                "numeric solver returned {} angles for {} links",
                angles_rad.len(),
                links.len()
            )));
        }

        angles_rad
            .iter()
            .zip(joint_limits.iter())
            .enumerate()
            .map(|(i, (angle, limits))| {
                let deg = angle.to_degrees();
                fit_to_limits(deg, limits, LinkType::Revolute).ok_or_else(|| {
                    IkError::Unreachable(format!(
                        "joint {} solution {:.3} is outside [{}, {}]",
                        i,
                        deg,
                        limits.minimum(),
                        limits.maximum()
                    ))
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Bring a joint value within its limits, if there is an equivalent value
/// that is.
///
/// Revolute joints may be shifted by whole turns. Values within
/// [`LIMIT_TOLERANCE_DEG`] of a limit are clipped onto it. Returns `None` if
/// no equivalent value is within the limits.
pub fn fit_to_limits(value: f64, limits: &JointLimits, link_type: LinkType) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }

    let mut candidate = value;

    if link_type == LinkType::Revolute && !limits.contains(value) && limits.minimum().is_finite() {
        // Smallest equivalent angle above the minimum
        let turns = ((limits.minimum() - value) / 360.0).ceil();
        candidate = value + turns * 360.0;

        // Being just under the minimum may be better than a full turn over
        if candidate - 360.0 >= limits.minimum() - LIMIT_TOLERANCE_DEG {
            candidate -= 360.0;
        }
    } else if link_type == LinkType::Revolute && !limits.contains(value) {
        let turns = ((value - limits.maximum()) / 360.0).ceil();
        candidate = value - turns * 360.0;
    }

    if candidate < limits.minimum() - LIMIT_TOLERANCE_DEG
        || candidate > limits.maximum() + LIMIT_TOLERANCE_DEG
    {
        return None;
    }

    Some(limits.clamp(candidate))
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::dh::DhParam;
    use crate::fk;

    /// Numeric solver that always fails.
    #[derive(Debug)]
    struct FailingSolver;

    impl NumericIkSolver for FailingSolver {
        fn solve(&self, _request: &NumericIkRequest) -> Result<Vec<f64>, NumericIkError> {
            Err(NumericIkError::NoConvergence { iterations: 0 })
        }
    }

    fn planar(n: usize) -> Vec<Link> {
        (0..n)
            .map(|_| Link::revolute(DhParam::new(0.0, 0.0, 10.0, 0.0)))
            .collect()
    }

    #[test]
    fn test_strategy_selection() {
        let solver: Arc<dyn NumericIkSolver> = Arc::new(DlsSolver::default());

        assert_eq!(
            IkDispatcher::new(&planar(3), solver.clone()).strategy(),
            IkStrategy::ThreeDof
        );
        for n in &[1, 2, 4, 6] {
            assert_eq!(
                IkDispatcher::new(&planar(*n), solver.clone()).strategy(),
                IkStrategy::Numeric
            );
        }
    }

    #[test]
    fn test_dimension_checks() {
        let links = planar(2);
        let ik = IkDispatcher::new(&links, Arc::new(DlsSolver::default()));
        let target = Transform::identity();

        assert_eq!(
            ik.solve(&links, &[0.0], &[JointLimits::NO_LIMIT; 2], &target),
            Err(IkError::DimensionMismatch {
                links: 2,
                angles: 1,
                limits: 2
            })
        );
        assert_eq!(
            ik.solve(&links, &[0.0; 2], &[JointLimits::NO_LIMIT; 3], &target),
            Err(IkError::DimensionMismatch {
                links: 2,
                angles: 2,
                limits: 3
            })
        );
        assert!(matches!(
            ik.solve(&[], &[], &[], &target),
            Err(IkError::DimensionMismatch { .. })
        ));

        let longer = planar(4);
        assert_eq!(
            ik.solve(&longer, &[0.0; 4], &[JointLimits::NO_LIMIT; 4], &target),
            Err(IkError::LinkCountChanged {
                expected: 2,
                found: 4
            })
        );
    }

    #[test]
    fn test_numeric_failure_is_unreachable() {
        let links = planar(2);
        let ik = IkDispatcher::new(&links, Arc::new(FailingSolver));

        let target = fk::solve(&links, &[10.0, 20.0]).unwrap();
        assert!(matches!(
            ik.solve(&links, &[0.0; 2], &[JointLimits::NO_LIMIT; 2], &target),
            Err(IkError::Unreachable(_))
        ));
    }

    #[test]
    fn test_numeric_path() {
        let links = planar(2);
        let ik = IkDispatcher::new(&links, Arc::new(DlsSolver::default()));
        let limits = [JointLimits::NO_LIMIT; 2];

        let target = fk::solve(&links, &[30.0, 45.0]).unwrap();
        let angles = ik.solve(&links, &[20.0, 30.0], &limits, &target).unwrap();

        assert!(fk::solve(&links, &angles).unwrap().approx_eq(&target, 1e-6));
        assert!((angles[0] - 30.0).abs() < 1e-4, "{:?}", angles);
        assert!((angles[1] - 45.0).abs() < 1e-4, "{:?}", angles);
    }

    #[test]
    fn test_numeric_rejects_prismatic() {
        let mut links = planar(2);
        links[1].link_type = LinkType::Prismatic;
        let ik = IkDispatcher::new(&links, Arc::new(DlsSolver::default()));

        assert!(matches!(
            ik.solve(
                &links,
                &[0.0; 2],
                &[JointLimits::NO_LIMIT; 2],
                &Transform::identity()
            ),
            Err(IkError::UnsupportedChain(_))
        ));
    }

    #[test]
    fn test_fit_to_limits() {
        let limits = JointLimits::new(-90.0, 90.0).unwrap();

        assert_eq!(fit_to_limits(45.0, &limits, LinkType::Revolute), Some(45.0));
        assert_eq!(fit_to_limits(405.0, &limits, LinkType::Revolute), Some(45.0));
        assert_eq!(fit_to_limits(-315.0, &limits, LinkType::Revolute), Some(45.0));
        assert_eq!(fit_to_limits(180.0, &limits, LinkType::Revolute), None);
        assert_eq!(
            fit_to_limits(90.0 + 1e-9, &limits, LinkType::Revolute),
            Some(90.0)
        );
        assert_eq!(fit_to_limits(405.0, &limits, LinkType::Prismatic), None);
        assert_eq!(fit_to_limits(f64::NAN, &limits, LinkType::Revolute), None);

        let wide = JointLimits::new(0.0, 360.0).unwrap();
        assert_eq!(fit_to_limits(-90.0, &wide, LinkType::Revolute), Some(270.0));

        let upper_only = JointLimits::new(f64::NEG_INFINITY, 10.0).unwrap();
        assert_eq!(
            fit_to_limits(370.0, &upper_only, LinkType::Revolute),
            Some(10.0)
        );
    }
}
