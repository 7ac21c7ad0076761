//! # Closed form three link solver
//!
//! Geometric inverse kinematics for a waist, shoulder and elbow arm. Only the
//! position of the tip is solved for, a three link arm cannot also set its
//! orientation.
//!
//! The supported shape is:
//!
//! - Link 0 is the waist, with `alpha = +/-90` so that the next joint axis is
//!   horizontal.
//! - Link 1 is the upper arm, with `alpha = 0` so that the elbow axis is
//!   parallel to the shoulder axis, and `r > 0`.
//! - Link 2 is the forearm with `r > 0`. Its alpha only changes the tip
//!   orientation.
//!
//! Any `d` offsets on links 1 and 2 shift the arm plane sideways from the
//! waist axis.
//!
//! Up to four candidates exist: the arm can reach forwards or back over the
//! waist, each with the elbow up or down. Candidates outside the joint limits
//! are dropped and the one closest to the current angles is chosen.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;

use super::{fit_to_limits, IkError, THREE_DOF_LINKS};
use crate::link::{JointLimits, Link, LinkType};
use crate::transform::Transform;
use util::maths::wrap_deg;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance on the alpha values describing the supported shape.
const SHAPE_EPSILON: f64 = 1e-9;

/// How far outside `[-1, 1]` the elbow cosine may be before the target is
/// considered out of reach. Covers rounding at full extension.
const REACH_EPSILON: f64 = 1e-9;

/// Horizontal distance under which the target is taken to be on the waist
/// axis.
const AXIS_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Geometry of a supported arm, pulled out of its links.
#[derive(Clone, Copy, Debug)]
struct ArmGeometry {
    /// Sign of the waist alpha.
    sign: f64,

    /// Waist height.
    d0: f64,

    /// Waist reach.
    r0: f64,

    /// Upper arm length.
    l1: f64,

    /// Forearm length.
    l2: f64,

    /// Sideways offset of the arm plane.
    lateral: f64,

    /// Theta offset of each link.
    theta: [f64; THREE_DOF_LINKS],
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Solve for the joint angles placing the tip of the arm at the position of
/// `target`.
///
/// `current_angles` and `joint_limits` are expected to have one entry per
/// link, see [`super::IkDispatcher::solve`].
pub fn solve(
    links: &[Link],
    current_angles: &[f64],
    joint_limits: &[JointLimits],
    target: &Transform,
) -> Result<Vec<f64>, IkError> {
    let geom = ArmGeometry::from_links(links)?;

    let current_waist = current_angles.first().copied().unwrap_or(0.0);
    let candidates = geom.candidates(target, current_waist);
    trace!("{} raw IK candidates", candidates.len());

    if candidates.is_empty() {
        return Err(IkError::Unreachable(format!(
            "target at {:?} is out of the arm's reach",
            target.translation().as_slice()
        )));
    }

    candidates
        .iter()
        .filter_map(|c| {
            c.iter()
                .zip(joint_limits.iter())
                .map(|(angle, limits)| fit_to_limits(*angle, limits, LinkType::Revolute))
                .collect::<Option<Vec<f64>>>()
        })
        .map(|c| (distance(&c, current_angles), c))
        .min_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(_, c)| c)
        .ok_or_else(|| {
            IkError::Unreachable(format!(
                "none of the {} solutions are within the joint limits",
                candidates.len()
            ))
        })
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArmGeometry {
    fn from_links(links: &[Link]) -> Result<Self, IkError> {
        if links.len() != THREE_DOF_LINKS {
            return Err(IkError::UnsupportedChain(format!(
                "expected {} links, found {}",
                THREE_DOF_LINKS,
                links.len()
            )));
        }

        if let Some(i) = links.iter().position(|l| l.link_type != LinkType::Revolute) {
            return Err(IkError::UnsupportedChain(format!("link {} is not revolute", i)));
        }

        let p0 = links[0].dh_param;
        let p1 = links[1].dh_param;
        let p2 = links[2].dh_param;

        if (p0.alpha.abs() - 90.0).abs() > SHAPE_EPSILON {
            return Err(IkError::UnsupportedChain(format!(
                "waist alpha must be +/-90, found {}",
                p0.alpha
            )));
        }

        if p1.alpha.abs() > SHAPE_EPSILON {
            return Err(IkError::UnsupportedChain(format!(
                "upper arm alpha must be 0, found {}",
                p1.alpha
            )));
        }

        if p1.r <= 0.0 || p2.r <= 0.0 {
            return Err(IkError::UnsupportedChain(format!(
                "upper arm and forearm need positive lengths, found {} and {}",
                p1.r, p2.r
            )));
        }

        let sign = p0.alpha.signum();

        Ok(Self {
            sign,
            d0: p0.d,
            r0: p0.r,
            l1: p1.r,
            l2: p2.r,
            lateral: sign * (p1.d + p2.d),
            theta: [p0.theta, p1.theta, p2.theta],
        })
    }

    /// Every joint solution reaching the target position, wrapped into
    /// `[-180, 180)`.
    fn candidates(&self, target: &Transform, current_waist: f64) -> Vec<[f64; THREE_DOF_LINKS]> {
        let x = target.translation_x();
        let y = target.translation_y();
        let z = target.translation_z();

        let planar_sq = x * x + y * y;
        let lateral_sq = self.lateral * self.lateral;

        if planar_sq < lateral_sq - REACH_EPSILON {
            return Vec::new();
        }

        let rho = (planar_sq - lateral_sq).max(0.0).sqrt();

        // On the waist axis any heading works, so keep the current one
        let heading = if planar_sq.sqrt() < AXIS_EPSILON {
            None
        } else {
            Some(y.atan2(x))
        };

        let mut solutions = Vec::with_capacity(4);

        for reach in &[rho, -rho] {
            let phi0 = match heading {
                Some(h) => (h + self.lateral.atan2(*reach)).to_degrees(),
                None => current_waist + self.theta[0],
            };

            let u = reach - self.r0;
            let v = self.sign * (z - self.d0);

            for (phi1, phi2) in self.planar(u, v) {
                solutions.push([
                    wrap_deg(phi0 - self.theta[0]),
                    wrap_deg(phi1 - self.theta[1]),
                    wrap_deg(phi2 - self.theta[2]),
                ]);
            }

            // Both reaches give the same solutions
            if rho == 0.0 {
                break;
            }
        }

        solutions
    }

    /// Two link planar solutions reaching `(u, v)` from the shoulder, as
    /// `(shoulder, elbow)` angles in degrees.
    fn planar(&self, u: f64, v: f64) -> Vec<(f64, f64)> {
        let cos_elbow =
            (u * u + v * v - self.l1 * self.l1 - self.l2 * self.l2) / (2.0 * self.l1 * self.l2);

        if cos_elbow.abs() > 1.0 + REACH_EPSILON {
            return Vec::new();
        }

        let elbow = cos_elbow.max(-1.0).min(1.0).acos();

        let mut out = Vec::with_capacity(2);
        for phi2 in &[elbow, -elbow] {
            let phi1 = v.atan2(u) - (self.l2 * phi2.sin()).atan2(self.l1 + self.l2 * phi2.cos());
            out.push((phi1.to_degrees(), phi2.to_degrees()));

            if elbow == 0.0 {
                break;
            }
        }

        out
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Distance between two joint configurations, taking the shortest way round
/// each joint.
fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| wrap_deg(x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::dh::DhParam;
    use crate::fk;

    fn sea_arm() -> Vec<Link> {
        vec![
            Link::revolute(DhParam::new(135.0, 0.0, 0.0, -90.0)),
            Link::revolute(DhParam::new(0.0, 0.0, 175.0, 0.0)),
            Link::revolute(DhParam::new(0.0, 90.0, 169.28, 0.0)),
        ]
    }

    fn offset_arm() -> Vec<Link> {
        vec![
            Link::revolute(DhParam::new(50.0, 10.0, 20.0, 90.0)),
            Link::revolute(DhParam::new(15.0, -20.0, 100.0, 0.0)),
            Link::revolute(DhParam::new(5.0, 30.0, 80.0, 90.0)),
        ]
    }

    fn check_round_trip(links: &[Link]) {
        let limits = [JointLimits::NO_LIMIT; 3];

        for q0 in &[-135.0, -45.0, 0.0, 30.0, 120.0] {
            for q1 in &[-30.0, 10.0, 45.0] {
                for q2 in &[-60.0, 30.0] {
                    let q = [*q0, *q1, *q2];
                    let target = fk::solve(links, &q).unwrap();

                    // Seeded with the answer, the answer comes back
                    let angles = solve(links, &q, &limits, &target).unwrap();
                    for i in 0..3 {
                        assert!(
                            wrap_deg(angles[i] - q[i]).abs() < 1e-6,
                            "q = {:?}, solved = {:?}",
                            q,
                            angles
                        );
                    }

                    // From zero, some solution reaching the target comes back
                    let angles = solve(links, &[0.0; 3], &limits, &target).unwrap();
                    let reached = fk::solve(links, &angles).unwrap();
                    assert!(
                        (reached.translation() - target.translation()).norm() < 1e-8,
                        "q = {:?}, solved = {:?}",
                        q,
                        angles
                    );
                }
            }
        }
    }

    #[test]
    fn test_sea_arm_round_trip() {
        check_round_trip(&sea_arm());
    }

    #[test]
    fn test_offset_arm_round_trip() {
        check_round_trip(&offset_arm());
    }

    #[test]
    fn test_out_of_reach() {
        let links = sea_arm();
        let target = Transform::from_translation(1000.0, 0.0, 135.0);

        assert!(matches!(
            solve(&links, &[0.0; 3], &[JointLimits::NO_LIMIT; 3], &target),
            Err(IkError::Unreachable(_))
        ));
    }

    #[test]
    fn test_limits_pick_other_solution() {
        let links = sea_arm();
        let q = [30.0, 45.0, -60.0];
        let target = fk::solve(&links, &q).unwrap();

        // Forbid the exact solution's elbow, so the flipped elbow must be
        // used instead
        let limits = [
            JointLimits::NO_LIMIT,
            JointLimits::NO_LIMIT,
            JointLimits::new(-180.0, -90.0).unwrap(),
        ];

        let angles = solve(&links, &q, &limits, &target).unwrap();
        assert!(limits[2].contains(angles[2]));

        let reached = fk::solve(&links, &angles).unwrap();
        assert!((reached.translation() - target.translation()).norm() < 1e-8);
    }

    #[test]
    fn test_limits_exclude_everything() {
        let links = sea_arm();
        let target = fk::solve(&links, &[30.0, 45.0, -60.0]).unwrap();
        let limits = [JointLimits::new(170.0, 175.0).unwrap(); 3];

        assert!(matches!(
            solve(&links, &[0.0; 3], &limits, &target),
            Err(IkError::Unreachable(_))
        ));
    }

    #[test]
    fn test_unsupported_shape() {
        let mut links = sea_arm();
        links[1].dh_param.alpha = 90.0;

        assert!(matches!(
            solve(
                &links,
                &[0.0; 3],
                &[JointLimits::NO_LIMIT; 3],
                &Transform::identity()
            ),
            Err(IkError::UnsupportedChain(_))
        ));

        let mut links = sea_arm();
        links[0].dh_param.alpha = 0.0;
        assert!(matches!(
            ArmGeometry::from_links(&links),
            Err(IkError::UnsupportedChain(_))
        ));
    }

    #[test]
    fn test_target_on_waist_axis() {
        let links = sea_arm();
        // Arm pointing straight up
        let q = [25.0, -90.0, -90.0];
        let target = fk::solve(&links, &q).unwrap();
        assert!(target.translation_planar().norm() < 1e-9);

        let angles = solve(&links, &q, &[JointLimits::NO_LIMIT; 3], &target).unwrap();
        assert!((angles[0] - 25.0).abs() < 1e-6, "{:?}", angles);

        let reached = fk::solve(&links, &angles).unwrap();
        assert!((reached.translation() - target.translation()).norm() < 1e-8);
    }
}
