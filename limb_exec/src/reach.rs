//! # Reachability checks
//!
//! Quick tests of whether a target transform can be reached by a limb before
//! committing to a motion.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;

use crate::fk;
use crate::ik::IkDispatcher;
use crate::link::Link;
use crate::transform::Transform;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

pub trait ReachabilityCalculator {
    fn is_reachable(&self, target: &Transform, links: &[Link]) -> bool;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Reachable if the target is no further from the base than the tip is with
/// every joint at zero.
///
/// This is a necessary condition only, and assumes the home pose is the limb
/// fully stretched out.
#[derive(Clone, Copy, Debug, Default)]
pub struct LengthReachability;

/// Reachable if the length check passes and inverse kinematics finds a
/// solution from the home pose.
#[derive(Clone, Debug)]
pub struct LengthAndIkReachability {
    ik: IkDispatcher,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ReachabilityCalculator for LengthReachability {
    fn is_reachable(&self, target: &Transform, links: &[Link]) -> bool {
        target.translation_length() <= fk::home(links).translation_length()
    }
}

impl LengthAndIkReachability {
    pub fn new(ik: IkDispatcher) -> Self {
        Self { ik }
    }
}

impl ReachabilityCalculator for LengthAndIkReachability {
    fn is_reachable(&self, target: &Transform, links: &[Link]) -> bool {
        if !LengthReachability.is_reachable(target, links) {
            return false;
        }

        let seed = vec![0.0; links.len()];
        let limits: Vec<_> = links.iter().map(|l| l.joint_limits).collect();

        match self.ik.solve(links, &seed, &limits, target) {
            Ok(_) => true,
            Err(e) => {
                debug!("Target passes the length check but IK failed: {}", e);
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
