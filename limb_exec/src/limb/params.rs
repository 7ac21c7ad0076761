//! Limb parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;
use serde::{Deserialize, Serialize};

use crate::ctrl::ControllerParams;
use crate::dh::DhParam;
use crate::ik::DlsSolver;
use crate::link::{JointLimits, LinkError, LinkType, ServoLimits};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters describing a whole limb.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LimbParams {
    /// Identifier of the limb, also used as its log target.
    pub id: String,

    /// Links from the base to the tip.
    pub links: Vec<LinkParams>,

    #[serde(default)]
    pub follower: FollowerParams,

    /// Settings of the numeric inverse kinematics solver.
    #[serde(default)]
    pub numeric_solver: DlsSolver,
}

/// Parameters of a single link.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinkParams {
    #[serde(default = "default_link_type")]
    pub link_type: LinkType,

    /// DH parameter of the link. Angles given as exact radian right angles
    /// are converted to degrees.
    pub dh: DhParam,

    /// Limits of the joint. Takes precedence over `servo_limits`.
    #[serde(default)]
    pub joint_limits: Option<JointLimits>,

    /// Limits of the joint in servo units.
    #[serde(default)]
    pub servo_limits: Option<ServoLimits>,

    pub controller: ControllerParams,
}

/// Parameters for how the limb turns a target into a motion plan.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowerParams {
    /// Number of joint space steps a task space target is split into.
    pub interpolation_steps: usize,

    /// Motion duration used when none is given, in milliseconds.
    pub default_motion_duration_ms: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LinkParams {
    pub fn dh_param(&self) -> DhParam {
        let p = self.dh;
        DhParam::from_maybe_radians(p.d, p.theta, p.r, p.alpha)
    }

    /// The joint limits of the link.
    ///
    /// Uses `joint_limits` if given, otherwise converts `servo_limits`, and
    /// otherwise the joint is unlimited.
    pub fn resolve_limits(&self) -> Result<JointLimits, LinkError> {
        match (&self.joint_limits, &self.servo_limits) {
            (Some(limits), servo) => {
                if servo.is_some() {
                    warn!("Both joint and servo limits given, using the joint limits");
                }
                Ok(*limits)
            }
            (None, Some(servo)) => servo.to_joint_limits(),
            (None, None) => Ok(JointLimits::NO_LIMIT),
        }
    }
}

impl Default for FollowerParams {
    fn default() -> Self {
        Self {
            interpolation_steps: 1,
            default_motion_duration_ms: 1000.0,
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn default_link_type() -> LinkType {
    LinkType::Revolute
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const PARAMS: &str = r#"
        id = "arm"

        [follower]
        interpolation_steps = 4

        [[links]]
        dh = { d = 135.0, theta = 0.0, r = 0.0, alpha = -1.5707963267948966 }
        joint_limits = { minimum = -90.0, maximum = 90.0 }
        controller = { kind = "simulated" }

        [[links]]
        link_type = "revolute"
        dh = { d = 0.0, theta = 0.0, r = 175.0, alpha = 0.0 }
        servo_limits = { maximum = 180.0, minimum = 0.0, zero = 10.0, scale = -1.0 }
        controller = { kind = "simulated", settings = { initial_angle_deg = 5.0 } }

        [[links]]
        link_type = "prismatic"
        dh = { d = 0.0, theta = 90.0, r = 169.28, alpha = 0.0 }

        [links.controller]
        kind = "simulated"
    "#;

    #[test]
    fn test_load() {
        let params: LimbParams = util::params::load_str(PARAMS).unwrap();

        assert_eq!(params.id, "arm");
        assert_eq!(params.links.len(), 3);
        assert_eq!(params.follower.interpolation_steps, 4);
        assert_eq!(params.follower.default_motion_duration_ms, 1000.0);
        assert_eq!(params.numeric_solver, DlsSolver::default());

        // Radian encoded alpha is converted
        let dh = params.links[0].dh_param();
        assert_eq!(dh.d, 135.0);
        assert_eq!(dh.theta, 0.0);
        assert!((dh.alpha + 90.0).abs() < 1e-12);
        assert_eq!(params.links[0].link_type, LinkType::Revolute);
        assert_eq!(
            params.links[0].resolve_limits(),
            JointLimits::new(-90.0, 90.0)
        );

        assert_eq!(
            params.links[1].resolve_limits(),
            JointLimits::new(-10.0, 170.0)
        );
        assert_eq!(params.links[1].controller.setting_or("initial_angle_deg", 0.0), 5.0);

        assert_eq!(params.links[2].link_type, LinkType::Prismatic);
        assert_eq!(params.links[2].resolve_limits(), Ok(JointLimits::NO_LIMIT));
    }
}
