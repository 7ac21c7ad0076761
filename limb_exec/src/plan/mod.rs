//! # Motion plans
//!
//! A [`LimbMotionPlan`] is an ordered list of joint angle targets, each with
//! the constraints under which the joints should move to it. Plans are run
//! by the [`MotionPlanFollower`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod follower;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

pub use follower::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Bound value meaning the quantity is not constrained.
///
/// Kept finite so that constraints survive a round trip through JSON.
pub const UNBOUNDED: f64 = f64::MAX;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PlanError {
    #[error("Step {step} has {found} joint angles but the limb has {expected} joints")]
    WrongAngleCount {
        step: usize,
        expected: usize,
        found: usize,
    },

    #[error("Step {step} has an invalid duration of {duration_ms} ms")]
    InvalidDuration { step: usize, duration_ms: f64 },

    #[error("Cannot interpolate a plan over zero steps")]
    ZeroSteps,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Constraints on how a joint approaches its target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionConstraints {
    /// Minimum time before the next step is issued, in milliseconds.
    pub motion_duration_ms: f64,

    /// Maximum joint velocity, in degrees per second.
    pub maximum_velocity: f64,

    /// Maximum joint acceleration, in degrees per second squared.
    pub maximum_acceleration: f64,

    /// Maximum joint jerk, in degrees per second cubed.
    pub maximum_jerk: f64,
}

/// One step of a plan, with a target for every joint of the limb.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LimbMotionPlanStep {
    pub joint_angles: Vec<f64>,
    pub motion_constraints: MotionConstraints,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LimbMotionPlan {
    pub steps: Vec<LimbMotionPlanStep>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotionConstraints {
    /// Constraints with only a duration and no bounds on the motion itself.
    pub fn with_duration(motion_duration_ms: f64) -> Self {
        Self {
            motion_duration_ms,
            maximum_velocity: UNBOUNDED,
            maximum_acceleration: UNBOUNDED,
            maximum_jerk: UNBOUNDED,
        }
    }
}

impl Default for MotionConstraints {
    fn default() -> Self {
        Self::with_duration(0.0)
    }
}

impl LimbMotionPlanStep {
    pub fn new(joint_angles: Vec<f64>, motion_constraints: MotionConstraints) -> Self {
        Self {
            joint_angles,
            motion_constraints,
        }
    }
}

impl LimbMotionPlan {
    pub fn new(steps: Vec<LimbMotionPlanStep>) -> Self {
        Self { steps }
    }

    /// A plan moving linearly in joint space from `from` to `to` over
    /// `num_steps` steps, each with `constraints`.
    ///
    /// The first step is one increment away from `from`, the last step is
    /// exactly `to`.
    pub fn linear(
        from: &[f64],
        to: &[f64],
        num_steps: usize,
        constraints: MotionConstraints,
    ) -> Result<Self, PlanError> {
        if num_steps == 0 {
            return Err(PlanError::ZeroSteps);
        }

        if from.len() != to.len() {
            return Err(PlanError::WrongAngleCount {
                step: 0,
                expected: from.len(),
                found: to.len(),
            });
        }

        let steps = (1..=num_steps)
            .map(|i| {
                let frac = i as f64 / num_steps as f64;
                let angles = if i == num_steps {
                    to.to_vec()
                } else {
                    from.iter()
                        .zip(to.iter())
                        .map(|(a, b)| a + (b - a) * frac)
                        .collect()
                };
                LimbMotionPlanStep::new(angles, constraints)
            })
            .collect();

        Ok(Self { steps })
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Sum of every step's duration, in milliseconds.
    pub fn total_duration_ms(&self) -> f64 {
        self.steps
            .iter()
            .map(|s| s.motion_constraints.motion_duration_ms)
            .sum()
    }

    /// Check every step has one angle per joint and a usable duration.
    ///
    /// All steps are checked, so a bad step anywhere in the plan is caught
    /// before any of it is run.
    pub fn validate(&self, num_joints: usize) -> Result<(), PlanError> {
        for (i, step) in self.steps.iter().enumerate() {
            if step.joint_angles.len() != num_joints {
                return Err(PlanError::WrongAngleCount {
                    step: i,
                    expected: num_joints,
                    found: step.joint_angles.len(),
                });
            }

            let duration_ms = step.motion_constraints.motion_duration_ms;
            if !duration_ms.is_finite() || duration_ms < 0.0 {
                return Err(PlanError::InvalidDuration { step: i, duration_ms });
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
