//! # Limb
//!
//! A [`Limb`] brings together a chain of links, one joint controller per link,
//! the kinematics solvers for the chain and the follower that runs motion
//! plans on the controllers.
//!
//! The limb's configuration is fixed at construction. Joint targets only ever
//! reach the controllers through the follower.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info};
use std::sync::Arc;

use crate::ctrl::{ControllerRegistry, JointAngleController, RegistryError};
use crate::fk::{self, FkError};
use crate::ik::{IkDispatcher, IkError, IkStrategy, NumericIkSolver};
use crate::link::{
    InertialState, InertialStateEstimator, JointLimits, Link, LinkError,
    NoopInertialStateEstimator,
};
use crate::plan::{
    FollowerError, FollowerState, LimbMotionPlan, LimbMotionPlanStep, MotionConstraints,
    MotionPlanFollower, PlanError,
};
use crate::reach::{LengthAndIkReachability, ReachabilityCalculator};
use crate::transform::Transform;

pub use params::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LimbError {
    #[error("A limb needs at least one link")]
    NoLinks,

    #[error("Expected one controller per link, found {links} links and {controllers} controllers")]
    DimensionMismatch { links: usize, controllers: usize },

    #[error("Joint index {index} is out of range for a limb of {joints} joints")]
    JointIndexOutOfRange { index: usize, joints: usize },

    #[error("Invalid parameters for link {link}: {error}")]
    LinkError { link: usize, error: LinkError },

    #[error("Cannot build the controller for link {link}: {error}")]
    RegistryError { link: usize, error: RegistryError },

    #[error("Forward kinematics error: {0}")]
    FkError(FkError),

    #[error("Inverse kinematics error: {0}")]
    IkError(IkError),

    #[error("Motion plan error: {0}")]
    PlanError(PlanError),

    #[error("Follower error: {0}")]
    FollowerError(FollowerError),
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Limb {
    id: String,

    links: Vec<Link>,

    ik: IkDispatcher,

    reachability: LengthAndIkReachability,

    follower: MotionPlanFollower,

    inertial_state_estimator: Arc<dyn InertialStateEstimator>,

    follower_params: FollowerParams,

    /// Task space target the limb was last sent to.
    desired: Transform,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Limb {
    /// Create a new limb.
    pub fn new(
        id: &str,
        links: Vec<Link>,
        controllers: Vec<Arc<dyn JointAngleController>>,
        numeric_solver: Arc<dyn NumericIkSolver>,
        follower_params: FollowerParams,
    ) -> Result<Self, LimbError> {
        if links.is_empty() {
            return Err(LimbError::NoLinks);
        }

        if links.len() != controllers.len() {
            return Err(LimbError::DimensionMismatch {
                links: links.len(),
                controllers: controllers.len(),
            });
        }

        let ik = IkDispatcher::new(&links, numeric_solver);
        let reachability = LengthAndIkReachability::new(ik.clone());

        let current: Vec<f64> = controllers.iter().map(|c| c.current_angle()).collect();
        let desired = fk::solve(&links, &current)?;

        info!(
            target: id,
            "Limb created with {} links, IK strategy {:?}",
            links.len(),
            ik.strategy()
        );

        Ok(Self {
            id: id.into(),
            links,
            ik,
            reachability,
            follower: MotionPlanFollower::new(id, controllers),
            inertial_state_estimator: Arc::new(NoopInertialStateEstimator),
            follower_params,
            desired,
        })
    }

    /// Create a limb from its parameters, building controllers from the
    /// registry.
    pub fn from_params(
        params: &LimbParams,
        registry: &ControllerRegistry,
    ) -> Result<Self, LimbError> {
        let mut links = Vec::with_capacity(params.links.len());
        let mut controllers = Vec::with_capacity(params.links.len());

        for (i, lp) in params.links.iter().enumerate() {
            let limits = lp
                .resolve_limits()
                .map_err(|error| LimbError::LinkError { link: i, error })?;

            links.push(Link::new(lp.link_type, lp.dh_param(), limits));

            controllers.push(
                registry
                    .build(&lp.controller)
                    .map_err(|error| LimbError::RegistryError { link: i, error })?,
            );

            debug!(
                target: params.id.as_str(),
                "Link {}: {:?} {:?}, limits [{}, {}]",
                i,
                lp.link_type,
                lp.dh_param(),
                limits.minimum(),
                limits.maximum()
            );
        }

        Self::new(
            &params.id,
            links,
            controllers,
            Arc::new(params.numeric_solver),
            params.follower,
        )
    }

    /// Replace the estimator of the limb's inertial state.
    pub fn with_inertial_state_estimator(
        mut self,
        estimator: Arc<dyn InertialStateEstimator>,
    ) -> Self {
        self.inertial_state_estimator = estimator;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn num_joints(&self) -> usize {
        self.links.len()
    }

    pub fn joint_limits(&self) -> Vec<JointLimits> {
        self.links.iter().map(|l| l.joint_limits).collect()
    }

    pub fn ik_strategy(&self) -> IkStrategy {
        self.ik.strategy()
    }

    /// Current angle of every joint, as reported by the controllers.
    pub fn current_joint_angles(&self) -> Vec<f64> {
        self.follower
            .controllers()
            .iter()
            .map(|c| c.current_angle())
            .collect()
    }

    /// Transform of the tip with the joints at their current angles.
    pub fn current_task_space_transform(&self) -> Result<Transform, LimbError> {
        Ok(fk::solve(&self.links, &self.current_joint_angles())?)
    }

    /// Transform of the tip at the end of the last commanded motion.
    pub fn desired_task_space_transform(&self) -> Transform {
        self.desired
    }

    /// Solve for the joint angles reaching `target` and move the limb there.
    ///
    /// The move is split into the configured number of joint space steps,
    /// sharing the duration given by `constraints`. Returns the target joint
    /// angles.
    pub fn set_desired_task_space_transform(
        &mut self,
        target: &Transform,
        constraints: MotionConstraints,
    ) -> Result<Vec<f64>, LimbError> {
        let current = self.current_joint_angles();
        let angles = self
            .ik
            .solve(&self.links, &current, &self.joint_limits(), target)?;

        let num_steps = self.follower_params.interpolation_steps.max(1);
        let mut step_constraints = constraints;
        step_constraints.motion_duration_ms = constraints.motion_duration_ms / num_steps as f64;

        let plan = LimbMotionPlan::linear(&current, &angles, num_steps, step_constraints)?;
        self.follow_plan(plan)?;

        Ok(angles)
    }

    /// Move a single joint, keeping the others at their current angles.
    pub fn set_desired_joint_angle(
        &mut self,
        index: usize,
        angle: f64,
        constraints: MotionConstraints,
    ) -> Result<(), LimbError> {
        if index >= self.links.len() {
            return Err(LimbError::JointIndexOutOfRange {
                index,
                joints: self.links.len(),
            });
        }

        let mut angles = self.current_joint_angles();
        angles[index] = angle;

        self.follow_plan(LimbMotionPlan::new(vec![LimbMotionPlanStep::new(
            angles,
            constraints,
        )]))
    }

    /// Start following a plan, replacing any plan already running.
    pub fn follow_plan(&mut self, plan: LimbMotionPlan) -> Result<(), LimbError> {
        let final_angles = plan.steps.last().map(|s| s.joint_angles.clone());

        self.follower.follow_plan(plan)?;

        if let Some(angles) = final_angles {
            self.desired = fk::solve(&self.links, &angles)?;
        }

        Ok(())
    }

    /// Block until the current plan has finished.
    pub fn wait(&mut self) -> Result<FollowerState, LimbError> {
        Ok(self.follower.wait()?)
    }

    /// Stop the current plan.
    pub fn stop(&mut self) -> Result<FollowerState, LimbError> {
        Ok(self.follower.stop()?)
    }

    pub fn follower_state(&self) -> Result<FollowerState, LimbError> {
        Ok(self.follower.state()?)
    }

    pub fn inertial_state(&self) -> InertialState {
        self.inertial_state_estimator.inertial_state()
    }

    /// Whether `target` passes the length check and has an IK solution.
    pub fn is_reachable(&self, target: &Transform) -> bool {
        self.reachability.is_reachable(target, &self.links)
    }
}

impl From<FkError> for LimbError {
    fn from(e: FkError) -> Self {
        Self::FkError(e)
    }
}

impl From<IkError> for LimbError {
    fn from(e: IkError) -> Self {
        Self::IkError(e)
    }
}

impl From<PlanError> for LimbError {
    fn from(e: PlanError) -> Self {
        Self::PlanError(e)
    }
}

impl From<FollowerError> for LimbError {
    fn from(e: FollowerError) -> Self {
        Self::FollowerError(e)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::ctrl::SimJointController;
    use crate::dh::DhParam;
    use crate::ik::DlsSolver;

    fn sea_arm() -> Vec<Link> {
        vec![
            Link::revolute(DhParam::new(135.0, 0.0, 0.0, -90.0)),
            Link::revolute(DhParam::new(0.0, 0.0, 175.0, 0.0)),
            Link::revolute(DhParam::new(0.0, 90.0, 169.28, 0.0)),
        ]
    }

    fn limb(links: Vec<Link>) -> Limb {
        let controllers = links
            .iter()
            .map(|_| Arc::new(SimJointController::new(0.0)) as Arc<dyn JointAngleController>)
            .collect();

        Limb::new(
            "test_limb",
            links,
            controllers,
            Arc::new(DlsSolver::default()),
            FollowerParams {
                interpolation_steps: 3,
                default_motion_duration_ms: 10.0,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_new_checks_dimensions() {
        let links = sea_arm();

        assert!(matches!(
            Limb::new(
                "bad",
                links,
                vec![Arc::new(SimJointController::new(0.0))],
                Arc::new(DlsSolver::default()),
                FollowerParams::default()
            ),
            Err(LimbError::DimensionMismatch {
                links: 3,
                controllers: 1
            })
        ));

        assert!(matches!(
            Limb::new(
                "empty",
                vec![],
                vec![],
                Arc::new(DlsSolver::default()),
                FollowerParams::default()
            ),
            Err(LimbError::NoLinks)
        ));
    }

    #[test]
    fn test_home_transform() {
        let l = limb(sea_arm());

        assert_eq!(l.ik_strategy(), IkStrategy::ThreeDof);
        assert_eq!(l.current_joint_angles(), vec![0.0; 3]);
        assert!(l
            .current_task_space_transform()
            .unwrap()
            .approx_eq(&fk::home(&sea_arm()), 1e-12));
        assert_eq!(
            l.desired_task_space_transform(),
            l.current_task_space_transform().unwrap()
        );
    }

    #[test]
    fn test_set_desired_task_space_transform() {
        let mut l = limb(sea_arm());
        let goal = [20.0, 30.0, -45.0];
        let target = fk::solve(&sea_arm(), &goal).unwrap();

        let angles = l
            .set_desired_task_space_transform(&target, MotionConstraints::with_duration(30.0))
            .unwrap();
        assert_eq!(l.wait().unwrap(), FollowerState::Settled);

        let reached = l.current_task_space_transform().unwrap();
        assert!((reached.translation() - target.translation()).norm() < 1e-8);
        assert_eq!(l.current_joint_angles(), angles);
        assert!((l.desired_task_space_transform().translation() - target.translation()).norm() < 1e-8);
    }

    #[test]
    fn test_unreachable_target_moves_nothing() {
        let mut l = limb(sea_arm());
        let target = Transform::from_translation(5000.0, 0.0, 0.0);

        assert!(!l.is_reachable(&target));
        assert!(matches!(
            l.set_desired_task_space_transform(&target, MotionConstraints::default()),
            Err(LimbError::IkError(IkError::Unreachable(_)))
        ));
        assert_eq!(l.follower_state().unwrap(), FollowerState::Idle);
    }

    #[test]
    fn test_set_desired_joint_angle() {
        let mut l = limb(sea_arm());

        l.set_desired_joint_angle(1, 25.0, MotionConstraints::with_duration(1.0))
            .unwrap();
        assert_eq!(l.wait().unwrap(), FollowerState::Settled);
        assert_eq!(l.current_joint_angles(), vec![0.0, 25.0, 0.0]);

        assert!(matches!(
            l.set_desired_joint_angle(3, 0.0, MotionConstraints::default()),
            Err(LimbError::JointIndexOutOfRange {
                index: 3,
                joints: 3
            })
        ));
    }

    #[test]
    fn test_inertial_state() {
        let l = limb(sea_arm());
        assert_eq!(l.inertial_state(), InertialState::default());
    }
}
