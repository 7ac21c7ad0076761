//! # Motion plan follower
//!
//! Runs a [`LimbMotionPlan`] on a worker thread, issuing each step's targets
//! to the joint controllers on a timed cadence. Step `i + 1` is issued once
//! step `i`'s motion duration has passed since step `i` was issued, whether or
//! not the joints have arrived.
//!
//! The follower moves through the states `Idle -> Running -> Settled` or
//! `Idle -> Running -> Aborted`. At most one plan runs at a time, starting a
//! new plan stops the current one first.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::{
    mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError},
    Arc, PoisonError, RwLock,
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::{LimbMotionPlan, PlanError};
use crate::ctrl::JointAngleController;
use util::time::millis_to_duration;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// State of the follower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowerState {
    /// No plan has been run yet.
    Idle,

    /// A plan is being run.
    Running,

    /// Every step of the last plan was issued and its duration has passed.
    Settled,

    /// The last plan was stopped before it finished.
    Aborted,
}

#[derive(Debug, thiserror::Error)]
pub enum FollowerError {
    #[error("Plan validation failed: {0}")]
    PlanValidation(PlanError),

    #[error("Sync primitive is poisoned")]
    PoisonError,

    #[error("The follower worker thread panicked")]
    WorkerPanicked,

    #[error("Could not start the follower worker thread: {0}")]
    ThreadStartError(std::io::Error),
}

#[derive(Debug)]
enum WorkerSignal {
    Stop,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Follows motion plans for one limb's set of joint controllers.
#[derive(Debug)]
pub struct MotionPlanFollower {
    /// Target all of this follower's log messages are sent to.
    log_target: String,

    controllers: Vec<Arc<dyn JointAngleController>>,

    shared: Arc<Shared>,

    worker: Option<Worker>,
}

#[derive(Debug)]
struct Shared {
    state: RwLock<FollowerState>,
}

#[derive(Debug)]
struct Worker {
    stop_sender: Sender<WorkerSignal>,
    jh: JoinHandle<()>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotionPlanFollower {
    /// Create a new follower driving `controllers`, one per joint.
    ///
    /// `log_target` is used as the target of every log message, normally the
    /// id of the limb.
    pub fn new(log_target: &str, controllers: Vec<Arc<dyn JointAngleController>>) -> Self {
        Self {
            log_target: log_target.into(),
            controllers,
            shared: Arc::new(Shared {
                state: RwLock::new(FollowerState::Idle),
            }),
            worker: None,
        }
    }

    pub fn num_joints(&self) -> usize {
        self.controllers.len()
    }

    pub fn controllers(&self) -> &[Arc<dyn JointAngleController>] {
        &self.controllers
    }

    pub fn state(&self) -> Result<FollowerState, FollowerError> {
        Ok(*self.shared.state.read()?)
    }

    /// Start following `plan`.
    ///
    /// The whole plan is validated first. If any step is invalid nothing is
    /// issued and any plan already running is left alone. Otherwise the
    /// running plan is stopped and the new one started, and this returns
    /// without waiting for it to complete.
    pub fn follow_plan(&mut self, plan: LimbMotionPlan) -> Result<(), FollowerError> {
        let target = self.log_target.as_str();

        if let Err(e) = plan.validate(self.controllers.len()) {
            warn!(target: target, "Rejected motion plan: {}", e);
            return Err(FollowerError::PlanValidation(e));
        }

        if self.worker.is_some() {
            let prior = self.stop()?;
            info!(target: self.log_target.as_str(), "Previous plan stopped ({:?})", prior);
        }

        if plan.is_empty() {
            debug!(target: self.log_target.as_str(), "Empty plan, nothing to follow");
            *self.shared.state.write()? = FollowerState::Settled;
            return Ok(());
        }

        info!(
            target: self.log_target.as_str(),
            "Following plan of {} steps over {:.0} ms",
            plan.len(),
            plan.total_duration_ms()
        );

        *self.shared.state.write()? = FollowerState::Running;

        let (stop_sender, stop_receiver) = channel();
        let shared = self.shared.clone();
        let controllers = self.controllers.clone();
        let log_target = self.log_target.clone();

        let jh = thread::Builder::new()
            .name(format!("{}::follower", self.log_target))
            .spawn(move || follow_thread(shared, controllers, plan, stop_receiver, log_target))
            .map_err(|e| {
                // Nothing was started so the plan never ran
                if let Ok(mut s) = self.shared.state.write() {
                    *s = FollowerState::Aborted;
                }
                FollowerError::ThreadStartError(e)
            })?;

        self.worker = Some(Worker { stop_sender, jh });

        Ok(())
    }

    /// Block until the current plan settles or is aborted, returning the final
    /// state.
    pub fn wait(&mut self) -> Result<FollowerState, FollowerError> {
        if let Some(Worker { stop_sender, jh }) = self.worker.take() {
            let result = jh.join();

            // Dropping the sender early would look like a stop to the worker
            drop(stop_sender);

            result.map_err(|_| FollowerError::WorkerPanicked)?;
        }

        self.state()
    }

    /// Stop the current plan, returning the final state.
    ///
    /// Targets already issued to the controllers are not undone.
    pub fn stop(&mut self) -> Result<FollowerState, FollowerError> {
        if let Some(Worker { stop_sender, jh }) = self.worker.take() {
            // The worker may already have finished, in which case there is no
            // one to tell
            stop_sender.send(WorkerSignal::Stop).ok();

            jh.join().map_err(|_| FollowerError::WorkerPanicked)?;
        }

        self.state()
    }
}

impl Drop for MotionPlanFollower {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!(target: self.log_target.as_str(), "Error stopping follower: {}", e);
        }
    }
}

impl<G> From<PoisonError<G>> for FollowerError {
    fn from(_: PoisonError<G>) -> Self {
        Self::PoisonError
    }
}

impl From<PlanError> for FollowerError {
    fn from(e: PlanError) -> Self {
        Self::PlanValidation(e)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn follow_thread(
    shared: Arc<Shared>,
    controllers: Vec<Arc<dyn JointAngleController>>,
    plan: LimbMotionPlan,
    stop_receiver: Receiver<WorkerSignal>,
    log_target: String,
) {
    let target = log_target.as_str();
    let start = Instant::now();
    let mut offset = Duration::from_secs(0);
    let mut stopped_at = None;

    for (i, step) in plan.steps.iter().enumerate() {
        if wait_until(&stop_receiver, start.checked_add(offset)) {
            stopped_at = Some(i);
            break;
        }

        for (ctrl, angle) in controllers.iter().zip(step.joint_angles.iter()) {
            ctrl.set_target_angle(*angle, &step.motion_constraints);
        }

        debug!(
            target: target,
            "Issued step {}/{}: {:?}",
            i + 1,
            plan.len(),
            step.joint_angles
        );

        offset = offset.saturating_add(millis_to_duration(
            step.motion_constraints.motion_duration_ms,
        ));
    }

    // Hold for the last step's duration
    if stopped_at.is_none() && wait_until(&stop_receiver, start.checked_add(offset)) {
        stopped_at = Some(plan.len());
    }

    let final_state = match stopped_at {
        Some(i) => {
            info!(
                target: target,
                "Plan stopped with {} of {} steps issued",
                i,
                plan.len()
            );
            FollowerState::Aborted
        }
        None => {
            info!(target: target, "Plan settled");
            FollowerState::Settled
        }
    };

    match shared.state.write() {
        Ok(mut s) => *s = final_state,
        Err(_) => error!(target: target, "Follower state is poisoned"),
    }
}

/// Sleep until `deadline`, returning `true` early if a stop is requested.
///
/// A `None` deadline lies beyond what an `Instant` can hold, so only a stop
/// ends the wait. A disconnected channel counts as a stop request.
fn wait_until(receiver: &Receiver<WorkerSignal>, deadline: Option<Instant>) -> bool {
    let deadline = match deadline {
        Some(d) => d,
        None => {
            // Stop and disconnection both end the wait
            receiver.recv().ok();
            return true;
        }
    };

    loop {
        let now = Instant::now();

        if now >= deadline {
            return match receiver.try_recv() {
                Ok(WorkerSignal::Stop) | Err(TryRecvError::Disconnected) => true,
                Err(TryRecvError::Empty) => false,
            };
        }

        match receiver.recv_timeout(deadline - now) {
            Ok(WorkerSignal::Stop) | Err(RecvTimeoutError::Disconnected) => return true,
            Err(RecvTimeoutError::Timeout) => continue,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
