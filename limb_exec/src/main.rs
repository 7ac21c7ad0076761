//! # Limb Executable
//!
//! Loads a limb from its parameters, checks its kinematics and runs a short
//! motion plan on its controllers. The plan and the resulting tip transforms
//! are saved in the session directory.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Result};
use log::{info, warn};
use serde::Serialize;

// Internal
use limb_lib::{
    ctrl::ControllerRegistry,
    fk,
    limb::{Limb, LimbParams},
    plan::{FollowerState, LimbMotionPlan, MotionConstraints},
    transform::{MatrixRecord, Transform},
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of steps in the demonstration plan.
const DEMO_PLAN_STEPS: usize = 5;

/// Angle every joint is moved through in the demonstration plan.
const DEMO_SWEEP_DEG: f64 = 20.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Summary of the run saved to the session.
#[derive(Serialize)]
struct RunRecord {
    home: MatrixRecord,
    plan: LimbMotionPlan,
    final_state: FollowerState,
    final_angles: Vec<f64>,
    final_transform: MatrixRecord,
}

// ---------------------------------------------------------------------------
// MAIN
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("limb_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Limb Executable\n");
    info!("Running on: {}", host::get_host_info());
    info!("Session directory: {:?}\n", session.session_root);

    info!("Initialising...");

    // ---- LOAD PARAMETERS ----

    let params: LimbParams =
        util::params::load("limb.toml").wrap_err("Failed to load limb parameters")?;

    info!("Parameters loaded");

    // ---- LIMB INITIALISATION ----

    let registry = ControllerRegistry::with_defaults();
    let mut limb = Limb::from_params(&params, &registry).wrap_err("Failed to build the limb")?;

    let home = fk::home(limb.links());
    info!("Limb \"{}\" home transform:\n{}", limb.id(), home);

    // ---- DEMONSTRATION PLAN ----

    let start = limb.current_joint_angles();
    let end: Vec<f64> = start.iter().map(|a| a + DEMO_SWEEP_DEG).collect();
    let step_duration_ms =
        params.follower.default_motion_duration_ms / DEMO_PLAN_STEPS as f64;

    let plan = LimbMotionPlan::linear(
        &start,
        &end,
        DEMO_PLAN_STEPS,
        MotionConstraints::with_duration(step_duration_ms),
    )
    .wrap_err("Failed to build the demonstration plan")?;

    limb.follow_plan(plan.clone())
        .wrap_err("Failed to start the demonstration plan")?;
    let final_state = limb.wait().wrap_err("Failed waiting for the plan")?;

    if final_state != FollowerState::Settled {
        warn!("Demonstration plan ended in state {:?}", final_state);
    }

    let final_transform = limb
        .current_task_space_transform()
        .wrap_err("Failed to compute the final transform")?;
    info!("Final transform:\n{}", final_transform);

    // ---- RETURN HOME THROUGH IK ----

    if limb.is_reachable(&home) {
        let angles = limb
            .set_desired_task_space_transform(
                &home,
                MotionConstraints::with_duration(params.follower.default_motion_duration_ms),
            )
            .wrap_err("Failed to return home")?;
        info!("Returning home with joint angles {:?}", angles);
        limb.wait().wrap_err("Failed waiting for the return home")?;
    } else {
        warn!("Home transform reported unreachable");
    }

    report_error(&home, &limb.current_task_space_transform()?);

    // ---- SAVE AND EXIT ----

    session.save(
        "run.json",
        &RunRecord {
            home: home.into(),
            plan,
            final_state,
            final_angles: end,
            final_transform: final_transform.into(),
        },
    );

    session.exit();

    Ok(())
}

fn report_error(target: &Transform, reached: &Transform) {
    let error = (*reached - *target).max_abs();
    info!("Largest element error from home: {:.3e}", error);
}
