//! # Limb library
//!
//! Kinematics and motion control for serial robotic limbs described by
//! Denavit-Hartenberg parameters. All angles at the public interface are in
//! degrees.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// Homogeneous transforms and the operations on them
pub mod transform;

/// Denavit-Hartenberg parameters and chain classification
pub mod dh;

/// Spherical wrists
pub mod wrist;

/// Euler rotation orders and the wrist patterns that produce them
pub mod euler;

/// Links, joint limits and inertial state
pub mod link;

/// Forward kinematics
pub mod fk;

/// Inverse kinematics - closed form for 3 link arms, numeric otherwise
pub mod ik;

/// Reachability checks
pub mod reach;

/// Joint angle controllers and their registry
pub mod ctrl;

/// Motion plans and the follower that runs them
pub mod plan;

/// A whole limb, tying the above together
pub mod limb;
