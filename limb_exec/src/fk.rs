//! # Forward kinematics

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::dh::{chain_to_transform, DhParam};
use crate::link::Link;
use crate::transform::Transform;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FkError {
    #[error("Expected one joint value per link, found {links} links and {angles} joint values")]
    DimensionMismatch { links: usize, angles: usize },
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Transform from the limb base to its tip with the joints at the given
/// values.
pub fn solve(links: &[Link], joint_angles: &[f64]) -> Result<Transform, FkError> {
    Ok(chain_to_transform(&effective_params(links, joint_angles)?))
}

/// The DH parameters of every link with the joint values applied.
pub fn effective_params(links: &[Link], joint_angles: &[f64]) -> Result<Vec<DhParam>, FkError> {
    if links.len() != joint_angles.len() {
        return Err(FkError::DimensionMismatch {
            links: links.len(),
            angles: joint_angles.len(),
        });
    }

    Ok(links
        .iter()
        .zip(joint_angles.iter())
        .map(|(link, angle)| link.dh_param_at(*angle))
        .collect())
}

/// Transform from the limb base to its tip with every joint at zero.
pub fn home(links: &[Link]) -> Transform {
    chain_to_transform(&links.iter().map(|l| l.dh_param).collect::<Vec<_>>())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
