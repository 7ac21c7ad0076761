//! # Spherical wrist decoupling
//!
//! A spherical wrist is three consecutive joints whose axes meet at a point.
//! With that assumption the wrist centre can be found from the end effector
//! pose alone, which lets the arm position be solved separately from the
//! wrist orientation.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;

use crate::dh::{chain_to_transform, ChainError, DhParam, WRIST_LEN};
use crate::transform::Transform;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Three DH parameters forming a spherical wrist.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphericalWrist {
    params: [DhParam; WRIST_LEN],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SphericalWrist {
    /// Create a new wrist, which must be exactly three parameters long.
    ///
    /// Whether the axes really intersect is not checked, see
    /// [`crate::dh::WristIdentifier`] for that.
    pub fn new(params: &[DhParam]) -> Result<Self, ChainError> {
        if params.len() != WRIST_LEN {
            return Err(ChainError::InvalidChainShape(params.len()));
        }

        Ok(Self {
            params: [params[0], params[1], params[2]],
        })
    }

    pub fn params(&self) -> &[DhParam] {
        &self.params
    }

    /// Distance from the wrist centre to the end effector along the tool z
    /// axis.
    pub fn bone_length(&self) -> f64 {
        self.params[1].r + self.params[2].d
    }

    /// Position of the wrist centre for the given end effector target.
    ///
    /// Walks back from the target position along the target's z axis by the
    /// wrist bone length.
    pub fn center(&self, target: &Transform) -> Vector3<f64> {
        target.translation() - self.bone_length() * target.rotation_column(2)
    }

    /// Position of the wrist centre with every joint at zero, given the links
    /// that come before the wrist.
    pub fn center_homed(&self, prior_links: &[DhParam]) -> Vector3<f64> {
        let prior = chain_to_transform(prior_links);
        let wrist = chain_to_transform(&self.params[..2]);

        (prior * wrist).translation()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
