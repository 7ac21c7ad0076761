//! # Denavit-Hartenberg chain model
//!
//! Each link of a serial chain is described by a [`DhParam`] 4-tuple
//! `(d, theta, r, alpha)`, with angles in degrees and lengths in whatever unit
//! the limb is configured in. A single link transform is
//! `Rz(theta) * Tz(d) * Tx(r) * Rx(alpha)`.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod chain;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

use crate::transform::Transform;

pub use chain::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance used to decide whether a raw DH value is a radian-encoded
/// multiple of 90 degrees.
const RADIAN_DETECT_EPSILON: f64 = 1e-14;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single Denavit-Hartenberg parameter set.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DhParam {
    /// Offset along the previous z axis.
    pub d: f64,

    /// Rotation about the previous z axis, in degrees.
    pub theta: f64,

    /// Length along the rotated x axis.
    pub r: f64,

    /// Rotation about the rotated x axis, in degrees.
    pub alpha: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DhParam {
    pub const ZERO: DhParam = DhParam::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(d: f64, theta: f64, r: f64, alpha: f64) -> Self {
        Self { d, theta, r, alpha }
    }

    /// Build a parameter from a link whose angles may be encoded in radians.
    ///
    /// If both `theta` and `alpha` sit on 0, +/-pi/2 or +/-pi they are
    /// treated as radians and converted. Anything else is taken as degrees
    /// already.
    pub fn from_maybe_radians(d: f64, theta: f64, r: f64, alpha: f64) -> Self {
        if is_radian_right_angle(theta) && is_radian_right_angle(alpha) {
            Self::new(d, theta.to_degrees(), r, alpha.to_degrees())
        } else {
            Self::new(d, theta, r, alpha)
        }
    }

    /// The homogeneous transform of this link.
    pub fn to_transform(&self) -> Transform {
        self.to_transform_with(None)
    }

    /// The homogeneous transform of this link, using `theta_override` in
    /// place of `theta` when given.
    pub fn to_transform_with(&self, theta_override: Option<f64>) -> Transform {
        let theta = theta_override.unwrap_or(self.theta).to_radians();
        let alpha = self.alpha.to_radians();

        let (st, ct) = theta.sin_cos();
        let (sa, ca) = alpha.sin_cos();

        Transform::from_row_major(&[
            ct, -st * ca, st * sa, self.r * ct,
            st, ct * ca, -ct * sa, self.r * st,
            0.0, sa, ca, self.d,
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Length of the translation this link produces.
    ///
    /// Depends only on `d` and `r`.
    pub fn length(&self) -> f64 {
        self.to_transform().translation_length()
    }

    /// Heading of the translation this link produces in the XY plane, in
    /// degrees.
    pub fn angle(&self) -> f64 {
        let t = self.to_transform();
        t.translation_y().atan2(t.translation_x()).to_degrees()
    }
}

impl Default for DhParam {
    fn default() -> Self {
        Self::ZERO
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Compose the transforms of every parameter in the chain, base first.
///
/// An empty chain gives the identity.
pub fn chain_to_transform(params: &[DhParam]) -> Transform {
    params
        .iter()
        .fold(Transform::identity(), |acc, p| acc * p.to_transform())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn is_radian_right_angle(value: f64) -> bool {
    [0.0, FRAC_PI_2, -FRAC_PI_2, PI, -PI]
        .iter()
        .any(|v| (value - v).abs() < RADIAN_DETECT_EPSILON)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use util::maths::float_range;

    const EPS: f64 = 1e-14;

    #[test]
    fn test_single_rotation_matches_dh() {
        let expected = DhParam::new(0.0, 90.0, 0.0, 0.0).to_transform();
        let actual = Transform::from_rotation(90.0, 0.0, 0.0);

        assert!(actual.approx_eq(&expected, EPS), "{}\n{}", actual, expected);
    }

    #[test]
    fn test_composition_matches_dh() {
        let expected = DhParam::new(10.0, 30.0, 8.0, 60.0).to_transform();
        let actual = Transform::from_rotation(30.0, 0.0, 0.0)
            * Transform::from_translation(0.0, 0.0, 10.0)
            * Transform::from_translation(8.0, 0.0, 0.0)
            * Transform::from_rotation(0.0, 0.0, 60.0);

        assert!(actual.approx_eq(&expected, EPS), "{}\n{}", actual, expected);
    }

    #[test]
    fn test_chain_to_transform() {
        let chain = [
            DhParam::new(2.0, 0.0, 0.0, 0.0),
            DhParam::new(0.0, 0.0, 3.0, 90.0),
        ];
        let expected =
            Transform::from_translation(3.0, 0.0, 2.0) * Transform::from_rotation(0.0, 0.0, 90.0);

        assert!(chain_to_transform(&chain).approx_eq(&expected, EPS));
        assert_eq!(chain_to_transform(&[]), Transform::identity());
    }

    #[test]
    fn test_theta_override() {
        let p = DhParam::new(1.0, 15.0, 2.0, -90.0);

        let overridden = p.to_transform_with(Some(40.0));
        let expected = DhParam::new(1.0, 40.0, 2.0, -90.0).to_transform();

        assert_eq!(overridden, expected);
        assert_eq!(p.to_transform_with(None), p.to_transform());
    }

    #[test]
    fn test_length_only_depends_on_d_and_r() {
        let expected = 2f64.hypot(3.0);

        for theta in float_range(-180.0, 180.0, 15.0) {
            for alpha in float_range(-180.0, 180.0, 15.0) {
                let length = DhParam::new(2.0, theta, 3.0, alpha).length();
                assert!(
                    (length - expected).abs() < 1e-12,
                    "theta = {}, alpha = {}, length = {}",
                    theta,
                    alpha,
                    length
                );
            }
        }
    }

    #[test]
    fn test_angle_is_theta() {
        for a in float_range(0.0, 90.0, 5.0) {
            let angle = DhParam::new(2.0, a, 3.0, a).angle();
            assert!((angle - a).abs() < 1e-10, "a = {}, angle = {}", a, angle);
        }
    }

    #[test]
    fn test_from_maybe_radians() {
        let converted = DhParam::from_maybe_radians(1.0, FRAC_PI_2, 2.0, -PI);
        assert_eq!(converted, DhParam::new(1.0, 90.0, 2.0, -180.0));

        // Already in degrees, left alone
        let kept = DhParam::from_maybe_radians(1.0, 90.0, 2.0, 0.0);
        assert_eq!(kept, DhParam::new(1.0, 90.0, 2.0, 0.0));

        // Only one value looks like radians, left alone
        let kept = DhParam::from_maybe_radians(1.0, 45.0, 2.0, FRAC_PI_2);
        assert_eq!(kept, DhParam::new(1.0, 45.0, 2.0, FRAC_PI_2));
    }
}
