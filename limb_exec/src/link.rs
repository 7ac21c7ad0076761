//! # Links
//!
//! A [`Link`] couples a DH parameter with the type of joint driving it, the
//! joint limits, and an estimator for the link's inertial state.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

use crate::dh::DhParam;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Type of joint actuating a link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    /// Joint value is an angle added to theta, in degrees.
    Revolute,

    /// Joint value is a length added to d.
    Prismatic,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LinkError {
    #[error("Joint limits minimum ({minimum}) is greater than the maximum ({maximum})")]
    InvalidJointLimits { minimum: f64, maximum: f64 },

    #[error("Joint limits cannot be NaN")]
    NanJointLimits,

    #[error("Servo scale cannot be zero")]
    ZeroServoScale,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Source of the inertial state of a link, for example an IMU mounted on it.
pub trait InertialStateEstimator: Debug + Send + Sync {
    fn inertial_state(&self) -> InertialState;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Range of values a joint may take.
///
/// Always satisfies `minimum <= maximum`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawJointLimits")]
pub struct JointLimits {
    minimum: f64,
    maximum: f64,
}

#[derive(Deserialize)]
struct RawJointLimits {
    minimum: f64,
    maximum: f64,
}

/// Limits expressed in the raw units of a servo.
///
/// The joint angle is `(raw - zero) * |scale|`, the sign of `scale` only
/// records the servo's direction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServoLimits {
    pub maximum: f64,
    pub minimum: f64,
    pub zero: f64,
    pub scale: f64,
}

/// Full inertial state of a link.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InertialState {
    pub x_position: f64,
    pub y_position: f64,
    pub z_position: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub x_velocity: f64,
    pub y_velocity: f64,
    pub z_velocity: f64,
    pub roll_rate: f64,
    pub pitch_rate: f64,
    pub yaw_rate: f64,
    pub x_acceleration: f64,
    pub y_acceleration: f64,
    pub z_acceleration: f64,
}

/// Estimator for links with no sensing, always reports a zero state.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopInertialStateEstimator;

/// A single link of a limb.
#[derive(Clone, Debug)]
pub struct Link {
    pub link_type: LinkType,
    pub dh_param: DhParam,
    pub joint_limits: JointLimits,
    pub inertial_state_estimator: Arc<dyn InertialStateEstimator>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl JointLimits {
    /// Limits that accept any value.
    pub const NO_LIMIT: JointLimits = JointLimits {
        minimum: f64::NEG_INFINITY,
        maximum: f64::INFINITY,
    };

    pub fn new(minimum: f64, maximum: f64) -> Result<Self, LinkError> {
        if minimum.is_nan() || maximum.is_nan() {
            return Err(LinkError::NanJointLimits);
        }
        if minimum > maximum {
            return Err(LinkError::InvalidJointLimits { minimum, maximum });
        }

        Ok(Self { minimum, maximum })
    }

    pub fn minimum(&self) -> f64 {
        self.minimum
    }

    pub fn maximum(&self) -> f64 {
        self.maximum
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.minimum && value <= self.maximum
    }

    pub fn clamp(&self, value: f64) -> f64 {
        util::maths::clamp(&value, &self.minimum, &self.maximum)
    }
}

impl Default for JointLimits {
    fn default() -> Self {
        Self::NO_LIMIT
    }
}

impl std::convert::TryFrom<RawJointLimits> for JointLimits {
    type Error = LinkError;

    fn try_from(raw: RawJointLimits) -> Result<Self, Self::Error> {
        JointLimits::new(raw.minimum, raw.maximum)
    }
}

impl ServoLimits {
    pub fn new(maximum: f64, minimum: f64, zero: f64, scale: f64) -> Self {
        Self {
            maximum,
            minimum,
            zero,
            scale,
        }
    }

    /// Convert the raw servo range into joint limits.
    pub fn to_joint_limits(&self) -> Result<JointLimits, LinkError> {
        if self.scale == 0.0 {
            return Err(LinkError::ZeroServoScale);
        }

        let a = (self.maximum - self.zero) * self.scale.abs();
        let b = (self.minimum - self.zero) * self.scale.abs();

        JointLimits::new(a.min(b), a.max(b))
    }
}

impl InertialState {
    /// The state as a flat vector, positions then attitude, velocities,
    /// rates and accelerations.
    pub fn to_array(&self) -> [f64; 15] {
        [
            self.x_position,
            self.y_position,
            self.z_position,
            self.roll,
            self.pitch,
            self.yaw,
            self.x_velocity,
            self.y_velocity,
            self.z_velocity,
            self.roll_rate,
            self.pitch_rate,
            self.yaw_rate,
            self.x_acceleration,
            self.y_acceleration,
            self.z_acceleration,
        ]
    }
}

impl InertialStateEstimator for NoopInertialStateEstimator {
    fn inertial_state(&self) -> InertialState {
        InertialState::default()
    }
}

impl Link {
    /// A link with no sensing attached.
    pub fn new(link_type: LinkType, dh_param: DhParam, joint_limits: JointLimits) -> Self {
        Self {
            link_type,
            dh_param,
            joint_limits,
            inertial_state_estimator: Arc::new(NoopInertialStateEstimator),
        }
    }

    pub fn revolute(dh_param: DhParam) -> Self {
        Self::new(LinkType::Revolute, dh_param, JointLimits::NO_LIMIT)
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn InertialStateEstimator>) -> Self {
        self.inertial_state_estimator = estimator;
        self
    }

    /// The DH parameter of this link with the joint at `joint_value`.
    pub fn dh_param_at(&self, joint_value: f64) -> DhParam {
        let mut p = self.dh_param;
        match self.link_type {
            LinkType::Revolute => p.theta += joint_value,
            LinkType::Prismatic => p.d += joint_value,
        }
        p
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn limits(max: f64, min: f64) -> JointLimits {
        JointLimits::new(min, max).unwrap()
    }

    #[test]
    fn test_servo_limits() {
        assert_eq!(
            ServoLimits::new(180.0, 0.0, 0.0, 1.0).to_joint_limits(),
            Ok(limits(180.0, 0.0))
        );
        assert_eq!(
            ServoLimits::new(180.0, 0.0, 0.0, -1.0).to_joint_limits(),
            Ok(limits(180.0, 0.0))
        );
        assert_eq!(
            ServoLimits::new(180.0, 0.0, 10.0, 1.0).to_joint_limits(),
            Ok(limits(170.0, -10.0))
        );
        assert_eq!(
            ServoLimits::new(180.0, 0.0, 10.0, -1.0).to_joint_limits(),
            Ok(limits(170.0, -10.0))
        );
        assert_eq!(
            ServoLimits::new(180.0, 0.0, 0.0, 0.0).to_joint_limits(),
            Err(LinkError::ZeroServoScale)
        );
    }

    #[test]
    fn test_joint_limits() {
        assert!(JointLimits::new(10.0, -10.0).is_err());
        assert!(JointLimits::new(f64::NAN, 0.0).is_err());

        let l = limits(90.0, -45.0);
        assert!(l.contains(90.0));
        assert!(l.contains(-45.0));
        assert!(!l.contains(91.0));
        assert_eq!(l.clamp(100.0), 90.0);
        assert_eq!(l.clamp(-50.0), -45.0);
        assert_eq!(l.clamp(12.0), 12.0);

        assert!(JointLimits::NO_LIMIT.contains(1e300));
        assert_eq!(JointLimits::default(), JointLimits::NO_LIMIT);
    }

    #[test]
    fn test_joint_limits_deserialise() {
        let l: JointLimits = serde_json::from_str(r#"{"minimum": -5, "maximum": 5}"#).unwrap();
        assert_eq!(l, limits(5.0, -5.0));

        assert!(serde_json::from_str::<JointLimits>(r#"{"minimum": 5, "maximum": -5}"#).is_err());
    }

    #[test]
    fn test_dh_param_at() {
        let p = DhParam::new(1.0, 10.0, 2.0, 90.0);

        let rev = Link::revolute(p);
        assert_eq!(rev.dh_param_at(5.0), DhParam::new(1.0, 15.0, 2.0, 90.0));

        let pri = Link::new(LinkType::Prismatic, p, JointLimits::NO_LIMIT);
        assert_eq!(pri.dh_param_at(5.0), DhParam::new(6.0, 10.0, 2.0, 90.0));
    }

    #[test]
    fn test_noop_estimator() {
        let link = Link::revolute(DhParam::ZERO);
        let state = link.inertial_state_estimator.inertial_state();

        assert_eq!(state, InertialState::default());
        assert!(state.to_array().iter().all(|v| *v == 0.0));
    }
}
