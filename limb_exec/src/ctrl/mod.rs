//! # Joint controllers
//!
//! Each joint of a limb is driven by a [`JointAngleController`]. Concrete
//! controllers are picked by name from the limb parameters, through a
//! [`ControllerRegistry`] mapping each name to a constructor.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod sim;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::plan::MotionConstraints;

pub use sim::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RegistryError {
    #[error("No controller is registered under the name \"{0}\"")]
    UnknownKind(String),

    #[error("Invalid setting for a \"{kind}\" controller: {reason}")]
    InvalidSetting { kind: String, reason: String },
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Controller for the angle of a single joint, in degrees.
///
/// Only the motion plan follower commands targets. Current angles may be read
/// from any thread.
pub trait JointAngleController: Debug + Send + Sync {
    /// Command the joint towards `angle_deg`.
    fn set_target_angle(&self, angle_deg: f64, constraints: &MotionConstraints);

    /// The joint's current angle.
    fn current_angle(&self) -> f64;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Constructor for a registered controller.
pub type ControllerConstructor =
    fn(&ControllerParams) -> Result<Arc<dyn JointAngleController>, RegistryError>;

/// Parameters selecting and configuring a joint controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControllerParams {
    /// Name the controller is registered under.
    pub kind: String,

    /// Controller specific numeric settings.
    #[serde(default)]
    pub settings: HashMap<String, f64>,
}

/// Maps controller names to their constructors.
#[derive(Clone)]
pub struct ControllerRegistry {
    constructors: HashMap<String, ControllerConstructor>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControllerParams {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.into(),
            settings: HashMap::new(),
        }
    }

    /// Get a setting, or `default` if it isn't given.
    pub fn setting_or(&self, name: &str, default: f64) -> f64 {
        self.settings.get(name).copied().unwrap_or(default)
    }
}

impl ControllerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// A registry containing the built in controllers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(SIM_CONTROLLER_KIND, SimJointController::construct);
        registry
    }

    /// Register a constructor, replacing any already registered under `kind`.
    pub fn register(&mut self, kind: &str, constructor: ControllerConstructor) {
        if self.constructors.insert(kind.into(), constructor).is_some() {
            debug!("Replaced the \"{}\" controller constructor", kind);
        }
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Build the controller described by `params`.
    pub fn build(
        &self,
        params: &ControllerParams,
    ) -> Result<Arc<dyn JointAngleController>, RegistryError> {
        let constructor = self
            .constructors
            .get(&params.kind)
            .ok_or_else(|| RegistryError::UnknownKind(params.kind.clone()))?;

        constructor(params)
    }
}

impl Default for ControllerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Debug for ControllerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.constructors.keys().collect();
        kinds.sort();
        f.debug_struct("ControllerRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn always_fails(params: &ControllerParams) -> Result<Arc<dyn JointAngleController>, RegistryError> {
        Err(RegistryError::InvalidSetting {
            kind: params.kind.clone(),
            reason: "always fails".into(),
        })
    }

    #[test]
    fn test_defaults() {
        let registry = ControllerRegistry::with_defaults();
        assert!(registry.contains(SIM_CONTROLLER_KIND));

        let mut params = ControllerParams::new(SIM_CONTROLLER_KIND);
        params.settings.insert(INITIAL_ANGLE_SETTING.into(), 12.5);

        let ctrl = registry.build(&params).unwrap();
        assert_eq!(ctrl.current_angle(), 12.5);
    }

    #[test]
    fn test_unknown_kind() {
        let registry = ControllerRegistry::with_defaults();

        assert_eq!(
            registry.build(&ControllerParams::new("servo")).err(),
            Some(RegistryError::UnknownKind("servo".into()))
        );
    }

    #[test]
    fn test_register() {
        let mut registry = ControllerRegistry::new();
        assert!(!registry.contains(SIM_CONTROLLER_KIND));

        registry.register("broken", always_fails);
        assert!(matches!(
            registry.build(&ControllerParams::new("broken")),
            Err(RegistryError::InvalidSetting { .. })
        ));
    }

    #[test]
    fn test_params_deserialise() {
        let params: ControllerParams = util::params::load_str(
            r#"
            kind = "simulated"

            [settings]
            initial_angle_deg = -30.0
            "#,
        )
        .unwrap();

        assert_eq!(params.kind, "simulated");
        assert_eq!(params.setting_or(INITIAL_ANGLE_SETTING, 0.0), -30.0);
        assert_eq!(params.setting_or("missing", 4.0), 4.0);
    }
}
