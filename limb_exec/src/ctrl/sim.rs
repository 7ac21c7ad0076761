//! Simulated joint controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::{ControllerParams, JointAngleController, RegistryError};
use crate::plan::MotionConstraints;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Name the simulated controller is registered under.
pub const SIM_CONTROLLER_KIND: &str = "simulated";

/// Setting giving the simulated joint's starting angle.
pub const INITIAL_ANGLE_SETTING: &str = "initial_angle_deg";

/// Setting giving the number of commands kept in the history.
pub const HISTORY_LENGTH_SETTING: &str = "history_length";

/// History length used when none is configured.
pub const DEFAULT_HISTORY_LENGTH: usize = 1024;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A joint that reaches every commanded target instantly.
///
/// The most recent commands are recorded along with the time they were
/// received. Once the history is full the oldest command is dropped.
#[derive(Debug)]
pub struct SimJointController {
    state: Mutex<SimState>,
}

/// A command received by a [`SimJointController`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimCommand {
    pub angle_deg: f64,
    pub constraints: MotionConstraints,
    pub received: Instant,
}

#[derive(Debug)]
struct SimState {
    angle_deg: f64,
    history: VecDeque<SimCommand>,
    history_length: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimJointController {
    pub fn new(initial_angle_deg: f64) -> Self {
        Self::with_history_length(initial_angle_deg, DEFAULT_HISTORY_LENGTH)
    }

    /// Create a controller keeping at most `history_length` commands.
    pub fn with_history_length(initial_angle_deg: f64, history_length: usize) -> Self {
        Self {
            state: Mutex::new(SimState {
                angle_deg: initial_angle_deg,
                history: VecDeque::with_capacity(history_length.min(DEFAULT_HISTORY_LENGTH)),
                history_length,
            }),
        }
    }

    /// Registry constructor.
    pub fn construct(
        params: &ControllerParams,
    ) -> Result<Arc<dyn JointAngleController>, RegistryError> {
        let initial = params.setting_or(INITIAL_ANGLE_SETTING, 0.0);

        if !initial.is_finite() {
            return Err(RegistryError::InvalidSetting {
                kind: params.kind.clone(),
                reason: format!("{} must be finite, found {}", INITIAL_ANGLE_SETTING, initial),
            });
        }

        let history_length =
            params.setting_or(HISTORY_LENGTH_SETTING, DEFAULT_HISTORY_LENGTH as f64);

        if !history_length.is_finite() || history_length < 0.0 || history_length.fract() != 0.0
        {
            return Err(RegistryError::InvalidSetting {
                kind: params.kind.clone(),
                reason: format!(
                    "{} must be a non-negative whole number, found {}",
                    HISTORY_LENGTH_SETTING, history_length
                ),
            });
        }

        Ok(Arc::new(Self::with_history_length(initial, history_length as usize)))
    }

    /// The retained commands, oldest first.
    pub fn history(&self) -> Vec<SimCommand> {
        match self.state.lock() {
            Ok(s) => s.history.iter().copied().collect(),
            Err(p) => p.into_inner().history.iter().copied().collect(),
        }
    }
}

impl JointAngleController for SimJointController {
    fn set_target_angle(&self, angle_deg: f64, constraints: &MotionConstraints) {
        let mut state = match self.state.lock() {
            Ok(s) => s,
            Err(p) => p.into_inner(),
        };

        trace!("Simulated joint {} -> {} deg", state.angle_deg, angle_deg);

        state.angle_deg = angle_deg;

        if state.history_length == 0 {
            return;
        }
        if state.history.len() == state.history_length {
            state.history.pop_front();
        }
        state.history.push_back(SimCommand {
            angle_deg,
            constraints: *constraints,
            received: Instant::now(),
        });
    }

    fn current_angle(&self) -> f64 {
        match self.state.lock() {
            Ok(s) => s.angle_deg,
            Err(p) => p.into_inner().angle_deg,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
