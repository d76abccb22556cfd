//! Runtime configuration for the controller.
//!
//! These are the policy structs the engine consumes. They are separate from
//! the TOML-deserialized config in `nightheat_config`.

use std::time::Duration;

use chrono::TimeDelta;

use crate::cycle::CyclePolicy;
use crate::retry::RetryPolicy;
use crate::stage::TriggerMode;

/// Everything one evaluation + actuation pass needs besides the profile.
#[derive(Debug, Clone)]
pub struct ControllerCfg {
    pub cycle: CyclePolicy,
    pub trigger: TriggerMode,
    /// Level used during the warming stage (ignored when warming is off).
    pub warming_level: i32,
    pub retry: RetryPolicy,
    /// Profiles evaluated at once.
    pub concurrency: usize,
    /// Outer bound on a single profile's work.
    pub profile_deadline: Duration,
}

impl Default for ControllerCfg {
    fn default() -> Self {
        Self {
            cycle: CyclePolicy::default(),
            trigger: TriggerMode::Interval,
            warming_level: 10,
            retry: RetryPolicy::default(),
            concurrency: 4,
            profile_deadline: Duration::from_secs(30),
        }
    }
}

impl ControllerCfg {
    /// Post-wake window during which no power-off is forced.
    pub fn wake_grace(&self) -> TimeDelta {
        match self.trigger {
            TriggerMode::Interval => TimeDelta::zero(),
            TriggerMode::Proximity { window } => window,
        }
    }
}
