//! Setpoint resolution: stage tag to heating level or device action.

use chrono::{DateTime, TimeDelta};
use chrono_tz::Tz;
use serde::Serialize;

use crate::cycle::SleepCycle;
use crate::stage::StageTag;

/// Per-stage heating levels for one profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageLevels {
    pub initial: i32,
    pub mid: i32,
    pub final_level: i32,
    /// Used only when the warming stage is enabled.
    pub warming: i32,
}

impl StageLevels {
    pub fn from_profile(profile: &nightheat_traits::ThermalProfile, warming: i32) -> Self {
        Self {
            initial: profile.initial_level,
            mid: profile.mid_level,
            final_level: profile.final_level,
            warming,
        }
    }
}

/// What the device should be doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "level", rename_all = "snake_case")]
pub enum Setpoint {
    /// Heat at this level.
    Level(i32),
    /// Leave the device as it is.
    Hold,
    /// Cycle is over; make sure the device is off.
    PowerOff,
}

/// Target level for a stage; pre-heating uses the initial level.
pub fn resolve(stage: StageTag, levels: &StageLevels) -> Option<i32> {
    match stage {
        StageTag::PreHeating | StageTag::Initial => Some(levels.initial),
        StageTag::Mid => Some(levels.mid),
        StageTag::Final => Some(levels.final_level),
        StageTag::Warming => Some(levels.warming),
        StageTag::OutsideCycle => None,
    }
}

/// Decide the setpoint for `now`.
///
/// `grace` is the proximity window: right after wake the device is held
/// rather than switched off so a late final-stage trigger is not undone.
pub fn decide(
    cycle: &SleepCycle,
    stage: StageTag,
    levels: &StageLevels,
    now: DateTime<Tz>,
    grace: TimeDelta,
) -> Setpoint {
    match resolve(stage, levels) {
        Some(level) => Setpoint::Level(level),
        None if cycle.is_after_wake(now) && now - cycle.wake_time() > grace => Setpoint::PowerOff,
        None => Setpoint::Hold,
    }
}
