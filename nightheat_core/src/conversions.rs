//! `From` implementations bridging `nightheat_config` types to core policy types.

use std::time::Duration;

use chrono::TimeDelta;

use crate::config::ControllerCfg;
use crate::cycle::CyclePolicy;
use crate::retry::RetryPolicy;
use crate::stage::TriggerMode;

fn minutes(m: u32) -> TimeDelta {
    TimeDelta::minutes(i64::from(m))
}

// ── CyclePolicy ──────────────────────────────────────────────────────────────

impl From<&nightheat_config::ScheduleCfg> for CyclePolicy {
    fn from(c: &nightheat_config::ScheduleCfg) -> Self {
        Self {
            lead_time: minutes(c.lead_time_minutes),
            mid_stage_offset: minutes(c.mid_stage_offset_minutes),
            final_stage_lead: minutes(c.final_stage_lead_minutes),
            warming_lead: c.warming_enabled.then(|| minutes(c.warming_lead_minutes)),
        }
    }
}

// ── TriggerMode ──────────────────────────────────────────────────────────────

impl From<&nightheat_config::ScheduleCfg> for TriggerMode {
    fn from(c: &nightheat_config::ScheduleCfg) -> Self {
        match c.trigger_mode {
            nightheat_config::TriggerMode::Interval => TriggerMode::Interval,
            nightheat_config::TriggerMode::Proximity => TriggerMode::Proximity {
                window: minutes(c.proximity_window_minutes),
            },
        }
    }
}

// ── RetryPolicy ──────────────────────────────────────────────────────────────

impl From<&nightheat_config::RetryCfg> for RetryPolicy {
    fn from(c: &nightheat_config::RetryCfg) -> Self {
        Self {
            max_attempts: c.max_attempts,
            base_delay: Duration::from_millis(c.base_delay_ms),
        }
    }
}

// ── ControllerCfg ────────────────────────────────────────────────────────────

impl From<&nightheat_config::Config> for ControllerCfg {
    fn from(c: &nightheat_config::Config) -> Self {
        Self {
            cycle: CyclePolicy::from(&c.schedule),
            trigger: TriggerMode::from(&c.schedule),
            warming_level: c.schedule.warming_level,
            retry: RetryPolicy::from(&c.retry),
            concurrency: c.runner.concurrency,
            profile_deadline: Duration::from_millis(c.runner.profile_deadline_ms),
        }
    }
}
