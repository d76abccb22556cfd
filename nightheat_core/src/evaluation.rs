//! Pure per-profile evaluation: cycle, stage and setpoint for one instant.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use nightheat_traits::ThermalProfile;

use crate::config::ControllerCfg;
use crate::cycle::{CycleTemplate, SleepCycle};
use crate::error::{Result, ThermoError};
use crate::setpoint::{self, Setpoint, StageLevels};
use crate::stage::{self, StageTag};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub cycle: SleepCycle,
    pub stage: StageTag,
    pub setpoint: Setpoint,
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ThermoError::InvalidTimezone(format!("{name:?} is not an IANA timezone")))
}

/// Evaluate a profile at `now`. No I/O.
pub fn evaluate(profile: &ThermalProfile, now: DateTime<Utc>, cfg: &ControllerCfg) -> Result<Evaluation> {
    let tz = parse_timezone(&profile.timezone)?;
    let template = CycleTemplate::parse(tz, &profile.bed_time, &profile.wake_time, cfg.cycle)?;
    let local_now = now.with_timezone(&tz);
    let cycle = template.current(local_now);

    let collapsed = cycle.collapsed_stages();
    if !collapsed.is_empty() {
        tracing::debug!(
            user = %profile.user_id,
            ?collapsed,
            "short cycle: zero-width stages skipped"
        );
    }

    let stage = stage::classify(&cycle, local_now, cfg.trigger);
    let levels = StageLevels::from_profile(profile, cfg.warming_level);
    let setpoint = setpoint::decide(&cycle, stage, &levels, local_now, cfg.wake_grace());
    Ok(Evaluation {
        cycle,
        stage,
        setpoint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(tz: &str) -> ThermalProfile {
        ThermalProfile {
            user_id: "u1".into(),
            device_user_id: "d1".into(),
            bed_time: "22:00".into(),
            wake_time: "06:00".into(),
            timezone: tz.into(),
            initial_level: 10,
            mid_level: 20,
            final_level: 30,
        }
    }

    #[test]
    fn evaluates_in_profile_timezone() {
        // 20:05 UTC is 22:05 in Berlin (CEST)
        let now = "2024-06-01T20:05:00Z".parse().unwrap();
        let e = evaluate(&profile("Europe/Berlin"), now, &ControllerCfg::default()).unwrap();
        assert_eq!(e.stage, StageTag::Initial);
        assert_eq!(e.setpoint, Setpoint::Level(10));
    }

    #[test]
    fn device_is_switched_off_in_the_afternoon() {
        let now = "2024-06-01T15:00:00Z".parse().unwrap();
        let e = evaluate(&profile("UTC"), now, &ControllerCfg::default()).unwrap();
        assert_eq!(e.stage, StageTag::OutsideCycle);
        assert_eq!(e.setpoint, Setpoint::PowerOff);
    }

    #[test]
    fn proximity_grace_after_wake_holds_instead_of_heating() {
        let cfg = ControllerCfg {
            cycle: crate::cycle::CyclePolicy {
                warming_lead: Some(chrono::TimeDelta::minutes(10)),
                ..crate::cycle::CyclePolicy::default()
            },
            trigger: crate::stage::TriggerMode::Proximity {
                window: chrono::TimeDelta::minutes(15),
            },
            ..ControllerCfg::default()
        };
        let now = "2024-06-01T06:03:00Z".parse().unwrap();
        let e = evaluate(&profile("UTC"), now, &cfg).unwrap();
        assert_eq!(e.stage, StageTag::OutsideCycle);
        assert_eq!(e.setpoint, Setpoint::Hold);
    }

    #[test]
    fn unknown_timezone_is_typed_error() {
        let now = "2024-06-01T20:05:00Z".parse().unwrap();
        let err = evaluate(&profile("Mars/Olympus"), now, &ControllerCfg::default()).unwrap_err();
        assert!(matches!(err, ThermoError::InvalidTimezone(_)));
    }

    #[test]
    fn malformed_clock_is_typed_error() {
        let mut p = profile("UTC");
        p.wake_time = "6am".into();
        let now = "2024-06-01T20:05:00Z".parse().unwrap();
        let err = evaluate(&p, now, &ControllerCfg::default()).unwrap_err();
        assert!(matches!(err, ThermoError::InvalidTimeFormat(_)));
    }
}
