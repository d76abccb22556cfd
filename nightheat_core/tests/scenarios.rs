//! End-to-end scenarios for a 22:00 → 06:00 sleeper.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use nightheat_core::mocks::{BedCall, MemoryStore, ScriptedBed, StaticAuth};
use nightheat_core::{
    Command, ControllerCfg, CycleRunner, Setpoint, StageTag, ThermoError, evaluate,
};
use nightheat_traits::clock::test_clock::TestClock;
use nightheat_traits::{Credential, DeviceState, ProfileRecord, ThermalProfile};
use rstest::rstest;

fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, d, h, m, 0).unwrap()
}

fn profile(bed: &str, wake: &str) -> ThermalProfile {
    ThermalProfile {
        user_id: "alice".into(),
        device_user_id: "dev-alice".into(),
        bed_time: bed.into(),
        wake_time: wake.into(),
        timezone: "UTC".into(),
        initial_level: 10,
        mid_level: 20,
        final_level: 30,
    }
}

fn record(profile: ThermalProfile) -> ProfileRecord {
    ProfileRecord {
        profile,
        credential: Credential {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at: utc(30, 0, 0),
        },
    }
}

fn runner(bed: Arc<ScriptedBed>, now: DateTime<Utc>, records: Vec<ProfileRecord>) -> CycleRunner {
    CycleRunner::builder()
        .with_store(Arc::new(MemoryStore::new(records)))
        .with_auth(Arc::new(StaticAuth::new(utc(30, 0, 0))))
        .with_device(bed)
        .with_clock(Arc::new(TestClock::at(now)))
        .with_config(ControllerCfg::default())
        .try_build()
        .unwrap()
}

#[rstest]
#[case::preheating(utc(10, 21, 5), StageTag::PreHeating, Setpoint::Level(10))]
#[case::mid(utc(10, 23, 30), StageTag::Mid, Setpoint::Level(20))]
#[case::initial(utc(10, 22, 30), StageTag::Initial, Setpoint::Level(10))]
#[case::final_stage(utc(11, 5, 0), StageTag::Final, Setpoint::Level(30))]
#[case::after_wake(utc(11, 7, 0), StageTag::OutsideCycle, Setpoint::PowerOff)]
#[case::before_preheat(utc(10, 20, 0), StageTag::OutsideCycle, Setpoint::Hold)]
fn stage_and_setpoint(
    #[case] now: DateTime<Utc>,
    #[case] stage: StageTag,
    #[case] setpoint: Setpoint,
) {
    let e = evaluate(&profile("22:00", "06:00"), now, &ControllerCfg::default()).unwrap();
    assert_eq!(e.stage, stage);
    assert_eq!(e.setpoint, setpoint);
}

#[test]
fn mid_stage_starts_an_hour_after_bed() {
    let e = evaluate(&profile("22:00", "06:00"), utc(10, 23, 30), &ControllerCfg::default()).unwrap();
    assert_eq!(e.cycle.mid_stage_start().with_timezone(&Utc), utc(10, 23, 0));
}

#[tokio::test]
async fn after_wake_powers_off_heating_device() {
    let bed = Arc::new(ScriptedBed::new().with_state(
        "dev-alice",
        DeviceState {
            is_heating: true,
            heating_level: 30,
        },
    ));
    let now = utc(11, 7, 0);
    let report = runner(bed.clone(), now, vec![record(profile("22:00", "06:00"))])
        .run_cycle(None)
        .await
        .unwrap();

    let out = &report.outcomes[0];
    assert_eq!(out.stage, Some(StageTag::OutsideCycle));
    assert_eq!(out.commands, vec![Command::PowerOff]);
    assert_eq!(bed.writes(), vec![("dev-alice".into(), BedCall::SetPower(false))]);
    assert!(!bed.state("dev-alice").is_heating);
}

#[tokio::test]
async fn midday_with_device_off_makes_no_writes() {
    let bed = Arc::new(ScriptedBed::new());
    let report = runner(bed.clone(), utc(11, 12, 0), vec![record(profile("22:00", "06:00"))])
        .run_cycle(None)
        .await
        .unwrap();

    let out = &report.outcomes[0];
    assert_eq!(out.stage, Some(StageTag::OutsideCycle));
    assert!(out.commands.is_empty());
    assert!(bed.writes().is_empty());
    assert!(out.is_ok());
}

#[test]
fn late_bed_wakes_next_day_with_final_after_mid() {
    let e = evaluate(&profile("23:00", "06:00"), utc(10, 23, 30), &ControllerCfg::default()).unwrap();
    let c = e.cycle;
    assert_eq!(c.bed_time().with_timezone(&Utc), utc(10, 23, 0));
    assert_eq!(c.wake_time().with_timezone(&Utc), utc(11, 6, 0));
    assert!(c.final_stage_start() > c.mid_stage_start());
    assert_eq!(e.stage, StageTag::Initial);
}

#[tokio::test]
async fn heating_at_target_makes_no_writes() {
    let bed = Arc::new(ScriptedBed::new().with_state(
        "dev-alice",
        DeviceState {
            is_heating: true,
            heating_level: 20,
        },
    ));
    let report = runner(bed.clone(), utc(10, 23, 30), vec![record(profile("22:00", "06:00"))])
        .run_cycle(None)
        .await
        .unwrap();
    assert_eq!(report.outcomes[0].setpoint, Some(Setpoint::Level(20)));
    assert!(report.outcomes[0].commands.is_empty());
    assert!(bed.writes().is_empty());
}

#[tokio::test]
async fn cold_device_is_powered_on_then_leveled() {
    let bed = Arc::new(ScriptedBed::new());
    let report = runner(bed.clone(), utc(10, 21, 5), vec![record(profile("22:00", "06:00"))])
        .run_cycle(None)
        .await
        .unwrap();
    assert_eq!(
        report.outcomes[0].commands,
        vec![Command::PowerOn, Command::SetLevel(10)]
    );
    assert_eq!(
        bed.state("dev-alice"),
        DeviceState {
            is_heating: true,
            heating_level: 10
        }
    );
}

#[test]
fn bad_profile_timezone_is_reported() {
    let mut p = profile("22:00", "06:00");
    p.timezone = "Nowhere/Special".into();
    let err = evaluate(&p, utc(10, 21, 5), &ControllerCfg::default()).unwrap_err();
    assert!(matches!(err, ThermoError::InvalidTimezone(_)));
}
