use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;
use nightheat_core::{
    ClockTime, CyclePolicy, CycleTemplate, StageTag, TriggerMode, classify,
    cycle::ROLLOVER_HOURS,
};
use proptest::prelude::*;

const ZONES: &[Tz] = &[
    chrono_tz::UTC,
    chrono_tz::Europe::Berlin,
    chrono_tz::America::New_York,
    chrono_tz::Australia::Lord_Howe,
    chrono_tz::Asia::Kolkata,
    chrono_tz::America::St_Johns,
];

prop_compose! {
    fn clock()(h in 0u8..24, m in 0u8..60) -> ClockTime {
        ClockTime::new(h, m).unwrap()
    }
}

prop_compose! {
    fn policy()(
        lead in 1i64..=720,
        mid in 0i64..=600,
        fin in 0i64..=600,
        warm in proptest::option::of(0i64..=120),
    ) -> CyclePolicy {
        CyclePolicy {
            lead_time: TimeDelta::minutes(lead),
            mid_stage_offset: TimeDelta::minutes(mid),
            final_stage_lead: TimeDelta::minutes(fin),
            warming_lead: warm.map(TimeDelta::minutes),
        }
    }
}

prop_compose! {
    fn instant()(secs in 1_577_836_800i64..1_893_456_000) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn boundaries_are_ordered(
        zone in 0usize..ZONES.len(),
        bed in clock(),
        wake in clock(),
        policy in policy(),
        now in instant(),
    ) {
        let tz = ZONES[zone];
        let c = CycleTemplate::new(tz, bed, wake, policy).current(now.with_timezone(&tz));
        prop_assert!(c.pre_heat_start() < c.bed_time());
        prop_assert!(c.bed_time() <= c.mid_stage_start());
        prop_assert!(c.mid_stage_start() <= c.final_stage_start());
        prop_assert!(c.final_stage_start() <= c.wake_time());
        if let Some(w) = c.warming_start() {
            prop_assert!(c.final_stage_start() <= w && w <= c.wake_time());
        }
        prop_assert!(c.wake_time() - c.pre_heat_start() <= TimeDelta::days(1));
    }

    #[test]
    fn windows_partition_the_cycle(
        zone in 0usize..ZONES.len(),
        bed in clock(),
        wake in clock(),
        policy in policy(),
        now in instant(),
    ) {
        let tz = ZONES[zone];
        let local = now.with_timezone(&tz);
        let c = CycleTemplate::new(tz, bed, wake, policy).current(local);
        let windows = c.stage_windows();

        prop_assert_eq!(windows[0].start, c.pre_heat_start());
        prop_assert_eq!(windows[windows.len() - 1].end, c.wake_time());
        for pair in windows.windows(2) {
            prop_assert_eq!(pair[0].end, pair[1].start);
        }

        let containing: Vec<StageTag> = windows
            .iter()
            .filter(|w| w.contains(local))
            .map(|w| w.stage)
            .collect();
        prop_assert!(containing.len() <= 1);
        let tag = classify(&c, local, TriggerMode::Interval);
        match containing.first() {
            Some(stage) => prop_assert_eq!(tag, *stage),
            None => {
                prop_assert_eq!(tag, StageTag::OutsideCycle);
                prop_assert!(!c.contains(local));
            }
        }
    }

    #[test]
    fn proximity_never_picks_a_collapsed_stage(
        zone in 0usize..ZONES.len(),
        bed in clock(),
        wake in clock(),
        policy in policy(),
        now in instant(),
        window in 0i64..=60,
    ) {
        let tz = ZONES[zone];
        let local = now.with_timezone(&tz);
        let c = CycleTemplate::new(tz, bed, wake, policy).current(local);
        let tag = classify(&c, local, TriggerMode::Proximity { window: TimeDelta::minutes(window) });
        prop_assert!(!c.collapsed_stages().contains(&tag));
    }

    #[test]
    fn normalization_is_idempotent_and_anchor_free(
        zone in 0usize..ZONES.len(),
        bed in clock(),
        wake in clock(),
        policy in policy(),
        now in instant(),
        offset in -5i64..=5,
    ) {
        let tz = ZONES[zone];
        let local = now.with_timezone(&tz);
        let template = CycleTemplate::new(tz, bed, wake, policy);
        let current = template.current(local);
        prop_assert_eq!(current.normalized(local), current);

        let anchor: NaiveDate = local.date_naive() + TimeDelta::days(offset);
        prop_assert_eq!(template.anchored(anchor).normalized(local), current);
    }

    #[test]
    fn current_cycle_follows_the_rollover_horizon(
        zone in 0usize..ZONES.len(),
        bed in clock(),
        wake in clock(),
        policy in policy(),
        now in instant(),
    ) {
        let tz = ZONES[zone];
        let local = now.with_timezone(&tz);
        let c = CycleTemplate::new(tz, bed, wake, policy).current(local);
        let horizon = local + TimeDelta::hours(ROLLOVER_HOURS);
        if !c.contains(local) {
            prop_assert!(c.wake_time() <= horizon);
            prop_assert!(c.shifted(1).wake_time() > horizon);
        }
    }
}
