#![no_main]
use chrono::{DateTime, Utc};
use libfuzzer_sys::{arbitrary::Arbitrary, fuzz_target};
use nightheat_core::{ControllerCfg, evaluate};
use nightheat_traits::ThermalProfile;

#[derive(Arbitrary, Debug)]
struct Input {
    bed: String,
    wake: String,
    timezone: String,
    // Seconds since the epoch, folded into 1970..2100
    at: u32,
    proximity: bool,
}

fuzz_target!(|input: Input| {
    let profile = ThermalProfile {
        user_id: "fuzz".into(),
        device_user_id: "fuzz".into(),
        bed_time: input.bed,
        wake_time: input.wake,
        timezone: input.timezone,
        initial_level: 1,
        mid_level: 2,
        final_level: 3,
    };
    let Some(now) = DateTime::<Utc>::from_timestamp(i64::from(input.at) * 2, 0) else {
        return;
    };
    let mut cfg = ControllerCfg::default();
    if input.proximity {
        cfg.trigger = nightheat_core::TriggerMode::Proximity {
            window: chrono::TimeDelta::minutes(15),
        };
    }
    if let Ok(eval) = evaluate(&profile, now, &cfg) {
        let c = eval.cycle;
        assert!(c.pre_heat_start() <= c.bed_time());
        assert!(c.bed_time() <= c.mid_stage_start());
        assert!(c.mid_stage_start() <= c.final_stage_start());
        assert!(c.final_stage_start() <= c.wake_time());
    }
});
