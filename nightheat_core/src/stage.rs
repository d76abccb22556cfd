//! Stage classification.

use std::fmt;

use chrono::{DateTime, TimeDelta};
use chrono_tz::Tz;
use serde::Serialize;

use crate::cycle::SleepCycle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageTag {
    PreHeating,
    Initial,
    Mid,
    Final,
    Warming,
    OutsideCycle,
}

impl StageTag {
    pub fn as_str(self) -> &'static str {
        match self {
            StageTag::PreHeating => "pre-heating",
            StageTag::Initial => "initial",
            StageTag::Mid => "mid",
            StageTag::Final => "final",
            StageTag::Warming => "warming",
            StageTag::OutsideCycle => "outside-cycle",
        }
    }
}

impl fmt::Display for StageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How stage edges are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerMode {
    /// Half-open interval membership only.
    #[default]
    Interval,
    /// A boundary within `window` of now selects the stage it opens.
    Proximity { window: TimeDelta },
}

/// One half-open stage interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageWindow {
    pub stage: StageTag,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl StageWindow {
    #[inline]
    pub fn is_collapsed(&self) -> bool {
        self.start >= self.end
    }

    #[inline]
    pub fn contains(&self, now: DateTime<Tz>) -> bool {
        self.start <= now && now < self.end
    }
}

impl SleepCycle {
    /// Stage windows in ascending order; adjacent windows share their edge.
    pub fn stage_windows(&self) -> Vec<StageWindow> {
        let final_end = self.warming_start().unwrap_or(self.wake_time());
        let mut windows = vec![
            StageWindow {
                stage: StageTag::PreHeating,
                start: self.pre_heat_start(),
                end: self.bed_time(),
            },
            StageWindow {
                stage: StageTag::Initial,
                start: self.bed_time(),
                end: self.mid_stage_start(),
            },
            StageWindow {
                stage: StageTag::Mid,
                start: self.mid_stage_start(),
                end: self.final_stage_start(),
            },
            StageWindow {
                stage: StageTag::Final,
                start: self.final_stage_start(),
                end: final_end,
            },
        ];
        if let Some(warming) = self.warming_start() {
            windows.push(StageWindow {
                stage: StageTag::Warming,
                start: warming,
                end: self.wake_time(),
            });
        }
        windows
    }

    /// Stages squeezed to zero width by a short night.
    pub fn collapsed_stages(&self) -> Vec<StageTag> {
        self.stage_windows()
            .into_iter()
            .filter(StageWindow::is_collapsed)
            .map(|w| w.stage)
            .collect()
    }
}

/// Stage Classifier: exactly one tag for `now`.
pub fn classify(cycle: &SleepCycle, now: DateTime<Tz>, mode: TriggerMode) -> StageTag {
    match mode {
        TriggerMode::Interval => classify_interval(cycle, now),
        TriggerMode::Proximity { window } => {
            classify_proximity(cycle, now, window).unwrap_or_else(|| classify_interval(cycle, now))
        }
    }
}

fn classify_interval(cycle: &SleepCycle, now: DateTime<Tz>) -> StageTag {
    cycle
        .stage_windows()
        .into_iter()
        .find(|w| w.contains(now))
        .map_or(StageTag::OutsideCycle, |w| w.stage)
}

// Priority: warming > bed/pre-heat transition > mid > final.
const PROXIMITY_PRIORITY: [StageTag; 5] = [
    StageTag::Warming,
    StageTag::Initial,
    StageTag::PreHeating,
    StageTag::Mid,
    StageTag::Final,
];

// A stage may fire early, never after its window has closed or past wake.
fn classify_proximity(cycle: &SleepCycle, now: DateTime<Tz>, window: TimeDelta) -> Option<StageTag> {
    if now >= cycle.wake_time() {
        return None;
    }
    let windows = cycle.stage_windows();
    PROXIMITY_PRIORITY.into_iter().find(|stage| {
        windows.iter().find(|w| w.stage == *stage).is_some_and(|w| {
            !w.is_collapsed() && now < w.end && (now - w.start).abs() <= window
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::{CyclePolicy, compute_cycle};
    use chrono::TimeZone;
    use rstest::rstest;

    fn local(h: u32, m: u32) -> DateTime<Tz> {
        chrono_tz::UTC
            .with_ymd_and_hms(2024, 3, 10, h, m, 0)
            .single()
            .expect("valid")
    }

    fn warming_policy() -> CyclePolicy {
        CyclePolicy {
            warming_lead: Some(TimeDelta::minutes(30)),
            ..CyclePolicy::default()
        }
    }

    #[rstest]
    #[case(21, 5, StageTag::PreHeating)]
    #[case(22, 0, StageTag::Initial)]
    #[case(22, 59, StageTag::Initial)]
    #[case(23, 0, StageTag::Mid)]
    #[case(23, 30, StageTag::Mid)]
    #[case(4, 0, StageTag::Final)]
    #[case(5, 59, StageTag::Final)]
    #[case(6, 0, StageTag::OutsideCycle)]
    #[case(12, 0, StageTag::OutsideCycle)]
    #[case(20, 59, StageTag::OutsideCycle)]
    fn interval_mode(#[case] h: u32, #[case] m: u32, #[case] expected: StageTag) {
        let now = local(h, m);
        let cycle = compute_cycle(now, "22:00", "06:00", &CyclePolicy::default()).unwrap();
        assert_eq!(classify(&cycle, now, TriggerMode::Interval), expected);
    }

    #[rstest]
    #[case(5, 29, StageTag::Final)]
    #[case(5, 30, StageTag::Warming)]
    #[case(5, 59, StageTag::Warming)]
    fn warming_stage_precedes_wake(#[case] h: u32, #[case] m: u32, #[case] expected: StageTag) {
        let now = local(h, m);
        let cycle = compute_cycle(now, "22:00", "06:00", &warming_policy()).unwrap();
        assert_eq!(classify(&cycle, now, TriggerMode::Interval), expected);
    }

    #[rstest]
    // 10 minutes before pre-heat start fires pre-heating early
    #[case(20, 50, StageTag::PreHeating)]
    // near bed beats interval membership of pre-heating
    #[case(21, 50, StageTag::Initial)]
    // near mid start fires mid early
    #[case(22, 46, StageTag::Mid)]
    // near the final start fires final early
    #[case(3, 50, StageTag::Final)]
    // warming (05:30) wins over final membership
    #[case(5, 20, StageTag::Warming)]
    // far from any boundary falls back to intervals
    #[case(1, 0, StageTag::Mid)]
    #[case(14, 0, StageTag::OutsideCycle)]
    fn proximity_mode(#[case] h: u32, #[case] m: u32, #[case] expected: StageTag) {
        let now = local(h, m);
        let cycle = compute_cycle(now, "22:00", "06:00", &warming_policy()).unwrap();
        let mode = TriggerMode::Proximity {
            window: TimeDelta::minutes(15),
        };
        assert_eq!(classify(&cycle, now, mode), expected);
    }

    #[rstest]
    // warming opened at 05:50 and closed at wake
    #[case(6, 3)]
    #[case(6, 0)]
    fn proximity_does_not_reopen_warming_after_wake(#[case] h: u32, #[case] m: u32) {
        let policy = CyclePolicy {
            warming_lead: Some(TimeDelta::minutes(10)),
            ..CyclePolicy::default()
        };
        let now = local(h, m);
        let cycle = compute_cycle(now, "22:00", "06:00", &policy).unwrap();
        let mode = TriggerMode::Proximity {
            window: TimeDelta::minutes(15),
        };
        assert_eq!(classify(&cycle, now, mode), StageTag::OutsideCycle);
    }

    #[test]
    fn proximity_skips_a_window_that_already_closed() {
        // Initial [22:00, 23:00) has closed; bed is within the window but mid is current.
        let now = local(23, 10);
        let cycle = compute_cycle(now, "22:00", "06:00", &CyclePolicy::default()).unwrap();
        let mode = TriggerMode::Proximity {
            window: TimeDelta::minutes(75),
        };
        assert_eq!(classify(&cycle, now, mode), StageTag::Mid);
    }

    #[test]
    fn collapsed_mid_is_skipped() {
        let now = local(22, 30);
        let cycle = compute_cycle(now, "22:00", "23:30", &CyclePolicy::default()).unwrap();
        assert_eq!(
            cycle.collapsed_stages(),
            vec![StageTag::Mid]
        );
        // bed+1h = 23:00 = mid start; final = max(21:30, mid) = 23:00
        assert_eq!(classify(&cycle, local(23, 10), TriggerMode::Interval), StageTag::Final);
        let prox = TriggerMode::Proximity {
            window: TimeDelta::minutes(15),
        };
        assert_ne!(classify(&cycle, local(22, 55), prox), StageTag::Mid);
    }

    #[test]
    fn display_uses_kebab_case() {
        assert_eq!(StageTag::PreHeating.to_string(), "pre-heating");
        assert_eq!(StageTag::OutsideCycle.to_string(), "outside-cycle");
    }
}
