//! Cycle boundary calculation.
//!
//! A profile's `bed_time`/`wake_time` strings describe a recurring nightly cycle.
//! `CycleTemplate` holds the parsed strings plus the stage policy; anchoring it on a
//! local calendar date yields one concrete `SleepCycle`. `SleepCycle::normalized`
//! then moves the cycle, as one unit and by whole local days, to the instance
//! current at the reference instant.
//!
//! Boundaries are built relative to bed and wake and clamped monotone, so
//! `pre_heat_start < bed_time <= mid_stage_start <= final_stage_start
//! (<= warming_start) <= wake_time` always holds and `wake_time` is never more
//! than one day after `pre_heat_start`. A stage whose span is too short collapses to
//! zero width instead of being rejected.

use chrono::{DateTime, LocalResult, NaiveDate, Offset, TimeDelta, TimeZone};
use chrono_tz::Tz;

use crate::clock_time::ClockTime;
use crate::error::Result;

/// A wake time further ahead than this belongs to a cycle that has not started yet.
pub const ROLLOVER_HOURS: i64 = 12;

/// Stage spacing around bed and wake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CyclePolicy {
    /// Pre-heating starts this long before bed
    pub lead_time: TimeDelta,
    /// Mid stage starts this long after bed
    pub mid_stage_offset: TimeDelta,
    /// Final stage starts this long before wake
    pub final_stage_lead: TimeDelta,
    /// Warming spike starts this long before wake; `None` disables the stage
    pub warming_lead: Option<TimeDelta>,
}

impl Default for CyclePolicy {
    fn default() -> Self {
        Self {
            lead_time: TimeDelta::hours(1),
            mid_stage_offset: TimeDelta::hours(1),
            final_stage_lead: TimeDelta::hours(2),
            warming_lead: None,
        }
    }
}

/// Parsed clock strings + policy in one timezone; the recipe for every cycle instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleTemplate {
    tz: Tz,
    bed: ClockTime,
    wake: ClockTime,
    policy: CyclePolicy,
}

impl CycleTemplate {
    pub fn new(tz: Tz, bed: ClockTime, wake: ClockTime, policy: CyclePolicy) -> Self {
        Self {
            tz,
            bed,
            wake,
            policy,
        }
    }

    pub fn parse(tz: Tz, bed: &str, wake: &str, policy: CyclePolicy) -> Result<Self> {
        Ok(Self::new(tz, bed.parse()?, wake.parse()?, policy))
    }

    #[inline]
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Build the cycle whose bedtime falls on `date` (local calendar).
    pub fn anchored(&self, date: NaiveDate) -> SleepCycle {
        let p = &self.policy;
        let bed_time = local_instant(&self.tz, date, self.bed);
        let pre_heat_start = bed_time - p.lead_time;

        let wake_date = if self.wake <= self.bed {
            shift_date(date, 1)
        } else {
            date
        };
        let wake_time = local_instant(&self.tz, wake_date, self.wake)
            .max(bed_time)
            .min(pre_heat_start + TimeDelta::days(1));

        let mid_stage_start = (bed_time + p.mid_stage_offset).min(wake_time);
        let final_stage_start = (wake_time - p.final_stage_lead).clamp(mid_stage_start, wake_time);
        let warming_start = p
            .warming_lead
            .map(|lead| (wake_time - lead).clamp(final_stage_start, wake_time));

        SleepCycle {
            template: *self,
            anchor: date,
            pre_heat_start,
            bed_time,
            mid_stage_start,
            final_stage_start,
            warming_start,
            wake_time,
        }
    }

    /// The cycle instance current at `now`; see `SleepCycle::normalized`.
    pub fn current(&self, now: DateTime<Tz>) -> SleepCycle {
        let now = now.with_timezone(&self.tz);
        self.anchored(now.date_naive()).normalized(now)
    }
}

/// Concrete stage boundaries of one nightly cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepCycle {
    template: CycleTemplate,
    anchor: NaiveDate,
    pre_heat_start: DateTime<Tz>,
    bed_time: DateTime<Tz>,
    mid_stage_start: DateTime<Tz>,
    final_stage_start: DateTime<Tz>,
    warming_start: Option<DateTime<Tz>>,
    wake_time: DateTime<Tz>,
}

impl SleepCycle {
    pub fn pre_heat_start(&self) -> DateTime<Tz> {
        self.pre_heat_start
    }
    pub fn bed_time(&self) -> DateTime<Tz> {
        self.bed_time
    }
    pub fn mid_stage_start(&self) -> DateTime<Tz> {
        self.mid_stage_start
    }
    pub fn final_stage_start(&self) -> DateTime<Tz> {
        self.final_stage_start
    }
    pub fn warming_start(&self) -> Option<DateTime<Tz>> {
        self.warming_start
    }
    pub fn wake_time(&self) -> DateTime<Tz> {
        self.wake_time
    }
    /// Local date the cycle's bedtime was anchored on.
    pub fn anchor_date(&self) -> NaiveDate {
        self.anchor
    }
    pub fn template(&self) -> &CycleTemplate {
        &self.template
    }

    /// True while `now` is in `[pre_heat_start, wake_time)`.
    #[inline]
    pub fn contains(&self, now: DateTime<Tz>) -> bool {
        self.pre_heat_start <= now && now < self.wake_time
    }

    #[inline]
    pub fn is_after_wake(&self, now: DateTime<Tz>) -> bool {
        now > self.wake_time
    }

    /// Same template anchored `days` local calendar days later (or earlier).
    pub fn shifted(&self, days: i64) -> SleepCycle {
        self.template.anchored(shift_date(self.anchor, days))
    }

    /// Day-rollover normalization.
    ///
    /// Picks the current instance of this cycle for `now`: the one containing
    /// `now` if any, otherwise the latest one whose wake time is at most
    /// `ROLLOVER_HOURS` ahead of `now`. A finished night stays current until the
    /// next wake is within `ROLLOVER_HOURS`. The result does not depend on which
    /// day `self` was anchored on, and normalizing twice equals normalizing once.
    pub fn normalized(self, now: DateTime<Tz>) -> SleepCycle {
        let now = now.with_timezone(&self.template.tz);
        let jump = now.date_naive().signed_duration_since(self.anchor).num_days();
        let base = if jump == 0 { self } else { self.shifted(jump) };

        // Anchors two days either side of now's date cover every candidate.
        let candidates = [-2, -1, 0, 1, 2].map(|d| base.shifted(d));
        if let Some(c) = candidates.iter().find(|c| c.contains(now)) {
            return *c;
        }
        let horizon = now + TimeDelta::hours(ROLLOVER_HOURS);
        candidates
            .iter()
            .rev()
            .find(|c| c.wake_time <= horizon)
            .copied()
            .unwrap_or(base)
    }
}

/// Cycle Boundary Calculator: boundaries of the cycle current at `now` for the given
/// local clock strings, in `now`'s timezone.
pub fn compute_cycle(
    now: DateTime<Tz>,
    bed_time: &str,
    wake_time: &str,
    policy: &CyclePolicy,
) -> Result<SleepCycle> {
    let template = CycleTemplate::parse(now.timezone(), bed_time, wake_time, *policy)?;
    Ok(template.current(now))
}

/// Saturates at the calendar bounds.
fn shift_date(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(TimeDelta::days(days)).unwrap_or(date)
}

/// Resolve a local wall-clock time on `date`.
///
/// Ambiguous times (DST fall-back) take the earlier instant; nonexistent times
/// (DST spring-forward gap) are shifted forward by the length of the gap.
fn local_instant(tz: &Tz, date: NaiveDate, clock: ClockTime) -> DateTime<Tz> {
    let naive = date.and_time(clock.to_naive());
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => t,
        LocalResult::Ambiguous(earlier, _) => earlier,
        LocalResult::None => {
            let before = tz.offset_from_utc_datetime(&(naive - TimeDelta::days(1)));
            let utc = naive - TimeDelta::seconds(i64::from(before.fix().local_minus_utc()));
            tz.from_utc_datetime(&utc)
        }
    }
}
