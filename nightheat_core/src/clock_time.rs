//! Local wall-clock times (`HH:MM`) as stored in profiles.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;

use crate::error::ThermoError;

/// A validated hour/minute pair in `[0,23] x [0,59]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime {
    hour: u8,
    minute: u8,
}

impl ClockTime {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    #[inline]
    pub fn hour(self) -> u8 {
        self.hour
    }

    #[inline]
    pub fn minute(self) -> u8 {
        self.minute
    }

    pub fn to_naive(self) -> NaiveTime {
        // In range by construction.
        NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl FromStr for ClockTime {
    type Err = ThermoError;

    /// Accepts `H:MM` or `HH:MM` with surrounding whitespace; no seconds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ThermoError::InvalidTimeFormat(format!("{s:?} is not HH:MM"));
        let (h, m) = s.trim().split_once(':').ok_or_else(bad)?;
        let digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
        if h.is_empty() || h.len() > 2 || m.len() != 2 || !digits(h) || !digits(m) {
            return Err(bad());
        }
        let hour: u8 = h.parse().map_err(|_| bad())?;
        let minute: u8 = m.parse().map_err(|_| bad())?;
        Self::new(hour, minute).ok_or_else(|| {
            ThermoError::InvalidTimeFormat(format!("{s:?} is outside 00:00..=23:59"))
        })
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}
