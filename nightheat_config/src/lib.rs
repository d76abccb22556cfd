#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the nightly heating controller.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Every section has defaults so a partial (or empty) file is accepted;
//!   `validate()` rejects out-of-range values with the offending key in the message.
use serde::Deserialize;

/// Lowest heating level accepted anywhere in the config.
pub const LEVEL_MIN: i32 = -100;
/// Highest heating level accepted anywhere in the config.
pub const LEVEL_MAX: i32 = 100;

/// How the stage classifier treats stage edges.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    /// Strict half-open interval membership.
    #[default]
    Interval,
    /// Fire a stage early/late when within `proximity_window_minutes` of its boundary.
    Proximity,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScheduleCfg {
    /// Minutes before bedtime at which pre-heating starts
    pub lead_time_minutes: u32,
    /// Minutes after bedtime at which the mid stage starts
    pub mid_stage_offset_minutes: u32,
    /// Minutes before wake at which the final stage starts
    pub final_stage_lead_minutes: u32,
    /// Enable the short warming spike right before wake
    pub warming_enabled: bool,
    /// Minutes before wake at which the warming spike starts
    pub warming_lead_minutes: u32,
    /// Target level during the warming spike
    pub warming_level: i32,
    pub trigger_mode: TriggerMode,
    /// Boundary proximity window used in `proximity` mode
    pub proximity_window_minutes: u32,
}

impl Default for ScheduleCfg {
    fn default() -> Self {
        Self {
            lead_time_minutes: 60,
            mid_stage_offset_minutes: 60,
            final_stage_lead_minutes: 120,
            warming_enabled: false,
            warming_lead_minutes: 30,
            warming_level: 10,
            trigger_mode: TriggerMode::Interval,
            proximity_window_minutes: 15,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RetryCfg {
    /// Attempts per device call, including the first one
    pub max_attempts: u32,
    /// First backoff delay; doubles after every failed attempt
    pub base_delay_ms: u64,
}

impl Default for RetryCfg {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunnerCfg {
    /// Profiles evaluated concurrently within one run
    pub concurrency: usize,
    /// Outer deadline for one profile's evaluation
    pub profile_deadline_ms: u64,
    /// Poll interval used by `nightheat watch`
    pub watch_interval_secs: u64,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            concurrency: 4,
            profile_deadline_ms: 30_000,
            watch_interval_secs: 300,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreCfg {
    /// TOML file holding profiles and their credentials
    pub profiles_path: String,
}

impl Default for StoreCfg {
    fn default() -> Self {
        Self {
            profiles_path: "etc/profiles.toml".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeviceBackend {
    #[default]
    Simulated,
    Http,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeviceCfg {
    pub backend: DeviceBackend,
    /// Vendor device API root (http backend)
    pub api_base_url: Option<String>,
    /// Vendor token endpoint root (http backend)
    pub auth_base_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub request_timeout_ms: u64,
    /// Lifetime of tokens minted by the simulated auth backend
    pub token_lifetime_secs: u64,
}

impl Default for DeviceCfg {
    fn default() -> Self {
        Self {
            backend: DeviceBackend::Simulated,
            api_base_url: None,
            auth_base_url: None,
            client_id: None,
            client_secret: None,
            request_timeout_ms: 10_000,
            token_lifetime_secs: 3600,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub schedule: ScheduleCfg,
    pub retry: RetryCfg,
    pub runner: RunnerCfg,
    pub store: StoreCfg,
    pub device: DeviceCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

const MAX_OFFSET_MINUTES: u32 = 12 * 60;

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Schedule
        let s = &self.schedule;
        if s.lead_time_minutes == 0 {
            eyre::bail!("schedule.lead_time_minutes must be >= 1");
        }
        if s.lead_time_minutes > MAX_OFFSET_MINUTES {
            eyre::bail!("schedule.lead_time_minutes must be <= 720 (12h)");
        }
        if s.mid_stage_offset_minutes == 0 || s.mid_stage_offset_minutes > MAX_OFFSET_MINUTES {
            eyre::bail!("schedule.mid_stage_offset_minutes must be in [1, 720]");
        }
        if s.final_stage_lead_minutes > MAX_OFFSET_MINUTES {
            eyre::bail!("schedule.final_stage_lead_minutes must be <= 720 (12h)");
        }
        if s.warming_enabled {
            if s.warming_lead_minutes == 0 {
                eyre::bail!("schedule.warming_lead_minutes must be >= 1 when warming is enabled");
            }
            if s.warming_lead_minutes >= s.final_stage_lead_minutes {
                eyre::bail!(
                    "schedule.warming_lead_minutes must be < schedule.final_stage_lead_minutes"
                );
            }
        }
        if !(LEVEL_MIN..=LEVEL_MAX).contains(&s.warming_level) {
            eyre::bail!("schedule.warming_level must be in [{LEVEL_MIN}, {LEVEL_MAX}]");
        }
        if s.trigger_mode == TriggerMode::Proximity
            && (s.proximity_window_minutes == 0 || s.proximity_window_minutes > 60)
        {
            eyre::bail!("schedule.proximity_window_minutes must be in [1, 60]");
        }

        // Retry
        if self.retry.max_attempts == 0 || self.retry.max_attempts > 10 {
            eyre::bail!("retry.max_attempts must be in [1, 10]");
        }
        if self.retry.base_delay_ms > 60_000 {
            eyre::bail!("retry.base_delay_ms is unreasonably large (>60s)");
        }

        // Runner
        if self.runner.concurrency == 0 {
            eyre::bail!("runner.concurrency must be >= 1");
        }
        if self.runner.profile_deadline_ms == 0 {
            eyre::bail!("runner.profile_deadline_ms must be >= 1");
        }
        if self.runner.watch_interval_secs == 0 {
            eyre::bail!("runner.watch_interval_secs must be >= 1");
        }

        // Store
        if self.store.profiles_path.trim().is_empty() {
            eyre::bail!("store.profiles_path must not be empty");
        }

        // Device
        if self.device.backend == DeviceBackend::Http {
            if self.device.api_base_url.as_deref().is_none_or(str::is_empty) {
                eyre::bail!("device.api_base_url is required for the http backend");
            }
            if self.device.auth_base_url.as_deref().is_none_or(str::is_empty) {
                eyre::bail!("device.auth_base_url is required for the http backend");
            }
        }
        if self.device.request_timeout_ms == 0 {
            eyre::bail!("device.request_timeout_ms must be >= 1");
        }
        if self.device.token_lifetime_secs == 0 {
            eyre::bail!("device.token_lifetime_secs must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of: never, daily, hourly");
        }
        Ok(())
    }
}
