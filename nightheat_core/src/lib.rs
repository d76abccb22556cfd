#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core heating-schedule logic (device-agnostic).
//!
//! This crate turns a stored sleep profile into device commands. All I/O goes
//! through the `nightheat_traits` collaborator traits (`ProfileStore`,
//! `CredentialRefresher`, `BedDevice`, `Clock`).
//!
//! ## Architecture
//!
//! - **Cycle**: bed/wake clock strings to concrete stage boundaries (`cycle`)
//! - **Stage**: which stage an instant falls into (`stage`)
//! - **Setpoint**: stage to heating level or power-off (`setpoint`)
//! - **Evaluation**: the three steps above for one profile, no I/O (`evaluation`)
//! - **Actuation**: minimal, idempotent device commands with retry (`actuator`, `retry`)
//! - **Runner**: fetch, refresh, evaluate and actuate every profile (`runner`)
//!
//! ## Time
//!
//! "Now" is always a parameter. Boundaries are computed in the profile's IANA
//! timezone with `chrono-tz`; comparisons happen on absolute instants so DST
//! transitions need no special casing once local times are resolved.

pub mod actuator;
pub mod clock_time;
pub mod config;
pub mod conversions;
pub mod cycle;
pub mod device_error;
pub mod error;
pub mod evaluation;
pub mod mocks;
pub mod retry;
pub mod runner;
pub mod setpoint;
pub mod stage;

pub use actuator::{Actuator, Command, plan};
pub use clock_time::ClockTime;
pub use config::ControllerCfg;
pub use cycle::{CyclePolicy, CycleTemplate, SleepCycle, compute_cycle};
pub use error::{BuildError, Result, ThermoError};
pub use evaluation::{Evaluation, evaluate, parse_timezone};
pub use retry::RetryPolicy;
pub use runner::{CycleRunner, CycleRunnerBuilder, ProfileOutcome, RunReport};
pub use setpoint::{Setpoint, StageLevels};
pub use stage::{StageTag, StageWindow, TriggerMode, classify};
