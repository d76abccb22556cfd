//! Run Orchestrator: one pass over every stored profile.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use nightheat_traits::{
    BedDevice, Clock, CredentialRefresher, DeviceState, ProfileRecord, ProfileStore, SystemClock,
};
use serde::{Serialize, Serializer};
use tracing::Instrument;

use crate::actuator::{Actuator, Command, plan};
use crate::config::ControllerCfg;
use crate::error::{BuildError, Result, ThermoError};
use crate::evaluation::evaluate;
use crate::setpoint::Setpoint;
use crate::stage::StageTag;

/// What happened to one profile during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileOutcome {
    pub user_id: String,
    pub stage: Option<StageTag>,
    pub setpoint: Option<Setpoint>,
    /// Issued commands, or planned ones in a dry run.
    pub commands: Vec<Command>,
    #[serde(serialize_with = "error_text")]
    pub error: Option<ThermoError>,
}

impl ProfileOutcome {
    fn new(user_id: String) -> Self {
        Self {
            user_id,
            stage: None,
            setpoint: None,
            commands: Vec::new(),
            error: None,
        }
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

fn error_text<S: Serializer>(e: &Option<ThermoError>, s: S) -> std::result::Result<S::Ok, S::Error> {
    match e {
        Some(e) => s.serialize_some(&e.to_string()),
        None => s.serialize_none(),
    }
}

/// Summary of one `run_cycle` call. Outcomes are sorted by user id.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub reference: DateTime<Utc>,
    pub dry_run: bool,
    pub outcomes: Vec<ProfileOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

pub struct CycleRunner {
    store: Arc<dyn ProfileStore>,
    auth: Arc<dyn CredentialRefresher>,
    device: Arc<dyn BedDevice>,
    clock: Arc<dyn Clock>,
    cfg: ControllerCfg,
}

impl CycleRunner {
    pub fn builder() -> CycleRunnerBuilder {
        CycleRunnerBuilder::default()
    }

    pub fn config(&self) -> &ControllerCfg {
        &self.cfg
    }

    /// Evaluate and actuate every profile once.
    ///
    /// With `test_instant` the run is dry: the instant replaces the clock,
    /// credentials are neither refreshed nor persisted, the device is assumed
    /// off and no device call is made. Only a failed profile fetch is an
    /// error; per-profile failures land in the report.
    pub async fn run_cycle(&self, test_instant: Option<DateTime<Utc>>) -> Result<RunReport> {
        let dry_run = test_instant.is_some();
        let reference = test_instant.unwrap_or_else(|| self.clock.now());

        let records = self
            .store
            .fetch_profiles()
            .await
            .map_err(|e| ThermoError::Persistence(e.to_string()))?;
        tracing::info!(profiles = records.len(), dry_run, %reference, "run start");

        let mut outcomes: Vec<ProfileOutcome> = stream::iter(records)
            .map(|rec| self.run_guarded(rec, reference, dry_run))
            .buffer_unordered(self.cfg.concurrency.max(1))
            .collect()
            .await;
        outcomes.sort_by(|a, b| a.user_id.cmp(&b.user_id));

        let report = RunReport {
            reference,
            dry_run,
            outcomes,
        };
        tracing::info!(
            ok = report.succeeded(),
            failed = report.failed(),
            "run complete"
        );
        Ok(report)
    }

    async fn run_guarded(
        &self,
        rec: ProfileRecord,
        reference: DateTime<Utc>,
        dry_run: bool,
    ) -> ProfileOutcome {
        let span = tracing::info_span!("profile", user = %rec.profile.user_id);
        let mut outcome = ProfileOutcome::new(rec.profile.user_id.clone());
        let deadline = self.cfg.profile_deadline;

        let res = tokio::time::timeout(
            deadline,
            self.run_profile(rec, reference, dry_run, &mut outcome),
        )
        .instrument(span.clone())
        .await;

        let err = match res {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(_) => Some(ThermoError::DeadlineExceeded(
                u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
            )),
        };
        if let Some(e) = &err {
            span.in_scope(|| tracing::warn!(error = %e, "profile failed"));
        }
        outcome.error = err;
        outcome
    }

    async fn run_profile(
        &self,
        rec: ProfileRecord,
        reference: DateTime<Utc>,
        dry_run: bool,
        outcome: &mut ProfileOutcome,
    ) -> Result<()> {
        let ProfileRecord {
            profile,
            mut credential,
        } = rec;

        if !dry_run && credential.is_expired(reference) {
            credential = self
                .auth
                .refresh(&credential.refresh_token, &profile.device_user_id)
                .await
                .map_err(|e| ThermoError::Auth(e.to_string()))?;
            tracing::info!(expires_at = %credential.expires_at, "credential refreshed");
            self.store
                .persist_credential(&profile.user_id, &credential)
                .await
                .map_err(|e| ThermoError::Persistence(e.to_string()))?;
        }

        let eval = evaluate(&profile, reference, &self.cfg)?;
        outcome.stage = Some(eval.stage);
        outcome.setpoint = Some(eval.setpoint);
        tracing::info!(stage = %eval.stage, setpoint = ?eval.setpoint, "evaluated");

        if dry_run {
            outcome.commands = plan(eval.setpoint, DeviceState::default());
            return Ok(());
        }

        let actuator = Actuator::new(self.device.as_ref(), self.clock.as_ref(), self.cfg.retry);
        actuator
            .apply(
                &credential,
                &profile.device_user_id,
                eval.setpoint,
                &mut outcome.commands,
            )
            .await
    }
}

/// Builder for `CycleRunner`. Store, refresher and device are required.
#[derive(Default)]
pub struct CycleRunnerBuilder {
    store: Option<Arc<dyn ProfileStore>>,
    auth: Option<Arc<dyn CredentialRefresher>>,
    device: Option<Arc<dyn BedDevice>>,
    clock: Option<Arc<dyn Clock>>,
    cfg: Option<ControllerCfg>,
}

impl CycleRunnerBuilder {
    pub fn with_store(mut self, store: Arc<dyn ProfileStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_auth(mut self, auth: Arc<dyn CredentialRefresher>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_device(mut self, device: Arc<dyn BedDevice>) -> Self {
        self.device = Some(device);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_config(mut self, cfg: ControllerCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    pub fn try_build(self) -> std::result::Result<CycleRunner, BuildError> {
        let store = self.store.ok_or(BuildError::MissingStore)?;
        let auth = self.auth.ok_or(BuildError::MissingAuth)?;
        let device = self.device.ok_or(BuildError::MissingDevice)?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()) as Arc<dyn Clock>);
        let cfg = self.cfg.unwrap_or_default();

        if cfg.concurrency == 0 {
            return Err(BuildError::InvalidConfig("concurrency must be >= 1"));
        }
        if cfg.profile_deadline.is_zero() {
            return Err(BuildError::InvalidConfig("profile deadline must be > 0"));
        }
        if cfg.retry.max_attempts == 0 {
            return Err(BuildError::InvalidConfig("retry max_attempts must be >= 1"));
        }
        if cfg.cycle.lead_time <= chrono::TimeDelta::zero() {
            return Err(BuildError::InvalidConfig("lead time must be > 0"));
        }

        Ok(CycleRunner {
            store,
            auth,
            device,
            clock,
            cfg,
        })
    }
}
